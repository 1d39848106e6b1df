//! Virtual Filesystem
//!
//! The engine performs all file I/O through the [`Vfs`] trait so embedders
//! can swap storage strategies without touching the interpreter. Three
//! implementations ship with the crate:
//!
//! - [`MemFs`]: a plain in-memory tree, the default backing store.
//! - [`OverlayFs`]: copy-on-write over any lower filesystem, with whiteout
//!   markers for deletions.
//! - [`MountFs`]: a base filesystem plus a routing table binding path
//!   prefixes to other filesystem instances.
//! - [`HostFs`]: a (normally read-only) window onto a host directory,
//!   meant to sit below an overlay.

pub mod host;
pub mod mem;
pub mod mount;
pub mod overlay;
pub mod path;

pub use host::HostFs;
pub use mem::MemFs;
pub use mount::MountFs;
pub use overlay::OverlayFs;

use async_trait::async_trait;
use std::time::SystemTime;
use thiserror::Error;

/// Maximum symlink hops during one path resolution.
pub const MAX_LINK_HOPS: u32 = 32;

/// Filesystem errors, tagged with the classic errno family.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    #[error("ENOENT: no such file or directory: '{0}'")]
    NotFound(String),

    #[error("EEXIST: file exists: '{0}'")]
    AlreadyExists(String),

    #[error("EISDIR: is a directory: '{0}'")]
    IsADirectory(String),

    #[error("ENOTDIR: not a directory: '{0}'")]
    NotADirectory(String),

    #[error("ENOTEMPTY: directory not empty: '{0}'")]
    NotEmpty(String),

    #[error("ELOOP: too many levels of symbolic links: '{0}'")]
    TooManyLinks(String),

    #[error("EROFS: read-only file system: '{0}'")]
    ReadOnly(String),

    #[error("EINVAL: invalid argument: '{0}'")]
    Invalid(String),
}

/// What kind of thing a directory entry or metadata record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

/// Stat-style record for a single path.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: FileKind,
    pub size: u64,
    pub mode: u32,
    pub mtime: SystemTime,
}

impl Metadata {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

/// One child of a directory, with its kind so listings need not re-stat.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

/// Options for [`Vfs::remove`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOpts {
    pub recursive: bool,
    pub force: bool,
}

/// The filesystem contract consumed by the interpreter and every bundled
/// utility. Paths handed to these methods are absolute; callers resolve
/// relative input against the shell's cwd first via [`Vfs::resolve`].
#[async_trait]
pub trait Vfs: Send + Sync {
    /// Read a file as UTF-8 text (lossy for non-UTF-8 bytes).
    async fn read_to_string(&self, path: &str) -> Result<String, VfsError>;

    /// Read a file's raw bytes.
    async fn read(&self, path: &str) -> Result<Vec<u8>, VfsError>;

    /// Create or truncate a file with the given bytes.
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError>;

    /// Append bytes, creating the file when absent.
    async fn append(&self, path: &str, data: &[u8]) -> Result<(), VfsError>;

    /// Remove a file, symlink, or (with `recursive`) a directory tree.
    async fn remove(&self, path: &str, opts: RemoveOpts) -> Result<(), VfsError>;

    /// Create a directory; with `recursive`, create missing ancestors and
    /// tolerate an existing directory.
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), VfsError>;

    /// List a directory's children, sorted by name.
    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError>;

    /// Stat following symlinks.
    async fn metadata(&self, path: &str) -> Result<Metadata, VfsError>;

    /// Stat without following a trailing symlink.
    async fn symlink_metadata(&self, path: &str) -> Result<Metadata, VfsError>;

    /// Create a symlink at `link` pointing to `target`.
    async fn symlink(&self, target: &str, link: &str) -> Result<(), VfsError>;

    /// Read a symlink's target.
    async fn read_link(&self, path: &str) -> Result<String, VfsError>;

    /// Rename a file or directory tree.
    async fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError>;

    /// Copy a file; with `recursive`, copy a directory tree.
    async fn copy(&self, src: &str, dst: &str, recursive: bool) -> Result<(), VfsError>;

    /// Change a path's permission bits.
    async fn set_mode(&self, path: &str, mode: u32) -> Result<(), VfsError>;

    /// Change a path's modification time.
    async fn set_mtime(&self, path: &str, mtime: SystemTime) -> Result<(), VfsError>;

    /// Does the path exist (following symlinks)?
    async fn exists(&self, path: &str) -> bool {
        self.metadata(path).await.is_ok()
    }

    /// Fully resolve symlinks, yielding the physical path.
    async fn canonicalize(&self, path: &str) -> Result<String, VfsError>;

    /// Resolve a possibly-relative path against a base directory. Pure
    /// string arithmetic; never touches storage.
    fn resolve(&self, base: &str, rel: &str) -> String {
        path::resolve(base, rel)
    }

    /// Every absolute path currently present, unordered. Pathname
    /// expansion and `find`-style walks are built on this.
    fn all_paths(&self) -> Vec<String>;
}
