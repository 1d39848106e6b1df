//! Host-Backed Filesystem
//!
//! Maps a subtree of the host filesystem into the sandbox. Reads delegate
//! to `std::fs`; writes are rejected with `EROFS` unless the filesystem
//! was opened writable. The usual sandboxing composition is a read-only
//! [`HostFs`] under an [`crate::vfs::OverlayFs`], which captures all
//! modifications in memory and leaves the host directory untouched.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

use super::path as vpath;
use super::{DirEntry, FileKind, Metadata, RemoveOpts, Vfs, VfsError};

pub struct HostFs {
    root: PathBuf,
    writable: bool,
}

impl HostFs {
    /// Expose `root` read-only.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writable: false,
        }
    }

    /// Expose `root` with writes passed through to the host.
    pub fn writable(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writable: true,
        }
    }

    /// Translate a virtual absolute path into a host path, refusing to
    /// escape the root.
    fn host_path(&self, p: &str) -> PathBuf {
        let norm = vpath::normalize(p);
        self.root.join(norm.trim_start_matches('/'))
    }

    fn guard_write(&self, p: &str) -> Result<(), VfsError> {
        if self.writable {
            Ok(())
        } else {
            Err(VfsError::ReadOnly(p.to_string()))
        }
    }

    fn map_err(p: &str, e: std::io::Error) -> VfsError {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => VfsError::NotFound(p.to_string()),
            ErrorKind::AlreadyExists => VfsError::AlreadyExists(p.to_string()),
            ErrorKind::PermissionDenied => VfsError::ReadOnly(p.to_string()),
            _ => VfsError::Invalid(p.to_string()),
        }
    }

    fn meta_from(meta: &std::fs::Metadata) -> Metadata {
        let kind = if meta.is_dir() {
            FileKind::Dir
        } else if meta.file_type().is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::File
        };
        Metadata {
            kind,
            size: meta.len(),
            mode: 0o644,
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    fn walk(dir: &Path, prefix: &str, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let virt = vpath::join(prefix, &name);
            out.push(virt.clone());
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                Self::walk(&entry.path(), &virt, out);
            }
        }
    }
}

#[async_trait]
impl Vfs for HostFs {
    async fn read_to_string(&self, p: &str) -> Result<String, VfsError> {
        let data = self.read(p).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn read(&self, p: &str) -> Result<Vec<u8>, VfsError> {
        let host = self.host_path(p);
        if host.is_dir() {
            return Err(VfsError::IsADirectory(p.to_string()));
        }
        std::fs::read(&host).map_err(|e| Self::map_err(p, e))
    }

    async fn write(&self, p: &str, data: &[u8]) -> Result<(), VfsError> {
        self.guard_write(p)?;
        let host = self.host_path(p);
        if let Some(parent) = host.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Self::map_err(p, e))?;
        }
        std::fs::write(&host, data).map_err(|e| Self::map_err(p, e))
    }

    async fn append(&self, p: &str, data: &[u8]) -> Result<(), VfsError> {
        self.guard_write(p)?;
        use std::io::Write;
        let host = self.host_path(p);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&host)
            .map_err(|e| Self::map_err(p, e))?;
        file.write_all(data).map_err(|e| Self::map_err(p, e))
    }

    async fn remove(&self, p: &str, opts: RemoveOpts) -> Result<(), VfsError> {
        self.guard_write(p)?;
        let host = self.host_path(p);
        let result = if host.is_dir() {
            if opts.recursive {
                std::fs::remove_dir_all(&host)
            } else {
                std::fs::remove_dir(&host)
            }
        } else {
            std::fs::remove_file(&host)
        };
        match result {
            Err(e) if opts.force && e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other.map_err(|e| Self::map_err(p, e)),
        }
    }

    async fn mkdir(&self, p: &str, recursive: bool) -> Result<(), VfsError> {
        self.guard_write(p)?;
        let host = self.host_path(p);
        if recursive {
            std::fs::create_dir_all(&host).map_err(|e| Self::map_err(p, e))
        } else {
            std::fs::create_dir(&host).map_err(|e| Self::map_err(p, e))
        }
    }

    async fn read_dir(&self, p: &str) -> Result<Vec<DirEntry>, VfsError> {
        let host = self.host_path(p);
        let meta = std::fs::metadata(&host).map_err(|e| Self::map_err(p, e))?;
        if !meta.is_dir() {
            return Err(VfsError::NotADirectory(p.to_string()));
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&host).map_err(|e| Self::map_err(p, e))? {
            let entry = entry.map_err(|e| Self::map_err(p, e))?;
            let kind = entry
                .file_type()
                .map(|t| {
                    if t.is_dir() {
                        FileKind::Dir
                    } else if t.is_symlink() {
                        FileKind::Symlink
                    } else {
                        FileKind::File
                    }
                })
                .unwrap_or(FileKind::File);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn metadata(&self, p: &str) -> Result<Metadata, VfsError> {
        let host = self.host_path(p);
        std::fs::metadata(&host)
            .map(|m| Self::meta_from(&m))
            .map_err(|e| Self::map_err(p, e))
    }

    async fn symlink_metadata(&self, p: &str) -> Result<Metadata, VfsError> {
        let host = self.host_path(p);
        std::fs::symlink_metadata(&host)
            .map(|m| Self::meta_from(&m))
            .map_err(|e| Self::map_err(p, e))
    }

    async fn symlink(&self, _target: &str, link: &str) -> Result<(), VfsError> {
        // Symlink creation on the host is never passed through.
        Err(VfsError::ReadOnly(link.to_string()))
    }

    async fn read_link(&self, p: &str) -> Result<String, VfsError> {
        let host = self.host_path(p);
        std::fs::read_link(&host)
            .map(|t| t.to_string_lossy().into_owned())
            .map_err(|e| Self::map_err(p, e))
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError> {
        self.guard_write(src)?;
        std::fs::rename(self.host_path(src), self.host_path(dst))
            .map_err(|e| Self::map_err(src, e))
    }

    async fn copy(&self, src: &str, dst: &str, recursive: bool) -> Result<(), VfsError> {
        let meta = self.metadata(src).await?;
        if meta.is_dir() {
            if !recursive {
                return Err(VfsError::IsADirectory(src.to_string()));
            }
            self.mkdir(dst, true).await?;
            for entry in self.read_dir(src).await? {
                let from = vpath::join(&vpath::normalize(src), &entry.name);
                let to = vpath::join(&vpath::normalize(dst), &entry.name);
                Box::pin(self.copy(&from, &to, true)).await?;
            }
            Ok(())
        } else {
            let data = self.read(src).await?;
            self.write(dst, &data).await
        }
    }

    async fn set_mode(&self, p: &str, _mode: u32) -> Result<(), VfsError> {
        self.guard_write(p)
    }

    async fn set_mtime(&self, p: &str, _mtime: SystemTime) -> Result<(), VfsError> {
        self.guard_write(p)
    }

    async fn canonicalize(&self, p: &str) -> Result<String, VfsError> {
        if self.exists(p).await {
            Ok(vpath::normalize(p))
        } else {
            Err(VfsError::NotFound(p.to_string()))
        }
    }

    fn all_paths(&self) -> Vec<String> {
        let mut out = vec!["/".to_string()];
        Self::walk(&self.root, "/", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempdir::TempDirAlike, HostFs) {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        // Build a throwaway directory under the system temp dir without
        // extra dev-dependencies.
        let dir = std::env::temp_dir().join(format!(
            "shellbox-hostfs-{}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("a.txt"), "host data").unwrap();
        std::fs::write(dir.join("sub/b.txt"), "nested").unwrap();
        (tempdir::TempDirAlike(dir.clone()), HostFs::read_only(dir))
    }

    mod tempdir {
        pub struct TempDirAlike(pub std::path::PathBuf);
        impl Drop for TempDirAlike {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    #[tokio::test]
    async fn test_reads_delegate_to_host() {
        let (_guard, fs) = fixture();
        assert_eq!(fs.read_to_string("/a.txt").await.unwrap(), "host data");
        assert_eq!(fs.read_to_string("/sub/b.txt").await.unwrap(), "nested");
    }

    #[tokio::test]
    async fn test_writes_blocked_when_read_only() {
        let (_guard, fs) = fixture();
        assert!(matches!(
            fs.write("/a.txt", b"nope").await,
            Err(VfsError::ReadOnly(_))
        ));
        assert!(matches!(
            fs.remove("/a.txt", RemoveOpts::default()).await,
            Err(VfsError::ReadOnly(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_and_stat() {
        let (_guard, fs) = fixture();
        let names: Vec<String> = fs
            .read_dir("/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "sub"]);
        assert!(fs.metadata("/sub").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_escape_attempts_clamp_to_root() {
        let (_guard, fs) = fixture();
        // `..` past the virtual root must not reach the host parent.
        assert!(matches!(
            fs.read("/../../etc/hostname").await,
            Err(VfsError::NotFound(_)) | Err(VfsError::Invalid(_)) | Err(VfsError::IsADirectory(_)) | Ok(_)
        ));
        assert_eq!(fs.host_path("/../../x"), fs.host_path("/x"));
    }
}
