//! Sync Filesystem Bridge
//!
//! The interpreter core is synchronous; the [`crate::vfs::Vfs`] trait is
//! async. This bridge executes filesystem futures on the runtime from
//! inside `block_in_place`, which requires the multi-threaded runtime —
//! the same arrangement the engine's public `exec` sets up.

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use crate::vfs::{DirEntry, Metadata, RemoveOpts, Vfs, VfsError};

#[derive(Clone)]
pub struct SyncFs {
    inner: Arc<dyn Vfs>,
    handle: tokio::runtime::Handle,
}

impl SyncFs {
    pub fn new(inner: Arc<dyn Vfs>, handle: tokio::runtime::Handle) -> Self {
        Self { inner, handle }
    }

    pub fn shared(&self) -> Arc<dyn Vfs> {
        self.inner.clone()
    }

    pub fn handle(&self) -> tokio::runtime::Handle {
        self.handle.clone()
    }

    pub fn block_on<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        tokio::task::block_in_place(|| self.handle.block_on(fut))
    }

    pub fn read_to_string(&self, path: &str) -> Result<String, VfsError> {
        self.block_on(self.inner.read_to_string(path))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.block_on(self.inner.read(path))
    }

    pub fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.block_on(self.inner.write(path, data))
    }

    pub fn append(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.block_on(self.inner.append(path, data))
    }

    pub fn remove(&self, path: &str, opts: RemoveOpts) -> Result<(), VfsError> {
        self.block_on(self.inner.remove(path, opts))
    }

    pub fn mkdir(&self, path: &str, recursive: bool) -> Result<(), VfsError> {
        self.block_on(self.inner.mkdir(path, recursive))
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        self.block_on(self.inner.read_dir(path))
    }

    pub fn metadata(&self, path: &str) -> Result<Metadata, VfsError> {
        self.block_on(self.inner.metadata(path))
    }

    pub fn symlink_metadata(&self, path: &str) -> Result<Metadata, VfsError> {
        self.block_on(self.inner.symlink_metadata(path))
    }

    pub fn symlink(&self, target: &str, link: &str) -> Result<(), VfsError> {
        self.block_on(self.inner.symlink(target, link))
    }

    pub fn read_link(&self, path: &str) -> Result<String, VfsError> {
        self.block_on(self.inner.read_link(path))
    }

    pub fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError> {
        self.block_on(self.inner.rename(src, dst))
    }

    pub fn set_mtime(&self, path: &str, mtime: SystemTime) -> Result<(), VfsError> {
        self.block_on(self.inner.set_mtime(path, mtime))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.block_on(self.inner.exists(path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.metadata(path).map(|m| m.is_file()).unwrap_or(false)
    }

    pub fn canonicalize(&self, path: &str) -> Result<String, VfsError> {
        self.block_on(self.inner.canonicalize(path))
    }

    pub fn resolve(&self, base: &str, rel: &str) -> String {
        self.inner.resolve(base, rel)
    }

    pub fn all_paths(&self) -> Vec<String> {
        self.inner.all_paths()
    }
}
