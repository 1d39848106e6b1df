//! Mount Namespaces
//!
//! A [`MountFs`] routes each path to one of several filesystem instances:
//! an ordered table binds path prefixes to inner filesystems, and the
//! longest matching prefix wins. Paths outside every mount fall through
//! to the base filesystem. Directory listings are stitched together at
//! boundaries, so a mount point shows up in its parent's listing even
//! when the base filesystem has no entry there.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::path;
use super::{DirEntry, FileKind, Metadata, RemoveOpts, Vfs, VfsError};

pub struct MountFs {
    base: Arc<dyn Vfs>,
    mounts: RwLock<Vec<(String, Arc<dyn Vfs>)>>,
}

impl MountFs {
    pub fn new(base: Arc<dyn Vfs>) -> Self {
        Self {
            base,
            mounts: RwLock::new(Vec::new()),
        }
    }

    /// Bind `fs` at `point`. Replaces an existing mount at the same point.
    pub async fn mount(&self, point: &str, fs: Arc<dyn Vfs>) {
        let point = path::normalize(point);
        let mut mounts = self.mounts.write().await;
        mounts.retain(|(p, _)| *p != point);
        mounts.push((point, fs));
        // Longest prefix first makes routing a linear scan for the win.
        mounts.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
    }

    /// Remove the mount at `point`. Returns whether one was present.
    pub async fn unmount(&self, point: &str) -> bool {
        let point = path::normalize(point);
        let mut mounts = self.mounts.write().await;
        let before = mounts.len();
        mounts.retain(|(p, _)| *p != point);
        mounts.len() != before
    }

    /// Pick the filesystem owning `path`, translate the path into it, and
    /// report which mount point matched (`None` for the base filesystem).
    async fn route(&self, p: &str) -> (Arc<dyn Vfs>, String, Option<String>) {
        let norm = path::normalize(p);
        let mounts = self.mounts.read().await;
        for (point, fs) in mounts.iter() {
            if let Some(rest) = path::strip_prefix(&norm, point) {
                let inner = if rest.is_empty() {
                    "/".to_string()
                } else {
                    format!("/{}", rest)
                };
                return (fs.clone(), inner, Some(point.clone()));
            }
        }
        (self.base.clone(), norm, None)
    }

    /// Mount points that live directly inside `dir`, as entry names, and
    /// whether `dir` is itself a strict ancestor of some mount point.
    async fn boundary_info(&self, dir: &str) -> (Vec<String>, bool) {
        let norm = path::normalize(dir);
        let mounts = self.mounts.read().await;
        let mut names = Vec::new();
        let mut is_ancestor = false;
        for (point, _) in mounts.iter() {
            if point == &norm {
                continue;
            }
            if let Some(rest) = path::strip_prefix(point, &norm) {
                is_ancestor = true;
                if let Some(first) = rest.split('/').next() {
                    if !first.is_empty() {
                        names.push(first.to_string());
                    }
                }
            }
        }
        (names, is_ancestor)
    }
}

#[async_trait]
impl Vfs for MountFs {
    async fn read_to_string(&self, p: &str) -> Result<String, VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.read_to_string(&inner).await
    }

    async fn read(&self, p: &str) -> Result<Vec<u8>, VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.read(&inner).await
    }

    async fn write(&self, p: &str, data: &[u8]) -> Result<(), VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.write(&inner, data).await
    }

    async fn append(&self, p: &str, data: &[u8]) -> Result<(), VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.append(&inner, data).await
    }

    async fn remove(&self, p: &str, opts: RemoveOpts) -> Result<(), VfsError> {
        let (_, ancestor) = self.boundary_info(p).await;
        if ancestor {
            return Err(VfsError::Invalid(p.to_string()));
        }
        let (fs, inner, point) = self.route(p).await;
        if inner == "/" && point.is_some() {
            // Removing a mount point means unmounting, not deleting.
            return Err(VfsError::Invalid(p.to_string()));
        }
        fs.remove(&inner, opts).await
    }

    async fn mkdir(&self, p: &str, recursive: bool) -> Result<(), VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.mkdir(&inner, recursive).await
    }

    async fn read_dir(&self, p: &str) -> Result<Vec<DirEntry>, VfsError> {
        let (fs, inner, _) = self.route(p).await;
        let (boundary_names, is_ancestor) = self.boundary_info(p).await;
        let mut entries = match fs.read_dir(&inner).await {
            Ok(entries) => entries,
            // A directory that exists only as a route to a mount point
            // still lists its boundary children.
            Err(_) if is_ancestor => Vec::new(),
            Err(e) => return Err(e),
        };
        let mut seen: HashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        for name in boundary_names {
            if seen.insert(name.clone()) {
                entries.push(DirEntry {
                    name,
                    kind: FileKind::Dir,
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn metadata(&self, p: &str) -> Result<Metadata, VfsError> {
        let (fs, inner, _) = self.route(p).await;
        match fs.metadata(&inner).await {
            Ok(meta) => Ok(meta),
            Err(e) => {
                let (_, is_ancestor) = self.boundary_info(p).await;
                if is_ancestor {
                    Ok(Metadata {
                        kind: FileKind::Dir,
                        size: 0,
                        mode: 0o755,
                        mtime: SystemTime::UNIX_EPOCH,
                    })
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn symlink_metadata(&self, p: &str) -> Result<Metadata, VfsError> {
        let (fs, inner, _) = self.route(p).await;
        match fs.symlink_metadata(&inner).await {
            Ok(meta) => Ok(meta),
            Err(e) => {
                let (_, is_ancestor) = self.boundary_info(p).await;
                if is_ancestor {
                    Ok(Metadata {
                        kind: FileKind::Dir,
                        size: 0,
                        mode: 0o755,
                        mtime: SystemTime::UNIX_EPOCH,
                    })
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<(), VfsError> {
        let (fs, inner, _) = self.route(link).await;
        fs.symlink(target, &inner).await
    }

    async fn read_link(&self, p: &str) -> Result<String, VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.read_link(&inner).await
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError> {
        let (src_fs, src_inner, _) = self.route(src).await;
        let (dst_fs, dst_inner, _) = self.route(dst).await;
        if Arc::ptr_eq(&src_fs, &dst_fs) {
            return src_fs.rename(&src_inner, &dst_inner).await;
        }
        // Cross-mount rename degrades to copy + delete.
        let meta = src_fs.metadata(&src_inner).await?;
        if meta.is_dir() {
            self.copy(src, dst, true).await?;
            src_fs
                .remove(
                    &src_inner,
                    RemoveOpts {
                        recursive: true,
                        force: false,
                    },
                )
                .await
        } else {
            let data = src_fs.read(&src_inner).await?;
            dst_fs.write(&dst_inner, &data).await?;
            src_fs.remove(&src_inner, RemoveOpts::default()).await
        }
    }

    async fn copy(&self, src: &str, dst: &str, recursive: bool) -> Result<(), VfsError> {
        let meta = self.metadata(src).await?;
        if meta.is_dir() {
            if !recursive {
                return Err(VfsError::IsADirectory(src.to_string()));
            }
            self.mkdir(dst, true).await?;
            for entry in self.read_dir(src).await? {
                let from = path::join(&path::normalize(src), &entry.name);
                let to = path::join(&path::normalize(dst), &entry.name);
                Box::pin(self.copy(&from, &to, true)).await?;
            }
            Ok(())
        } else {
            let data = self.read(src).await?;
            self.write(dst, &data).await
        }
    }

    async fn set_mode(&self, p: &str, mode: u32) -> Result<(), VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.set_mode(&inner, mode).await
    }

    async fn set_mtime(&self, p: &str, mtime: SystemTime) -> Result<(), VfsError> {
        let (fs, inner, _) = self.route(p).await;
        fs.set_mtime(&inner, mtime).await
    }

    async fn canonicalize(&self, p: &str) -> Result<String, VfsError> {
        let (fs, inner, point) = self.route(p).await;
        let inner_canon = fs.canonicalize(&inner).await?;
        match point {
            None => Ok(inner_canon),
            Some(point) => Ok(path::normalize(&format!("{}/{}", point, inner_canon))),
        }
    }

    fn all_paths(&self) -> Vec<String> {
        let mounts = self.mounts.blocking_read();
        let mut out: Vec<String> = self
            .base
            .all_paths()
            .into_iter()
            .filter(|p| !mounts.iter().any(|(point, _)| path::starts_with(p, point)))
            .collect();
        for (point, fs) in mounts.iter() {
            for inner in fs.all_paths() {
                let joined = if inner == "/" {
                    point.clone()
                } else {
                    path::normalize(&format!("{}/{}", point, inner))
                };
                out.push(joined);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemFs;

    async fn fs_with(files: &[(&str, &str)]) -> Arc<dyn Vfs> {
        let fs = MemFs::new();
        for (p, c) in files {
            fs.write(p, c.as_bytes()).await.unwrap();
        }
        Arc::new(fs)
    }

    #[tokio::test]
    async fn test_routes_longest_prefix() {
        let mounted = MountFs::new(fs_with(&[("/base.txt", "b")]).await);
        mounted
            .mount("/data", fs_with(&[("/f", "data-fs")]).await)
            .await;
        mounted
            .mount("/data/inner", fs_with(&[("/f", "inner-fs")]).await)
            .await;
        assert_eq!(mounted.read_to_string("/data/f").await.unwrap(), "data-fs");
        assert_eq!(
            mounted.read_to_string("/data/inner/f").await.unwrap(),
            "inner-fs"
        );
        assert_eq!(mounted.read_to_string("/base.txt").await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_writes_land_in_mount() {
        let inner = Arc::new(MemFs::new());
        let mounted = MountFs::new(Arc::new(MemFs::new()));
        mounted.mount("/mnt", inner.clone()).await;
        mounted.write("/mnt/out.txt", b"captured").await.unwrap();
        assert_eq!(inner.read_to_string("/out.txt").await.unwrap(), "captured");
    }

    #[tokio::test]
    async fn test_listing_stitches_boundary() {
        let mounted = MountFs::new(fs_with(&[("/plain.txt", "x")]).await);
        mounted.mount("/mnt/data", Arc::new(MemFs::new())).await;
        let names: Vec<String> = mounted
            .read_dir("/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert!(names.contains(&"mnt".to_string()));
        assert!(names.contains(&"plain.txt".to_string()));
        let under: Vec<String> = mounted
            .read_dir("/mnt")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(under, vec!["data"]);
    }

    #[tokio::test]
    async fn test_mount_point_stats_as_dir() {
        let mounted = MountFs::new(Arc::new(MemFs::new()));
        mounted.mount("/srv/files", Arc::new(MemFs::new())).await;
        assert!(mounted.metadata("/srv").await.unwrap().is_dir());
        assert!(mounted.metadata("/srv/files").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_unmount_restores_base() {
        let mounted = MountFs::new(fs_with(&[("/d/f", "base")]).await);
        mounted.mount("/d", fs_with(&[("/f", "mounted")]).await).await;
        assert_eq!(mounted.read_to_string("/d/f").await.unwrap(), "mounted");
        assert!(mounted.unmount("/d").await);
        assert_eq!(mounted.read_to_string("/d/f").await.unwrap(), "base");
    }

    #[tokio::test]
    async fn test_cross_mount_rename() {
        let mounted = MountFs::new(fs_with(&[("/a.txt", "payload")]).await);
        mounted.mount("/m", Arc::new(MemFs::new())).await;
        mounted.rename("/a.txt", "/m/b.txt").await.unwrap();
        assert_eq!(mounted.read_to_string("/m/b.txt").await.unwrap(), "payload");
        assert!(!mounted.exists("/a.txt").await);
    }
}
