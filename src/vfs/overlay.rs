//! Copy-On-Write Overlay
//!
//! An [`OverlayFs`] stacks a writable upper layer (a private [`MemFs`])
//! over an arbitrary read-only lower filesystem. Lookup order for a path:
//!
//! 1. whiteout marker present → `ENOENT`
//! 2. upper layer has the path → upper wins
//! 3. otherwise → fall through to the lower layer
//!
//! Deleting a path that only exists below records a whiteout instead of
//! touching the lower layer. Recursive deletes whiteout every affected
//! lower path individually, so re-creating a directory later does not
//! resurrect its old children.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::mem::MemFs;
use super::path;
use super::{DirEntry, Metadata, RemoveOpts, Vfs, VfsError};

pub struct OverlayFs {
    lower: Arc<dyn Vfs>,
    upper: MemFs,
    whiteouts: RwLock<HashSet<String>>,
}

impl OverlayFs {
    pub fn new(lower: Arc<dyn Vfs>) -> Self {
        Self {
            lower,
            upper: MemFs::new(),
            whiteouts: RwLock::new(HashSet::new()),
        }
    }

    async fn hidden(&self, path: &str) -> bool {
        let whiteouts = self.whiteouts.read().await;
        let norm = path::normalize(path);
        if whiteouts.contains(&norm) {
            return true;
        }
        // An ancestor whiteout hides the whole lower subtree unless the
        // upper layer re-created the ancestor.
        let mut cur = norm;
        loop {
            let up = path::parent(&cur);
            if up == cur {
                return false;
            }
            if whiteouts.contains(&up) && !self.upper.exists(&up).await {
                return true;
            }
            cur = up;
        }
    }

    async fn unhide(&self, path: &str) {
        self.whiteouts.write().await.remove(&path::normalize(path));
    }

    /// Pull a lower file into the upper layer before an in-place edit.
    async fn copy_up(&self, path: &str) -> Result<(), VfsError> {
        if self.upper.exists(path).await || self.hidden(path).await {
            return Ok(());
        }
        if let Ok(data) = self.lower.read(path).await {
            self.upper.write(path, &data).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Vfs for OverlayFs {
    async fn read_to_string(&self, path: &str) -> Result<String, VfsError> {
        let data = self.read(path).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        if self.hidden(path).await {
            return Err(VfsError::NotFound(path.to_string()));
        }
        match self.upper.read(path).await {
            Err(VfsError::NotFound(_)) => self.lower.read(path).await,
            other => other,
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        if !self.hidden(path).await {
            if let Ok(meta) = self.lower.metadata(path).await {
                if meta.is_dir() {
                    return Err(VfsError::IsADirectory(path.to_string()));
                }
            }
        }
        self.unhide(path).await;
        self.upper.write(path, data).await
    }

    async fn append(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        if !self.hidden(path).await {
            self.copy_up(path).await?;
        }
        self.unhide(path).await;
        self.upper.append(path, data).await
    }

    async fn remove(&self, path: &str, opts: RemoveOpts) -> Result<(), VfsError> {
        let existed_below = !self.hidden(path).await && self.lower.exists(path).await;
        let existed_above = self.upper.exists(path).await;
        if !existed_below && !existed_above {
            return if opts.force {
                Ok(())
            } else {
                Err(VfsError::NotFound(path.to_string()))
            };
        }
        let is_dir = self.metadata(path).await.map(|m| m.is_dir()).unwrap_or(false);
        if is_dir && !opts.recursive {
            if !self.read_dir(path).await?.is_empty() {
                return Err(VfsError::NotEmpty(path.to_string()));
            }
        }
        if existed_above {
            self.upper
                .remove(
                    path,
                    RemoveOpts {
                        recursive: opts.recursive,
                        force: true,
                    },
                )
                .await?;
        }
        if existed_below {
            let norm = path::normalize(path);
            let mut whiteouts = self.whiteouts.write().await;
            for lower_path in self.lower.all_paths() {
                if path::starts_with(&lower_path, &norm) {
                    whiteouts.insert(lower_path);
                }
            }
        }
        Ok(())
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), VfsError> {
        if self.exists(path).await {
            return if recursive && self.metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
                Ok(())
            } else {
                Err(VfsError::AlreadyExists(path.to_string()))
            };
        }
        self.unhide(path).await;
        self.upper.mkdir(path, true).await?;
        let _ = recursive;
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        if self.hidden(path).await {
            return Err(VfsError::NotFound(path.to_string()));
        }
        let upper_entries = self.upper.read_dir(path).await;
        let lower_entries = self.lower.read_dir(path).await;
        if upper_entries.is_err() && lower_entries.is_err() {
            return lower_entries;
        }
        let mut merged: Vec<DirEntry> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for entry in upper_entries.into_iter().flatten() {
            seen.insert(entry.name.clone());
            merged.push(entry);
        }
        for entry in lower_entries.into_iter().flatten() {
            let child = path::join(&path::normalize(path), &entry.name);
            if !seen.contains(&entry.name) && !self.hidden(&child).await {
                merged.push(entry);
            }
        }
        merged.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(merged)
    }

    async fn metadata(&self, path: &str) -> Result<Metadata, VfsError> {
        if self.hidden(path).await {
            return Err(VfsError::NotFound(path.to_string()));
        }
        match self.upper.metadata(path).await {
            Err(VfsError::NotFound(_)) => self.lower.metadata(path).await,
            other => other,
        }
    }

    async fn symlink_metadata(&self, path: &str) -> Result<Metadata, VfsError> {
        if self.hidden(path).await {
            return Err(VfsError::NotFound(path.to_string()));
        }
        match self.upper.symlink_metadata(path).await {
            Err(VfsError::NotFound(_)) => self.lower.symlink_metadata(path).await,
            other => other,
        }
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<(), VfsError> {
        if self.exists(link).await {
            return Err(VfsError::AlreadyExists(link.to_string()));
        }
        self.unhide(link).await;
        self.upper.symlink(target, link).await
    }

    async fn read_link(&self, path: &str) -> Result<String, VfsError> {
        if self.hidden(path).await {
            return Err(VfsError::NotFound(path.to_string()));
        }
        match self.upper.read_link(path).await {
            Err(VfsError::NotFound(_)) => self.lower.read_link(path).await,
            other => other,
        }
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError> {
        let data = self.read(src).await;
        match data {
            Ok(bytes) => {
                self.write(dst, &bytes).await?;
                self.remove(src, RemoveOpts::default()).await
            }
            Err(VfsError::IsADirectory(_)) => {
                self.copy(src, dst, true).await?;
                self.remove(
                    src,
                    RemoveOpts {
                        recursive: true,
                        force: false,
                    },
                )
                .await
            }
            Err(e) => Err(e),
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

    async fn set_mode(&self, path: &str, mode: u32) -> Result<(), VfsError> {
        self.copy_up(path).await?;
        self.upper.set_mode(path, mode).await
    }

    async fn set_mtime(&self, path: &str, mtime: SystemTime) -> Result<(), VfsError> {
        self.copy_up(path).await?;
        self.upper.set_mtime(path, mtime).await
    }

    async fn exists(&self, path: &str) -> bool {
        self.metadata(path).await.is_ok()
    }

    async fn canonicalize(&self, path: &str) -> Result<String, VfsError> {
        if self.hidden(path).await {
            return Err(VfsError::NotFound(path.to_string()));
        }
        match self.upper.canonicalize(path).await {
            Err(VfsError::NotFound(_)) => self.lower.canonicalize(path).await,
            other => other,
        }
    }

    fn all_paths(&self) -> Vec<String> {
        let whiteouts = self.whiteouts.blocking_read();
        let mut paths: HashSet<String> = self
            .lower
            .all_paths()
            .into_iter()
            .filter(|p| {
                // Cheap ancestor check against the whiteout set only; the
                // full hidden() check needs async upper lookups.
                let mut cur = p.clone();
                loop {
                    if whiteouts.contains(&cur) {
                        return false;
                    }
                    let up = path::parent(&cur);
                    if up == cur {
                        return true;
                    }
                    cur = up;
                }
            })
            .collect();
        paths.extend(self.upper.all_paths());
        paths.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn lower_with(files: &[(&str, &str)]) -> Arc<dyn Vfs> {
        let fs = MemFs::new();
        for (p, c) in files {
            fs.write(p, c.as_bytes()).await.unwrap();
        }
        Arc::new(fs)
    }

    #[tokio::test]
    async fn test_read_falls_through() {
        let overlay = OverlayFs::new(lower_with(&[("/etc/motd", "hi")]).await);
        assert_eq!(overlay.read_to_string("/etc/motd").await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_write_shadows_lower() {
        let overlay = OverlayFs::new(lower_with(&[("/f", "old")]).await);
        overlay.write("/f", b"new").await.unwrap();
        assert_eq!(overlay.read_to_string("/f").await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_delete_creates_whiteout() {
        let overlay = OverlayFs::new(lower_with(&[("/f", "x")]).await);
        overlay.remove("/f", RemoveOpts::default()).await.unwrap();
        assert!(matches!(
            overlay.read("/f").await,
            Err(VfsError::NotFound(_))
        ));
        // The lower layer itself is untouched.
        assert!(overlay.lower.exists("/f").await);
    }

    #[tokio::test]
    async fn test_whiteout_then_recreate() {
        let overlay = OverlayFs::new(lower_with(&[("/f", "old")]).await);
        overlay.remove("/f", RemoveOpts::default()).await.unwrap();
        overlay.write("/f", b"fresh").await.unwrap();
        assert_eq!(overlay.read_to_string("/f").await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_recursive_delete_hides_children() {
        let overlay =
            OverlayFs::new(lower_with(&[("/d/a", "1"), ("/d/b", "2")]).await);
        overlay
            .remove(
                "/d",
                RemoveOpts {
                    recursive: true,
                    force: false,
                },
            )
            .await
            .unwrap();
        overlay.mkdir("/d", true).await.unwrap();
        // Old children must not resurface under the re-created directory.
        assert!(overlay.read_dir("/d").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_dir_merges_layers() {
        let overlay = OverlayFs::new(lower_with(&[("/d/lower.txt", "l")]).await);
        overlay.write("/d/upper.txt", b"u").await.unwrap();
        let names: Vec<String> = overlay
            .read_dir("/d")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["lower.txt", "upper.txt"]);
    }

    #[tokio::test]
    async fn test_append_copies_up() {
        let overlay = OverlayFs::new(lower_with(&[("/log", "a\n")]).await);
        overlay.append("/log", b"b\n").await.unwrap();
        assert_eq!(overlay.read_to_string("/log").await.unwrap(), "a\nb\n");
        assert_eq!(overlay.lower.read_to_string("/log").await.unwrap(), "a\n");
    }
}
