//! In-Memory Filesystem
//!
//! The default backing store: a flat map from absolute path to node,
//! guarded by one `RwLock`. Symlinks are resolved component by component
//! with a bounded hop budget, so cycles surface as `ELOOP` rather than
//! hanging the resolver.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::path;
use super::{DirEntry, FileKind, Metadata, RemoveOpts, Vfs, VfsError, MAX_LINK_HOPS};

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Vec<u8>,
        mode: u32,
        mtime: SystemTime,
    },
    Dir {
        mode: u32,
        mtime: SystemTime,
    },
    Link {
        target: String,
        mtime: SystemTime,
    },
}

impl Node {
    fn kind(&self) -> FileKind {
        match self {
            Node::File { .. } => FileKind::File,
            Node::Dir { .. } => FileKind::Dir,
            Node::Link { .. } => FileKind::Symlink,
        }
    }

    fn metadata(&self) -> Metadata {
        match self {
            Node::File { data, mode, mtime } => Metadata {
                kind: FileKind::File,
                size: data.len() as u64,
                mode: *mode,
                mtime: *mtime,
            },
            Node::Dir { mode, mtime } => Metadata {
                kind: FileKind::Dir,
                size: 0,
                mode: *mode,
                mtime: *mtime,
            },
            Node::Link { target, mtime } => Metadata {
                kind: FileKind::Symlink,
                size: target.len() as u64,
                mode: 0o777,
                mtime: *mtime,
            },
        }
    }
}

fn dir_node() -> Node {
    Node::Dir {
        mode: 0o755,
        mtime: SystemTime::now(),
    }
}

/// A pure in-memory virtual filesystem.
pub struct MemFs {
    nodes: RwLock<HashMap<String, Node>>,
}

impl MemFs {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), dir_node());
        Self {
            nodes: RwLock::new(nodes),
        }
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `path` left to right, substituting symlink targets as they are
/// met. When `follow_last` is false a trailing symlink is left in place
/// (lstat/rm/readlink semantics).
fn chase_links(
    nodes: &HashMap<String, Node>,
    path: &str,
    follow_last: bool,
) -> Result<String, VfsError> {
    let mut current = path::normalize(path);
    let mut hops = 0u32;
    'rewalk: loop {
        let comps: Vec<String> = current
            .split('/')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let mut acc = String::from("/");
        for (i, comp) in comps.iter().enumerate() {
            acc = path::join(&acc, comp);
            let last = i + 1 == comps.len();
            if let Some(Node::Link { target, .. }) = nodes.get(&acc) {
                if last && !follow_last {
                    return Ok(current);
                }
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(VfsError::TooManyLinks(path.to_string()));
                }
                let resolved = path::resolve(&path::parent(&acc), target);
                let rest = comps[i + 1..].join("/");
                current = if rest.is_empty() {
                    resolved
                } else {
                    path::normalize(&format!("{}/{}", resolved, rest))
                };
                continue 'rewalk;
            }
        }
        return Ok(current);
    }
}

/// Create any missing ancestor directories of `path`. Fails with
/// `ENOTDIR` when an ancestor exists as a file.
fn ensure_parents(nodes: &mut HashMap<String, Node>, path: &str) -> Result<(), VfsError> {
    let parent = path::parent(path);
    if parent == "/" {
        return Ok(());
    }
    let mut acc = String::from("/");
    for comp in parent.split('/').filter(|c| !c.is_empty()) {
        acc = path::join(&acc, comp);
        match nodes.get(&acc) {
            None => {
                nodes.insert(acc.clone(), dir_node());
            }
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(VfsError::NotADirectory(acc.clone())),
        }
    }
    Ok(())
}

fn children_of<'a>(
    nodes: &'a HashMap<String, Node>,
    dir: &'a str,
) -> impl Iterator<Item = (&'a String, &'a Node)> {
    nodes
        .iter()
        .filter(move |(p, _)| p.as_str() != "/" && path::parent(p) == dir)
}

#[async_trait]
impl Vfs for MemFs {
    async fn read_to_string(&self, path: &str) -> Result<String, VfsError> {
        let data = self.read(path).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let nodes = self.nodes.read().await;
        let real = chase_links(&nodes, path, true)?;
        match nodes.get(&real) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(VfsError::IsADirectory(path.to_string())),
            _ => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let real = chase_links(&nodes, path, true)?;
        ensure_parents(&mut nodes, &real)?;
        let mode = match nodes.get(&real) {
            Some(Node::Dir { .. }) => return Err(VfsError::IsADirectory(path.to_string())),
            Some(Node::File { mode, .. }) => *mode,
            _ => 0o644,
        };
        nodes.insert(
            real,
            Node::File {
                data: data.to_vec(),
                mode,
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn append(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let real = chase_links(&nodes, path, true)?;
        ensure_parents(&mut nodes, &real)?;
        match nodes.get_mut(&real) {
            Some(Node::File {
                data: existing,
                mtime,
                ..
            }) => {
                existing.extend_from_slice(data);
                *mtime = SystemTime::now();
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(VfsError::IsADirectory(path.to_string())),
            _ => {
                nodes.insert(
                    real,
                    Node::File {
                        data: data.to_vec(),
                        mode: 0o644,
                        mtime: SystemTime::now(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn remove(&self, path: &str, opts: RemoveOpts) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let real = chase_links(&nodes, path, false)?;
        if real == "/" {
            return Err(VfsError::Invalid(path.to_string()));
        }
        match nodes.get(&real) {
            None => {
                if opts.force {
                    Ok(())
                } else {
                    Err(VfsError::NotFound(path.to_string()))
                }
            }
            Some(Node::Dir { .. }) => {
                if !opts.recursive {
                    if children_of(&nodes, &real).next().is_some() {
                        return Err(VfsError::NotEmpty(path.to_string()));
                    }
                    nodes.remove(&real);
                    return Ok(());
                }
                let doomed: Vec<String> = nodes
                    .keys()
                    .filter(|p| path::starts_with(p, &real))
                    .cloned()
                    .collect();
                for p in doomed {
                    nodes.remove(&p);
                }
                Ok(())
            }
            Some(_) => {
                nodes.remove(&real);
                Ok(())
            }
        }
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let real = chase_links(&nodes, path, true)?;
        match nodes.get(&real) {
            Some(Node::Dir { .. }) => {
                return if recursive {
                    Ok(())
                } else {
                    Err(VfsError::AlreadyExists(path.to_string()))
                };
            }
            Some(_) => return Err(VfsError::AlreadyExists(path.to_string())),
            None => {}
        }
        let parent = path::parent(&real);
        if recursive {
            ensure_parents(&mut nodes, &real)?;
        } else {
            match nodes.get(&parent) {
                Some(Node::Dir { .. }) => {}
                Some(_) => return Err(VfsError::NotADirectory(parent)),
                None => return Err(VfsError::NotFound(parent)),
            }
        }
        nodes.insert(real, dir_node());
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        let nodes = self.nodes.read().await;
        let real = chase_links(&nodes, path, true)?;
        match nodes.get(&real) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(VfsError::NotADirectory(path.to_string())),
            None => return Err(VfsError::NotFound(path.to_string())),
        }
        let mut entries: Vec<DirEntry> = children_of(&nodes, &real)
            .map(|(p, node)| DirEntry {
                name: path::file_name(p).to_string(),
                kind: node.kind(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn metadata(&self, path: &str) -> Result<Metadata, VfsError> {
        let nodes = self.nodes.read().await;
        let real = chase_links(&nodes, path, true)?;
        nodes
            .get(&real)
            .map(Node::metadata)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    async fn symlink_metadata(&self, path: &str) -> Result<Metadata, VfsError> {
        let nodes = self.nodes.read().await;
        let real = chase_links(&nodes, path, false)?;
        nodes
            .get(&real)
            .map(Node::metadata)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let real = path::normalize(link);
        if nodes.contains_key(&real) {
            return Err(VfsError::AlreadyExists(link.to_string()));
        }
        ensure_parents(&mut nodes, &real)?;
        nodes.insert(
            real,
            Node::Link {
                target: target.to_string(),
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn read_link(&self, path: &str) -> Result<String, VfsError> {
        let nodes = self.nodes.read().await;
        let real = chase_links(&nodes, path, false)?;
        match nodes.get(&real) {
            Some(Node::Link { target, .. }) => Ok(target.clone()),
            Some(_) => Err(VfsError::Invalid(path.to_string())),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let src_real = chase_links(&nodes, src, false)?;
        let dst_real = chase_links(&nodes, dst, false)?;
        if !nodes.contains_key(&src_real) {
            return Err(VfsError::NotFound(src.to_string()));
        }
        if let Some(Node::Dir { .. }) = nodes.get(&dst_real) {
            if children_of(&nodes, &dst_real).next().is_some() {
                return Err(VfsError::NotEmpty(dst.to_string()));
            }
        }
        ensure_parents(&mut nodes, &dst_real)?;
        let moved: Vec<(String, Node)> = nodes
            .iter()
            .filter(|(p, _)| path::starts_with(p, &src_real))
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        for (p, _) in &moved {
            nodes.remove(p);
        }
        for (p, node) in moved {
            let suffix = path::strip_prefix(&p, &src_real).unwrap_or("");
            let new_path = if suffix.is_empty() {
                dst_real.clone()
            } else {
                path::join(&dst_real, suffix)
            };
            nodes.insert(new_path, node);
        }
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str, recursive: bool) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let src_real = chase_links(&nodes, src, true)?;
        let dst_real = chase_links(&nodes, dst, true)?;
        match nodes.get(&src_real).cloned() {
            None => Err(VfsError::NotFound(src.to_string())),
            Some(Node::Dir { .. }) if !recursive => Err(VfsError::IsADirectory(src.to_string())),
            Some(Node::Dir { .. }) => {
                let copied: Vec<(String, Node)> = nodes
                    .iter()
                    .filter(|(p, _)| path::starts_with(p, &src_real))
                    .map(|(p, n)| (p.clone(), n.clone()))
                    .collect();
                ensure_parents(&mut nodes, &dst_real)?;
                for (p, node) in copied {
                    let suffix = path::strip_prefix(&p, &src_real).unwrap_or("");
                    let new_path = if suffix.is_empty() {
                        dst_real.clone()
                    } else {
                        path::join(&dst_real, suffix)
                    };
                    nodes.insert(new_path, node);
                }
                Ok(())
            }
            Some(node) => {
                ensure_parents(&mut nodes, &dst_real)?;
                if let Some(Node::Dir { .. }) = nodes.get(&dst_real) {
                    return Err(VfsError::IsADirectory(dst.to_string()));
                }
                nodes.insert(dst_real, node);
                Ok(())
            }
        }
    }

    async fn set_mode(&self, path: &str, new_mode: u32) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let real = chase_links(&nodes, path, true)?;
        match nodes.get_mut(&real) {
            Some(Node::File { mode, .. }) | Some(Node::Dir { mode, .. }) => {
                *mode = new_mode;
                Ok(())
            }
            Some(Node::Link { .. }) => Ok(()),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn set_mtime(&self, path: &str, new_mtime: SystemTime) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().await;
        let real = chase_links(&nodes, path, true)?;
        match nodes.get_mut(&real) {
            Some(Node::File { mtime, .. })
            | Some(Node::Dir { mtime, .. })
            | Some(Node::Link { mtime, .. }) => {
                *mtime = new_mtime;
                Ok(())
            }
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn canonicalize(&self, path: &str) -> Result<String, VfsError> {
        let nodes = self.nodes.read().await;
        let real = chase_links(&nodes, path, true)?;
        if nodes.contains_key(&real) {
            Ok(real)
        } else {
            Err(VfsError::NotFound(path.to_string()))
        }
    }

    fn all_paths(&self) -> Vec<String> {
        // Callers are sync contexts reached through block_in_place,
        // never a polled future, so a blocking acquire cannot deadlock.
        self.nodes.blocking_read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let fs = MemFs::new();
        fs.write("/a.txt", b"hello").await.unwrap();
        assert_eq!(fs.read_to_string("/a.txt").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let fs = MemFs::new();
        fs.write("/deep/nested/f.txt", b"x").await.unwrap();
        assert!(fs.metadata("/deep/nested").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_append() {
        let fs = MemFs::new();
        fs.append("/log", b"one\n").await.unwrap();
        fs.append("/log", b"two\n").await.unwrap();
        assert_eq!(fs.read_to_string("/log").await.unwrap(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_mkdir_recursive_idempotent() {
        let fs = MemFs::new();
        fs.mkdir("/a/b/c", true).await.unwrap();
        fs.mkdir("/a/b/c", true).await.unwrap();
        assert!(fs.metadata("/a/b/c").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_mkdir_plain_requires_parent() {
        let fs = MemFs::new();
        assert!(matches!(
            fs.mkdir("/no/parent", false).await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_then_stat_is_enoent() {
        let fs = MemFs::new();
        fs.write("/f", b"x").await.unwrap();
        fs.remove("/f", RemoveOpts::default()).await.unwrap();
        assert!(matches!(
            fs.metadata("/f").await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_dir_requires_recursive() {
        let fs = MemFs::new();
        fs.write("/d/f", b"x").await.unwrap();
        assert!(matches!(
            fs.remove("/d", RemoveOpts::default()).await,
            Err(VfsError::NotEmpty(_))
        ));
        fs.remove(
            "/d",
            RemoveOpts {
                recursive: true,
                force: false,
            },
        )
        .await
        .unwrap();
        assert!(!fs.exists("/d/f").await);
    }

    #[tokio::test]
    async fn test_read_dir_sorted_with_kinds() {
        let fs = MemFs::new();
        fs.write("/d/b.txt", b"").await.unwrap();
        fs.mkdir("/d/a", true).await.unwrap();
        let entries = fs.read_dir("/d").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].kind, FileKind::Dir);
        assert_eq!(entries[1].name, "b.txt");
        assert_eq!(entries[1].kind, FileKind::File);
    }

    #[tokio::test]
    async fn test_symlink_follow_and_lstat() {
        let fs = MemFs::new();
        fs.write("/target", b"data").await.unwrap();
        fs.symlink("/target", "/link").await.unwrap();
        assert_eq!(fs.read_to_string("/link").await.unwrap(), "data");
        assert!(fs.symlink_metadata("/link").await.unwrap().is_symlink());
        assert!(fs.metadata("/link").await.unwrap().is_file());
        assert_eq!(fs.read_link("/link").await.unwrap(), "/target");
    }

    #[tokio::test]
    async fn test_symlink_relative_target() {
        let fs = MemFs::new();
        fs.write("/d/real.txt", b"r").await.unwrap();
        fs.symlink("real.txt", "/d/alias").await.unwrap();
        assert_eq!(fs.read_to_string("/d/alias").await.unwrap(), "r");
    }

    #[tokio::test]
    async fn test_symlink_cycle_is_eloop() {
        let fs = MemFs::new();
        fs.symlink("/b", "/a").await.unwrap();
        fs.symlink("/a", "/b").await.unwrap();
        assert!(matches!(
            fs.read("/a").await,
            Err(VfsError::TooManyLinks(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_moves_subtree() {
        let fs = MemFs::new();
        fs.write("/src/a/f", b"1").await.unwrap();
        fs.rename("/src", "/dst").await.unwrap();
        assert_eq!(fs.read_to_string("/dst/a/f").await.unwrap(), "1");
        assert!(!fs.exists("/src").await);
    }

    #[tokio::test]
    async fn test_copy_recursive() {
        let fs = MemFs::new();
        fs.write("/src/f", b"z").await.unwrap();
        fs.copy("/src", "/dst", true).await.unwrap();
        assert_eq!(fs.read_to_string("/dst/f").await.unwrap(), "z");
        assert_eq!(fs.read_to_string("/src/f").await.unwrap(), "z");
    }

    #[tokio::test]
    async fn test_read_dir_on_file_is_enotdir() {
        let fs = MemFs::new();
        fs.write("/f", b"x").await.unwrap();
        assert!(matches!(
            fs.read_dir("/f").await,
            Err(VfsError::NotADirectory(_))
        ));
    }
}
