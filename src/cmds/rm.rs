//! rm and rmdir

use async_trait::async_trait;

use crate::vfs::RemoveOpts;

use super::{Invocation, Tool, ToolOutput};

pub struct Rm;

#[async_trait]
impl Tool for Rm {
    fn name(&self) -> &'static str {
        "rm"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut recursive = false;
        let mut force = false;
        let mut targets: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-r" | "-R" | "--recursive" => recursive = true,
                "-f" | "--force" => force = true,
                "-rf" | "-fr" => {
                    recursive = true;
                    force = true;
                }
                "-v" => {}
                _ => targets.push(arg.clone()),
            }
        }
        if targets.is_empty() {
            return if force {
                ToolOutput::success("")
            } else {
                ToolOutput::failure("rm: missing operand\n", 1)
            };
        }
        let mut stderr = String::new();
        let mut status = 0;
        for target in &targets {
            let path = inv.path(target);
            let meta = inv.fs.symlink_metadata(&path).await;
            if let Ok(meta) = &meta {
                if meta.is_dir() && !recursive {
                    stderr.push_str(&format!("rm: cannot remove '{}': Is a directory\n", target));
                    status = 1;
                    continue;
                }
            }
            match inv.fs.remove(&path, RemoveOpts { recursive, force }).await {
                Ok(()) => {}
                Err(e) => {
                    if !force {
                        stderr.push_str(&format!("rm: cannot remove '{}': {}\n", target, e));
                        status = 1;
                    }
                }
            }
        }
        ToolOutput::new("", stderr, status)
    }
}

pub struct Rmdir;

#[async_trait]
impl Tool for Rmdir {
    fn name(&self) -> &'static str {
        "rmdir"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut stderr = String::new();
        let mut status = 0;
        for target in inv.args.iter().filter(|a| !a.starts_with('-')) {
            let path = inv.path(target);
            match inv.fs.metadata(&path).await {
                Ok(meta) if meta.is_dir() => {
                    if let Err(e) = inv.fs.remove(&path, RemoveOpts::default()).await {
                        stderr.push_str(&format!("rmdir: failed to remove '{}': {}\n", target, e));
                        status = 1;
                    }
                }
                Ok(_) => {
                    stderr.push_str(&format!("rmdir: failed to remove '{}': Not a directory\n", target));
                    status = 1;
                }
                Err(e) => {
                    stderr.push_str(&format!("rmdir: failed to remove '{}': {}\n", target, e));
                    status = 1;
                }
            }
        }
        ToolOutput::new("", stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;
    use crate::vfs::Vfs;

    #[tokio::test]
    async fn test_rm_file() {
        let inv = invocation(&["/f.txt"], "", &[("/f.txt", "x")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Rm.run(inv).await.status, 0);
        assert!(!fs.exists("/f.txt").await);
    }

    #[tokio::test]
    async fn test_rm_dir_requires_recursive() {
        let inv = invocation(&["/d"], "", &[("/d/f", "x")]).await;
        let out = Rm.run(inv).await;
        assert_eq!(out.status, 1);
        assert!(out.stderr.contains("Is a directory"));

        let inv = invocation(&["-rf", "/d"], "", &[("/d/f", "x")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Rm.run(inv).await.status, 0);
        assert!(!fs.exists("/d").await);
    }

    #[tokio::test]
    async fn test_rm_force_ignores_missing() {
        let inv = invocation(&["-f", "/ghost"], "", &[]).await;
        let out = Rm.run(inv).await;
        assert_eq!(out.status, 0);
        assert!(out.stderr.is_empty());
    }
}
