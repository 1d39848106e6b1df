//! mkdir

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Mkdir;

#[async_trait]
impl Tool for Mkdir {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut recursive = false;
        let mut dirs: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-p" | "--parents" => recursive = true,
                "-m" => {}
                _ => dirs.push(arg.clone()),
            }
        }
        if dirs.is_empty() {
            return ToolOutput::failure("mkdir: missing operand\n", 1);
        }
        let mut stderr = String::new();
        let mut status = 0;
        for dir in &dirs {
            let path = inv.path(dir);
            if let Err(e) = inv.fs.mkdir(&path, recursive).await {
                stderr.push_str(&format!("mkdir: cannot create directory '{}': {}\n", dir, e));
                status = 1;
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
    async fn test_mkdir_plain_and_parents() {
        let inv = invocation(&["/solo"], "", &[]).await;
        let fs = inv.fs.clone();
        assert_eq!(Mkdir.run(inv).await.status, 0);
        assert!(fs.metadata("/solo").await.unwrap().is_dir());

        let inv = invocation(&["-p", "/a/b/c"], "", &[]).await;
        let fs = inv.fs.clone();
        assert_eq!(Mkdir.run(inv).await.status, 0);
        assert!(fs.metadata("/a/b/c").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_mkdir_missing_parent_fails() {
        let inv = invocation(&["/no/parent"], "", &[]).await;
        let out = Mkdir.run(inv).await;
        assert_eq!(out.status, 1);
        assert!(out.stderr.contains("cannot create directory"));
    }
}
