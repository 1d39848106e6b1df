//! touch

use std::time::SystemTime;

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Touch;

#[async_trait]
impl Tool for Touch {
    fn name(&self) -> &'static str {
        "touch"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut no_create = false;
        let mut files: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-c" => no_create = true,
                "-a" | "-m" => {}
                _ => files.push(arg.clone()),
            }
        }
        if files.is_empty() {
            return ToolOutput::failure("touch: missing file operand\n", 1);
        }
        let mut stderr = String::new();
        let mut status = 0;
        for file in &files {
            let path = inv.path(file);
            if inv.fs.exists(&path).await {
                if let Err(e) = inv.fs.set_mtime(&path, SystemTime::now()).await {
                    stderr.push_str(&format!("touch: cannot touch '{}': {}\n", file, e));
                    status = 1;
                }
            } else if !no_create {
                if let Err(e) = inv.fs.write(&path, b"").await {
                    stderr.push_str(&format!("touch: cannot touch '{}': {}\n", file, e));
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
    async fn test_touch_creates_empty_file() {
        let inv = invocation(&["/new.txt"], "", &[]).await;
        let fs = inv.fs.clone();
        assert_eq!(Touch.run(inv).await.status, 0);
        assert_eq!(fs.read_to_string("/new.txt").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_touch_preserves_content() {
        let inv = invocation(&["/f"], "", &[("/f", "keep")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Touch.run(inv).await.status, 0);
        assert_eq!(fs.read_to_string("/f").await.unwrap(), "keep");
    }
}
