//! cp

use async_trait::async_trait;

use crate::vfs::path as vpath;

use super::{Invocation, Tool, ToolOutput};

pub struct Cp;

#[async_trait]
impl Tool for Cp {
    fn name(&self) -> &'static str {
        "cp"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut recursive = false;
        let mut operands: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-r" | "-R" | "-a" | "--recursive" => recursive = true,
                "-f" | "-p" | "-v" => {}
                _ => operands.push(arg.clone()),
            }
        }
        if operands.len() < 2 {
            return ToolOutput::failure("cp: missing file operand\n", 1);
        }
        let Some(dest_arg) = operands.pop() else {
            return ToolOutput::failure("cp: missing destination\n", 1);
        };
        let dest = inv.path(&dest_arg);
        let dest_is_dir = inv.fs.metadata(&dest).await.map(|m| m.is_dir()).unwrap_or(false);
        if operands.len() > 1 && !dest_is_dir {
            return ToolOutput::failure(
                format!("cp: target '{}' is not a directory\n", dest_arg),
                1,
            );
        }

        let mut stderr = String::new();
        let mut status = 0;
        for src_arg in &operands {
            let src = inv.path(src_arg);
            let target = if dest_is_dir {
                vpath::join(&dest, vpath::file_name(&src))
            } else {
                dest.clone()
            };
            if let Err(e) = inv.fs.copy(&src, &target, recursive).await {
                stderr.push_str(&format!("cp: cannot copy '{}': {}\n", src_arg, e));
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
    async fn test_cp_file() {
        let inv = invocation(&["/a", "/b"], "", &[("/a", "data")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Cp.run(inv).await.status, 0);
        assert_eq!(fs.read_to_string("/b").await.unwrap(), "data");
    }

    #[tokio::test]
    async fn test_cp_into_directory() {
        let inv = invocation(&["/a.txt", "/dir"], "", &[("/a.txt", "x"), ("/dir/keep", "")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Cp.run(inv).await.status, 0);
        assert_eq!(fs.read_to_string("/dir/a.txt").await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_cp_dir_requires_recursive() {
        let inv = invocation(&["/d", "/e"], "", &[("/d/f", "x")]).await;
        let out = Cp.run(inv).await;
        assert_eq!(out.status, 1);
    }
}
