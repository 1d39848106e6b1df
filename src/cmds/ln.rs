//! ln and readlink

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Ln;

#[async_trait]
impl Tool for Ln {
    fn name(&self) -> &'static str {
        "ln"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut symbolic = false;
        let mut force = false;
        let mut operands: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-s" => symbolic = true,
                "-f" => force = true,
                "-sf" | "-fs" => {
                    symbolic = true;
                    force = true;
                }
                _ => operands.push(arg.clone()),
            }
        }
        if !symbolic {
            return ToolOutput::failure("ln: hard links are not supported\n", 1);
        }
        let (Some(target), Some(link)) = (operands.first(), operands.get(1)) else {
            return ToolOutput::failure("ln: missing file operand\n", 1);
        };
        let link_path = inv.path(link);
        if force && inv.fs.exists(&link_path).await {
            let _ = inv
                .fs
                .remove(&link_path, crate::vfs::RemoveOpts::default())
                .await;
        }
        match inv.fs.symlink(target, &link_path).await {
            Ok(()) => ToolOutput::success(""),
            Err(e) => ToolOutput::failure(format!("ln: failed to create symbolic link '{}': {}\n", link, e), 1),
        }
    }
}

pub struct Readlink;

#[async_trait]
impl Tool for Readlink {
    fn name(&self) -> &'static str {
        "readlink"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let canonical = inv.args.iter().any(|a| a == "-f");
        let mut stdout = String::new();
        let mut status = 0;
        for file in inv.args.iter().filter(|a| !a.starts_with('-')) {
            let path = inv.path(file);
            if canonical {
                match inv.fs.canonicalize(&path).await {
                    Ok(real) => stdout.push_str(&format!("{}\n", real)),
                    Err(_) => status = 1,
                }
            } else {
                match inv.fs.read_link(&path).await {
                    Ok(target) => stdout.push_str(&format!("{}\n", target)),
                    Err(_) => status = 1,
                }
            }
        }
        ToolOutput::new(stdout, "", status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;
    use crate::vfs::Vfs;

    #[tokio::test]
    async fn test_ln_symlink_and_readlink() {
        let inv = invocation(&["-s", "/target", "/link"], "", &[("/target", "x")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Ln.run(inv).await.status, 0);
        assert_eq!(fs.read_link("/link").await.unwrap(), "/target");

        let inv = invocation(&["/link"], "", &[]).await;
        // fresh fs in this invocation; use the original one instead
        let mut inv = inv;
        inv.fs = fs;
        let out = Readlink.run(inv).await;
        assert_eq!(out.stdout, "/target\n");
    }

    #[tokio::test]
    async fn test_ln_requires_symbolic() {
        let inv = invocation(&["/a", "/b"], "", &[("/a", "x")]).await;
        let out = Ln.run(inv).await;
        assert_eq!(out.status, 1);
    }
}
