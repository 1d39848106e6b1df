//! mv

use async_trait::async_trait;

use crate::vfs::path as vpath;

use super::{Invocation, Tool, ToolOutput};

pub struct Mv;

#[async_trait]
impl Tool for Mv {
    fn name(&self) -> &'static str {
        "mv"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let operands: Vec<&String> = inv.args.iter().filter(|a| !a.starts_with('-')).collect();
        if operands.len() < 2 {
            return ToolOutput::failure("mv: missing file operand\n", 1);
        }
        let Some(dest_arg) = operands.last() else {
            return ToolOutput::failure("mv: missing destination\n", 1);
        };
        let dest = inv.path(dest_arg);
        let dest_is_dir = inv.fs.metadata(&dest).await.map(|m| m.is_dir()).unwrap_or(false);
        let sources = &operands[..operands.len() - 1];
        if sources.len() > 1 && !dest_is_dir {
            return ToolOutput::failure(
                format!("mv: target '{}' is not a directory\n", dest_arg),
                1,
            );
        }

        let mut stderr = String::new();
        let mut status = 0;
        for src_arg in sources {
            let src = inv.path(src_arg);
            let target = if dest_is_dir {
                vpath::join(&dest, vpath::file_name(&src))
            } else {
                dest.clone()
            };
            if let Err(e) = inv.fs.rename(&src, &target).await {
                stderr.push_str(&format!("mv: cannot move '{}': {}\n", src_arg, e));
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
    async fn test_mv_rename() {
        let inv = invocation(&["/old", "/new"], "", &[("/old", "v")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Mv.run(inv).await.status, 0);
        assert!(!fs.exists("/old").await);
        assert_eq!(fs.read_to_string("/new").await.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_mv_into_directory() {
        let inv = invocation(&["/f", "/d"], "", &[("/f", "x"), ("/d/existing", "")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Mv.run(inv).await.status, 0);
        assert_eq!(fs.read_to_string("/d/f").await.unwrap(), "x");
    }
}
