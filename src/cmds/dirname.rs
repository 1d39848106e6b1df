//! dirname

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Dirname;

#[async_trait]
impl Tool for Dirname {
    fn name(&self) -> &'static str {
        "dirname"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        if inv.args.is_empty() {
            return ToolOutput::failure("dirname: missing operand\n", 1);
        }
        let mut out = String::new();
        for path in &inv.args {
            let trimmed = path.trim_end_matches('/');
            let dir = match trimmed.rfind('/') {
                Some(0) => "/",
                Some(idx) => &trimmed[..idx],
                None => ".",
            };
            let dir = if trimmed.is_empty() && path.starts_with('/') {
                "/"
            } else {
                dir
            };
            out.push_str(dir);
            out.push('\n');
        }
        ToolOutput::success(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_dirname() {
        let inv = invocation(&["/usr/bin/sort"], "", &[]).await;
        assert_eq!(Dirname.run(inv).await.stdout, "/usr/bin\n");
    }

    #[tokio::test]
    async fn test_dirname_no_slash() {
        let inv = invocation(&["plain.txt"], "", &[]).await;
        assert_eq!(Dirname.run(inv).await.stdout, ".\n");
    }
}
