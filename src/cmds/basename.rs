//! basename

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Basename;

#[async_trait]
impl Tool for Basename {
    fn name(&self) -> &'static str {
        "basename"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let Some(path) = inv.args.first() else {
            return ToolOutput::failure("basename: missing operand\n", 1);
        };
        let trimmed = path.trim_end_matches('/');
        let base = if trimmed.is_empty() {
            "/"
        } else {
            trimmed.rsplit('/').next().unwrap_or(trimmed)
        };
        let base = match inv.args.get(1) {
            Some(suffix) if base != suffix.as_str() => {
                base.strip_suffix(suffix.as_str()).unwrap_or(base)
            }
            _ => base,
        };
        ToolOutput::success(format!("{}\n", base))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_basename() {
        let inv = invocation(&["/usr/bin/sort"], "", &[]).await;
        assert_eq!(Basename.run(inv).await.stdout, "sort\n");
    }

    #[tokio::test]
    async fn test_basename_suffix() {
        let inv = invocation(&["/src/main.rs", ".rs"], "", &[]).await;
        assert_eq!(Basename.run(inv).await.stdout, "main\n");
    }

    #[tokio::test]
    async fn test_basename_root() {
        let inv = invocation(&["/"], "", &[]).await;
        assert_eq!(Basename.run(inv).await.stdout, "/\n");
    }
}
