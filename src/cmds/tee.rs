//! tee

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Tee;

#[async_trait]
impl Tool for Tee {
    fn name(&self) -> &'static str {
        "tee"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut append = false;
        let mut files: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-a" => append = true,
                _ => files.push(arg.clone()),
            }
        }
        let mut stderr = String::new();
        let mut status = 0;
        for file in &files {
            let path = inv.path(file);
            let result = if append {
                inv.fs.append(&path, inv.stdin.as_bytes()).await
            } else {
                inv.fs.write(&path, inv.stdin.as_bytes()).await
            };
            if let Err(e) = result {
                stderr.push_str(&format!("tee: {}: {}\n", file, e));
                status = 1;
            }
        }
        ToolOutput::new(inv.stdin.clone(), stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;
    use crate::vfs::Vfs;

    #[tokio::test]
    async fn test_tee_passes_through_and_writes() {
        let inv = invocation(&["/copy.txt"], "payload", &[]).await;
        let fs = inv.fs.clone();
        let out = Tee.run(inv).await;
        assert_eq!(out.stdout, "payload");
        assert_eq!(fs.read_to_string("/copy.txt").await.unwrap(), "payload");
    }
}
