//! env

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct EnvCmd;

#[async_trait]
impl Tool for EnvCmd {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        // Assignments prefix an optional command line.
        let mut vars = inv.env.clone();
        let mut rest: Vec<String> = Vec::new();
        for (i, arg) in inv.args.iter().enumerate() {
            match arg.split_once('=') {
                Some((name, value)) if rest.is_empty() && !name.is_empty() => {
                    vars.insert(name.to_string(), value.to_string());
                }
                _ => {
                    rest = inv.args[i..].to_vec();
                    break;
                }
            }
        }

        if rest.is_empty() {
            let mut lines: Vec<String> = vars
                .iter()
                .map(|(k, v)| format!("{}={}\n", k, v))
                .collect();
            lines.sort();
            return ToolOutput::success(lines.concat());
        }

        let Some(exec) = &inv.exec else {
            return ToolOutput::failure("env: command execution unavailable\n", 126);
        };
        let line = rest.join(" ");
        exec(line, inv.stdin.clone(), inv.cwd.clone(), vars).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_env_lists_sorted() {
        let mut inv = invocation(&[], "", &[]).await;
        inv.env.insert("B".to_string(), "2".to_string());
        inv.env.insert("A".to_string(), "1".to_string());
        let out = EnvCmd.run(inv).await;
        assert_eq!(out.stdout, "A=1\nB=2\n");
    }
}
