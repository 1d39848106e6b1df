//! xargs

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Xargs;

#[async_trait]
impl Tool for Xargs {
    fn name(&self) -> &'static str {
        "xargs"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut per_call: Option<usize> = None;
        let mut replace: Option<String> = None;
        let mut delimiter: Option<char> = None;
        let mut command: Vec<String> = Vec::new();

        let mut i = 0;
        while i < inv.args.len() {
            let arg = &inv.args[i];
            if !command.is_empty() {
                command.push(arg.clone());
                i += 1;
                continue;
            }
            match arg.as_str() {
                "-n" => {
                    per_call = inv.args.get(i + 1).and_then(|v| v.parse().ok());
                    i += 1;
                }
                "-I" => {
                    if let Some(token) = inv.args.get(i + 1) {
                        replace = Some(token.clone());
                        i += 1;
                    }
                }
                "-d" => {
                    delimiter = inv.args.get(i + 1).and_then(|v| v.chars().next());
                    i += 1;
                }
                "-r" | "--no-run-if-empty" | "-0" => {}
                _ => command.push(arg.clone()),
            }
            i += 1;
        }
        if command.is_empty() {
            command.push("echo".to_string());
        }

        let items: Vec<String> = match delimiter {
            Some(d) => inv
                .stdin
                .split(d)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => inv
                .stdin
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        };
        if items.is_empty() {
            return ToolOutput::success("");
        }

        let Some(exec) = &inv.exec else {
            return ToolOutput::failure("xargs: command execution unavailable\n", 126);
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut status = 0;

        let batches: Vec<Vec<String>> = if replace.is_some() {
            items.iter().map(|item| vec![item.clone()]).collect()
        } else {
            let size = per_call.unwrap_or(items.len()).max(1);
            items.chunks(size).map(<[String]>::to_vec).collect()
        };

        for batch in batches {
            if let Err(breach) = inv.governor.charge_loop() {
                return ToolOutput::failure(format!("xargs: {}\n", breach.message()), 125);
            }
            let line = match &replace {
                Some(token) => command
                    .iter()
                    .map(|part| part.replace(token.as_str(), &batch[0]))
                    .collect::<Vec<_>>()
                    .join(" "),
                None => {
                    let mut parts = command.clone();
                    parts.extend(batch.iter().map(|item| shell_quote(item)));
                    parts.join(" ")
                }
            };
            let result = exec(line, String::new(), inv.cwd.clone(), inv.env.clone()).await;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            if result.status != 0 {
                status = 123;
            }
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

fn shell_quote(text: &str) -> String {
    if text
        .chars()
        .all(|c| c.is_alphanumeric() || "_-./=:".contains(c))
    {
        text.to_string()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "plain");
        assert_eq!(shell_quote("has space"), "'has space'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
