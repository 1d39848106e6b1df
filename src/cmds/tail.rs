//! tail

use async_trait::async_trait;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Tail;

#[async_trait]
impl Tool for Tail {
    fn name(&self) -> &'static str {
        "tail"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut count = 10usize;
        let mut from_start = false;
        let mut files: Vec<String> = Vec::new();
        let mut i = 0;
        while i < inv.args.len() {
            let arg = &inv.args[i];
            match arg.as_str() {
                "-n" => {
                    if let Some(value) = inv.args.get(i + 1) {
                        if let Some(rest) = value.strip_prefix('+') {
                            from_start = true;
                            count = rest.parse().unwrap_or(1);
                        } else {
                            count = value.parse().unwrap_or(10);
                        }
                        i += 1;
                    }
                }
                "-f" => {}
                _ if arg.starts_with("-n") => {
                    count = arg[2..].parse().unwrap_or(10);
                }
                _ if arg.starts_with('-')
                    && arg.len() > 1
                    && arg[1..].chars().all(|c| c.is_ascii_digit()) =>
                {
                    count = arg[1..].parse().unwrap_or(10);
                }
                _ => files.push(arg.clone()),
            }
            i += 1;
        }

        let multiple = files.len() > 1;
        let mut stdout = String::new();
        let (stderr, status) = for_each_input(&inv, &files, "tail", |text, label| {
            if multiple {
                stdout.push_str(&format!("==> {} <==\n", label.unwrap_or("standard input")));
            }
            let lines: Vec<&str> = text.split_inclusive('\n').collect();
            if from_start {
                for line in lines.iter().skip(count.saturating_sub(1)) {
                    stdout.push_str(line);
                }
            } else {
                let start = lines.len().saturating_sub(count);
                for line in &lines[start..] {
                    stdout.push_str(line);
                }
            }
        })
        .await;
        ToolOutput::new(stdout, stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_tail_last_lines() {
        let inv = invocation(&["-n", "2"], "a\nb\nc\nd\n", &[]).await;
        let out = Tail.run(inv).await;
        assert_eq!(out.stdout, "c\nd\n");
    }

    #[tokio::test]
    async fn test_tail_plus_offset() {
        let inv = invocation(&["-n", "+3"], "a\nb\nc\nd\n", &[]).await;
        let out = Tail.run(inv).await;
        assert_eq!(out.stdout, "c\nd\n");
    }
}
