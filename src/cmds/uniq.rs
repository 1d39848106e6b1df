//! uniq

use async_trait::async_trait;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Uniq;

#[async_trait]
impl Tool for Uniq {
    fn name(&self) -> &'static str {
        "uniq"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut count = false;
        let mut only_dup = false;
        let mut only_unique = false;
        let mut ignore_case = false;
        let mut files: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-c" => count = true,
                "-d" => only_dup = true,
                "-u" => only_unique = true,
                "-i" => ignore_case = true,
                _ => files.push(arg.clone()),
            }
        }

        let mut lines: Vec<String> = Vec::new();
        let (stderr, status) = for_each_input(&inv, &files, "uniq", |text, _| {
            lines.extend(text.lines().map(str::to_string));
        })
        .await;

        let same = |a: &str, b: &str| -> bool {
            if ignore_case {
                a.eq_ignore_ascii_case(b)
            } else {
                a == b
            }
        };

        let mut out = String::new();
        let mut idx = 0;
        while idx < lines.len() {
            let mut run = 1;
            while idx + run < lines.len() && same(&lines[idx], &lines[idx + run]) {
                run += 1;
            }
            let keep = if only_dup {
                run > 1
            } else if only_unique {
                run == 1
            } else {
                true
            };
            if keep {
                if count {
                    out.push_str(&format!("{:>7} {}\n", run, lines[idx]));
                } else {
                    out.push_str(&lines[idx]);
                    out.push('\n');
                }
            }
            idx += run;
        }
        ToolOutput::new(out, stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_uniq_collapses_adjacent() {
        let inv = invocation(&[], "a\na\nb\na\n", &[]).await;
        let out = Uniq.run(inv).await;
        assert_eq!(out.stdout, "a\nb\na\n");
    }

    #[tokio::test]
    async fn test_uniq_count() {
        let inv = invocation(&["-c"], "x\nx\ny\n", &[]).await;
        let out = Uniq.run(inv).await;
        assert!(out.stdout.contains("2 x"));
        assert!(out.stdout.contains("1 y"));
    }

    #[tokio::test]
    async fn test_uniq_only_duplicates() {
        let inv = invocation(&["-d"], "a\na\nb\n", &[]).await;
        let out = Uniq.run(inv).await;
        assert_eq!(out.stdout, "a\n");
    }
}
