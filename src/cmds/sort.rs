//! sort

use std::cmp::Ordering;

use async_trait::async_trait;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Sort;

#[async_trait]
impl Tool for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut numeric = false;
        let mut reverse = false;
        let mut unique = false;
        let mut ignore_case = false;
        let mut field: Option<usize> = None;
        let mut delim: Option<char> = None;
        let mut files: Vec<String> = Vec::new();

        let mut i = 0;
        while i < inv.args.len() {
            let arg = &inv.args[i];
            match arg.as_str() {
                "-n" => numeric = true,
                "-r" => reverse = true,
                "-u" => unique = true,
                "-f" => ignore_case = true,
                "-nr" | "-rn" => {
                    numeric = true;
                    reverse = true;
                }
                "-k" => {
                    if let Some(spec) = inv.args.get(i + 1) {
                        field = spec.split(',').next().and_then(|f| f.parse().ok());
                        i += 1;
                    }
                }
                "-t" => {
                    if let Some(d) = inv.args.get(i + 1) {
                        delim = d.chars().next();
                        i += 1;
                    }
                }
                _ if arg.starts_with("-k") => field = arg[2..].parse().ok(),
                _ if arg.starts_with("-t") => delim = arg[2..].chars().next(),
                _ => files.push(arg.clone()),
            }
            i += 1;
        }

        let mut lines: Vec<String> = Vec::new();
        let (stderr, status) = for_each_input(&inv, &files, "sort", |text, _| {
            lines.extend(text.lines().map(str::to_string));
        })
        .await;

        let key_of = |line: &str| -> String {
            let selected = match field {
                Some(n) if n >= 1 => match delim {
                    Some(d) => line.split(d).nth(n - 1).unwrap_or("").to_string(),
                    None => line.split_whitespace().nth(n - 1).unwrap_or("").to_string(),
                },
                _ => line.to_string(),
            };
            if ignore_case {
                selected.to_lowercase()
            } else {
                selected
            }
        };

        lines.sort_by(|a, b| {
            let (ka, kb) = (key_of(a), key_of(b));
            let ord = if numeric {
                let na = leading_number(&ka);
                let nb = leading_number(&kb);
                na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
            } else {
                ka.cmp(&kb)
            };
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        });
        if unique {
            lines.dedup_by(|a, b| key_of(a) == key_of(b));
        }

        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        ToolOutput::new(out, stderr, status)
    }
}

fn leading_number(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    trimmed[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_sort_lexicographic() {
        let inv = invocation(&[], "pear\napple\nbanana\n", &[]).await;
        let out = Sort.run(inv).await;
        assert_eq!(out.stdout, "apple\nbanana\npear\n");
    }

    #[tokio::test]
    async fn test_sort_numeric() {
        let inv = invocation(&["-n"], "10\n2\n33\n", &[]).await;
        let out = Sort.run(inv).await;
        assert_eq!(out.stdout, "2\n10\n33\n");
    }

    #[tokio::test]
    async fn test_sort_reverse_unique() {
        let inv = invocation(&["-r", "-u"], "b\na\nb\n", &[]).await;
        let out = Sort.run(inv).await;
        assert_eq!(out.stdout, "b\na\n");
    }

    #[tokio::test]
    async fn test_sort_key_field() {
        let inv = invocation(&["-t", ":", "-k", "2", "-n"], "x:3\ny:1\nz:2\n", &[]).await;
        let out = Sort.run(inv).await;
        assert_eq!(out.stdout, "y:1\nz:2\nx:3\n");
    }
}
