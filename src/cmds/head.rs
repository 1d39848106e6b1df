//! head

use async_trait::async_trait;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Head;

#[async_trait]
impl Tool for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let (count, bytes, files) = match parse_args(&inv.args) {
            Ok(parsed) => parsed,
            Err(msg) => return ToolOutput::failure(format!("head: {}\n", msg), 1),
        };

        let multiple = files.len() > 1;
        let mut stdout = String::new();
        let (stderr, status) = for_each_input(&inv, &files, "head", |text, label| {
            if multiple {
                stdout.push_str(&format!("==> {} <==\n", label.unwrap_or("standard input")));
            }
            if bytes {
                stdout.extend(text.chars().take(count));
            } else {
                for line in text.split_inclusive('\n').take(count) {
                    stdout.push_str(line);
                }
            }
        })
        .await;
        ToolOutput::new(stdout, stderr, status)
    }
}

fn parse_args(args: &[String]) -> Result<(usize, bool, Vec<String>), String> {
    let mut count = 10usize;
    let mut bytes = false;
    let mut files = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-n" | "-c" => {
                bytes = arg == "-c";
                let value = args.get(i + 1).ok_or("option requires an argument")?;
                count = value
                    .parse()
                    .map_err(|_| format!("invalid number of lines: '{}'", value))?;
                i += 1;
            }
            _ if arg.starts_with("-n") => {
                count = arg[2..]
                    .parse()
                    .map_err(|_| format!("invalid number of lines: '{}'", &arg[2..]))?;
            }
            _ if arg.starts_with('-') && arg.len() > 1 && arg[1..].chars().all(|c| c.is_ascii_digit()) => {
                count = arg[1..].parse().unwrap_or(10);
            }
            _ => files.push(arg.clone()),
        }
        i += 1;
    }
    Ok((count, bytes, files))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_head_default_ten() {
        let text: String = (1..=20).map(|i| format!("{}\n", i)).collect();
        let inv = invocation(&[], &text, &[]).await;
        let out = Head.run(inv).await;
        assert_eq!(out.stdout.lines().count(), 10);
        assert!(out.stdout.starts_with("1\n"));
    }

    #[tokio::test]
    async fn test_head_n_flag() {
        let inv = invocation(&["-n", "2", "/f"], "", &[("/f", "a\nb\nc\n")]).await;
        let out = Head.run(inv).await;
        assert_eq!(out.stdout, "a\nb\n");
    }

    #[tokio::test]
    async fn test_head_legacy_count() {
        let inv = invocation(&["-3"], "a\nb\nc\nd\n", &[]).await;
        let out = Head.run(inv).await;
        assert_eq!(out.stdout, "a\nb\nc\n");
    }
}
