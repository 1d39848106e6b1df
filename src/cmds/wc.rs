//! wc

use async_trait::async_trait;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Wc;

#[derive(Default, Clone, Copy)]
struct Counts {
    lines: usize,
    words: usize,
    chars: usize,
}

fn count(text: &str) -> Counts {
    Counts {
        lines: text.matches('\n').count(),
        words: text.split_whitespace().count(),
        chars: text.chars().count(),
    }
}

#[async_trait]
impl Tool for Wc {
    fn name(&self) -> &'static str {
        "wc"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut show = (false, false, false); // lines, words, chars
        let mut files: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-l" => show.0 = true,
                "-w" => show.1 = true,
                "-c" | "-m" => show.2 = true,
                _ if !arg.starts_with('-') || arg == "-" => files.push(arg.clone()),
                _ => {}
            }
        }
        if show == (false, false, false) {
            show = (true, true, true);
        }

        let mut rows: Vec<(Counts, Option<String>)> = Vec::new();
        let (stderr, status) = for_each_input(&inv, &files, "wc", |text, label| {
            rows.push((count(text), label.map(str::to_string)));
        })
        .await;

        let mut total = Counts::default();
        for (c, _) in &rows {
            total.lines += c.lines;
            total.words += c.words;
            total.chars += c.chars;
        }
        let width = if rows.len() > 1 {
            7
        } else {
            total
                .lines
                .max(total.words)
                .max(total.chars)
                .to_string()
                .len()
                .max(1)
        };

        let render = |c: &Counts, label: Option<&str>| -> String {
            let mut cols: Vec<String> = Vec::new();
            if show.0 {
                cols.push(format!("{:>width$}", c.lines, width = width));
            }
            if show.1 {
                cols.push(format!("{:>width$}", c.words, width = width));
            }
            if show.2 {
                cols.push(format!("{:>width$}", c.chars, width = width));
            }
            match label {
                Some(name) => format!("{} {}\n", cols.join(" "), name),
                None => format!("{}\n", cols.join(" ")),
            }
        };

        let mut stdout = String::new();
        for (c, label) in &rows {
            stdout.push_str(&render(c, label.as_deref()));
        }
        if rows.len() > 1 {
            stdout.push_str(&render(&total, Some("total")));
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_wc_word_count() {
        let inv = invocation(&["-w"], "hello\n", &[]).await;
        let out = Wc.run(inv).await;
        assert_eq!(out.stdout.trim(), "1");
    }

    #[tokio::test]
    async fn test_wc_lines() {
        let inv = invocation(&["-l", "/f"], "", &[("/f", "a\nb\nc\n")]).await;
        let out = Wc.run(inv).await;
        assert!(out.stdout.trim().starts_with('3'));
    }

    #[tokio::test]
    async fn test_wc_total_row() {
        let inv = invocation(
            &["/a", "/b"],
            "",
            &[("/a", "one\n"), ("/b", "two three\n")],
        )
        .await;
        let out = Wc.run(inv).await;
        assert!(out.stdout.contains("total"));
    }
}
