//! cat

use async_trait::async_trait;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Cat;

#[async_trait]
impl Tool for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut number = false;
        let mut squeeze = false;
        let mut show_ends = false;
        let mut files: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-n" => number = true,
                "-s" => squeeze = true,
                "-E" => show_ends = true,
                "-A" => {
                    show_ends = true;
                }
                _ => files.push(arg.clone()),
            }
        }

        let mut stdout = String::new();
        let (stderr, status) = for_each_input(&inv, &files, "cat", |text, _| {
            stdout.push_str(text);
        })
        .await;

        if squeeze {
            stdout = squeeze_blank(&stdout);
        }
        if show_ends {
            stdout = stdout
                .split_inclusive('\n')
                .map(|l| l.replace('\n', "$\n"))
                .collect();
        }
        if number {
            let mut numbered = String::new();
            for (i, line) in stdout.split_inclusive('\n').enumerate() {
                numbered.push_str(&format!("{:>6}\t{}", i + 1, line));
            }
            stdout = numbered;
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

fn squeeze_blank(text: &str) -> String {
    let mut out = String::new();
    let mut blank_run = false;
    for line in text.split_inclusive('\n') {
        let is_blank = line.trim_end_matches('\n').is_empty();
        if is_blank && blank_run {
            continue;
        }
        blank_run = is_blank;
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_cat_concatenates_files() {
        let inv = invocation(
            &["/a.txt", "/b.txt"],
            "",
            &[("/a.txt", "one\n"), ("/b.txt", "two\n")],
        )
        .await;
        let out = Cat.run(inv).await;
        assert_eq!(out.stdout, "one\ntwo\n");
        assert_eq!(out.status, 0);
    }

    #[tokio::test]
    async fn test_cat_stdin_dash() {
        let inv = invocation(&["-"], "from stdin", &[]).await;
        let out = Cat.run(inv).await;
        assert_eq!(out.stdout, "from stdin");
    }

    #[tokio::test]
    async fn test_cat_missing_file() {
        let inv = invocation(&["/missing"], "", &[]).await;
        let out = Cat.run(inv).await;
        assert_eq!(out.status, 1);
        assert!(out.stderr.contains("No such file"));
    }

    #[tokio::test]
    async fn test_cat_numbering() {
        let inv = invocation(&["-n", "/f"], "", &[("/f", "a\nb\n")]).await;
        let out = Cat.run(inv).await;
        assert!(out.stdout.contains("1\ta\n"));
        assert!(out.stdout.contains("2\tb\n"));
    }
}
