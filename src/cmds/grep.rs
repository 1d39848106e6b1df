//! grep

use async_trait::async_trait;
use regex_lite::RegexBuilder;

use super::{Invocation, Tool, ToolOutput};

pub struct Grep;

struct Options {
    ignore_case: bool,
    invert: bool,
    count_only: bool,
    names_only: bool,
    line_numbers: bool,
    quiet: bool,
    word: bool,
    fixed: bool,
    only_matching: bool,
    recursive: bool,
    extended: bool,
}

#[async_trait]
impl Tool for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut opts = Options {
            ignore_case: false,
            invert: false,
            count_only: false,
            names_only: false,
            line_numbers: false,
            quiet: false,
            word: false,
            fixed: false,
            only_matching: false,
            recursive: false,
            extended: false,
        };
        let mut pattern: Option<String> = None;
        let mut files: Vec<String> = Vec::new();

        let mut i = 0;
        while i < inv.args.len() {
            let arg = &inv.args[i];
            match arg.as_str() {
                "-i" => opts.ignore_case = true,
                "-v" => opts.invert = true,
                "-c" => opts.count_only = true,
                "-l" => opts.names_only = true,
                "-n" => opts.line_numbers = true,
                "-q" => opts.quiet = true,
                "-w" => opts.word = true,
                "-F" => opts.fixed = true,
                "-o" => opts.only_matching = true,
                "-r" | "-R" => opts.recursive = true,
                "-E" => opts.extended = true,
                "-e" => {
                    if let Some(p) = inv.args.get(i + 1) {
                        pattern = Some(p.clone());
                        i += 1;
                    }
                }
                _ if arg.starts_with('-') && arg.len() > 1 => {
                    // Bundled short flags like -in.
                    for c in arg[1..].chars() {
                        match c {
                            'i' => opts.ignore_case = true,
                            'v' => opts.invert = true,
                            'c' => opts.count_only = true,
                            'l' => opts.names_only = true,
                            'n' => opts.line_numbers = true,
                            'q' => opts.quiet = true,
                            'w' => opts.word = true,
                            'F' => opts.fixed = true,
                            'o' => opts.only_matching = true,
                            'r' => opts.recursive = true,
                            'E' => opts.extended = true,
                            _ => {}
                        }
                    }
                }
                _ => {
                    if pattern.is_none() {
                        pattern = Some(arg.clone());
                    } else {
                        files.push(arg.clone());
                    }
                }
            }
            i += 1;
        }

        let Some(pattern) = pattern else {
            return ToolOutput::failure("usage: grep [OPTION]... PATTERN [FILE]...\n", 2);
        };
        let source = if opts.fixed {
            regex_escape(&pattern)
        } else if opts.extended {
            pattern.clone()
        } else {
            basic_to_extended(&pattern)
        };
        let source = if opts.word {
            format!(r"\b(?:{})\b", source)
        } else {
            source
        };
        let regex = match RegexBuilder::new(&source)
            .case_insensitive(opts.ignore_case)
            .build()
        {
            Ok(regex) => regex,
            Err(_) => {
                return ToolOutput::failure(format!("grep: invalid pattern: {}\n", pattern), 2)
            }
        };

        if opts.recursive {
            let mut expanded: Vec<String> = Vec::new();
            for file in &files {
                collect_files(&inv, &inv.path(file), &mut expanded).await;
            }
            files = expanded;
        }

        let label_output = files.len() > 1 || opts.recursive;
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut matched_any = false;
        let mut status = 0;

        let mut inputs: Vec<(String, Option<String>)> = Vec::new();
        if files.is_empty() {
            inputs.push((inv.stdin.clone(), None));
        } else {
            for file in &files {
                if file == "-" {
                    inputs.push((inv.stdin.clone(), None));
                    continue;
                }
                let path = inv.path(file);
                match inv.fs.read_to_string(&path).await {
                    Ok(text) => inputs.push((text, Some(file.clone()))),
                    Err(_) => {
                        stderr.push_str(&format!("grep: {}: No such file or directory\n", file));
                        status = 2;
                    }
                }
            }
        }

        for (text, label) in &inputs {
            let mut count = 0usize;
            for (lineno, line) in text.lines().enumerate() {
                let hit = regex.is_match(line) != opts.invert;
                if !hit {
                    continue;
                }
                matched_any = true;
                count += 1;
                if opts.quiet || opts.count_only || opts.names_only {
                    continue;
                }
                let mut rendered = String::new();
                if let Some(name) = label {
                    if label_output {
                        rendered.push_str(name);
                        rendered.push(':');
                    }
                }
                if opts.line_numbers {
                    rendered.push_str(&format!("{}:", lineno + 1));
                }
                if opts.only_matching {
                    for found in regex.find_iter(line) {
                        stdout.push_str(&format!("{}{}\n", rendered, found.as_str()));
                    }
                    continue;
                }
                rendered.push_str(line);
                rendered.push('\n');
                stdout.push_str(&rendered);
            }
            if opts.count_only {
                match label {
                    Some(name) if label_output => {
                        stdout.push_str(&format!("{}:{}\n", name, count))
                    }
                    _ => stdout.push_str(&format!("{}\n", count)),
                }
            }
            if opts.names_only && count > 0 {
                if let Some(name) = label {
                    stdout.push_str(&format!("{}\n", name));
                }
            }
        }

        if status == 0 && !matched_any {
            status = 1;
        }
        if opts.quiet {
            return ToolOutput::new("", "", status);
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

/// Translate basic-RE quirks: `\(` groups become `(`, literal `(` the
/// reverse, `\|` alternation.
fn basic_to_extended(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(g @ ('(' | ')' | '|' | '{' | '}')) => out.push(g),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '(' | ')' | '{' | '}' | '|' | '+' | '?' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn regex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

async fn collect_files(inv: &Invocation, path: &str, out: &mut Vec<String>) {
    match inv.fs.metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            let Ok(entries) = inv.fs.read_dir(path).await else {
                return;
            };
            for entry in entries {
                let child = crate::vfs::path::join(path, &entry.name);
                Box::pin(collect_files(inv, &child, out)).await;
            }
        }
        Ok(_) => out.push(path.to_string()),
        Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_grep_matches_lines() {
        let inv = invocation(&["foo"], "foo one\nbar\nfoo two\n", &[]).await;
        let out = Grep.run(inv).await;
        assert_eq!(out.stdout, "foo one\nfoo two\n");
        assert_eq!(out.status, 0);
    }

    #[tokio::test]
    async fn test_grep_no_match_status_one() {
        let inv = invocation(&["zzz"], "abc\n", &[]).await;
        let out = Grep.run(inv).await;
        assert_eq!(out.status, 1);
        assert!(out.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_grep_missing_file_status_two() {
        let inv = invocation(&["x", "/missing.txt"], "", &[]).await;
        let out = Grep.run(inv).await;
        assert_eq!(out.status, 2);
        assert_eq!(out.stderr, "grep: /missing.txt: No such file or directory\n");
    }

    #[tokio::test]
    async fn test_grep_flags() {
        let inv = invocation(&["-in", "HELLO"], "say hello\nbye\n", &[]).await;
        let out = Grep.run(inv).await;
        assert_eq!(out.stdout, "1:say hello\n");

        let inv = invocation(&["-c", "a"], "a\nb\na\n", &[]).await;
        let out = Grep.run(inv).await;
        assert_eq!(out.stdout, "2\n");

        let inv = invocation(&["-v", "a"], "a\nb\n", &[]).await;
        let out = Grep.run(inv).await;
        assert_eq!(out.stdout, "b\n");
    }

    #[tokio::test]
    async fn test_grep_multiple_files_prefixed() {
        let inv = invocation(
            &["x", "/a", "/b"],
            "",
            &[("/a", "x1\n"), ("/b", "x2\n")],
        )
        .await;
        let out = Grep.run(inv).await;
        assert_eq!(out.stdout, "/a:x1\n/b:x2\n");
    }
}
