//! stat

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::vfs::FileKind;

use super::{Invocation, Tool, ToolOutput};

pub struct Stat;

#[async_trait]
impl Tool for Stat {
    fn name(&self) -> &'static str {
        "stat"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut format: Option<String> = None;
        let mut files: Vec<String> = Vec::new();
        let mut i = 0;
        while i < inv.args.len() {
            match inv.args[i].as_str() {
                "-c" | "--format" => {
                    if let Some(f) = inv.args.get(i + 1) {
                        format = Some(f.clone());
                        i += 1;
                    }
                }
                arg => files.push(arg.to_string()),
            }
            i += 1;
        }
        if files.is_empty() {
            return ToolOutput::failure("stat: missing operand\n", 1);
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut status = 0;
        for file in &files {
            let path = inv.path(file);
            let meta = match inv.fs.symlink_metadata(&path).await {
                Ok(meta) => meta,
                Err(_) => {
                    stderr.push_str(&format!(
                        "stat: cannot stat '{}': No such file or directory\n",
                        file
                    ));
                    status = 1;
                    continue;
                }
            };
            let kind = match meta.kind {
                FileKind::File => "regular file",
                FileKind::Dir => "directory",
                FileKind::Symlink => "symbolic link",
            };
            let when: DateTime<Local> = meta.mtime.into();
            match &format {
                Some(spec) => {
                    let mut line = String::new();
                    let mut chars = spec.chars().peekable();
                    while let Some(c) = chars.next() {
                        if c != '%' {
                            line.push(c);
                            continue;
                        }
                        match chars.next() {
                            Some('n') => line.push_str(file),
                            Some('s') => line.push_str(&meta.size.to_string()),
                            Some('F') => line.push_str(kind),
                            Some('a') => line.push_str(&format!("{:o}", meta.mode)),
                            Some('y') => line.push_str(&when.format("%Y-%m-%d %H:%M:%S").to_string()),
                            Some(other) => {
                                line.push('%');
                                line.push(other);
                            }
                            None => line.push('%'),
                        }
                    }
                    stdout.push_str(&line);
                    stdout.push('\n');
                }
                None => {
                    stdout.push_str(&format!("  File: {}\n", file));
                    stdout.push_str(&format!(
                        "  Size: {:<15} {}\n",
                        meta.size, kind
                    ));
                    stdout.push_str(&format!("Access: ({:o})\n", meta.mode));
                    stdout.push_str(&format!(
                        "Modify: {}\n",
                        when.format("%Y-%m-%d %H:%M:%S")
                    ));
                }
            }
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_stat_format_size() {
        let inv = invocation(&["-c", "%s", "/f"], "", &[("/f", "12345")]).await;
        let out = Stat.run(inv).await;
        assert_eq!(out.stdout, "5\n");
    }

    #[tokio::test]
    async fn test_stat_kind() {
        let inv = invocation(&["-c", "%F", "/d/x"], "", &[("/d/x", "")]).await;
        let out = Stat.run(inv).await;
        assert_eq!(out.stdout, "regular file\n");
    }

    #[tokio::test]
    async fn test_stat_missing() {
        let inv = invocation(&["/nope"], "", &[]).await;
        let out = Stat.run(inv).await;
        assert_eq!(out.status, 1);
    }
}
