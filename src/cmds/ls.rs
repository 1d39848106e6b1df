//! ls

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::vfs::FileKind;

use super::{Invocation, Tool, ToolOutput};

pub struct Ls;

#[async_trait]
impl Tool for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut long = false;
        let mut all = false;
        let mut one_per_line = false;
        let mut targets: Vec<String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-l" => long = true,
                "-a" | "-A" => all = true,
                "-1" => one_per_line = true,
                "-la" | "-al" => {
                    long = true;
                    all = true;
                }
                _ if arg.starts_with('-') => {
                    for c in arg[1..].chars() {
                        match c {
                            'l' => long = true,
                            'a' | 'A' => all = true,
                            '1' => one_per_line = true,
                            _ => {}
                        }
                    }
                }
                _ => targets.push(arg.clone()),
            }
        }
        if targets.is_empty() {
            targets.push(".".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut status = 0;
        let show_headers = targets.len() > 1;

        for (idx, target) in targets.iter().enumerate() {
            let path = inv.path(target);
            let meta = match inv.fs.metadata(&path).await {
                Ok(meta) => meta,
                Err(_) => {
                    stderr.push_str(&format!(
                        "ls: cannot access '{}': No such file or directory\n",
                        target
                    ));
                    status = 2;
                    continue;
                }
            };

            if show_headers {
                if idx > 0 {
                    stdout.push('\n');
                }
                stdout.push_str(&format!("{}:\n", target));
            }

            if !meta.is_dir() {
                stdout.push_str(&render_one(&inv, &path, target, long).await);
                continue;
            }

            let Ok(entries) = inv.fs.read_dir(&path).await else {
                continue;
            };
            let mut names: Vec<(String, FileKind)> = entries
                .into_iter()
                .filter(|e| all || !e.name.starts_with('.'))
                .map(|e| (e.name, e.kind))
                .collect();
            names.sort_by(|a, b| a.0.cmp(&b.0));

            if long {
                for (name, _) in &names {
                    let child = crate::vfs::path::join(&path, name);
                    stdout.push_str(&render_one(&inv, &child, name, true).await);
                }
            } else if one_per_line {
                for (name, _) in &names {
                    stdout.push_str(name);
                    stdout.push('\n');
                }
            } else {
                let row: Vec<&str> = names.iter().map(|(n, _)| n.as_str()).collect();
                if !row.is_empty() {
                    stdout.push_str(&row.join("  "));
                    stdout.push('\n');
                }
            }
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

async fn render_one(inv: &Invocation, path: &str, label: &str, long: bool) -> String {
    if !long {
        return format!("{}\n", label);
    }
    let Ok(meta) = inv.fs.symlink_metadata(path).await else {
        return format!("{}\n", label);
    };
    let kind = match meta.kind {
        FileKind::Dir => 'd',
        FileKind::Symlink => 'l',
        FileKind::File => '-',
    };
    let perms = render_mode(meta.mode);
    let when: DateTime<Local> = meta.mtime.into();
    let suffix = if meta.kind == FileKind::Symlink {
        match inv.fs.read_link(path).await {
            Ok(target) => format!(" -> {}", target),
            Err(_) => String::new(),
        }
    } else {
        String::new()
    };
    format!(
        "{}{} 1 user user {:>8} {} {}{}\n",
        kind,
        perms,
        meta.size,
        when.format("%b %e %H:%M"),
        label,
        suffix
    )
}

fn render_mode(mode: u32) -> String {
    let mut out = String::with_capacity(9);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 7;
        out.push(if bits & 4 != 0 { 'r' } else { '-' });
        out.push(if bits & 2 != 0 { 'w' } else { '-' });
        out.push(if bits & 1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_ls_lists_sorted() {
        let inv = invocation(&["/d"], "", &[("/d/b.txt", ""), ("/d/a.txt", "")]).await;
        let out = Ls.run(inv).await;
        assert_eq!(out.stdout, "a.txt  b.txt\n");
    }

    #[tokio::test]
    async fn test_ls_hides_dotfiles_without_a() {
        let inv = invocation(&["/d"], "", &[("/d/.secret", ""), ("/d/seen", "")]).await;
        let out = Ls.run(inv).await;
        assert_eq!(out.stdout, "seen\n");

        let inv = invocation(&["-a", "/d"], "", &[("/d/.secret", ""), ("/d/seen", "")]).await;
        let out = Ls.run(inv).await;
        assert!(out.stdout.contains(".secret"));
    }

    #[tokio::test]
    async fn test_ls_long_format() {
        let inv = invocation(&["-l", "/d"], "", &[("/d/f.txt", "abc")]).await;
        let out = Ls.run(inv).await;
        assert!(out.stdout.starts_with('-'));
        assert!(out.stdout.contains("f.txt"));
        assert!(out.stdout.contains('3'));
    }

    #[tokio::test]
    async fn test_ls_missing_target() {
        let inv = invocation(&["/nope"], "", &[]).await;
        let out = Ls.run(inv).await;
        assert_eq!(out.status, 2);
    }
}
