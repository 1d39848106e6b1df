//! find

use async_trait::async_trait;

use crate::expand::pattern::GlobPattern;
use crate::vfs::{path as vpath, FileKind};

use super::{Invocation, Tool, ToolOutput};

pub struct Find;

#[derive(Default)]
struct Criteria {
    name: Option<GlobPattern>,
    kind: Option<FileKind>,
    max_depth: Option<usize>,
    min_depth: Option<usize>,
    exec: Option<Vec<String>>,
    delete: bool,
}

#[async_trait]
impl Tool for Find {
    fn name(&self) -> &'static str {
        "find"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut roots: Vec<String> = Vec::new();
        let mut criteria = Criteria::default();

        let mut i = 0;
        while i < inv.args.len() {
            let arg = &inv.args[i];
            match arg.as_str() {
                "-name" | "-iname" => {
                    if let Some(pattern) = inv.args.get(i + 1) {
                        criteria.name =
                            Some(GlobPattern::compile(pattern, true, arg == "-iname"));
                        i += 1;
                    }
                }
                "-type" => {
                    criteria.kind = match inv.args.get(i + 1).map(String::as_str) {
                        Some("f") => Some(FileKind::File),
                        Some("d") => Some(FileKind::Dir),
                        Some("l") => Some(FileKind::Symlink),
                        _ => None,
                    };
                    i += 1;
                }
                "-maxdepth" => {
                    criteria.max_depth = inv.args.get(i + 1).and_then(|v| v.parse().ok());
                    i += 1;
                }
                "-mindepth" => {
                    criteria.min_depth = inv.args.get(i + 1).and_then(|v| v.parse().ok());
                    i += 1;
                }
                "-delete" => criteria.delete = true,
                "-exec" => {
                    // Collect up to the terminating `;` (or `\;`).
                    let mut body = Vec::new();
                    i += 1;
                    while let Some(part) = inv.args.get(i) {
                        if part == ";" || part == "\\;" {
                            break;
                        }
                        body.push(part.clone());
                        i += 1;
                    }
                    criteria.exec = Some(body);
                }
                "-print" => {}
                _ if !arg.starts_with('-') => roots.push(arg.clone()),
                _ => {}
            }
            i += 1;
        }
        if roots.is_empty() {
            roots.push(".".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut status = 0;
        for root in &roots {
            let base = inv.path(root);
            if !inv.fs.exists(&base).await {
                stderr.push_str(&format!(
                    "find: '{}': No such file or directory\n",
                    root
                ));
                status = 1;
                continue;
            }
            let mut hits: Vec<(String, String)> = Vec::new(); // (display, absolute)
            walk(&inv, &base, root.trim_end_matches('/'), 0, &criteria, &mut hits).await;

            for (display, absolute) in hits {
                if criteria.delete {
                    let _ = inv
                        .fs
                        .remove(
                            &absolute,
                            crate::vfs::RemoveOpts {
                                recursive: true,
                                force: true,
                            },
                        )
                        .await;
                    continue;
                }
                if let Some(body) = &criteria.exec {
                    if let Some(exec) = &inv.exec {
                        let line: Vec<String> = body
                            .iter()
                            .map(|part| part.replace("{}", &display))
                            .collect();
                        let result = exec(
                            line.join(" "),
                            String::new(),
                            inv.cwd.clone(),
                            inv.env.clone(),
                        )
                        .await;
                        stdout.push_str(&result.stdout);
                        stderr.push_str(&result.stderr);
                    }
                    continue;
                }
                stdout.push_str(&display);
                stdout.push('\n');
            }
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

async fn walk(
    inv: &Invocation,
    absolute: &str,
    display: &str,
    depth: usize,
    criteria: &Criteria,
    hits: &mut Vec<(String, String)>,
) {
    let Ok(meta) = inv.fs.symlink_metadata(absolute).await else {
        return;
    };
    let name = vpath::file_name(absolute);
    let depth_ok = criteria.min_depth.map(|min| depth >= min).unwrap_or(true)
        && criteria.max_depth.map(|max| depth <= max).unwrap_or(true);
    let name_ok = criteria
        .name
        .as_ref()
        .map(|p| p.matches(name))
        .unwrap_or(true);
    let kind_ok = criteria.kind.map(|k| meta.kind == k).unwrap_or(true);
    if depth_ok && name_ok && kind_ok {
        hits.push((display.to_string(), absolute.to_string()));
    }

    if meta.kind == FileKind::Dir
        && criteria
            .max_depth
            .map(|max| depth < max)
            .unwrap_or(true)
    {
        let Ok(entries) = inv.fs.read_dir(absolute).await else {
            return;
        };
        for entry in entries {
            let child_abs = vpath::join(absolute, &entry.name);
            let child_display = format!("{}/{}", display, entry.name);
            Box::pin(walk(inv, &child_abs, &child_display, depth + 1, criteria, hits)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_find_by_name() {
        let inv = invocation(
            &["/w", "-name", "*.txt"],
            "",
            &[("/w/a.txt", ""), ("/w/b.md", ""), ("/w/sub/c.txt", "")],
        )
        .await;
        let out = Find.run(inv).await;
        assert_eq!(out.stdout, "/w/a.txt\n/w/sub/c.txt\n");
    }

    #[tokio::test]
    async fn test_find_type_dir() {
        let inv = invocation(&["/w", "-type", "d"], "", &[("/w/sub/f", "")]).await;
        let out = Find.run(inv).await;
        assert_eq!(out.stdout, "/w\n/w/sub\n");
    }

    #[tokio::test]
    async fn test_find_maxdepth() {
        let inv = invocation(
            &["/w", "-maxdepth", "1", "-type", "f"],
            "",
            &[("/w/top", ""), ("/w/sub/deep", "")],
        )
        .await;
        let out = Find.run(inv).await;
        assert_eq!(out.stdout, "/w/top\n");
    }

    #[tokio::test]
    async fn test_find_missing_root() {
        let inv = invocation(&["/nope"], "", &[]).await;
        let out = Find.run(inv).await;
        assert_eq!(out.status, 1);
    }
}
