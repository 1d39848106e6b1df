//! Pathname Expansion
//!
//! Matches one glob pattern against the virtual filesystem, component by
//! component so `*` never crosses a slash. `**` (with `globstar`) walks
//! whole subtrees. Results come back sorted, relative patterns yielding
//! relative paths.

use crate::engine::env::Shopts;
use crate::engine::fsbridge::SyncFs;
use crate::vfs::path as vpath;

use super::pattern::GlobPattern;

pub fn expand_pathname(fs: &SyncFs, cwd: &str, pattern: &str, shopts: &Shopts) -> Vec<String> {
    let absolute = pattern.starts_with('/');
    let base = if absolute {
        "/".to_string()
    } else {
        vpath::normalize(cwd)
    };
    let comps: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    if comps.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    walk(fs, &base, &comps, shopts, &mut matches);
    matches.sort();

    if absolute {
        matches
    } else {
        let prefix = if base == "/" {
            "/".to_string()
        } else {
            format!("{}/", base)
        };
        matches
            .into_iter()
            .map(|m| m.strip_prefix(&prefix).map(str::to_string).unwrap_or(m))
            .collect()
    }
}

fn walk(fs: &SyncFs, dir: &str, comps: &[&str], shopts: &Shopts, out: &mut Vec<String>) {
    let Some((comp, rest)) = comps.split_first() else {
        return;
    };

    // Literal `.`/`..` components pass straight through.
    if *comp == "." || *comp == ".." {
        let next = vpath::resolve(dir, comp);
        if rest.is_empty() {
            if fs.exists(&next) {
                out.push(next);
            }
        } else {
            walk(fs, &next, rest, shopts, out);
        }
        return;
    }

    // globstar: `**` matches zero or more directory levels.
    if shopts.globstar && *comp == "**" {
        if rest.is_empty() {
            collect_tree(fs, dir, shopts, out);
        } else {
            walk(fs, dir, rest, shopts, out);
            for sub in subdirs(fs, dir, shopts) {
                walk(fs, &sub, comps, shopts, out);
            }
        }
        return;
    }

    let matcher = GlobPattern::compile(comp, shopts.extglob, shopts.nocaseglob);
    let show_hidden = shopts.dotglob || comp.starts_with('.') || comp.starts_with("\\.");
    let Ok(entries) = fs.read_dir(dir) else {
        return;
    };
    for entry in entries {
        if entry.name.starts_with('.') && !show_hidden {
            continue;
        }
        if !matcher.matches(&entry.name) {
            continue;
        }
        let child = vpath::join(dir, &entry.name);
        if rest.is_empty() {
            out.push(child);
        } else if fs.is_dir(&child) {
            walk(fs, &child, rest, shopts, out);
        }
    }
}

fn subdirs(fs: &SyncFs, dir: &str, shopts: &Shopts) -> Vec<String> {
    let Ok(entries) = fs.read_dir(dir) else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter(|e| shopts.dotglob || !e.name.starts_with('.'))
        .map(|e| vpath::join(dir, &e.name))
        .filter(|p| fs.is_dir(p))
        .collect()
}

fn collect_tree(fs: &SyncFs, dir: &str, shopts: &Shopts, out: &mut Vec<String>) {
    let Ok(entries) = fs.read_dir(dir) else {
        return;
    };
    for entry in entries {
        if entry.name.starts_with('.') && !shopts.dotglob {
            continue;
        }
        let child = vpath::join(dir, &entry.name);
        out.push(child.clone());
        if fs.is_dir(&child) {
            collect_tree(fs, &child, shopts, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{MemFs, Vfs};
    use std::sync::Arc;

    async fn fixture() -> SyncFs {
        let fs = MemFs::new();
        for p in [
            "/work/a.txt",
            "/work/b.txt",
            "/work/c.md",
            "/work/.hidden",
            "/work/sub/d.txt",
            "/work/sub/deep/e.txt",
        ] {
            fs.write(p, b"x").await.unwrap();
        }
        SyncFs::new(Arc::new(fs), tokio::runtime::Handle::current())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_star_in_cwd() {
        let fs = fixture().await;
        let hits = expand_pathname(&fs, "/work", "*.txt", &Shopts::default());
        assert_eq!(hits, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_absolute_pattern() {
        let fs = fixture().await;
        let hits = expand_pathname(&fs, "/", "/work/*.md", &Shopts::default());
        assert_eq!(hits, vec!["/work/c.md"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hidden_requires_dotglob() {
        let fs = fixture().await;
        let plain = expand_pathname(&fs, "/work", "*", &Shopts::default());
        assert!(!plain.iter().any(|p| p.contains("hidden")));
        let opts = Shopts {
            dotglob: true,
            ..Default::default()
        };
        let dotted = expand_pathname(&fs, "/work", "*", &opts);
        assert!(dotted.iter().any(|p| p.contains("hidden")));
        let explicit = expand_pathname(&fs, "/work", ".h*", &Shopts::default());
        assert_eq!(explicit, vec![".hidden"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_multi_component() {
        let fs = fixture().await;
        let hits = expand_pathname(&fs, "/work", "sub/*.txt", &Shopts::default());
        assert_eq!(hits, vec!["sub/d.txt"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_globstar() {
        let fs = fixture().await;
        let opts = Shopts {
            globstar: true,
            ..Default::default()
        };
        let hits = expand_pathname(&fs, "/work", "**/*.txt", &opts);
        assert_eq!(hits, vec!["a.txt", "b.txt", "sub/d.txt", "sub/deep/e.txt"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_question_and_class() {
        let fs = fixture().await;
        let hits = expand_pathname(&fs, "/work", "[ab].txt", &Shopts::default());
        assert_eq!(hits, vec!["a.txt", "b.txt"]);
        let hits = expand_pathname(&fs, "/work", "?.md", &Shopts::default());
        assert_eq!(hits, vec!["c.md"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_no_match_returns_empty() {
        let fs = fixture().await;
        assert!(expand_pathname(&fs, "/work", "*.zip", &Shopts::default()).is_empty());
    }
}
