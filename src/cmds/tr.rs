//! tr

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Tr;

/// Expand a tr set: ranges (`a-z`), classes (`[:lower:]`), escapes.
fn expand_set(spec: &str) -> Vec<char> {
    let mut out = Vec::new();
    let chars: Vec<char> = spec.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '[' && chars.get(i + 1) == Some(&':') {
            if let Some(end) = spec[i..].find(":]") {
                let name = &spec[i + 2..i + end];
                out.extend(class_chars(name));
                i += end + 2;
                continue;
            }
        }
        if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(match chars[i + 1] {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '\\' => '\\',
                other => other,
            });
            i += 2;
            continue;
        }
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (start, end) = (chars[i], chars[i + 2]);
            if start <= end {
                for c in start..=end {
                    out.push(c);
                }
                i += 3;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn class_chars(name: &str) -> Vec<char> {
    match name {
        "lower" => ('a'..='z').collect(),
        "upper" => ('A'..='Z').collect(),
        "digit" => ('0'..='9').collect(),
        "alpha" => ('a'..='z').chain('A'..='Z').collect(),
        "alnum" => ('a'..='z').chain('A'..='Z').chain('0'..='9').collect(),
        "space" => vec![' ', '\t', '\n', '\r', '\x0b', '\x0c'],
        "punct" => (0u8..128)
            .map(char::from)
            .filter(|c| c.is_ascii_punctuation())
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Tool for Tr {
    fn name(&self) -> &'static str {
        "tr"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut delete = false;
        let mut squeeze = false;
        let mut complement = false;
        let mut sets: Vec<&String> = Vec::new();
        for arg in &inv.args {
            match arg.as_str() {
                "-d" => delete = true,
                "-s" => squeeze = true,
                "-c" | "-C" => complement = true,
                "-ds" | "-sd" => {
                    delete = true;
                    squeeze = true;
                }
                _ => sets.push(arg),
            }
        }
        let Some(set1_spec) = sets.first() else {
            return ToolOutput::failure("tr: missing operand\n", 1);
        };
        let set1 = expand_set(set1_spec);
        let set2 = sets.get(1).map(|s| expand_set(s)).unwrap_or_default();

        let in_set1 = |c: char| -> bool {
            let hit = set1.contains(&c);
            if complement {
                !hit
            } else {
                hit
            }
        };

        let mut out = String::with_capacity(inv.stdin.len());
        let mut last_squeezed: Option<char> = None;
        for c in inv.stdin.chars() {
            if delete {
                if in_set1(c) {
                    continue;
                }
                out.push(c);
                continue;
            }
            let mapped = if in_set1(c) && !set2.is_empty() {
                let idx = set1.iter().position(|&s| s == c).unwrap_or(0);
                *set2.get(idx).or_else(|| set2.last()).unwrap_or(&c)
            } else {
                c
            };
            if squeeze && in_set1(c) && last_squeezed == Some(mapped) {
                continue;
            }
            last_squeezed = Some(mapped);
            out.push(mapped);
        }
        ToolOutput::success(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_tr_case_ranges() {
        let inv = invocation(&["a-z", "A-Z"], "hello\n", &[]).await;
        let out = Tr.run(inv).await;
        assert_eq!(out.stdout, "HELLO\n");
    }

    #[tokio::test]
    async fn test_tr_delete() {
        let inv = invocation(&["-d", "l"], "hello\n", &[]).await;
        let out = Tr.run(inv).await;
        assert_eq!(out.stdout, "heo\n");
    }

    #[tokio::test]
    async fn test_tr_squeeze() {
        let inv = invocation(&["-s", " "], "a    b\n", &[]).await;
        let out = Tr.run(inv).await;
        assert_eq!(out.stdout, "a b\n");
    }

    #[tokio::test]
    async fn test_tr_classes() {
        let inv = invocation(&["[:lower:]", "[:upper:]"], "abc\n", &[]).await;
        let out = Tr.run(inv).await;
        assert_eq!(out.stdout, "ABC\n");
    }
}
