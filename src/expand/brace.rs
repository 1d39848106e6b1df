//! Brace Expansion
//!
//! Phase one of word expansion: rewrite one word into the cartesian
//! product of its brace alternatives. Purely structural; no variable or
//! command state is consulted.

use crate::syntax::ast::{BraceElem, Word, WordPart};

/// Ceiling on generated alternatives; a hostile `{1..999999999}` clamps
/// here instead of exhausting memory.
const MAX_ALTERNATIVES: usize = 100_000;

pub fn brace_expand(word: &Word) -> Vec<Word> {
    let mut results: Vec<Vec<WordPart>> = vec![Vec::new()];
    for part in &word.parts {
        match part {
            WordPart::Brace(elems) => {
                let mut alternatives: Vec<Vec<WordPart>> = Vec::new();
                for elem in elems {
                    expand_elem(elem, &mut alternatives);
                }
                if alternatives.is_empty() {
                    alternatives.push(Vec::new());
                }
                let mut next = Vec::with_capacity(results.len() * alternatives.len());
                'outer: for prefix in &results {
                    for alt in &alternatives {
                        if next.len() >= MAX_ALTERNATIVES {
                            break 'outer;
                        }
                        let mut combined = prefix.clone();
                        combined.extend(alt.iter().cloned());
                        next.push(combined);
                    }
                }
                results = next;
            }
            other => {
                for r in &mut results {
                    r.push(other.clone());
                }
            }
        }
    }
    results.into_iter().map(|parts| Word { parts }).collect()
}

fn expand_elem(elem: &BraceElem, out: &mut Vec<Vec<WordPart>>) {
    match elem {
        BraceElem::Item(word) => {
            // Items may hold nested braces of their own.
            for sub in brace_expand(word) {
                out.push(sub.parts);
            }
        }
        BraceElem::NumRange {
            start,
            end,
            step,
            width,
        } => {
            let step = step.unsigned_abs().max(1) as i64;
            let ascending = start <= end;
            let mut n = *start;
            loop {
                if out.len() >= MAX_ALTERNATIVES {
                    break;
                }
                let text = if *width > 0 {
                    let sign = if n < 0 { "-" } else { "" };
                    format!("{}{:0width$}", sign, n.abs(), width = *width)
                } else {
                    n.to_string()
                };
                out.push(vec![WordPart::Lit(text)]);
                if ascending {
                    if n + step > *end {
                        break;
                    }
                    n += step;
                } else {
                    if n - step < *end {
                        break;
                    }
                    n -= step;
                }
            }
        }
        BraceElem::CharRange { start, end, step } => {
            let step = step.unsigned_abs().max(1) as u32;
            let (a, b) = (*start as u32, *end as u32);
            let ascending = a <= b;
            let mut n = a;
            loop {
                if out.len() >= MAX_ALTERNATIVES {
                    break;
                }
                if let Some(c) = char::from_u32(n) {
                    out.push(vec![WordPart::Lit(c.to_string())]);
                }
                if ascending {
                    if n + step > b {
                        break;
                    }
                    n += step;
                } else {
                    if n < b + step {
                        break;
                    }
                    n -= step;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use crate::syntax::ast::Cmd;

    fn words_of(src: &str) -> Vec<String> {
        let script = parse(src).unwrap();
        let Cmd::Simple(cmd) = &script.items[0].pipelines[0].elements[0] else {
            panic!("expected simple command");
        };
        brace_expand(&cmd.words[1])
            .iter()
            .map(|w| {
                w.parts
                    .iter()
                    .map(|p| match p {
                        WordPart::Lit(s) => s.clone(),
                        other => panic!("unexpected part {:?}", other),
                    })
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_simple_alternatives() {
        assert_eq!(words_of("echo a{b,c}d"), vec!["abd", "acd"]);
    }

    #[test]
    fn test_numeric_range() {
        assert_eq!(words_of("echo {1..4}"), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_reversed_range() {
        assert_eq!(words_of("echo {3..1}"), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_stepped_range() {
        assert_eq!(words_of("echo {1..9..3}"), vec!["1", "4", "7"]);
    }

    #[test]
    fn test_zero_padded_range() {
        assert_eq!(words_of("echo {01..03}"), vec!["01", "02", "03"]);
    }

    #[test]
    fn test_char_range() {
        assert_eq!(words_of("echo {a..d}"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_nested_braces() {
        assert_eq!(words_of("echo a{b,{c,d}}e"), vec!["abe", "ace", "ade"]);
    }

    #[test]
    fn test_multiple_groups_cartesian() {
        assert_eq!(
            words_of("echo {a,b}{1,2}"),
            vec!["a1", "a2", "b1", "b2"]
        );
    }

    #[test]
    fn test_empty_alternative() {
        assert_eq!(words_of("echo x{,y}"), vec!["x", "xy"]);
    }
}
