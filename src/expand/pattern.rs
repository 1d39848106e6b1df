//! Glob Pattern Matching
//!
//! The shell's own matcher for pathname expansion, `case`, `[[ == ]]`,
//! and parameter trim/replace operations. Deliberately not a regex
//! round-trip: patterns compile to a small token list and match by
//! backtracking. Runs of `*` collapse to one token so matching stays
//! linear for ordinary patterns.
//!
//! Supported syntax: `*`, `?`, `[set]` with `!`/`^` negation, ranges,
//! `[[:class:]]` names, backslash escapes, and (when enabled) the
//! extended groups `?(…)`, `*(…)`, `+(…)`, `@(…)`, `!(…)`.

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Lit(char),
    Any,
    Star,
    Class { negated: bool, items: Vec<ClassItem> },
    Group { kind: GroupKind, branches: Vec<Vec<Tok>> },
}

#[derive(Debug, Clone, PartialEq)]
enum ClassItem {
    Ch(char),
    Range(char, char),
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    ZeroOrOne,  // ?(…)
    ZeroOrMore, // *(…)
    OneOrMore,  // +(…)
    ExactlyOne, // @(…)
    Negate,     // !(…)
}

#[derive(Debug, Clone)]
pub struct GlobPattern {
    toks: Vec<Tok>,
    nocase: bool,
}

/// Does the text contain unescaped glob metacharacters?
pub fn has_glob_meta(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

/// Escape text so the matcher treats it literally. Used for the quoted
/// fragments of a word before pathname expansion.
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '(' | ')' | '|' | '!' | '+' | '@') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl GlobPattern {
    pub fn compile(pattern: &str, extglob: bool, nocase: bool) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let (toks, _) = compile_until(&chars, 0, extglob, &[]);
        Self { toks, nocase }
    }

    pub fn matches(&self, text: &str) -> bool {
        let chars: Vec<char> = if self.nocase {
            text.chars().flat_map(|c| c.to_lowercase()).collect()
        } else {
            text.chars().collect()
        };
        let toks = if self.nocase {
            lowercase_toks(&self.toks)
        } else {
            self.toks.clone()
        };
        match_here(&toks, &chars)
    }
}

fn lowercase_toks(toks: &[Tok]) -> Vec<Tok> {
    toks.iter()
        .map(|t| match t {
            Tok::Lit(c) => Tok::Lit(c.to_lowercase().next().unwrap_or(*c)),
            Tok::Class { negated, items } => Tok::Class {
                negated: *negated,
                items: items
                    .iter()
                    .map(|i| match i {
                        ClassItem::Ch(c) => {
                            ClassItem::Ch(c.to_lowercase().next().unwrap_or(*c))
                        }
                        ClassItem::Range(a, b) => ClassItem::Range(
                            a.to_lowercase().next().unwrap_or(*a),
                            b.to_lowercase().next().unwrap_or(*b),
                        ),
                        named => named.clone(),
                    })
                    .collect(),
            },
            Tok::Group { kind, branches } => Tok::Group {
                kind: *kind,
                branches: branches.iter().map(|b| lowercase_toks(b)).collect(),
            },
            other => other.clone(),
        })
        .collect()
}

/// Compile until one of `stops` (at depth 0) or end of input. Returns the
/// tokens and the index of the stop character (or input length).
fn compile_until(
    chars: &[char],
    mut i: usize,
    extglob: bool,
    stops: &[char],
) -> (Vec<Tok>, usize) {
    let mut toks = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        if stops.contains(&c) {
            return (toks, i);
        }
        match c {
            '\\' => {
                i += 1;
                if i < chars.len() {
                    toks.push(Tok::Lit(chars[i]));
                    i += 1;
                } else {
                    toks.push(Tok::Lit('\\'));
                }
            }
            '?' | '*' | '+' | '@' | '!' if extglob && chars.get(i + 1) == Some(&'(') => {
                let kind = match c {
                    '?' => GroupKind::ZeroOrOne,
                    '*' => GroupKind::ZeroOrMore,
                    '+' => GroupKind::OneOrMore,
                    '@' => GroupKind::ExactlyOne,
                    _ => GroupKind::Negate,
                };
                let mut branches = Vec::new();
                let mut j = i + 2;
                loop {
                    let (branch, stop) = compile_until(chars, j, extglob, &['|', ')']);
                    branches.push(branch);
                    if stop >= chars.len() {
                        // Unterminated group: fall back to literal chars.
                        toks.push(Tok::Lit(c));
                        toks.push(Tok::Lit('('));
                        j = i + 2;
                        branches.clear();
                        break;
                    }
                    if chars[stop] == '|' {
                        j = stop + 1;
                        continue;
                    }
                    j = stop + 1;
                    break;
                }
                if branches.is_empty() {
                    i += 2;
                } else {
                    toks.push(Tok::Group { kind, branches });
                    i = j;
                }
            }
            '?' => {
                toks.push(Tok::Any);
                i += 1;
            }
            '*' => {
                if toks.last() != Some(&Tok::Star) {
                    toks.push(Tok::Star);
                }
                i += 1;
            }
            '[' => match compile_class(chars, i) {
                Some((tok, next)) => {
                    toks.push(tok);
                    i = next;
                }
                None => {
                    toks.push(Tok::Lit('['));
                    i += 1;
                }
            },
            _ => {
                toks.push(Tok::Lit(c));
                i += 1;
            }
        }
    }
    (toks, i)
}

/// Compile a `[…]` bracket expression starting at `chars[i] == '['`.
fn compile_class(chars: &[char], i: usize) -> Option<(Tok, usize)> {
    let mut j = i + 1;
    let negated = match chars.get(j) {
        Some('!') | Some('^') => {
            j += 1;
            true
        }
        _ => false,
    };
    let mut items = Vec::new();
    let mut first = true;
    loop {
        let c = *chars.get(j)?;
        if c == ']' && !first {
            return Some((Tok::Class { negated, items }, j + 1));
        }
        first = false;
        if c == '[' && chars.get(j + 1) == Some(&':') {
            let mut k = j + 2;
            let mut name = String::new();
            while let Some(&n) = chars.get(k) {
                if n == ':' {
                    break;
                }
                name.push(n);
                k += 1;
            }
            if chars.get(k) == Some(&':') && chars.get(k + 1) == Some(&']') {
                items.push(ClassItem::Named(name));
                j = k + 2;
                continue;
            }
        }
        if chars.get(j + 1) == Some(&'-') && chars.get(j + 2).map(|&e| e != ']').unwrap_or(false) {
            items.push(ClassItem::Range(c, chars[j + 2]));
            j += 3;
            continue;
        }
        items.push(ClassItem::Ch(c));
        j += 1;
    }
}

fn class_matches(negated: bool, items: &[ClassItem], c: char) -> bool {
    let mut hit = false;
    for item in items {
        hit = match item {
            ClassItem::Ch(x) => c == *x,
            ClassItem::Range(a, b) => c >= *a && c <= *b,
            ClassItem::Named(name) => match name.as_str() {
                "alpha" => c.is_alphabetic(),
                "digit" => c.is_ascii_digit(),
                "alnum" => c.is_alphanumeric(),
                "upper" => c.is_uppercase(),
                "lower" => c.is_lowercase(),
                "space" => c.is_whitespace(),
                "blank" => c == ' ' || c == '\t',
                "punct" => c.is_ascii_punctuation(),
                "xdigit" => c.is_ascii_hexdigit(),
                "cntrl" => c.is_control(),
                "graph" => c.is_ascii_graphic(),
                "print" => c.is_ascii_graphic() || c == ' ',
                "word" => c.is_alphanumeric() || c == '_',
                _ => false,
            },
        };
        if hit {
            break;
        }
    }
    hit != negated
}

fn match_here(toks: &[Tok], text: &[char]) -> bool {
    match toks.first() {
        None => text.is_empty(),
        Some(Tok::Lit(c)) => text.first() == Some(c) && match_here(&toks[1..], &text[1..]),
        Some(Tok::Any) => !text.is_empty() && match_here(&toks[1..], &text[1..]),
        Some(Tok::Star) => {
            for skip in 0..=text.len() {
                if match_here(&toks[1..], &text[skip..]) {
                    return true;
                }
            }
            false
        }
        Some(Tok::Class { negated, items }) => match text.first() {
            Some(&c) => class_matches(*negated, items, c) && match_here(&toks[1..], &text[1..]),
            None => false,
        },
        Some(Tok::Group { kind, branches }) => match kind {
            GroupKind::ExactlyOne => branches
                .iter()
                .any(|b| match_concat(b, &toks[1..], text)),
            GroupKind::ZeroOrOne => {
                match_here(&toks[1..], text)
                    || branches.iter().any(|b| match_concat(b, &toks[1..], text))
            }
            GroupKind::ZeroOrMore | GroupKind::OneOrMore => {
                let need_one = *kind == GroupKind::OneOrMore;
                match_repeat(branches, &toks[1..], text, need_one)
            }
            GroupKind::Negate => {
                // Any split where the prefix matches none of the branches
                // and the rest matches the remaining pattern.
                for split in 0..=text.len() {
                    let prefix = &text[..split];
                    let rest = &text[split..];
                    let prefix_matches_branch = branches
                        .iter()
                        .any(|b| match_here(b, prefix));
                    if !prefix_matches_branch && match_here(&toks[1..], rest) {
                        return true;
                    }
                }
                false
            }
        },
    }
}

/// Match `branch` against some prefix of `text`, then `rest` against the
/// remainder.
fn match_concat(branch: &[Tok], rest: &[Tok], text: &[char]) -> bool {
    for split in 0..=text.len() {
        if match_here(branch, &text[..split]) && match_here(rest, &text[split..]) {
            return true;
        }
    }
    false
}

/// `*(…)` / `+(…)`: greedy-enough repetition with backtracking.
fn match_repeat(branches: &[Vec<Tok>], rest: &[Tok], text: &[char], need_one: bool) -> bool {
    if !need_one && match_here(rest, text) {
        return true;
    }
    for split in 1..=text.len() {
        let prefix = &text[..split];
        if branches.iter().any(|b| match_here(b, prefix))
            && match_repeat(branches, rest, &text[split..], false)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pattern: &str, text: &str) -> bool {
        GlobPattern::compile(pattern, false, false).matches(text)
    }

    fn mx(pattern: &str, text: &str) -> bool {
        GlobPattern::compile(pattern, true, false).matches(text)
    }

    #[test]
    fn test_literal_and_any() {
        assert!(m("abc", "abc"));
        assert!(!m("abc", "abd"));
        assert!(m("a?c", "abc"));
        assert!(!m("a?c", "ac"));
    }

    #[test]
    fn test_star() {
        assert!(m("*", ""));
        assert!(m("*", "anything"));
        assert!(m("a*c", "abbbc"));
        assert!(m("a*c", "ac"));
        assert!(!m("a*c", "ab"));
        assert!(m("*.txt", "notes.txt"));
        assert!(!m("*.txt", "notes.txt.bak"));
    }

    #[test]
    fn test_adjacent_stars_collapse() {
        let p = GlobPattern::compile("a****b", false, false);
        assert!(p.matches("ab"));
        assert!(p.matches("axxxb"));
    }

    #[test]
    fn test_bracket_sets() {
        assert!(m("[abc]", "b"));
        assert!(!m("[abc]", "d"));
        assert!(m("[!abc]", "d"));
        assert!(!m("[!abc]", "a"));
        assert!(m("[a-f]9", "c9"));
        assert!(m("file[0-9]", "file7"));
        assert!(m("[]x]", "]"));
    }

    #[test]
    fn test_char_classes() {
        assert!(m("[[:alpha:]]*", "word"));
        assert!(!m("[[:digit:]]*", "word"));
        assert!(m("x[[:digit:]]y", "x5y"));
    }

    #[test]
    fn test_escapes_are_literal() {
        assert!(m(r"\*", "*"));
        assert!(!m(r"\*", "x"));
        assert!(m(r"a\?b", "a?b"));
    }

    #[test]
    fn test_extglob_groups() {
        assert!(mx("a@(b|c)d", "abd"));
        assert!(mx("a@(b|c)d", "acd"));
        assert!(!mx("a@(b|c)d", "ad"));
        assert!(mx("a?(b)c", "ac"));
        assert!(mx("a?(b)c", "abc"));
        assert!(mx("a*(b)c", "abbbc"));
        assert!(mx("a*(b)c", "ac"));
        assert!(mx("a+(b)c", "abc"));
        assert!(!mx("a+(b)c", "ac"));
        assert!(mx("!(foo)", "bar"));
        assert!(!mx("!(foo)", "foo"));
        assert!(mx("!(foo).txt", "bar.txt"));
    }

    #[test]
    fn test_nocase() {
        let p = GlobPattern::compile("*.TXT", false, true);
        assert!(p.matches("readme.txt"));
    }

    #[test]
    fn test_has_glob_meta() {
        assert!(has_glob_meta("*.rs"));
        assert!(has_glob_meta("a?b"));
        assert!(has_glob_meta("[ab]"));
        assert!(!has_glob_meta("plain.txt"));
        assert!(!has_glob_meta(r"escaped\*star"));
    }

    #[test]
    fn test_escape_glob_roundtrip() {
        let escaped = escape_glob("a*b?c[d]");
        assert!(!has_glob_meta(&escaped));
        assert!(GlobPattern::compile(&escaped, false, false).matches("a*b?c[d]"));
    }
}
