//! Parameter Expansion
//!
//! Resolution of `$name` / `${name…}` with the full operation set. A
//! parameter resolves to a *subject* — a scalar (possibly unset) or a
//! list (`$@`, `$*`, whole arrays) — and the operation transforms the
//! subject before it is emitted as quoting-tagged pieces.

use crate::engine::env::{Env, Value};
use crate::engine::flow::Flow;
use crate::engine::walker::Walker;
use crate::syntax::ast::{ParamExp, ParamIndex, ParamOp, ReplaceAnchor, Word};

use super::pattern::GlobPattern;
use super::Piece;

enum Subject {
    Scalar(Option<String>),
    List { values: Vec<String>, star: bool },
}

impl Subject {
    fn is_unset(&self) -> bool {
        match self {
            Subject::Scalar(v) => v.is_none(),
            Subject::List { values, .. } => values.is_empty(),
        }
    }

    fn is_null(&self) -> bool {
        match self {
            Subject::Scalar(v) => v.as_deref().map(str::is_empty).unwrap_or(true),
            Subject::List { values, .. } => values.concat().is_empty(),
        }
    }

    fn map(self, f: impl Fn(&str) -> String) -> Subject {
        match self {
            Subject::Scalar(v) => Subject::Scalar(v.map(|s| f(&s))),
            Subject::List { values, star } => Subject::List {
                values: values.iter().map(|v| f(v)).collect(),
                star,
            },
        }
    }
}

impl Walker {
    pub(crate) fn expand_param(
        &self,
        env: &mut Env,
        p: &ParamExp,
        in_dq: bool,
        out: &mut Vec<Piece>,
    ) -> Result<(), Flow> {
        // Name-level operations first: they never read the value itself.
        match &p.op {
            Some(ParamOp::NamesWithPrefix { star }) => {
                let names = env.names_with_prefix(&p.name);
                emit(
                    env,
                    Subject::List {
                        values: names,
                        star: *star,
                    },
                    in_dq,
                    out,
                );
                return Ok(());
            }
            Some(ParamOp::ArrayKeys { star }) => {
                let keys = self.array_keys(env, &p.name);
                emit(
                    env,
                    Subject::List {
                        values: keys,
                        star: *star,
                    },
                    in_dq,
                    out,
                );
                return Ok(());
            }
            Some(ParamOp::Length) => {
                let subject = self.param_subject(env, p)?;
                let count = match (&p.index, subject) {
                    (Some(ParamIndex::All | ParamIndex::Star), Subject::List { values, .. }) => {
                        values.len()
                    }
                    (_, Subject::List { values, .. }) => values.len(),
                    (_, Subject::Scalar(v)) => v.unwrap_or_default().chars().count(),
                };
                out.push(Piece::frag(count.to_string(), in_dq));
                return Ok(());
            }
            Some(ParamOp::Indirect) => {
                let target = match self.param_subject(env, p)? {
                    Subject::Scalar(v) => v.unwrap_or_default(),
                    Subject::List { values, .. } => values.first().cloned().unwrap_or_default(),
                };
                let subject = if target.is_empty() {
                    Subject::Scalar(None)
                } else {
                    self.lookup_by_text(env, &target)?
                };
                if subject.is_unset() && env.flags.nounset {
                    return Err(Flow::unbound(&target));
                }
                emit(env, subject, in_dq, out);
                return Ok(());
            }
            _ => {}
        }

        let subject = self.param_subject(env, p)?;

        match &p.op {
            None => {
                self.check_nounset(env, p, &subject)?;
                emit(env, subject, in_dq, out);
            }
            Some(ParamOp::Default { word, colon }) => {
                if needs_fallback(&subject, *colon) {
                    self.expand_parts(env, &word.parts, in_dq, out)?;
                } else {
                    emit(env, subject, in_dq, out);
                }
            }
            Some(ParamOp::AssignDefault { word, colon }) => {
                if needs_fallback(&subject, *colon) {
                    let text = self.expand_word_str(env, word)?;
                    env.set_str(&p.name, text.clone());
                    out.push(Piece::frag(text, in_dq));
                } else {
                    emit(env, subject, in_dq, out);
                }
            }
            Some(ParamOp::Alternative { word, colon }) => {
                if !needs_fallback(&subject, *colon) {
                    self.expand_parts(env, &word.parts, in_dq, out)?;
                }
            }
            Some(ParamOp::ErrorIfUnset { word, colon }) => {
                if needs_fallback(&subject, *colon) {
                    let message = match word {
                        Some(w) => self.expand_word_str(env, w)?,
                        None => "parameter null or not set".to_string(),
                    };
                    return Err(Flow::fail(1, format!("{}: {}", p.name, message)));
                }
                emit(env, subject, in_dq, out);
            }
            Some(ParamOp::TrimPrefix { pattern, greedy }) => {
                self.check_nounset(env, p, &subject)?;
                let matcher = self.pattern_matcher(env, pattern)?;
                emit(
                    env,
                    subject.map(|s| trim_prefix(s, &matcher, *greedy)),
                    in_dq,
                    out,
                );
            }
            Some(ParamOp::TrimSuffix { pattern, greedy }) => {
                self.check_nounset(env, p, &subject)?;
                let matcher = self.pattern_matcher(env, pattern)?;
                emit(
                    env,
                    subject.map(|s| trim_suffix(s, &matcher, *greedy)),
                    in_dq,
                    out,
                );
            }
            Some(ParamOp::Replace {
                pattern,
                replacement,
                all,
                anchor,
            }) => {
                self.check_nounset(env, p, &subject)?;
                let matcher = self.pattern_matcher(env, pattern)?;
                let replacement = match replacement {
                    Some(w) => self.expand_word_str(env, w)?,
                    None => String::new(),
                };
                emit(
                    env,
                    subject.map(|s| glob_replace(s, &matcher, &replacement, *all, *anchor)),
                    in_dq,
                    out,
                );
            }
            Some(ParamOp::Substring { offset, length }) => {
                self.check_nounset(env, p, &subject)?;
                let off = self.eval_arith(env, offset)?;
                let len = match length {
                    Some(expr) => Some(self.eval_arith(env, expr)?),
                    None => None,
                };
                let sliced = self.slice_subject(env, &p.name, subject, off, len)?;
                emit(env, sliced, in_dq, out);
            }
            Some(ParamOp::CaseConvert {
                upper,
                all,
                pattern,
            }) => {
                self.check_nounset(env, p, &subject)?;
                let matcher = match pattern {
                    Some(w) => Some(self.pattern_matcher(env, w)?),
                    None => None,
                };
                emit(
                    env,
                    subject.map(|s| case_convert(s, *upper, *all, matcher.as_ref())),
                    in_dq,
                    out,
                );
            }
            Some(ParamOp::Transform(c)) => {
                self.check_nounset(env, p, &subject)?;
                emit(env, subject.map(|s| transform(s, *c)), in_dq, out);
            }
            // Handled in the name-level block above.
            Some(ParamOp::Length)
            | Some(ParamOp::Indirect)
            | Some(ParamOp::NamesWithPrefix { .. })
            | Some(ParamOp::ArrayKeys { .. }) => {}
        }
        Ok(())
    }

    fn check_nounset(&self, env: &Env, p: &ParamExp, subject: &Subject) -> Result<(), Flow> {
        if !env.flags.nounset || !subject.is_unset() {
            return Ok(());
        }
        // `$@`/`$*` (and whole-array expansions) are exempt.
        if matches!(p.name.as_str(), "@" | "*")
            || matches!(p.index, Some(ParamIndex::All | ParamIndex::Star))
        {
            return Ok(());
        }
        Err(Flow::unbound(&p.name))
    }

    fn pattern_matcher(&self, env: &mut Env, word: &Word) -> Result<GlobPattern, Flow> {
        let text = self.expand_word_pattern(env, word)?;
        Ok(GlobPattern::compile(&text, true, env.shopts.nocasematch))
    }

    // -----------------------------------------------------------------
    // Subject resolution
    // -----------------------------------------------------------------

    fn param_subject(&self, env: &mut Env, p: &ParamExp) -> Result<Subject, Flow> {
        match (&p.name[..], &p.index) {
            ("@", _) => Ok(Subject::List {
                values: env.positionals.clone(),
                star: false,
            }),
            ("*", _) => Ok(Subject::List {
                values: env.positionals.clone(),
                star: true,
            }),
            (_, Some(ParamIndex::All)) => Ok(Subject::List {
                values: self.array_elements(env, &p.name),
                star: false,
            }),
            (_, Some(ParamIndex::Star)) => Ok(Subject::List {
                values: self.array_elements(env, &p.name),
                star: true,
            }),
            (name, Some(ParamIndex::Expr(word))) => {
                let element = self.array_element(env, name, word)?;
                Ok(Subject::Scalar(element))
            }
            (name, None) => Ok(Subject::Scalar(self.scalar_value(env, name))),
        }
    }

    fn scalar_value(&self, env: &mut Env, name: &str) -> Option<String> {
        if name == "RANDOM" && env.get(name).is_none() {
            let roll = self
                .random
                .as_ref()
                .map(|f| f())
                .unwrap_or(0.5);
            return Some(((roll * 32768.0) as u32 % 32768).to_string());
        }
        if name == "PIPESTATUS" {
            return env.pipe_status.first().map(|s| s.to_string());
        }
        if name == "BASH_REMATCH" {
            return env.rematch.first().cloned();
        }
        if name == "BASH_SOURCE" {
            return env
                .source_stack
                .last()
                .cloned()
                .or_else(|| Some(env.script_name.clone()));
        }
        env.get_str(name)
    }

    fn pseudo_array(&self, env: &Env, name: &str) -> Option<Vec<String>> {
        match name {
            "PIPESTATUS" => Some(env.pipe_status.iter().map(|s| s.to_string()).collect()),
            "BASH_REMATCH" => Some(env.rematch.clone()),
            "FUNCNAME" => Some(env.func_stack.iter().rev().cloned().collect()),
            "BASH_SOURCE" => Some(env.source_stack.iter().rev().cloned().collect()),
            "DIRSTACK" => Some(env.dir_stack.iter().rev().cloned().collect()),
            _ => None,
        }
    }

    fn array_elements(&self, env: &Env, name: &str) -> Vec<String> {
        if let Some(values) = self.pseudo_array(env, name) {
            return values;
        }
        match env.get(name) {
            Some(var) => var.value.elements(),
            None => Vec::new(),
        }
    }

    fn array_keys(&self, env: &Env, name: &str) -> Vec<String> {
        if let Some(values) = self.pseudo_array(env, name) {
            return (0..values.len()).map(|i| i.to_string()).collect();
        }
        match env.get(name) {
            Some(var) => var.value.keys(),
            None => Vec::new(),
        }
    }

    /// `${name[subscript]}` for one element.
    pub(crate) fn array_element(
        &self,
        env: &mut Env,
        name: &str,
        subscript: &Word,
    ) -> Result<Option<String>, Flow> {
        let is_assoc = matches!(
            env.get(name),
            Some(crate::engine::env::Var {
                value: Value::Assoc(_),
                ..
            })
        );
        if is_assoc {
            let key = self.expand_word_str(env, subscript)?;
            if let Some(crate::engine::env::Var {
                value: Value::Assoc(map),
                ..
            }) = env.get(name)
            {
                return Ok(map.get(&key).cloned());
            }
            return Ok(None);
        }

        let text = self.expand_word_str(env, subscript)?;
        let index = self.eval_arith_text(env, &text)?;
        if let Some(values) = self.pseudo_array(env, name) {
            let i = absolute_index(index, values.len());
            return Ok(i.and_then(|i| values.get(i).cloned()));
        }
        match env.get(name) {
            Some(var) => match &var.value {
                Value::Indexed(map) => {
                    if index < 0 {
                        let values: Vec<&String> = map.values().collect();
                        let i = absolute_index(index, values.len());
                        Ok(i.and_then(|i| values.get(i).map(|s| (*s).clone())))
                    } else {
                        Ok(map.get(&index).cloned())
                    }
                }
                Value::Str(s) => Ok(if index == 0 { Some(s.clone()) } else { None }),
                Value::Assoc(map) => Ok(map.get(&text).cloned()),
            },
            None => Ok(None),
        }
    }

    /// `${!text}` — `text` may itself be `name` or `name[subscript]`.
    fn lookup_by_text(&self, env: &mut Env, text: &str) -> Result<Subject, Flow> {
        if let Some(open) = text.find('[') {
            if let Some(rest) = text[open + 1..].strip_suffix(']') {
                let name = &text[..open];
                match rest {
                    "@" | "*" => {
                        return Ok(Subject::List {
                            values: self.array_elements(env, name),
                            star: rest == "*",
                        })
                    }
                    _ => {
                        let word = Word::lit(rest);
                        return Ok(Subject::Scalar(self.array_element(env, name, &word)?));
                    }
                }
            }
        }
        Ok(Subject::Scalar(self.scalar_value(env, text)))
    }

    /// `${x:off}` / `${x:off:len}` on a scalar or a list.
    fn slice_subject(
        &self,
        env: &Env,
        name: &str,
        subject: Subject,
        offset: i64,
        length: Option<i64>,
    ) -> Result<Subject, Flow> {
        match subject {
            Subject::Scalar(None) => Ok(Subject::Scalar(None)),
            Subject::Scalar(Some(text)) => {
                let chars: Vec<char> = text.chars().collect();
                let start = match absolute_index(offset, chars.len()) {
                    Some(i) => i,
                    None => return Ok(Subject::Scalar(Some(String::new()))),
                };
                let end = match length {
                    None => chars.len(),
                    Some(n) if n < 0 => {
                        // Negative length counts back from the end.
                        let e = chars.len() as i64 + n;
                        if e < start as i64 {
                            return Err(Flow::fail(
                                1,
                                format!("{}: substring expression < 0", name),
                            ));
                        }
                        e as usize
                    }
                    Some(n) => (start + n as usize).min(chars.len()),
                };
                Ok(Subject::Scalar(Some(
                    chars[start.min(chars.len())..end.min(chars.len())]
                        .iter()
                        .collect(),
                )))
            }
            Subject::List { values, star } => {
                // `${@:1}` starts at $1; `${@:0}` includes $0.
                let mut full = vec![env.script_name.clone()];
                full.extend(values);
                let start = match absolute_index(offset, full.len()) {
                    Some(i) => i,
                    None => {
                        return Ok(Subject::List {
                            values: Vec::new(),
                            star,
                        })
                    }
                };
                let end = match length {
                    None => full.len(),
                    Some(n) if n < 0 => {
                        return Err(Flow::fail(1, format!("{}: substring expression < 0", name)))
                    }
                    Some(n) => (start + n as usize).min(full.len()),
                };
                let values = full
                    .get(start.min(full.len())..end.min(full.len()))
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                Ok(Subject::List { values, star })
            }
        }
    }
}

fn needs_fallback(subject: &Subject, colon: bool) -> bool {
    if subject.is_unset() {
        return true;
    }
    colon && subject.is_null()
}

fn absolute_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        Some(index as usize)
    } else {
        let adjusted = len as i64 + index;
        if adjusted < 0 {
            None
        } else {
            Some(adjusted as usize)
        }
    }
}

fn emit(env: &Env, subject: Subject, in_dq: bool, out: &mut Vec<Piece>) {
    match subject {
        Subject::Scalar(Some(text)) => out.push(Piece::frag(text, in_dq)),
        Subject::Scalar(None) => {
            if in_dq {
                out.push(Piece::frag("", true));
            }
        }
        Subject::List { values, star } => {
            if in_dq && star {
                let sep = env
                    .get_str("IFS")
                    .unwrap_or_else(|| " ".to_string())
                    .chars()
                    .next()
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                out.push(Piece::frag(values.join(&sep), true));
            } else {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(Piece::Break);
                    }
                    out.push(Piece::frag(value.clone(), in_dq));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------
// String operations
// ---------------------------------------------------------------------

fn trim_prefix(text: &str, matcher: &GlobPattern, greedy: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let lengths: Vec<usize> = if greedy {
        (0..=chars.len()).rev().collect()
    } else {
        (0..=chars.len()).collect()
    };
    for k in lengths {
        let prefix: String = chars[..k].iter().collect();
        if matcher.matches(&prefix) {
            return chars[k..].iter().collect();
        }
    }
    text.to_string()
}

fn trim_suffix(text: &str, matcher: &GlobPattern, greedy: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let lengths: Vec<usize> = if greedy {
        (0..=chars.len()).collect()
    } else {
        (0..=chars.len()).rev().collect()
    };
    for k in lengths {
        let suffix: String = chars[k..].iter().collect();
        if matcher.matches(&suffix) {
            return chars[..k].iter().collect();
        }
    }
    text.to_string()
}

fn glob_replace(
    text: &str,
    matcher: &GlobPattern,
    replacement: &str,
    all: bool,
    anchor: Option<ReplaceAnchor>,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    match anchor {
        Some(ReplaceAnchor::Start) => {
            for k in (0..=chars.len()).rev() {
                let prefix: String = chars[..k].iter().collect();
                if matcher.matches(&prefix) {
                    let rest: String = chars[k..].iter().collect();
                    return format!("{}{}", replacement, rest);
                }
            }
            text.to_string()
        }
        Some(ReplaceAnchor::End) => {
            for k in 0..=chars.len() {
                let suffix: String = chars[k..].iter().collect();
                if matcher.matches(&suffix) {
                    let head: String = chars[..k].iter().collect();
                    return format!("{}{}", head, replacement);
                }
            }
            text.to_string()
        }
        None => {
            let mut out = String::new();
            let mut i = 0;
            let mut replaced = false;
            while i < chars.len() {
                if !replaced || all {
                    // Longest match starting here wins.
                    let mut matched = None;
                    for k in (1..=chars.len() - i).rev() {
                        let segment: String = chars[i..i + k].iter().collect();
                        if matcher.matches(&segment) {
                            matched = Some(k);
                            break;
                        }
                    }
                    if let Some(k) = matched {
                        out.push_str(replacement);
                        i += k;
                        replaced = true;
                        continue;
                    }
                }
                out.push(chars[i]);
                i += 1;
            }
            out
        }
    }
}

fn case_convert(text: &str, upper: bool, all: bool, matcher: Option<&GlobPattern>) -> String {
    let convert = |c: char| -> String {
        let hit = matcher
            .map(|m| m.matches(&c.to_string()))
            .unwrap_or(true);
        if !hit {
            return c.to_string();
        }
        if upper {
            c.to_uppercase().to_string()
        } else {
            c.to_lowercase().to_string()
        }
    };
    if all {
        text.chars().map(convert).collect()
    } else {
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => format!("{}{}", convert(first), chars.as_str()),
            None => String::new(),
        }
    }
}

fn transform(text: &str, op: char) -> String {
    match op {
        'Q' => format!("'{}'", text.replace('\'', r"'\''")),
        'U' => text.to_uppercase(),
        'L' => text.to_lowercase(),
        'u' => {
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
                None => String::new(),
            }
        }
        'E' | 'P' | 'A' | 'K' | 'a' | 'k' => text.to_string(),
        _ => text.to_string(),
    }
}
