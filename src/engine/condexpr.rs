//! `[[ … ]]` Evaluation
//!
//! String, numeric, and file tests with pattern matching on `==`/`!=`
//! and regex matching on `=~` (which populates `BASH_REMATCH`). The
//! same logic backs the `test`/`[` builtin through the walker's word
//! expansion.

use regex_lite::Regex;

use crate::engine::env::Env;
use crate::engine::flow::Flow;
use crate::engine::walker::Walker;
use crate::expand::pattern::GlobPattern;
use crate::syntax::ast::{CondBinaryOp, CondExpr, Word, WordPart};

impl Walker {
    pub(crate) fn eval_cond(&self, env: &mut Env, expr: &CondExpr) -> Result<bool, Flow> {
        match expr {
            CondExpr::And(lhs, rhs) => {
                Ok(self.eval_cond(env, lhs)? && self.eval_cond(env, rhs)?)
            }
            CondExpr::Or(lhs, rhs) => {
                Ok(self.eval_cond(env, lhs)? || self.eval_cond(env, rhs)?)
            }
            CondExpr::Not(inner) => Ok(!self.eval_cond(env, inner)?),
            CondExpr::Group(inner) => self.eval_cond(env, inner),
            CondExpr::Value(word) => {
                let text = self.expand_word_str(env, word)?;
                Ok(!text.is_empty())
            }
            CondExpr::Unary { op, operand } => self.eval_unary_test(env, *op, operand),
            CondExpr::Binary { op, lhs, rhs } => self.eval_binary_test(env, *op, lhs, rhs),
        }
    }

    pub(crate) fn eval_unary_test(
        &self,
        env: &mut Env,
        op: char,
        operand: &Word,
    ) -> Result<bool, Flow> {
        let text = self.expand_word_str(env, operand)?;
        Ok(match op {
            'z' => text.is_empty(),
            'n' => !text.is_empty(),
            'v' => env.is_set(&text),
            'o' => self.option_is_set(env, &text),
            't' => false,
            _ => {
                let path = self.fs.resolve(&env.cwd, &text);
                match op {
                    'e' | 'a' => self.fs.exists(&path),
                    'f' => self.fs.is_file(&path),
                    'd' => self.fs.is_dir(&path),
                    'r' | 'w' => self.fs.exists(&path),
                    'x' => self
                        .fs
                        .metadata(&path)
                        .map(|m| m.is_dir() || m.mode & 0o111 != 0)
                        .unwrap_or(false),
                    's' => self.fs.metadata(&path).map(|m| m.size > 0).unwrap_or(false),
                    'L' | 'h' => self
                        .fs
                        .symlink_metadata(&path)
                        .map(|m| m.is_symlink())
                        .unwrap_or(false),
                    'N' => false,
                    'p' | 'S' | 'b' | 'c' | 'g' | 'k' | 'u' | 'G' | 'O' => false,
                    _ => false,
                }
            }
        })
    }

    fn option_is_set(&self, env: &Env, name: &str) -> bool {
        match name {
            "errexit" => env.flags.errexit,
            "nounset" => env.flags.nounset,
            "pipefail" => env.flags.pipefail,
            "xtrace" => env.flags.xtrace,
            "verbose" => env.flags.verbose,
            "noglob" => env.flags.noglob,
            "noclobber" => env.flags.noclobber,
            "noexec" => env.flags.noexec,
            "allexport" => env.flags.allexport,
            _ => false,
        }
    }

    fn eval_binary_test(
        &self,
        env: &mut Env,
        op: CondBinaryOp,
        lhs: &Word,
        rhs: &Word,
    ) -> Result<bool, Flow> {
        match op {
            CondBinaryOp::StrEq | CondBinaryOp::StrNe => {
                let subject = self.expand_word_str(env, lhs)?;
                let pattern = self.expand_word_pattern(env, rhs)?;
                let matched = GlobPattern::compile(&pattern, true, env.shopts.nocasematch)
                    .matches(&subject);
                Ok(if op == CondBinaryOp::StrEq {
                    matched
                } else {
                    !matched
                })
            }
            CondBinaryOp::Regex => {
                let subject = self.expand_word_str(env, lhs)?;
                let pattern = self.expand_word_regex(env, rhs)?;
                let regex = Regex::new(&pattern)
                    .map_err(|_| Flow::fail(2, format!("invalid regex: {}", pattern)))?;
                match regex.captures(&subject) {
                    Some(caps) => {
                        env.rematch = (0..caps.len())
                            .map(|i| {
                                caps.get(i)
                                    .map(|m| m.as_str().to_string())
                                    .unwrap_or_default()
                            })
                            .collect();
                        self.mirror_rematch(env);
                        Ok(true)
                    }
                    None => {
                        env.rematch.clear();
                        self.mirror_rematch(env);
                        Ok(false)
                    }
                }
            }
            CondBinaryOp::StrLt | CondBinaryOp::StrGt => {
                let a = self.expand_word_str(env, lhs)?;
                let b = self.expand_word_str(env, rhs)?;
                Ok(if op == CondBinaryOp::StrLt {
                    a < b
                } else {
                    a > b
                })
            }
            CondBinaryOp::NumEq
            | CondBinaryOp::NumNe
            | CondBinaryOp::NumLt
            | CondBinaryOp::NumLe
            | CondBinaryOp::NumGt
            | CondBinaryOp::NumGe => {
                let a_text = self.expand_word_str(env, lhs)?;
                let b_text = self.expand_word_str(env, rhs)?;
                let a = self.eval_arith_text(env, &a_text)?;
                let b = self.eval_arith_text(env, &b_text)?;
                Ok(match op {
                    CondBinaryOp::NumEq => a == b,
                    CondBinaryOp::NumNe => a != b,
                    CondBinaryOp::NumLt => a < b,
                    CondBinaryOp::NumLe => a <= b,
                    CondBinaryOp::NumGt => a > b,
                    _ => a >= b,
                })
            }
            CondBinaryOp::NewerThan | CondBinaryOp::OlderThan => {
                let a_text = self.expand_word_str(env, lhs)?;
                let b_text = self.expand_word_str(env, rhs)?;
                let a = self.fs.resolve(&env.cwd, &a_text);
                let b = self.fs.resolve(&env.cwd, &b_text);
                let ma = self.fs.metadata(&a).ok().map(|m| m.mtime);
                let mb = self.fs.metadata(&b).ok().map(|m| m.mtime);
                Ok(match (ma, mb, op) {
                    (Some(a), Some(b), CondBinaryOp::NewerThan) => a > b,
                    (Some(a), Some(b), CondBinaryOp::OlderThan) => a < b,
                    (Some(_), None, CondBinaryOp::NewerThan) => true,
                    (None, Some(_), CondBinaryOp::OlderThan) => true,
                    _ => false,
                })
            }
            CondBinaryOp::SameFile => {
                let a_text = self.expand_word_str(env, lhs)?;
                let b_text = self.expand_word_str(env, rhs)?;
                let a = self.fs.resolve(&env.cwd, &a_text);
                let b = self.fs.resolve(&env.cwd, &b_text);
                Ok(match (self.fs.canonicalize(&a), self.fs.canonicalize(&b)) {
                    (Ok(ca), Ok(cb)) => ca == cb,
                    _ => false,
                })
            }
        }
    }

    /// `BASH_REMATCH` is mirrored into scalar variables so subscript
    /// reads and plugin environments both see it.
    fn mirror_rematch(&self, env: &mut Env) {
        for name in env.names_with_prefix("BASH_REMATCH_") {
            env.unset(&name);
        }
        let rematch = env.rematch.clone();
        for (i, group) in rematch.iter().enumerate() {
            env.set_str(format!("BASH_REMATCH_{}", i).as_str(), group.clone());
        }
        env.set_str("BASH_REMATCH__length", rematch.len().to_string());
    }

    /// Regex operand: quoted fragments match literally, unquoted text is
    /// raw regex.
    fn expand_word_regex(&self, env: &mut Env, word: &Word) -> Result<String, Flow> {
        let mut pieces = Vec::new();
        self.expand_regex_parts(env, &word.parts, false, &mut pieces)?;
        Ok(pieces.concat())
    }

    fn expand_regex_parts(
        &self,
        env: &mut Env,
        parts: &[WordPart],
        quoted: bool,
        out: &mut Vec<String>,
    ) -> Result<(), Flow> {
        use crate::expand::Piece;
        for part in parts {
            match part {
                WordPart::DoubleQuoted(inner) => {
                    self.expand_regex_parts(env, inner, true, out)?;
                }
                WordPart::SingleQuoted(text) => out.push(regex_escape(text)),
                WordPart::Escaped(c) => out.push(regex_escape(&c.to_string())),
                other => {
                    let mut pieces = Vec::new();
                    self.expand_parts(env, std::slice::from_ref(other), false, &mut pieces)?;
                    for piece in pieces {
                        if let Piece::Frag { text, .. } = piece {
                            if quoted {
                                out.push(regex_escape(&text));
                            } else {
                                out.push(text);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
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
