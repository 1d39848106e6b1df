//! Word Expansion
//!
//! The six-phase pipeline that turns one parsed word into argv fields:
//! brace expansion, tilde, parameter expansion, command substitution,
//! arithmetic, field splitting, pathname expansion, and quote removal.
//! Quoting survives as metadata on every produced fragment until the
//! final assembly, so a quoted `*` never reaches the glob matcher and a
//! quoted `$x` never splits.

pub mod brace;
pub mod glob;
pub mod pattern;
pub mod split;

mod arith;
mod param;

use crate::engine::env::Env;
use crate::engine::flow::Flow;
use crate::engine::walker::Walker;
use crate::syntax::ast::{Script, Word, WordPart};

use pattern::{escape_glob, has_glob_meta};
use split::{split_fields, DEFAULT_IFS};

/// An intermediate expansion product: a run of text that is atomic with
/// respect to splitting when `quoted`, or a hard field boundary from an
/// array/`$@` expansion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Frag { text: String, quoted: bool },
    Break,
}

impl Piece {
    pub(crate) fn frag(text: impl Into<String>, quoted: bool) -> Self {
        Piece::Frag {
            text: text.into(),
            quoted,
        }
    }
}

impl Walker {
    // -----------------------------------------------------------------
    // Public entry points
    // -----------------------------------------------------------------

    /// Full expansion of a word list into argv fields.
    pub fn expand_words(&self, env: &mut Env, words: &[Word]) -> Result<Vec<String>, Flow> {
        let mut fields = Vec::new();
        for word in words {
            fields.extend(self.expand_word_fields(env, word)?);
        }
        Ok(fields)
    }

    /// Full expansion of a single word (brace → … → glob).
    pub fn expand_word_fields(&self, env: &mut Env, word: &Word) -> Result<Vec<String>, Flow> {
        let ifs = env
            .get_str("IFS")
            .unwrap_or_else(|| DEFAULT_IFS.to_string());
        let mut fields = Vec::new();
        for branch in brace::brace_expand(word) {
            let mut pieces = Vec::new();
            self.expand_parts(env, &branch.parts, false, &mut pieces)?;
            let pieces = split_unquoted(pieces, &ifs);
            for field in assemble_fields(pieces) {
                self.glob_field(env, field, &mut fields)?;
            }
        }
        Ok(fields)
    }

    /// Expansion without splitting or globbing: assignments, redirect
    /// targets, here-documents, `case` subjects, `[[ ]]` operands.
    pub fn expand_word_str(&self, env: &mut Env, word: &Word) -> Result<String, Flow> {
        let mut pieces = Vec::new();
        self.expand_parts(env, &word.parts, false, &mut pieces)?;
        let mut out = String::new();
        let mut first = true;
        for piece in pieces {
            match piece {
                Piece::Frag { text, .. } => {
                    out.push_str(&text);
                    first = false;
                }
                Piece::Break => {
                    if !first {
                        out.push(' ');
                    }
                }
            }
        }
        Ok(out)
    }

    /// Expansion preserving quoting as matcher escapes: `case` patterns,
    /// pattern operands of `[[ ]]` and `${x#…}`.
    pub fn expand_word_pattern(&self, env: &mut Env, word: &Word) -> Result<String, Flow> {
        let mut pieces = Vec::new();
        self.expand_parts(env, &word.parts, false, &mut pieces)?;
        let mut out = String::new();
        for piece in pieces {
            match piece {
                Piece::Frag { text, quoted } => {
                    if quoted {
                        out.push_str(&escape_glob(&text));
                    } else {
                        out.push_str(&text);
                    }
                }
                Piece::Break => out.push(' '),
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------
    // Part expansion
    // -----------------------------------------------------------------

    pub(crate) fn expand_parts(
        &self,
        env: &mut Env,
        parts: &[WordPart],
        in_dq: bool,
        out: &mut Vec<Piece>,
    ) -> Result<(), Flow> {
        for part in parts {
            match part {
                WordPart::Lit(text) => out.push(Piece::frag(text.clone(), in_dq)),
                WordPart::SingleQuoted(text) => out.push(Piece::frag(text.clone(), true)),
                WordPart::Escaped(c) => out.push(Piece::frag(c.to_string(), true)),
                WordPart::DoubleQuoted(inner) => {
                    if inner.is_empty() {
                        // `""` still contributes an (empty) field.
                        out.push(Piece::frag("", true));
                    } else {
                        self.expand_parts(env, inner, true, out)?;
                    }
                }
                WordPart::Tilde(user) => {
                    let text = match user {
                        None => env.get_str("HOME").unwrap_or_else(|| "~".to_string()),
                        Some(name) => env
                            .get_str(&format!("HOME_{}", name))
                            .unwrap_or_else(|| format!("~{}", name)),
                    };
                    out.push(Piece::frag(text, true));
                }
                WordPart::Param(p) => self.expand_param(env, p, in_dq, out)?,
                WordPart::CmdSub { script, .. } => {
                    let text = self.run_substitution(env, script)?;
                    out.push(Piece::frag(text, in_dq));
                }
                WordPart::ArithSub(expr) => {
                    let value = self.eval_arith(env, expr)?;
                    out.push(Piece::frag(value.to_string(), in_dq));
                }
                WordPart::ProcSub { script, write } => {
                    env.psub_seq += 1;
                    let path = format!("/tmp/.psub-{}", env.psub_seq);
                    if *write {
                        if let Err(e) = self.fs.write(&path, b"") {
                            return Err(Flow::fail(1, e.to_string()));
                        }
                        env.pending_out_procs.push((path.clone(), script.clone()));
                    } else {
                        let text = self.run_substitution_untrimmed(env, script)?;
                        if let Err(e) = self.fs.write(&path, text.as_bytes()) {
                            return Err(Flow::fail(1, e.to_string()));
                        }
                    }
                    out.push(Piece::frag(path, true));
                }
                WordPart::Brace(items) => {
                    // Reached only in non-splitting contexts, where brace
                    // groups stay literal.
                    let mut text = String::from("{");
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            text.push(',');
                        }
                        if let crate::syntax::ast::BraceElem::Item(word) = item {
                            text.push_str(&self.expand_word_str(env, word)?);
                        }
                    }
                    text.push('}');
                    out.push(Piece::frag(text, in_dq));
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Command substitution
    // -----------------------------------------------------------------

    /// Run a substitution body in a copied environment, capture stdout,
    /// and trim trailing newlines.
    pub(crate) fn run_substitution(&self, env: &mut Env, script: &Script) -> Result<String, Flow> {
        let text = self.run_substitution_untrimmed(env, script)?;
        Ok(text.trim_end_matches('\n').to_string())
    }

    fn run_substitution_untrimmed(&self, env: &mut Env, script: &Script) -> Result<String, Flow> {
        let mut child = env.clone();
        let result = match self.run_script(&mut child, script, "") {
            Ok(out) => out,
            Err(flow) => match flow.kind {
                crate::engine::flow::FlowKind::Limit(_) => return Err(flow),
                _ => flow.into_output(),
            },
        };
        env.last_status = result.status;
        env.last_sub_status = Some(result.status);
        env.expansion_stderr.push_str(&result.stderr);
        Ok(result.stdout)
    }

    // -----------------------------------------------------------------
    // Globbing
    // -----------------------------------------------------------------

    fn glob_field(
        &self,
        env: &mut Env,
        field: Field,
        out: &mut Vec<String>,
    ) -> Result<(), Flow> {
        if env.flags.noglob || !has_glob_meta(&field.pattern) {
            out.push(field.raw);
            return Ok(());
        }
        let matches = glob::expand_pathname(&self.fs, &env.cwd, &field.pattern, &env.shopts);
        if !matches.is_empty() {
            out.extend(matches);
        } else if env.shopts.failglob {
            return Err(Flow::fail(1, format!("no match: {}", field.raw)));
        } else if !env.shopts.nullglob {
            out.push(field.raw);
        }
        Ok(())
    }
}

/// One assembled field: the quote-removed text plus the matcher-facing
/// pattern with quoted regions escaped.
struct Field {
    raw: String,
    pattern: String,
}

/// Split every unquoted fragment on IFS, inserting breaks; quoted
/// fragments pass through untouched.
fn split_unquoted(pieces: Vec<Piece>, ifs: &str) -> Vec<Piece> {
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            Piece::Break => out.push(Piece::Break),
            Piece::Frag { text, quoted: true } => out.push(Piece::frag(text, true)),
            Piece::Frag {
                text,
                quoted: false,
            } => {
                if text.is_empty() {
                    continue;
                }
                if ifs.is_empty() {
                    out.push(Piece::frag(text, false));
                    continue;
                }
                let leading = text.chars().next().map(|c| ifs.contains(c)).unwrap_or(false);
                let trailing = text.chars().last().map(|c| ifs.contains(c)).unwrap_or(false);
                let fields = split_fields(&text, ifs);
                if fields.is_empty() {
                    // Pure separators: a boundary and nothing else.
                    out.push(Piece::Break);
                    continue;
                }
                if leading {
                    out.push(Piece::Break);
                }
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(Piece::Break);
                    }
                    out.push(Piece::frag(f.clone(), false));
                }
                if trailing {
                    out.push(Piece::Break);
                }
            }
        }
    }
    out
}

/// Fuse fragment runs between breaks into fields.
fn assemble_fields(pieces: Vec<Piece>) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut raw = String::new();
    let mut pattern = String::new();
    let mut live = false;
    for piece in pieces {
        match piece {
            Piece::Frag { text, quoted } => {
                raw.push_str(&text);
                if quoted {
                    pattern.push_str(&escape_glob(&text));
                } else {
                    pattern.push_str(&text);
                }
                live = true;
            }
            Piece::Break => {
                if live {
                    fields.push(Field {
                        raw: std::mem::take(&mut raw),
                        pattern: std::mem::take(&mut pattern),
                    });
                    live = false;
                }
            }
        }
    }
    if live {
        fields.push(Field { raw, pattern });
    }
    fields
}
