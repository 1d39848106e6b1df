//! Word Grammar
//!
//! A word is a run of parts: literals, quoted regions, expansions, brace
//! candidates, tildes. The same scanner serves several surrounding
//! contexts, which differ only in what ends the word.

use super::{is_metachar, is_name_char, is_name_start, Parser};
use crate::syntax::ast::*;
use crate::syntax::ParseError;

/// What terminates the current word scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WordCtx {
    /// Stop at shell metacharacters.
    Normal,
    /// Brace-expansion item: stop at top-level `,` or `}`; a metacharacter
    /// aborts the brace attempt.
    BraceItem,
    /// `${…}` operation argument: stop at `}`.
    ParamArg,
    /// `${x/pat/repl}` pattern: stop at `/` or `}`.
    ParamPattern,
    /// Consume the entire remaining input.
    ToEnd,
}

impl Parser {
    /// Parse one word in command position.
    pub(crate) fn parse_word(&mut self) -> Result<Word, ParseError> {
        let parts = self.parse_word_parts(WordCtx::Normal)?;
        if parts.is_empty() {
            return Err(self.err("expected word"));
        }
        Ok(Word { parts })
    }

    /// Parse the whole remaining input as a single word.
    pub(crate) fn parse_word_to_end(&mut self) -> Result<Word, ParseError> {
        let parts = self.parse_word_parts(WordCtx::ToEnd)?;
        Ok(Word { parts })
    }

    pub(crate) fn parse_word_parts(
        &mut self,
        ctx: WordCtx,
    ) -> Result<Vec<WordPart>, ParseError> {
        let mut parts: Vec<WordPart> = Vec::new();
        let mut lit = String::new();

        macro_rules! flush {
            () => {
                if !lit.is_empty() {
                    parts.push(WordPart::Lit(std::mem::take(&mut lit)));
                }
            };
        }

        loop {
            let Some(c) = self.peek() else { break };
            match ctx {
                WordCtx::Normal if is_metachar(c) => {
                    // Process substitutions look like redirects but are
                    // whole words.
                    if (c == '<' || c == '>') && self.peek_at(1) == Some('(') {
                        flush!();
                        parts.push(self.parse_proc_sub()?);
                        continue;
                    }
                    break;
                }
                WordCtx::BraceItem if c == ',' || c == '}' => break,
                WordCtx::BraceItem if is_metachar(c) => break,
                WordCtx::ParamArg if c == '}' => break,
                WordCtx::ParamPattern if c == '}' || c == '/' => break,
                _ => {}
            }

            match c {
                '\'' => {
                    flush!();
                    self.pos_advance(1);
                    parts.push(WordPart::SingleQuoted(self.scan_single_quoted()?));
                }
                '"' => {
                    flush!();
                    self.pos_advance(1);
                    parts.push(WordPart::DoubleQuoted(self.parse_dquote_inner()?));
                }
                '\\' => {
                    self.pos_advance(1);
                    match self.bump() {
                        Some('\n') => {} // line continuation
                        Some(esc) => {
                            flush!();
                            parts.push(WordPart::Escaped(esc));
                        }
                        None => lit.push('\\'),
                    }
                }
                '$' if self.looking_at("$'") => {
                    flush!();
                    self.pos_advance(2);
                    parts.push(WordPart::SingleQuoted(self.scan_ansi_c()?));
                }
                '$' if self.looking_at("$\"") => {
                    flush!();
                    self.pos_advance(2);
                    parts.push(WordPart::DoubleQuoted(self.parse_dquote_inner()?));
                }
                '$' => {
                    flush!();
                    parts.push(self.parse_dollar()?);
                }
                '`' => {
                    flush!();
                    parts.push(self.parse_backquote()?);
                }
                '~' if parts.is_empty() && lit.is_empty() && ctx == WordCtx::Normal => {
                    self.pos_advance(1);
                    let mut user = String::new();
                    while let Some(u) = self.peek() {
                        if u.is_alphanumeric() || u == '_' || u == '-' || u == '.' {
                            user.push(u);
                            self.pos_advance(1);
                        } else {
                            break;
                        }
                    }
                    parts.push(WordPart::Tilde(if user.is_empty() {
                        None
                    } else {
                        Some(user)
                    }));
                }
                '{' if ctx != WordCtx::ToEnd => match self.try_parse_brace()? {
                    Some(part) => {
                        flush!();
                        parts.push(part);
                    }
                    None => {
                        lit.push('{');
                        self.pos_advance(1);
                    }
                },
                '?' | '*' | '+' | '@' | '!' if self.peek_at(1) == Some('(') => {
                    // Extended glob: keep the whole group literal; the
                    // pattern matcher interprets it.
                    lit.push(c);
                    self.pos_advance(2);
                    lit.push('(');
                    let mut depth = 0usize;
                    loop {
                        match self.bump() {
                            None => return Err(self.err("unterminated pattern group")),
                            Some('(') => {
                                depth += 1;
                                lit.push('(');
                            }
                            Some(')') => {
                                if depth == 0 {
                                    lit.push(')');
                                    break;
                                }
                                depth -= 1;
                                lit.push(')');
                            }
                            Some(inner) => lit.push(inner),
                        }
                    }
                }
                _ => {
                    lit.push(c);
                    self.pos_advance(1);
                }
            }
        }
        if !lit.is_empty() {
            parts.push(WordPart::Lit(lit));
        }
        Ok(parts)
    }

    // -----------------------------------------------------------------
    // Quoted regions
    // -----------------------------------------------------------------

    fn scan_single_quoted(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated single quote")),
                Some('\'') => return Ok(text),
                Some(c) => text.push(c),
            }
        }
    }

    pub(crate) fn parse_dquote_inner(&mut self) -> Result<Vec<WordPart>, ParseError> {
        let mut parts = Vec::new();
        let mut lit = String::new();
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated double quote")),
                Some('"') => {
                    self.pos_advance(1);
                    break;
                }
                Some('\\') => {
                    self.pos_advance(1);
                    match self.bump() {
                        Some('\n') => {}
                        Some(e @ ('$' | '`' | '"' | '\\')) => lit.push(e),
                        Some(other) => {
                            lit.push('\\');
                            lit.push(other);
                        }
                        None => lit.push('\\'),
                    }
                }
                Some('$') => {
                    if !lit.is_empty() {
                        parts.push(WordPart::Lit(std::mem::take(&mut lit)));
                    }
                    parts.push(self.parse_dollar()?);
                }
                Some('`') => {
                    if !lit.is_empty() {
                        parts.push(WordPart::Lit(std::mem::take(&mut lit)));
                    }
                    parts.push(self.parse_backquote()?);
                }
                Some(c) => {
                    lit.push(c);
                    self.pos_advance(1);
                }
            }
        }
        if !lit.is_empty() {
            parts.push(WordPart::Lit(lit));
        }
        Ok(parts)
    }

    /// Here-document body text: like double-quote content, but nothing
    /// terminates it and quote characters stay literal.
    pub(crate) fn parse_expansion_text(&mut self) -> Result<Vec<WordPart>, ParseError> {
        let mut parts = Vec::new();
        let mut lit = String::new();
        loop {
            match self.peek() {
                None => break,
                Some('\\') => {
                    self.pos_advance(1);
                    match self.bump() {
                        Some(e @ ('$' | '`' | '\\')) => lit.push(e),
                        Some(other) => {
                            lit.push('\\');
                            lit.push(other);
                        }
                        None => lit.push('\\'),
                    }
                }
                Some('$') => {
                    if !lit.is_empty() {
                        parts.push(WordPart::Lit(std::mem::take(&mut lit)));
                    }
                    parts.push(self.parse_dollar()?);
                }
                Some('`') => {
                    if !lit.is_empty() {
                        parts.push(WordPart::Lit(std::mem::take(&mut lit)));
                    }
                    parts.push(self.parse_backquote()?);
                }
                Some(c) => {
                    lit.push(c);
                    self.pos_advance(1);
                }
            }
        }
        if !lit.is_empty() {
            parts.push(WordPart::Lit(lit));
        }
        Ok(parts)
    }

    fn scan_ansi_c(&mut self) -> Result<String, ParseError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated $'…' string")),
                Some('\'') => return Ok(out),
                Some('\\') => {
                    let Some(esc) = self.bump() else {
                        return Err(self.err("unterminated $'…' string"));
                    };
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'a' => out.push('\x07'),
                        'b' => out.push('\x08'),
                        'e' | 'E' => out.push('\x1b'),
                        'f' => out.push('\x0c'),
                        'v' => out.push('\x0b'),
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        '0'..='7' => {
                            let mut value = esc.to_digit(8).unwrap_or(0);
                            for _ in 0..2 {
                                match self.peek().and_then(|d| d.to_digit(8)) {
                                    Some(d) => {
                                        value = value * 8 + d;
                                        self.pos_advance(1);
                                    }
                                    None => break,
                                }
                            }
                            out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                        }
                        'x' => {
                            let mut value = 0u32;
                            let mut any = false;
                            for _ in 0..2 {
                                match self.peek().and_then(|d| d.to_digit(16)) {
                                    Some(d) => {
                                        value = value * 16 + d;
                                        any = true;
                                        self.pos_advance(1);
                                    }
                                    None => break,
                                }
                            }
                            if any {
                                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                            } else {
                                out.push_str("\\x");
                            }
                        }
                        'u' => {
                            let mut value = 0u32;
                            let mut any = false;
                            for _ in 0..4 {
                                match self.peek().and_then(|d| d.to_digit(16)) {
                                    Some(d) => {
                                        value = value * 16 + d;
                                        any = true;
                                        self.pos_advance(1);
                                    }
                                    None => break,
                                }
                            }
                            if any {
                                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                            } else {
                                out.push_str("\\u");
                            }
                        }
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    // -----------------------------------------------------------------
    // Dollar expansions
    // -----------------------------------------------------------------

    pub(crate) fn parse_dollar(&mut self) -> Result<WordPart, ParseError> {
        if self.looking_at("$((") {
            // `$((…))` is arithmetic when the parens balance as one; a
            // failed match falls back to `$( (subshell) )`.
            let saved = self.save();
            self.pos_advance(1);
            match self.extract_arith_text() {
                Ok(text) => {
                    let expr = Parser::new(&text)
                        .parse_arith_to_end()
                        .map_err(|e| self.err(e.message))?;
                    return Ok(WordPart::ArithSub(expr));
                }
                Err(_) => self.restore(saved),
            }
        }
        if self.looking_at("$(") {
            self.pos_advance(2);
            let script = Script {
                items: self.parse_list_until(&[")"])?,
            };
            self.skip_blank_lines();
            if !self.eat(')') {
                return Err(self.err("expected `)` to close command substitution"));
            }
            return Ok(WordPart::CmdSub {
                script,
                backquoted: false,
            });
        }
        if self.looking_at("${") {
            return self.parse_param_braced();
        }

        self.pos_advance(1); // $
        match self.peek() {
            Some(c) if is_name_start(c) => {
                let mut name = String::new();
                while let Some(n) = self.peek() {
                    if is_name_char(n) {
                        name.push(n);
                        self.pos_advance(1);
                    } else {
                        break;
                    }
                }
                Ok(WordPart::Param(ParamExp {
                    name,
                    index: None,
                    op: None,
                }))
            }
            Some(c) if c.is_ascii_digit() => {
                self.pos_advance(1);
                Ok(WordPart::Param(ParamExp {
                    name: c.to_string(),
                    index: None,
                    op: None,
                }))
            }
            Some(c @ ('@' | '*' | '#' | '?' | '$' | '!' | '-' | '_')) => {
                self.pos_advance(1);
                Ok(WordPart::Param(ParamExp {
                    name: c.to_string(),
                    index: None,
                    op: None,
                }))
            }
            _ => Ok(WordPart::Lit("$".to_string())),
        }
    }

    fn parse_backquote(&mut self) -> Result<WordPart, ParseError> {
        self.pos_advance(1); // `
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated backquote")),
                Some('`') => break,
                Some('\\') => match self.bump() {
                    Some(e @ ('`' | '$' | '\\')) => text.push(e),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => return Err(self.err("unterminated backquote")),
                },
                Some(c) => text.push(c),
            }
        }
        let script = Parser::new(&text)
            .parse_script_to_end()
            .map_err(|e| self.err(format!("in backquoted command: {}", e.message)))?;
        Ok(WordPart::CmdSub {
            script,
            backquoted: true,
        })
    }

    fn parse_proc_sub(&mut self) -> Result<WordPart, ParseError> {
        let write = self.peek() == Some('>');
        self.pos_advance(2); // <( or >(
        let script = Script {
            items: self.parse_list_until(&[")"])?,
        };
        self.skip_blank_lines();
        if !self.eat(')') {
            return Err(self.err("expected `)` to close process substitution"));
        }
        Ok(WordPart::ProcSub { script, write })
    }

    // -----------------------------------------------------------------
    // Brace expansion candidates
    // -----------------------------------------------------------------

    fn try_parse_brace(&mut self) -> Result<Option<WordPart>, ParseError> {
        let saved = self.save();
        self.pos_advance(1); // {

        // Range form first: {1..9}, {01..10..2}, {a..f}.
        if let Some(elem) = self.try_scan_brace_range() {
            return Ok(Some(WordPart::Brace(vec![elem])));
        }

        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            let parts = self.parse_word_parts(WordCtx::BraceItem)?;
            match self.peek() {
                Some(',') => {
                    self.pos_advance(1);
                    items.push(BraceElem::Item(Word { parts }));
                    saw_comma = true;
                }
                Some('}') => {
                    self.pos_advance(1);
                    items.push(BraceElem::Item(Word { parts }));
                    break;
                }
                _ => {
                    self.restore(saved);
                    return Ok(None);
                }
            }
        }
        if !saw_comma {
            self.restore(saved);
            return Ok(None);
        }
        Ok(Some(WordPart::Brace(items)))
    }

    /// Textual scan for `X..Y` / `X..Y..Z` directly before `}`.
    fn try_scan_brace_range(&mut self) -> Option<BraceElem> {
        let saved = self.save();
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '}' {
                break;
            }
            if c == ',' || c == '{' || is_metachar(c) || c == '\'' || c == '"' || c == '$' {
                self.restore(saved);
                return None;
            }
            text.push(c);
            self.pos_advance(1);
        }
        if self.peek() != Some('}') {
            self.restore(saved);
            return None;
        }

        let sections: Vec<&str> = text.split("..").collect();
        if sections.len() != 2 && sections.len() != 3 {
            self.restore(saved);
            return None;
        }
        let step = if sections.len() == 3 {
            match sections[2].parse::<i64>() {
                Ok(s) => s,
                Err(_) => {
                    self.restore(saved);
                    return None;
                }
            }
        } else {
            1
        };

        let (a, b) = (sections[0], sections[1]);
        if let (Ok(start), Ok(end)) = (a.parse::<i64>(), b.parse::<i64>()) {
            let width = if (a.starts_with('0') && a.len() > 1)
                || (a.starts_with("-0") && a.len() > 2)
                || (b.starts_with('0') && b.len() > 1)
                || (b.starts_with("-0") && b.len() > 2)
            {
                a.trim_start_matches('-')
                    .len()
                    .max(b.trim_start_matches('-').len())
            } else {
                0
            };
            self.pos_advance(1); // }
            return Some(BraceElem::NumRange {
                start,
                end,
                step,
                width,
            });
        }

        let mut a_chars = a.chars();
        let mut b_chars = b.chars();
        if let (Some(ac), None, Some(bc), None) =
            (a_chars.next(), a_chars.next(), b_chars.next(), b_chars.next())
        {
            if ac.is_ascii_alphabetic() && bc.is_ascii_alphabetic() {
                self.pos_advance(1); // }
                return Some(BraceElem::CharRange {
                    start: ac,
                    end: bc,
                    step,
                });
            }
        }
        self.restore(saved);
        None
    }
}
