//! `[[ … ]]` Grammar
//!
//! Conditional expressions with `&&`/`||`/`!`, parenthesised groups,
//! unary file/string tests, and binary comparisons including `=~`.
//! Words are scanned raw (quotes included) and re-parsed with the word
//! grammar, which lets a regex right-hand side keep unquoted parens.

use super::Parser;
use crate::syntax::ast::*;
use crate::syntax::ParseError;

const UNARY_OPS: &str = "abcdefghkprstuwxGLNOSznovR";

impl Parser {
    pub(crate) fn parse_cond_expr(&mut self) -> Result<CondExpr, ParseError> {
        self.parse_cond_or()
    }

    fn parse_cond_or(&mut self) -> Result<CondExpr, ParseError> {
        let mut lhs = self.parse_cond_and()?;
        loop {
            self.skip_blank_lines();
            if self.looking_at("||") {
                self.pos_advance(2);
                let rhs = self.parse_cond_and()?;
                lhs = CondExpr::Or(Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_cond_and(&mut self) -> Result<CondExpr, ParseError> {
        let mut lhs = self.parse_cond_unit()?;
        loop {
            self.skip_blank_lines();
            if self.looking_at("&&") {
                self.pos_advance(2);
                let rhs = self.parse_cond_unit()?;
                lhs = CondExpr::And(Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_cond_unit(&mut self) -> Result<CondExpr, ParseError> {
        self.skip_blank_lines();
        if self.peek() == Some('!')
            && self
                .peek_at(1)
                .map(|c| c == ' ' || c == '\t' || c == '\n')
                .unwrap_or(false)
        {
            self.pos_advance(1);
            let operand = self.parse_cond_unit()?;
            return Ok(CondExpr::Not(Box::new(operand)));
        }
        if self.peek() == Some('(') {
            self.pos_advance(1);
            let inner = self.parse_cond_or()?;
            self.skip_blank_lines();
            if !self.eat(')') {
                return Err(self.err("expected `)` in conditional expression"));
            }
            return Ok(CondExpr::Group(Box::new(inner)));
        }

        // Unary test: -X word
        if self.peek() == Some('-') {
            if let Some(op) = self.peek_at(1) {
                let boundary = self
                    .peek_at(2)
                    .map(|c| c == ' ' || c == '\t' || c == '\n')
                    .unwrap_or(false);
                if boundary && UNARY_OPS.contains(op) {
                    self.pos_advance(2);
                    self.skip_blank_lines();
                    let operand = self.parse_cond_word(false)?;
                    return Ok(CondExpr::Unary { op, operand });
                }
            }
        }

        let lhs = self.parse_cond_word(false)?;
        self.skip_hspace();

        let op = if self.looking_at("==") {
            self.pos_advance(2);
            Some(CondBinaryOp::StrEq)
        } else if self.looking_at("=~") {
            self.pos_advance(2);
            Some(CondBinaryOp::Regex)
        } else if self.looking_at("!=") {
            self.pos_advance(2);
            Some(CondBinaryOp::StrNe)
        } else if self.peek() == Some('=') {
            self.pos_advance(1);
            Some(CondBinaryOp::StrEq)
        } else if self.peek() == Some('<') {
            self.pos_advance(1);
            Some(CondBinaryOp::StrLt)
        } else if self.peek() == Some('>') {
            self.pos_advance(1);
            Some(CondBinaryOp::StrGt)
        } else {
            let named = [
                ("-eq", CondBinaryOp::NumEq),
                ("-ne", CondBinaryOp::NumNe),
                ("-lt", CondBinaryOp::NumLt),
                ("-le", CondBinaryOp::NumLe),
                ("-gt", CondBinaryOp::NumGt),
                ("-ge", CondBinaryOp::NumGe),
                ("-nt", CondBinaryOp::NewerThan),
                ("-ot", CondBinaryOp::OlderThan),
                ("-ef", CondBinaryOp::SameFile),
            ];
            named.iter().find_map(|(tok, op)| {
                if self.looking_at(tok)
                    && self
                        .peek_at(3)
                        .map(|c| c == ' ' || c == '\t' || c == '\n')
                        .unwrap_or(false)
                {
                    Some(*op)
                } else {
                    None
                }
            })
        };
        let op = match op {
            Some(op) => {
                if matches!(
                    op,
                    CondBinaryOp::NumEq
                        | CondBinaryOp::NumNe
                        | CondBinaryOp::NumLt
                        | CondBinaryOp::NumLe
                        | CondBinaryOp::NumGt
                        | CondBinaryOp::NumGe
                        | CondBinaryOp::NewerThan
                        | CondBinaryOp::OlderThan
                        | CondBinaryOp::SameFile
                ) {
                    self.pos_advance(3);
                }
                op
            }
            None => return Ok(CondExpr::Value(lhs)),
        };

        self.skip_blank_lines();
        let rhs = self.parse_cond_word(op == CondBinaryOp::Regex)?;
        Ok(CondExpr::Binary { op, lhs, rhs })
    }

    /// Scan one conditional word as raw text, then re-parse it with the
    /// word grammar. In regex position parens nest instead of ending the
    /// word.
    fn parse_cond_word(&mut self, regex: bool) -> Result<Word, ParseError> {
        let mut raw = String::new();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => break,
                Some(' ') | Some('\t') | Some('\n') if depth == 0 => break,
                Some(']') if self.looking_at("]]") && depth == 0 => break,
                Some('(') if regex => {
                    depth += 1;
                    raw.push('(');
                    self.pos_advance(1);
                }
                Some(')') if regex => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    raw.push(')');
                    self.pos_advance(1);
                }
                Some('(') | Some(')') => break,
                Some('&') | Some('|') if depth == 0 && !regex => break,
                Some('\\') => {
                    raw.push('\\');
                    self.pos_advance(1);
                    if let Some(c) = self.bump() {
                        raw.push(c);
                    }
                }
                Some(q @ ('\'' | '"')) => {
                    raw.push(q);
                    self.pos_advance(1);
                    while let Some(c) = self.bump() {
                        raw.push(c);
                        if c == q {
                            break;
                        }
                        if c == '\\' && q == '"' {
                            if let Some(next) = self.bump() {
                                raw.push(next);
                            }
                        }
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.pos_advance(1);
                }
            }
        }
        if raw.is_empty() {
            return Err(self.err("expected word in conditional expression"));
        }
        Parser::new(&raw)
            .parse_word_to_end()
            .map_err(|e| self.err(e.message))
    }
}
