//! `${…}` Grammar
//!
//! Braced parameter expansion with the full operation set: defaults,
//! assignment, alternatives, error-if-unset, trims, replacement,
//! substrings, length, indirection, name listing, key listing, case
//! conversion, and `@`-transforms.

use super::word::WordCtx;
use super::{is_name_char, is_name_start, Parser};
use crate::syntax::ast::*;
use crate::syntax::ParseError;

impl Parser {
    /// Cursor sits on `${`.
    pub(crate) fn parse_param_braced(&mut self) -> Result<WordPart, ParseError> {
        self.pos_advance(2); // ${

        // ${#…}: length, unless the whole thing is ${#} or ${#…} where #
        // is itself the parameter.
        if self.peek() == Some('#') {
            if self.peek_at(1) == Some('}') {
                self.pos_advance(2);
                return Ok(WordPart::Param(ParamExp {
                    name: "#".to_string(),
                    index: None,
                    op: None,
                }));
            }
            self.pos_advance(1);
            let (name, index) = self.parse_param_name_and_index()?;
            self.expect_close_brace()?;
            return Ok(WordPart::Param(ParamExp {
                name,
                index,
                op: Some(ParamOp::Length),
            }));
        }

        // ${!…}: indirection, array keys, or prefix listing.
        if self.peek() == Some('!') && self.peek_at(1) != Some('}') {
            self.pos_advance(1);
            let (name, index) = self.parse_param_name_and_index()?;
            if let Some(ParamIndex::All | ParamIndex::Star) = index {
                let star = matches!(index, Some(ParamIndex::Star));
                self.expect_close_brace()?;
                return Ok(WordPart::Param(ParamExp {
                    name,
                    index: None,
                    op: Some(ParamOp::ArrayKeys { star }),
                }));
            }
            if matches!(self.peek(), Some('@') | Some('*')) && self.peek_at(1) == Some('}') {
                let star = self.peek() == Some('*');
                self.pos_advance(2);
                return Ok(WordPart::Param(ParamExp {
                    name,
                    index: None,
                    op: Some(ParamOp::NamesWithPrefix { star }),
                }));
            }
            self.expect_close_brace()?;
            return Ok(WordPart::Param(ParamExp {
                name,
                index,
                op: Some(ParamOp::Indirect),
            }));
        }

        let (name, index) = self.parse_param_name_and_index()?;
        let op = self.parse_param_op()?;
        self.expect_close_brace()?;
        Ok(WordPart::Param(ParamExp { name, index, op }))
    }

    fn expect_close_brace(&mut self) -> Result<(), ParseError> {
        if self.eat('}') {
            Ok(())
        } else {
            Err(self.err("bad substitution"))
        }
    }

    fn parse_param_name_and_index(
        &mut self,
    ) -> Result<(String, Option<ParamIndex>), ParseError> {
        let mut name = String::new();
        match self.peek() {
            Some(c) if is_name_start(c) => {
                while let Some(n) = self.peek() {
                    if is_name_char(n) {
                        name.push(n);
                        self.pos_advance(1);
                    } else {
                        break;
                    }
                }
            }
            Some(c) if c.is_ascii_digit() => {
                while let Some(n) = self.peek() {
                    if n.is_ascii_digit() {
                        name.push(n);
                        self.pos_advance(1);
                    } else {
                        break;
                    }
                }
            }
            Some(c @ ('@' | '*' | '#' | '?' | '$' | '!' | '-' | '_')) => {
                name.push(c);
                self.pos_advance(1);
            }
            _ => return Err(self.err("bad substitution")),
        }

        let index = if self.peek() == Some('[') {
            match self.scan_balanced_subscript()? {
                Some(text) => Some(match text.as_str() {
                    "@" => ParamIndex::All,
                    "*" => ParamIndex::Star,
                    _ => ParamIndex::Expr(
                        Parser::new(&text)
                            .parse_word_to_end()
                            .map_err(|e| self.err(e.message))?,
                    ),
                }),
                None => return Err(self.err("bad substitution")),
            }
        } else {
            None
        };
        Ok((name, index))
    }

    fn parse_param_op(&mut self) -> Result<Option<ParamOp>, ParseError> {
        let colon = self.peek() == Some(':')
            && matches!(self.peek_at(1), Some('-') | Some('=') | Some('+') | Some('?'));
        if colon {
            self.pos_advance(1);
        }
        match self.peek() {
            Some('}') | None => Ok(None),
            Some('-') => {
                self.pos_advance(1);
                let word = self.parse_param_arg()?;
                Ok(Some(ParamOp::Default { word, colon }))
            }
            Some('=') => {
                self.pos_advance(1);
                let word = self.parse_param_arg()?;
                Ok(Some(ParamOp::AssignDefault { word, colon }))
            }
            Some('+') => {
                self.pos_advance(1);
                let word = self.parse_param_arg()?;
                Ok(Some(ParamOp::Alternative { word, colon }))
            }
            Some('?') => {
                self.pos_advance(1);
                let word = if self.peek() == Some('}') {
                    None
                } else {
                    Some(self.parse_param_arg()?)
                };
                Ok(Some(ParamOp::ErrorIfUnset { word, colon }))
            }
            Some(':') => {
                self.pos_advance(1);
                self.parse_substring_op().map(Some)
            }
            Some('#') => {
                self.pos_advance(1);
                let greedy = self.eat('#');
                let pattern = self.parse_param_arg()?;
                Ok(Some(ParamOp::TrimPrefix { pattern, greedy }))
            }
            Some('%') => {
                self.pos_advance(1);
                let greedy = self.eat('%');
                let pattern = self.parse_param_arg()?;
                Ok(Some(ParamOp::TrimSuffix { pattern, greedy }))
            }
            Some('/') => {
                self.pos_advance(1);
                let all = self.eat('/');
                let anchor = if !all && self.eat('#') {
                    Some(ReplaceAnchor::Start)
                } else if !all && self.eat('%') {
                    Some(ReplaceAnchor::End)
                } else {
                    None
                };
                let pattern = Word {
                    parts: self.parse_word_parts(WordCtx::ParamPattern)?,
                };
                let replacement = if self.eat('/') {
                    Some(self.parse_param_arg()?)
                } else {
                    None
                };
                Ok(Some(ParamOp::Replace {
                    pattern,
                    replacement,
                    all,
                    anchor,
                }))
            }
            Some('^') => {
                self.pos_advance(1);
                let all = self.eat('^');
                let pattern = self.parse_optional_pattern()?;
                Ok(Some(ParamOp::CaseConvert {
                    upper: true,
                    all,
                    pattern,
                }))
            }
            Some(',') => {
                self.pos_advance(1);
                let all = self.eat(',');
                let pattern = self.parse_optional_pattern()?;
                Ok(Some(ParamOp::CaseConvert {
                    upper: false,
                    all,
                    pattern,
                }))
            }
            Some('@') => {
                self.pos_advance(1);
                match self.bump() {
                    Some(c) if c.is_ascii_alphabetic() => Ok(Some(ParamOp::Transform(c))),
                    _ => Err(self.err("bad substitution")),
                }
            }
            Some(_) => Err(self.err("bad substitution")),
        }
    }

    fn parse_param_arg(&mut self) -> Result<Word, ParseError> {
        Ok(Word {
            parts: self.parse_word_parts(WordCtx::ParamArg)?,
        })
    }

    fn parse_optional_pattern(&mut self) -> Result<Option<Word>, ParseError> {
        if self.peek() == Some('}') {
            Ok(None)
        } else {
            Ok(Some(self.parse_param_arg()?))
        }
    }

    /// `${x:offset}` / `${x:offset:length}` — the expressions are scanned
    /// textually to the closing brace, then parsed as arithmetic.
    fn parse_substring_op(&mut self) -> Result<ParamOp, ParseError> {
        let mut depth = 0usize;
        let mut sections: Vec<String> = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.err("bad substitution")),
                Some('}') if depth == 0 => break,
                Some(c) => {
                    match c {
                        '(' | '{' | '[' => depth += 1,
                        ')' | '}' | ']' => depth = depth.saturating_sub(1),
                        ':' if depth == 0 => {
                            if sections.len() == 2 {
                                return Err(self.err("bad substitution"));
                            }
                            sections.push(String::new());
                            self.pos_advance(1);
                            continue;
                        }
                        _ => {}
                    }
                    if let Some(section) = sections.last_mut() {
                        section.push(c);
                    }
                    self.pos_advance(1);
                }
            }
        }
        let offset = Parser::new(&sections[0])
            .parse_arith_to_end()
            .map_err(|e| self.err(e.message))?;
        let length = match sections.get(1) {
            Some(text) if !text.trim().is_empty() => Some(
                Parser::new(text)
                    .parse_arith_to_end()
                    .map_err(|e| self.err(e.message))?,
            ),
            _ => None,
        };
        Ok(ParamOp::Substring { offset, length })
    }
}
