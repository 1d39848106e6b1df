//! Command Grammar
//!
//! Simple commands, the compound forms, function definitions, and
//! redirections.

use super::{is_metachar, is_name_char, is_name_start, Parser};
use crate::syntax::ast::*;
use crate::syntax::ParseError;

const IF_ARM_STOPS: &[&str] = &["elif", "else", "fi"];
const CASE_BODY_STOPS: &[&str] = &[";;", "esac"];

impl Parser {
    pub(crate) fn parse_command(&mut self, stops: &[&str]) -> Result<Cmd, ParseError> {
        self.skip_hspace();
        let span = self.span();

        if self.looking_at("((") {
            return self.parse_arith_command(span);
        }
        if self.peek() == Some('(') {
            return self.parse_subshell(span);
        }
        if self.looking_at("[[")
            && self
                .peek_at(2)
                .map(|c| c == ' ' || c == '\t' || c == '\n')
                .unwrap_or(false)
        {
            return self.parse_cond_command(span);
        }
        if self.peek() == Some('{')
            && self
                .peek_at(1)
                .map(|c| c == ' ' || c == '\t' || c == '\n')
                .unwrap_or(false)
        {
            return self.parse_group(span);
        }

        match self.peek_name().as_str() {
            "if" => return self.parse_if(span),
            "while" => return self.parse_loop(span, false),
            "until" => return self.parse_loop(span, true),
            "for" => return self.parse_for(span),
            "select" => return self.parse_select(span),
            "case" => return self.parse_case(span),
            "function" => return self.parse_function_keyword(span),
            _ => {}
        }

        if let Some(def) = self.try_parse_funcdef(span)? {
            return Ok(Cmd::FuncDef(def));
        }
        self.parse_simple(span, stops)
    }

    // -----------------------------------------------------------------
    // Compound commands
    // -----------------------------------------------------------------

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        self.skip_blank_lines();
        if self.peek_name() == word {
            self.pos_advance(word.chars().count());
            Ok(())
        } else {
            Err(self.err(format!("expected `{}`", word)))
        }
    }

    pub(crate) fn pos_advance(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    /// Optional `;` after a condition or loop header.
    fn eat_separator(&mut self) {
        self.skip_hspace();
        self.eat(';');
    }

    fn parse_subshell(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.eat('(');
        let body = self.parse_list_until(&[")"])?;
        self.skip_blank_lines();
        if !self.eat(')') {
            return Err(self.err("expected `)`"));
        }
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::Subshell(BlockCmd { body, redirs, span }))
    }

    fn parse_group(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.eat('{');
        let body = self.parse_list_until(&["}"])?;
        self.skip_blank_lines();
        if !self.eat('}') {
            return Err(self.err("expected `}`"));
        }
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::Group(BlockCmd { body, redirs, span }))
    }

    fn parse_if(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.pos_advance(2); // if
        let mut arms = Vec::new();
        let condition = self.parse_list_until(&["then"])?;
        self.expect_word("then")?;
        let body = self.parse_list_until(IF_ARM_STOPS)?;
        arms.push((condition, body));

        let mut else_body = None;
        loop {
            self.skip_blank_lines();
            match self.peek_name().as_str() {
                "elif" => {
                    self.pos_advance(4);
                    let condition = self.parse_list_until(&["then"])?;
                    self.expect_word("then")?;
                    let body = self.parse_list_until(IF_ARM_STOPS)?;
                    arms.push((condition, body));
                }
                "else" => {
                    self.pos_advance(4);
                    else_body = Some(self.parse_list_until(&["fi"])?);
                }
                "fi" => {
                    self.pos_advance(2);
                    break;
                }
                _ => return Err(self.err("expected `fi`")),
            }
        }
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::If(IfCmd {
            arms,
            else_body,
            redirs,
            span,
        }))
    }

    fn parse_loop(&mut self, span: Span, until: bool) -> Result<Cmd, ParseError> {
        self.pos_advance(5); // while / until
        let condition = self.parse_list_until(&["do"])?;
        self.expect_word("do")?;
        let body = self.parse_list_until(&["done"])?;
        self.expect_word("done")?;
        let redirs = self.parse_trailing_redirs()?;
        let node = LoopCmd {
            condition,
            body,
            redirs,
            span,
        };
        Ok(if until {
            Cmd::Until(node)
        } else {
            Cmd::While(node)
        })
    }

    fn parse_for(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.pos_advance(3); // for
        self.skip_hspace();

        if self.looking_at("((") {
            return self.parse_arith_for(span);
        }

        let var = self.parse_identifier()?;
        self.skip_hspace();
        self.eat(';');
        self.skip_blank_lines();

        let list = if self.peek_name() == "in" {
            self.pos_advance(2);
            Some(self.parse_word_list()?)
        } else {
            None
        };
        self.eat_separator();
        self.expect_word("do")?;
        let body = self.parse_list_until(&["done"])?;
        self.expect_word("done")?;
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::For(ForCmd {
            var,
            list,
            body,
            redirs,
            span,
        }))
    }

    fn parse_select(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.pos_advance(6); // select
        self.skip_hspace();
        let var = self.parse_identifier()?;
        self.skip_blank_lines();
        let list = if self.peek_name() == "in" {
            self.pos_advance(2);
            Some(self.parse_word_list()?)
        } else {
            None
        };
        self.eat_separator();
        self.expect_word("do")?;
        let body = self.parse_list_until(&["done"])?;
        self.expect_word("done")?;
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::Select(ForCmd {
            var,
            list,
            body,
            redirs,
            span,
        }))
    }

    fn parse_arith_for(&mut self, span: Span) -> Result<Cmd, ParseError> {
        let text = self.extract_arith_text()?;
        let mut sections = text.splitn(3, ';');
        let mut next = |p: &mut Parser| -> Result<Option<ArithExpr>, ParseError> {
            match sections.next() {
                Some(s) if !s.trim().is_empty() => Ok(Some(
                    Parser::new(s).parse_arith_to_end().map_err(|e| p.err(e.message))?,
                )),
                _ => Ok(None),
            }
        };
        let init = next(self)?;
        let cond = next(self)?;
        let step = next(self)?;
        self.eat_separator();
        self.expect_word("do")?;
        let body = self.parse_list_until(&["done"])?;
        self.expect_word("done")?;
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::ArithFor(ArithForCmd {
            init,
            cond,
            step,
            body,
            redirs,
            span,
        }))
    }

    fn parse_case(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.pos_advance(4); // case
        self.skip_hspace();
        let subject = self.parse_word()?;
        self.expect_word("in")?;

        let mut arms = Vec::new();
        loop {
            self.skip_blank_lines();
            if self.peek_name() == "esac" {
                self.pos_advance(4);
                break;
            }
            if self.at_end() {
                return Err(self.err("expected `esac`"));
            }
            self.eat('(');
            self.skip_hspace();
            let mut patterns = vec![self.parse_word()?];
            loop {
                self.skip_hspace();
                if self.peek() == Some('|') && !self.looking_at("||") {
                    self.pos_advance(1);
                    self.skip_hspace();
                    patterns.push(self.parse_word()?);
                } else {
                    break;
                }
            }
            self.skip_hspace();
            if !self.eat(')') {
                return Err(self.err("expected `)` after case pattern"));
            }
            let body = self.parse_list_until(CASE_BODY_STOPS)?;
            self.skip_blank_lines();
            let terminator = if self.eat_str(";;&") {
                CaseFall::Resume
            } else if self.eat_str(";&") {
                CaseFall::Through
            } else if self.eat_str(";;") {
                CaseFall::Stop
            } else {
                // Last arm may omit its terminator.
                CaseFall::Stop
            };
            arms.push(CaseArm {
                patterns,
                body,
                terminator,
            });
        }
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::Case(CaseCmd {
            subject,
            arms,
            redirs,
            span,
        }))
    }

    fn parse_cond_command(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.pos_advance(2); // [[
        let expr = self.parse_cond_expr()?;
        self.skip_blank_lines();
        if !self.eat_str("]]") {
            return Err(self.err("expected `]]`"));
        }
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::Cond(CondCmd { expr, redirs, span }))
    }

    fn parse_arith_command(&mut self, span: Span) -> Result<Cmd, ParseError> {
        let text = self.extract_arith_text()?;
        let expr = Parser::new(&text)
            .parse_arith_to_end()
            .map_err(|e| self.err(e.message))?;
        let redirs = self.parse_trailing_redirs()?;
        Ok(Cmd::Arith(ArithCmd { expr, redirs, span }))
    }

    /// Consume `(( … ))` and return the inner text.
    pub(crate) fn extract_arith_text(&mut self) -> Result<String, ParseError> {
        self.pos_advance(2); // ((
        let mut depth = 0usize;
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.err("expected `))`")),
                Some('(') => {
                    depth += 1;
                    text.push('(');
                    self.pos_advance(1);
                }
                Some(')') => {
                    if depth == 0 {
                        if self.looking_at("))") {
                            self.pos_advance(2);
                            return Ok(text);
                        }
                        return Err(self.err("expected `))`"));
                    }
                    depth -= 1;
                    text.push(')');
                    self.pos_advance(1);
                }
                Some(c) => {
                    text.push(c);
                    self.pos_advance(1);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------

    fn parse_function_keyword(&mut self, span: Span) -> Result<Cmd, ParseError> {
        self.pos_advance(8); // function
        self.skip_hspace();
        let name = self.parse_func_name()?;
        self.skip_hspace();
        if self.eat('(') {
            self.skip_hspace();
            if !self.eat(')') {
                return Err(self.err("expected `)`"));
            }
        }
        Ok(Cmd::FuncDef(self.finish_funcdef(name, span)?))
    }

    fn try_parse_funcdef(&mut self, span: Span) -> Result<Option<FuncDef>, ParseError> {
        let saved = self.save();
        let name = match self.parse_func_name() {
            Ok(n) if !n.is_empty() => n,
            _ => {
                self.restore(saved);
                return Ok(None);
            }
        };
        self.skip_hspace();
        if !self.eat('(') {
            self.restore(saved);
            return Ok(None);
        }
        self.skip_hspace();
        if !self.eat(')') {
            self.restore(saved);
            return Ok(None);
        }
        Ok(Some(self.finish_funcdef(name, span)?))
    }

    fn finish_funcdef(&mut self, name: String, span: Span) -> Result<FuncDef, ParseError> {
        self.skip_blank_lines();
        let body = self.parse_command(&[])?;
        Ok(FuncDef {
            name,
            body: Box::new(body),
            redirs: Vec::new(),
            source: self.source_label().map(str::to_string),
            span,
        })
    }

    fn parse_func_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                name.push(c);
                self.pos_advance(1);
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        self.skip_hspace();
        let mut name = String::new();
        match self.peek() {
            Some(c) if is_name_start(c) => {
                name.push(c);
                self.pos_advance(1);
            }
            _ => return Err(self.err("expected identifier")),
        }
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                name.push(c);
                self.pos_advance(1);
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// Words up to end of line or `;` (for `for x in …; do`).
    fn parse_word_list(&mut self) -> Result<Vec<Word>, ParseError> {
        let mut words = Vec::new();
        loop {
            self.skip_hspace();
            match self.peek() {
                None | Some('\n') | Some(';') => break,
                Some(c) if is_metachar(c) => break,
                _ => words.push(self.parse_word()?),
            }
        }
        Ok(words)
    }

    // -----------------------------------------------------------------
    // Simple commands
    // -----------------------------------------------------------------

    fn parse_simple(&mut self, span: Span, _stops: &[&str]) -> Result<Cmd, ParseError> {
        let mut assigns = Vec::new();
        let mut words: Vec<Word> = Vec::new();
        let mut redirs = Vec::new();

        loop {
            self.skip_hspace();
            match self.peek() {
                None | Some('\n') | Some(';') | Some('|') | Some(')') => break,
                Some('&') if !self.looking_at("&>") => break,
                _ => {}
            }
            if let Some(redir) = self.try_parse_redirect()? {
                redirs.push(redir);
                continue;
            }
            if words.is_empty() {
                if let Some(assign) = self.try_parse_assignment()? {
                    assigns.push(assign);
                    continue;
                }
            }
            match self.peek() {
                Some(c) if is_metachar(c) => break,
                None => break,
                _ => words.push(self.parse_word()?),
            }
        }

        if assigns.is_empty() && words.is_empty() && redirs.is_empty() {
            let c = self.peek().map(String::from).unwrap_or_default();
            return Err(self.err(format!("unexpected token `{}`", c)));
        }
        Ok(Cmd::Simple(SimpleCmd {
            assigns,
            words,
            redirs,
            span,
        }))
    }

    fn try_parse_assignment(&mut self) -> Result<Option<Assign>, ParseError> {
        let saved = self.save();
        let name = {
            let mut n = String::new();
            match self.peek() {
                Some(c) if is_name_start(c) => {
                    n.push(c);
                    self.pos_advance(1);
                }
                _ => return Ok(None),
            }
            while let Some(c) = self.peek() {
                if is_name_char(c) {
                    n.push(c);
                    self.pos_advance(1);
                } else {
                    break;
                }
            }
            n
        };

        let index = if self.peek() == Some('[') {
            match self.scan_balanced_subscript()? {
                Some(text) => Some(
                    Parser::new(&text)
                        .parse_word_to_end()
                        .map_err(|e| self.err(e.message))?,
                ),
                None => {
                    self.restore(saved);
                    return Ok(None);
                }
            }
        } else {
            None
        };

        let append = if self.eat_str("+=") {
            true
        } else if self.eat('=') {
            false
        } else {
            self.restore(saved);
            return Ok(None);
        };

        if self.peek() == Some('(') && index.is_none() {
            self.pos_advance(1);
            let mut elements = Vec::new();
            loop {
                self.skip_blank_lines();
                if self.eat(')') {
                    break;
                }
                if self.at_end() {
                    return Err(self.err("expected `)` in array assignment"));
                }
                elements.push(self.parse_array_element()?);
            }
            return Ok(Some(Assign {
                name,
                index: None,
                append,
                value: None,
                array: Some(elements),
            }));
        }

        let value = match self.peek() {
            Some(c) if !is_metachar(c) => Some(self.parse_word()?),
            _ => None,
        };
        Ok(Some(Assign {
            name,
            index,
            append,
            value,
            array: None,
        }))
    }

    /// Consume `[…]` and return the inner text, tolerating nested
    /// brackets and quoting.
    pub(crate) fn scan_balanced_subscript(&mut self) -> Result<Option<String>, ParseError> {
        if self.peek() != Some('[') {
            return Ok(None);
        }
        let saved = self.save();
        self.pos_advance(1);
        let mut depth = 0usize;
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.restore(saved);
                    return Ok(None);
                }
                Some('[') => {
                    depth += 1;
                    text.push('[');
                    self.pos_advance(1);
                }
                Some(']') => {
                    self.pos_advance(1);
                    if depth == 0 {
                        return Ok(Some(text));
                    }
                    depth -= 1;
                    text.push(']');
                }
                Some('\'') => {
                    text.push('\'');
                    self.pos_advance(1);
                    while let Some(c) = self.bump() {
                        text.push(c);
                        if c == '\'' {
                            break;
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.pos_advance(1);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Redirections
    // -----------------------------------------------------------------

    pub(crate) fn parse_trailing_redirs(&mut self) -> Result<Vec<Redirect>, ParseError> {
        let mut redirs = Vec::new();
        loop {
            self.skip_hspace();
            match self.try_parse_redirect()? {
                Some(r) => redirs.push(r),
                None => return Ok(redirs),
            }
        }
    }

    pub(crate) fn try_parse_redirect(&mut self) -> Result<Option<Redirect>, ParseError> {
        let saved = self.save();
        self.skip_hspace();

        // Leading descriptor digits count only when glued to an operator.
        let mut fd_text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                fd_text.push(c);
                self.pos_advance(1);
            } else {
                break;
            }
        }
        let fd = if fd_text.is_empty() {
            None
        } else {
            match self.peek() {
                Some('<') | Some('>') => fd_text.parse::<u32>().ok(),
                _ => {
                    self.restore(saved);
                    return Ok(None);
                }
            }
        };

        let op = if fd.is_none() && self.eat_str("&>>") {
            RedirOp::OutErrAppend
        } else if fd.is_none() && self.eat_str("&>") {
            RedirOp::OutErr
        } else if self.eat_str("<<<") {
            RedirOp::HereString
        } else if self.looking_at("<<") {
            return self.parse_heredoc_redirect(fd).map(Some);
        } else if self.eat_str("<&") {
            RedirOp::DupIn
        } else if self.eat_str("<>") {
            RedirOp::InOut
        } else if self.eat('<') {
            RedirOp::In
        } else if self.eat_str(">>") {
            RedirOp::OutAppend
        } else if self.eat_str(">&") {
            RedirOp::DupOut
        } else if self.eat_str(">|") {
            RedirOp::OutClobber
        } else if self.eat('>') {
            RedirOp::Out
        } else {
            self.restore(saved);
            return Ok(None);
        };

        self.skip_hspace();
        // `2>&-` / `>&-`: closing a descriptor.
        if matches!(op, RedirOp::DupIn | RedirOp::DupOut) && self.eat('-') {
            return Ok(Some(Redirect {
                fd,
                op,
                target: RedirTarget::Word(Word::lit("-")),
            }));
        }
        match self.peek() {
            Some(c) if !is_metachar(c) => {
                let word = self.parse_word()?;
                Ok(Some(Redirect {
                    fd,
                    op,
                    target: RedirTarget::Word(word),
                }))
            }
            _ => Err(self.err("expected redirect target")),
        }
    }

    fn parse_heredoc_redirect(&mut self, fd: Option<u32>) -> Result<Redirect, ParseError> {
        self.pos_advance(2); // <<
        let strip_tabs = self.eat('-');
        self.skip_hspace();

        let mut quoted = false;
        let mut tag = String::new();
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos_advance(1);
                quoted = true;
                while let Some(c) = self.bump() {
                    if c == q {
                        break;
                    }
                    tag.push(c);
                }
            }
            Some('\\') => {
                // Backslash-escaped tag also disables expansion.
                self.pos_advance(1);
                quoted = true;
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '-' {
                        tag.push(c);
                        self.pos_advance(1);
                    } else {
                        break;
                    }
                }
            }
            _ => {
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '-' {
                        tag.push(c);
                        self.pos_advance(1);
                    } else {
                        break;
                    }
                }
            }
        }
        if tag.is_empty() {
            return Err(self.err("expected here-document delimiter"));
        }
        let heredoc = self.capture_heredoc(&tag, strip_tabs, quoted)?;
        Ok(Redirect {
            fd,
            op: RedirOp::HereDoc,
            target: RedirTarget::HereDoc(heredoc),
        })
    }

    fn parse_array_element(&mut self) -> Result<Word, ParseError> {
        // `[k]=v` keeps its subscript as literal prefix; the interpreter
        // re-splits it when building the array.
        self.parse_word()
    }
}
