//! Parser Core
//!
//! A recursive-descent scanner over the source characters. The grammar
//! is spread across sibling files as `impl Parser` blocks:
//!
//! - `command.rs` — simple and compound commands, redirections
//! - `word.rs` — word parts, quoting, brace candidates
//! - `param.rs` — `${…}` operations
//! - `arith.rs` — arithmetic expressions
//! - `cond.rs` — `[[ … ]]` expressions
//!
//! Here-document bodies are captured eagerly: when `<<TAG` is scanned,
//! the parser reaches forward to the body lines, records their span, and
//! later jumps over that span when the main scan crosses the newline in
//! front of it.

mod arith;
mod command;
mod cond;
mod param;
mod word;

pub use arith::parse_integer_literal;

use super::ast::*;
use super::ParseError;

/// Parse a complete script.
pub fn parse(src: &str) -> Result<Script, ParseError> {
    Parser::new(src).parse_script_to_end()
}

/// Parse standalone arithmetic text (used by `let`, array subscripts,
/// substring offsets).
pub fn parse_arith_text(text: &str) -> Result<ArithExpr, ParseError> {
    Parser::new(text).parse_arith_to_end()
}

pub struct Parser {
    chars: Vec<char>,
    pos: usize,
    /// Regions already consumed as here-document bodies.
    hd_skips: Vec<(usize, usize)>,
    /// Where the next here-document body search begins.
    hd_from: usize,
    /// Label recorded on function definitions for `BASH_SOURCE`.
    source_label: Option<String>,
}

impl Parser {
    pub fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            hd_skips: Vec::new(),
            hd_from: 0,
            source_label: None,
        }
    }

    pub fn with_source_label(src: &str, label: &str) -> Self {
        let mut p = Self::new(src);
        p.source_label = Some(label.to_string());
        p
    }

    pub fn parse_script_to_end(&mut self) -> Result<Script, ParseError> {
        let items = self.parse_list_until(&[])?;
        self.skip_blank_lines();
        if !self.at_end() {
            let c = self.peek().unwrap_or(' ');
            return Err(self.err(format!("unexpected token `{}`", c)));
        }
        Ok(Script { items })
    }

    // -----------------------------------------------------------------
    // Character primitives
    // -----------------------------------------------------------------

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    pub(crate) fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn looking_at(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    pub(crate) fn eat_str(&mut self, s: &str) -> bool {
        if self.looking_at(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    pub(crate) fn save(&self) -> usize {
        self.pos
    }

    pub(crate) fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Compute 1-based line/column for a position by counting newlines.
    fn location(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for &c in self.chars.iter().take(pos) {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    pub(crate) fn span(&self) -> Span {
        let (line, col) = self.location(self.pos);
        Span { line, col }
    }

    pub(crate) fn err(&self, message: impl Into<String>) -> ParseError {
        let (line, col) = self.location(self.pos);
        ParseError {
            line,
            col,
            message: message.into(),
        }
    }

    // -----------------------------------------------------------------
    // Whitespace, comments, here-document skips
    // -----------------------------------------------------------------

    /// Skip spaces, tabs, comments, and escaped line breaks.
    pub(crate) fn skip_hspace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') => {
                    self.pos += 1;
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Consume one newline and jump over captured here-document bodies.
    pub(crate) fn skip_newline(&mut self) {
        if self.eat('\n') {
            self.apply_hd_skips();
        }
    }

    fn apply_hd_skips(&mut self) {
        loop {
            let mut jumped = false;
            for &(start, end) in &self.hd_skips {
                if start == self.pos {
                    self.pos = end;
                    jumped = true;
                    break;
                }
            }
            if !jumped {
                return;
            }
        }
    }

    /// Skip whitespace, comments, newlines, and `;`-less blank space
    /// between statements.
    pub(crate) fn skip_blank_lines(&mut self) {
        loop {
            self.skip_hspace();
            if self.peek() == Some('\n') {
                self.skip_newline();
            } else {
                return;
            }
        }
    }

    /// The literal word at the cursor, if the next token is a plain run
    /// of word characters. Does not consume.
    pub(crate) fn peek_name(&self) -> String {
        let mut out = String::new();
        let mut i = 0;
        while let Some(c) = self.peek_at(i) {
            if c.is_alphanumeric() || c == '_' {
                out.push(c);
                i += 1;
            } else {
                break;
            }
        }
        // A name followed by quoting or expansion chars is not a bare word.
        match self.peek_at(i) {
            Some(c) if !is_metachar(c) && c != '#' => String::new(),
            _ => out,
        }
    }

    /// True when the cursor sits on a list-closing token for the current
    /// context: a stop word (`done`, `fi`, …), `)`, `}`, or a case-arm
    /// terminator.
    pub(crate) fn at_stop(&self, stops: &[&str]) -> bool {
        if self.looking_at(";;") || self.looking_at(";&") {
            return stops.contains(&";;");
        }
        match self.peek() {
            Some(')') => return stops.contains(&")"),
            Some('}') => {
                // `}` closes a group only as a standalone word.
                if stops.contains(&"}")
                    && self
                        .peek_at(1)
                        .map(|c| is_metachar(c) || c == '#')
                        .unwrap_or(true)
                {
                    return true;
                }
                return false;
            }
            _ => {}
        }
        let name = self.peek_name();
        !name.is_empty() && stops.contains(&name.as_str())
    }

    // -----------------------------------------------------------------
    // Lists, and-or chains, pipelines
    // -----------------------------------------------------------------

    /// Parse statements until end of input or one of `stops` (the stop
    /// token itself is not consumed).
    pub(crate) fn parse_list_until(&mut self, stops: &[&str]) -> Result<Vec<AndOrList>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_blank_lines();
            if self.at_end() || self.at_stop(stops) {
                return Ok(items);
            }
            items.push(self.parse_and_or(stops)?);
        }
    }

    pub(crate) fn parse_and_or(&mut self, stops: &[&str]) -> Result<AndOrList, ParseError> {
        self.skip_hspace();
        let span = self.span();
        let mut pipelines = vec![self.parse_pipeline(stops)?];
        let mut connectors = Vec::new();
        loop {
            self.skip_hspace();
            let connector = if self.eat_str("&&") {
                Connector::AndIf
            } else if self.eat_str("||") {
                Connector::OrIf
            } else if self.looking_at(";;") || self.looking_at(";&") {
                break;
            } else if self.peek() == Some(';') {
                self.pos += 1;
                Connector::Seq
            } else if self.peek() == Some('&') && !self.looking_at("&>") {
                // Background jobs run synchronously in this engine; `&`
                // separates statements like `;`.
                self.pos += 1;
                Connector::Seq
            } else {
                break;
            };
            match connector {
                Connector::Seq => {
                    self.skip_hspace();
                    if self.at_end()
                        || self.peek() == Some('\n')
                        || self.at_stop(stops)
                        || self.peek() == Some(')')
                    {
                        break;
                    }
                }
                _ => self.skip_blank_lines(),
            }
            connectors.push(connector);
            pipelines.push(self.parse_pipeline(stops)?);
        }
        Ok(AndOrList {
            pipelines,
            connectors,
            span,
        })
    }

    pub(crate) fn parse_pipeline(&mut self, stops: &[&str]) -> Result<Pipeline, ParseError> {
        self.skip_hspace();
        let mut bang = false;
        let mut timed = false;
        loop {
            if self.peek() == Some('!')
                && self
                    .peek_at(1)
                    .map(|c| c == ' ' || c == '\t' || c == '\n')
                    .unwrap_or(true)
            {
                self.pos += 1;
                self.skip_hspace();
                bang = !bang;
                continue;
            }
            if self.peek_name() == "time" {
                self.pos += 4;
                self.skip_hspace();
                if self.looking_at("-p")
                    && self
                        .peek_at(2)
                        .map(|c| is_metachar(c))
                        .unwrap_or(true)
                {
                    self.pos += 2;
                    self.skip_hspace();
                }
                timed = true;
                continue;
            }
            break;
        }

        let mut elements = vec![self.parse_command(stops)?];
        let mut stderr_pipes = Vec::new();
        loop {
            self.skip_hspace();
            if self.eat_str("|&") {
                stderr_pipes.push(true);
            } else if self.peek() == Some('|') && !self.looking_at("||") {
                self.pos += 1;
                stderr_pipes.push(false);
            } else {
                break;
            }
            self.skip_blank_lines();
            elements.push(self.parse_command(stops)?);
        }
        Ok(Pipeline {
            elements,
            stderr_pipes,
            bang,
            timed,
        })
    }

    // -----------------------------------------------------------------
    // Here-document capture
    // -----------------------------------------------------------------

    /// Called right after `<<TAG` is scanned: reach forward to the body
    /// lines, consume them, and build the node.
    pub(crate) fn capture_heredoc(
        &mut self,
        tag: &str,
        strip_tabs: bool,
        quoted: bool,
    ) -> Result<HereDoc, ParseError> {
        // The body starts after the next newline, or where the previous
        // capture on this line ended.
        let body_start = if self.hd_from > self.pos {
            self.hd_from
        } else {
            match self.chars[self.pos..].iter().position(|&c| c == '\n') {
                Some(off) => self.pos + off + 1,
                None => self.chars.len(),
            }
        };

        let mut body = String::new();
        let mut i = body_start;
        let end;
        loop {
            if i >= self.chars.len() {
                end = self.chars.len();
                break;
            }
            let line_end = self.chars[i..]
                .iter()
                .position(|&c| c == '\n')
                .map(|off| i + off)
                .unwrap_or(self.chars.len());
            let line: String = self.chars[i..line_end].iter().collect();
            let candidate = if strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line.as_str()
            };
            if candidate == tag {
                end = (line_end + 1).min(self.chars.len());
                break;
            }
            let kept = if strip_tabs {
                line.trim_start_matches('\t').to_string()
            } else {
                line
            };
            body.push_str(&kept);
            body.push('\n');
            i = line_end + 1;
        }

        if body_start < end {
            self.hd_skips.push((body_start, end));
            self.hd_from = end;
        }

        let body_word = if quoted {
            Word {
                parts: vec![WordPart::SingleQuoted(body)],
            }
        } else {
            let parts = Parser::new(&body).parse_expansion_text()?;
            Word {
                parts: vec![WordPart::DoubleQuoted(parts)],
            }
        };
        Ok(HereDoc {
            tag: tag.to_string(),
            body: body_word,
            strip_tabs,
            quoted,
        })
    }

    pub(crate) fn source_label(&self) -> Option<&str> {
        self.source_label.as_deref()
    }
}

/// Characters that end an unquoted word.
pub(crate) fn is_metachar(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '|' | '&' | ';' | '(' | ')' | '<' | '>')
}

/// Valid first character of a variable name.
pub(crate) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Valid continuation character of a variable name.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Script {
        parse(src).unwrap_or_else(|e| panic!("parse failed for {:?}: {}", src, e))
    }

    fn first_simple(script: &Script) -> &SimpleCmd {
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::Simple(cmd) => cmd,
            other => panic!("expected simple command, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_command_words() {
        let script = parse_ok("echo hello world");
        let cmd = first_simple(&script);
        assert_eq!(cmd.words.len(), 3);
        assert_eq!(cmd.words[0].as_lit(), Some("echo"));
        assert_eq!(cmd.words[2].as_lit(), Some("world"));
    }

    #[test]
    fn test_and_or_chain() {
        let script = parse_ok("true && echo yes || echo no");
        let list = &script.items[0];
        assert_eq!(list.pipelines.len(), 3);
        assert_eq!(list.connectors, vec![Connector::AndIf, Connector::OrIf]);
    }

    #[test]
    fn test_pipeline_with_stderr_pipe() {
        let script = parse_ok("a | b |& c");
        let pipe = &script.items[0].pipelines[0];
        assert_eq!(pipe.elements.len(), 3);
        assert_eq!(pipe.stderr_pipes, vec![false, true]);
    }

    #[test]
    fn test_negated_pipeline() {
        let script = parse_ok("! false");
        assert!(script.items[0].pipelines[0].bang);
    }

    #[test]
    fn test_semicolon_list() {
        let script = parse_ok("echo a; echo b; echo c");
        assert_eq!(script.items[0].pipelines.len(), 3);
    }

    #[test]
    fn test_assignment_prefix() {
        let script = parse_ok("FOO=bar BAZ=qux cmd");
        let cmd = first_simple(&script);
        assert_eq!(cmd.assigns.len(), 2);
        assert_eq!(cmd.assigns[0].name, "FOO");
        assert!(!cmd.assigns[0].append);
        assert_eq!(cmd.words.len(), 1);
    }

    #[test]
    fn test_append_assignment() {
        let script = parse_ok("PATH+=:/opt/bin");
        let cmd = first_simple(&script);
        assert!(cmd.assigns[0].append);
        assert!(cmd.words.is_empty());
    }

    #[test]
    fn test_array_assignment() {
        let script = parse_ok("a=(1 2 3)");
        let cmd = first_simple(&script);
        let arr = cmd.assigns[0].array.as_ref().unwrap();
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn test_if_elif_else() {
        let script = parse_ok("if a; then b; elif c; then d; else e; fi");
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::If(node) => {
                assert_eq!(node.arms.len(), 2);
                assert!(node.else_body.is_some());
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_while_loop() {
        let script = parse_ok("while true; do echo x; done");
        assert!(matches!(
            script.items[0].pipelines[0].elements[0],
            Cmd::While(_)
        ));
    }

    #[test]
    fn test_for_in_loop() {
        let script = parse_ok("for i in 1 2 3; do echo $i; done");
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::For(node) => {
                assert_eq!(node.var, "i");
                assert_eq!(node.list.as_ref().unwrap().len(), 3);
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_c_style_for() {
        let script = parse_ok("for ((i=0; i<3; i++)); do echo $i; done");
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::ArithFor(node) => {
                assert!(node.init.is_some());
                assert!(node.cond.is_some());
                assert!(node.step.is_some());
            }
            other => panic!("expected arith for, got {:?}", other),
        }
    }

    #[test]
    fn test_case_with_terminators() {
        let script = parse_ok("case $x in a) echo a;; b|c) echo bc;;& *) echo d;; esac");
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::Case(node) => {
                assert_eq!(node.arms.len(), 3);
                assert_eq!(node.arms[0].terminator, CaseFall::Stop);
                assert_eq!(node.arms[1].patterns.len(), 2);
                assert_eq!(node.arms[1].terminator, CaseFall::Resume);
            }
            other => panic!("expected case, got {:?}", other),
        }
    }

    #[test]
    fn test_subshell_and_group() {
        assert!(matches!(
            parse_ok("(echo a; echo b)").items[0].pipelines[0].elements[0],
            Cmd::Subshell(_)
        ));
        assert!(matches!(
            parse_ok("{ echo a; echo b; }").items[0].pipelines[0].elements[0],
            Cmd::Group(_)
        ));
    }

    #[test]
    fn test_function_definitions() {
        let script = parse_ok("greet() { echo hi; }");
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::FuncDef(def) => assert_eq!(def.name, "greet"),
            other => panic!("expected funcdef, got {:?}", other),
        }
        let script = parse_ok("function greet { echo hi; }");
        assert!(matches!(
            script.items[0].pipelines[0].elements[0],
            Cmd::FuncDef(_)
        ));
    }

    #[test]
    fn test_redirections() {
        let script = parse_ok("cmd < in.txt > out.txt 2>&1");
        let cmd = first_simple(&script);
        assert_eq!(cmd.redirs.len(), 3);
        assert_eq!(cmd.redirs[0].op, RedirOp::In);
        assert_eq!(cmd.redirs[1].op, RedirOp::Out);
        assert_eq!(cmd.redirs[2].op, RedirOp::DupOut);
        assert_eq!(cmd.redirs[2].fd, Some(2));
    }

    #[test]
    fn test_here_string() {
        let script = parse_ok("cat <<< hello");
        let cmd = first_simple(&script);
        assert_eq!(cmd.redirs[0].op, RedirOp::HereString);
    }

    #[test]
    fn test_heredoc_body_captured() {
        let script = parse_ok("cat <<EOF\nline one\nline two\nEOF\necho after");
        let cmd = first_simple(&script);
        match &cmd.redirs[0].target {
            RedirTarget::HereDoc(hd) => {
                assert_eq!(hd.tag, "EOF");
                assert!(!hd.quoted);
            }
            other => panic!("expected heredoc, got {:?}", other),
        }
        // The statement after the body still parses.
        assert_eq!(script.items.len(), 2);
    }

    #[test]
    fn test_heredoc_quoted_tag() {
        let script = parse_ok("cat <<'END'\n$not_expanded\nEND");
        let cmd = first_simple(&script);
        match &cmd.redirs[0].target {
            RedirTarget::HereDoc(hd) => {
                assert!(hd.quoted);
                assert_eq!(
                    hd.body.parts,
                    vec![WordPart::SingleQuoted("$not_expanded\n".to_string())]
                );
            }
            other => panic!("expected heredoc, got {:?}", other),
        }
    }

    #[test]
    fn test_word_quoting_parts() {
        let script = parse_ok(r#"echo 'single' "double $x" plain"#);
        let cmd = first_simple(&script);
        assert_eq!(
            cmd.words[1].parts,
            vec![WordPart::SingleQuoted("single".to_string())]
        );
        match &cmd.words[2].parts[0] {
            WordPart::DoubleQuoted(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], WordPart::Param(_)));
            }
            other => panic!("expected double quote, got {:?}", other),
        }
    }

    #[test]
    fn test_ansi_c_string() {
        let script = parse_ok(r"echo $'a\tb\n'");
        let cmd = first_simple(&script);
        assert_eq!(
            cmd.words[1].parts,
            vec![WordPart::SingleQuoted("a\tb\n".to_string())]
        );
    }

    #[test]
    fn test_command_substitution() {
        let script = parse_ok("echo $(date) `hostname`");
        let cmd = first_simple(&script);
        assert!(matches!(
            cmd.words[1].parts[0],
            WordPart::CmdSub {
                backquoted: false,
                ..
            }
        ));
        assert!(matches!(
            cmd.words[2].parts[0],
            WordPart::CmdSub {
                backquoted: true,
                ..
            }
        ));
    }

    #[test]
    fn test_arith_substitution() {
        let script = parse_ok("echo $((1 + 2 * 3))");
        let cmd = first_simple(&script);
        assert!(matches!(cmd.words[1].parts[0], WordPart::ArithSub(_)));
    }

    #[test]
    fn test_param_operations() {
        let script = parse_ok("echo ${x:-fallback} ${#arr[@]} ${y/foo/bar}");
        let cmd = first_simple(&script);
        match &cmd.words[1].parts[0] {
            WordPart::Param(p) => {
                assert!(matches!(
                    p.op,
                    Some(ParamOp::Default { colon: true, .. })
                ));
            }
            other => panic!("expected param, got {:?}", other),
        }
        match &cmd.words[2].parts[0] {
            WordPart::Param(p) => {
                assert_eq!(p.name, "arr");
                assert!(matches!(p.op, Some(ParamOp::Length)));
                assert!(matches!(p.index, Some(ParamIndex::All)));
            }
            other => panic!("expected param, got {:?}", other),
        }
        match &cmd.words[3].parts[0] {
            WordPart::Param(p) => {
                assert!(matches!(p.op, Some(ParamOp::Replace { all: false, .. })));
            }
            other => panic!("expected param, got {:?}", other),
        }
    }

    #[test]
    fn test_brace_expansion_parts() {
        let script = parse_ok("echo a{b,c}d {1..3}");
        let cmd = first_simple(&script);
        assert!(cmd.words[1]
            .parts
            .iter()
            .any(|p| matches!(p, WordPart::Brace(_))));
        match &cmd.words[2].parts[0] {
            WordPart::Brace(items) => assert_eq!(
                items[0],
                BraceElem::NumRange {
                    start: 1,
                    end: 3,
                    step: 1,
                    width: 0
                }
            ),
            other => panic!("expected brace, got {:?}", other),
        }
    }

    #[test]
    fn test_brace_without_comma_is_literal() {
        let script = parse_ok("echo {abc}");
        let cmd = first_simple(&script);
        assert_eq!(cmd.words[1].as_lit(), Some("{abc}"));
    }

    #[test]
    fn test_cond_command() {
        let script = parse_ok(r#"[[ "$x" == y* && -f /etc/f ]]"#);
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::Cond(node) => assert!(matches!(node.expr, CondExpr::And(_, _))),
            other => panic!("expected cond, got {:?}", other),
        }
    }

    #[test]
    fn test_cond_regex() {
        let script = parse_ok("[[ abc =~ ^a(b)c$ ]]");
        match &script.items[0].pipelines[0].elements[0] {
            Cmd::Cond(node) => match &node.expr {
                CondExpr::Binary { op, .. } => assert_eq!(*op, CondBinaryOp::Regex),
                other => panic!("expected binary, got {:?}", other),
            },
            other => panic!("expected cond, got {:?}", other),
        }
    }

    #[test]
    fn test_arith_command() {
        let script = parse_ok("(( x > 3 ))");
        assert!(matches!(
            script.items[0].pipelines[0].elements[0],
            Cmd::Arith(_)
        ));
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse("echo ok\nif then").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_comments_skipped() {
        let script = parse_ok("# leading comment\necho hi # trailing");
        let cmd = first_simple(&script);
        assert_eq!(cmd.words.len(), 2);
    }

    #[test]
    fn test_line_continuation() {
        let script = parse_ok("echo a \\\n  b");
        let cmd = first_simple(&script);
        assert_eq!(cmd.words.len(), 3);
    }

    #[test]
    fn test_process_substitution() {
        let script = parse_ok("diff <(sort a) <(sort b)");
        let cmd = first_simple(&script);
        assert!(matches!(
            cmd.words[1].parts[0],
            WordPart::ProcSub { write: false, .. }
        ));
    }

    #[test]
    fn test_tilde_word() {
        let script = parse_ok("cd ~/projects");
        let cmd = first_simple(&script);
        assert_eq!(cmd.words[1].parts[0], WordPart::Tilde(None));
    }

    #[test]
    fn test_arith_literals() {
        use super::arith::parse_integer_literal;
        assert_eq!(parse_integer_literal("42"), Some(42));
        assert_eq!(parse_integer_literal("0x1f"), Some(31));
        assert_eq!(parse_integer_literal("010"), Some(8));
        assert_eq!(parse_integer_literal("2#1010"), Some(10));
        assert_eq!(parse_integer_literal("16#ff"), Some(255));
        assert_eq!(parse_integer_literal("nope"), None);
    }
}
