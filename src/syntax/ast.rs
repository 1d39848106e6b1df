//! Abstract Syntax Tree
//!
//! The parser's output. Nodes are immutable after parsing; the
//! interpreter walks them by reference and never mutates them. Every
//! statement-level node carries the source position it started at, which
//! feeds diagnostics, `$LINENO`, and `BASH_SOURCE` bookkeeping.

/// Source position (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

/// A whole script: a sequence of and-or lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub items: Vec<AndOrList>,
}

/// Pipelines glued with `&&`, `||`, and `;`.
#[derive(Debug, Clone, PartialEq)]
pub struct AndOrList {
    pub pipelines: Vec<Pipeline>,
    /// `connectors[i]` sits between `pipelines[i]` and `pipelines[i+1]`.
    pub connectors: Vec<Connector>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    AndIf, // &&
    OrIf,  // ||
    Seq,   // ;
}

/// `cmd1 | cmd2 |& cmd3`, possibly negated with `!` or timed with `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Never empty.
    pub elements: Vec<Cmd>,
    /// `stderr_pipes[i]` is true when the pipe after `elements[i]` was `|&`.
    pub stderr_pipes: Vec<bool>,
    pub bang: bool,
    pub timed: bool,
}

/// Any command, simple or compound.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    Simple(SimpleCmd),
    If(IfCmd),
    While(LoopCmd),
    Until(LoopCmd),
    For(ForCmd),
    ArithFor(ArithForCmd),
    Select(ForCmd),
    Case(CaseCmd),
    Group(BlockCmd),
    Subshell(BlockCmd),
    Cond(CondCmd),
    Arith(ArithCmd),
    FuncDef(FuncDef),
}

impl Cmd {
    pub fn redirs(&self) -> &[Redirect] {
        match self {
            Cmd::Simple(c) => &c.redirs,
            Cmd::If(c) => &c.redirs,
            Cmd::While(c) | Cmd::Until(c) => &c.redirs,
            Cmd::For(c) | Cmd::Select(c) => &c.redirs,
            Cmd::ArithFor(c) => &c.redirs,
            Cmd::Case(c) => &c.redirs,
            Cmd::Group(c) | Cmd::Subshell(c) => &c.redirs,
            Cmd::Cond(c) => &c.redirs,
            Cmd::Arith(c) => &c.redirs,
            Cmd::FuncDef(c) => &c.redirs,
        }
    }
}

/// `VAR=x VAR2+=y cmd arg1 arg2 <redirs`
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCmd {
    pub assigns: Vec<Assign>,
    /// Command name followed by arguments; empty for assignment-only lines.
    pub words: Vec<Word>,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub name: String,
    /// Subscript for `name[idx]=…`.
    pub index: Option<Word>,
    pub append: bool,
    /// Scalar right-hand side; `None` for bare `name=` or array assignment.
    pub value: Option<Word>,
    /// `name=(a b c)` elements, each possibly `[k]=v` shaped.
    pub array: Option<Vec<Word>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfCmd {
    /// `(condition, body)` for the `if` and each `elif`.
    pub arms: Vec<(Vec<AndOrList>, Vec<AndOrList>)>,
    pub else_body: Option<Vec<AndOrList>>,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

/// Shared by `while` and `until`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCmd {
    pub condition: Vec<AndOrList>,
    pub body: Vec<AndOrList>,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForCmd {
    pub var: String,
    /// `None` means iterate `"$@"`.
    pub list: Option<Vec<Word>>,
    pub body: Vec<AndOrList>,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithForCmd {
    pub init: Option<ArithExpr>,
    pub cond: Option<ArithExpr>,
    pub step: Option<ArithExpr>,
    pub body: Vec<AndOrList>,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseCmd {
    pub subject: Word,
    pub arms: Vec<CaseArm>,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub patterns: Vec<Word>,
    pub body: Vec<AndOrList>,
    pub terminator: CaseFall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFall {
    /// `;;` — stop after this arm.
    Stop,
    /// `;&` — run the next arm's body unconditionally.
    Through,
    /// `;;&` — keep testing later patterns.
    Resume,
}

/// `{ …; }` and `( … )` share a body shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockCmd {
    pub body: Vec<AndOrList>,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondCmd {
    pub expr: CondExpr,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithCmd {
    pub expr: ArithExpr,
    pub redirs: Vec<Redirect>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub body: Box<Cmd>,
    pub redirs: Vec<Redirect>,
    /// Script label the definition came from; feeds `BASH_SOURCE`.
    pub source: Option<String>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Redirections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    /// Explicit descriptor, e.g. the 2 in `2>`.
    pub fd: Option<u32>,
    pub op: RedirOp,
    pub target: RedirTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirOp {
    In,           // <
    Out,          // >
    OutAppend,    // >>
    OutClobber,   // >|
    InOut,        // <>
    DupIn,        // <&
    DupOut,       // >&
    OutErr,       // &>
    OutErrAppend, // &>>
    HereString,   // <<<
    HereDoc,      // << and <<-
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedirTarget {
    Word(Word),
    HereDoc(HereDoc),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HereDoc {
    pub tag: String,
    /// Body as a word: one literal part when the tag was quoted, expansion
    /// parts otherwise.
    pub body: Word,
    pub strip_tabs: bool,
    pub quoted: bool,
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

/// One shell word: a run of parts that expansion later fuses and splits.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    pub fn lit(text: impl Into<String>) -> Self {
        Word {
            parts: vec![WordPart::Lit(text.into())],
        }
    }

    /// The word's text when it is entirely literal (no quoting, no
    /// expansions); used for assignment detection and `case` keywords.
    pub fn as_lit(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [WordPart::Lit(s)] => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    /// Unquoted text; may contain glob metacharacters.
    Lit(String),
    /// `'…'` — fully literal. Also the decoded form of `$'…'`.
    SingleQuoted(String),
    /// `"…"` — inner parts exclude `SingleQuoted`.
    DoubleQuoted(Vec<WordPart>),
    /// `\x` outside quotes.
    Escaped(char),
    Param(ParamExp),
    CmdSub {
        script: Script,
        backquoted: bool,
    },
    ArithSub(ArithExpr),
    /// `<(…)` / `>(…)`, emulated through temp files.
    ProcSub {
        script: Script,
        write: bool,
    },
    Brace(Vec<BraceElem>),
    /// Leading `~` or `~user`.
    Tilde(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceElem {
    Item(Word),
    NumRange {
        start: i64,
        end: i64,
        step: i64,
        /// Zero-pad width when either endpoint had leading zeros.
        width: usize,
    },
    CharRange {
        start: char,
        end: char,
        step: i64,
    },
}

// ---------------------------------------------------------------------------
// Parameter expansion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ParamExp {
    /// Variable name, or a special parameter (`@ * # ? $ ! 0 1 …`).
    pub name: String,
    /// Array subscript: `${a[expr]}`, `${a[@]}`, `${a[*]}`.
    pub index: Option<ParamIndex>,
    pub op: Option<ParamOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamIndex {
    All,  // [@]
    Star, // [*]
    Expr(Word),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamOp {
    /// `${x:-w}` / `${x-w}`
    Default { word: Word, colon: bool },
    /// `${x:=w}` / `${x=w}`
    AssignDefault { word: Word, colon: bool },
    /// `${x:+w}` / `${x+w}`
    Alternative { word: Word, colon: bool },
    /// `${x:?w}` / `${x?w}`
    ErrorIfUnset { word: Option<Word>, colon: bool },
    /// `${x#p}` / `${x##p}`
    TrimPrefix { pattern: Word, greedy: bool },
    /// `${x%p}` / `${x%%p}`
    TrimSuffix { pattern: Word, greedy: bool },
    /// `${x/p/r}` family.
    Replace {
        pattern: Word,
        replacement: Option<Word>,
        all: bool,
        anchor: Option<ReplaceAnchor>,
    },
    /// `${x:off}` / `${x:off:len}`
    Substring {
        offset: ArithExpr,
        length: Option<ArithExpr>,
    },
    /// `${#x}`
    Length,
    /// `${!x}`
    Indirect,
    /// `${!prefix@}` / `${!prefix*}` — `name` holds the prefix.
    NamesWithPrefix { star: bool },
    /// `${!arr[@]}` / `${!arr[*]}`
    ArrayKeys { star: bool },
    /// `${x^p}` `${x^^p}` `${x,p}` `${x,,p}`
    CaseConvert {
        upper: bool,
        all: bool,
        pattern: Option<Word>,
    },
    /// `${x@Q}` and friends.
    Transform(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceAnchor {
    Start,
    End,
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Num(i64),
    /// Variable or array element reference.
    Var {
        name: String,
        index: Option<Box<ArithExpr>>,
        /// String subscript for associative arrays.
        key: Option<String>,
    },
    Unary {
        op: ArithUnary,
        operand: Box<ArithExpr>,
        postfix: bool,
    },
    Binary {
        op: ArithBinary,
        lhs: Box<ArithExpr>,
        rhs: Box<ArithExpr>,
    },
    Ternary {
        cond: Box<ArithExpr>,
        then: Box<ArithExpr>,
        otherwise: Box<ArithExpr>,
    },
    Assign {
        name: String,
        index: Option<Box<ArithExpr>>,
        key: Option<String>,
        op: ArithAssignOp,
        rhs: Box<ArithExpr>,
    },
    Group(Box<ArithExpr>),
    /// An embedded expansion (`$x`, `${x}`, `$(cmd)`): the word is
    /// expanded to text, then evaluated as a nested expression.
    WordExpr(Word),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithUnary {
    Neg,
    Pos,
    Not,
    BitNot,
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithBinary {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithAssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    Xor,
    Or,
}

// ---------------------------------------------------------------------------
// [[ … ]] conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CondExpr {
    And(Box<CondExpr>, Box<CondExpr>),
    Or(Box<CondExpr>, Box<CondExpr>),
    Not(Box<CondExpr>),
    Group(Box<CondExpr>),
    /// `-f word`, `-z word`, …
    Unary { op: char, operand: Word },
    /// `a = b`, `a =~ re`, `a -lt b`, …
    Binary {
        op: CondBinaryOp,
        lhs: Word,
        rhs: Word,
    },
    /// Bare word: true when non-empty.
    Value(Word),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondBinaryOp {
    StrEq,    // = and ==  (pattern match)
    StrNe,    // !=        (pattern mismatch)
    Regex,    // =~
    StrLt,    // <
    StrGt,    // >
    NumEq,    // -eq
    NumNe,    // -ne
    NumLt,    // -lt
    NumLe,    // -le
    NumGt,    // -gt
    NumGe,    // -ge
    NewerThan, // -nt
    OlderThan, // -ot
    SameFile, // -ef
}
