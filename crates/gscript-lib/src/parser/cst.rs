//! Syntax kinds for the GSC/CSC scripting languages.
//!
//! `SyntaxKind` serves dual roles: token kinds (from lexer) and node kinds (from parser).
//! Logos derives token recognition; node kinds lack token/regex attributes.
//! `GscLang` implements Rowan's `Language` trait for tree construction.
//!
//! GSC keywords are case-insensitive (`IF`, `If` and `if` are the same keyword);
//! identifier comparisons elsewhere in the analyzer are case-insensitive too.

use logos::Logos;
use rowan::Language;

/// All token and node kinds. Tokens first, then nodes, then `__LAST` sentinel.
/// `#[repr(u16)]` enables safe transmute in `kind_from_raw`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    #[token("(")]
    ParenOpen = 0,

    #[token(")")]
    ParenClose,

    /// `[[` opens a function-pointer dereference. Defined before `[` so the
    /// two-character form wins.
    #[token("[[")]
    DoubleBracketOpen,

    #[token("]]")]
    DoubleBracketClose,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    /// `...` vararg marker. Defined before `.` for correct precedence.
    #[token("...")]
    Ellipsis,

    #[token(".")]
    Dot,

    /// `::` for namespace-qualified names.
    #[token("::")]
    ColonColon,

    #[token(":")]
    Colon,

    #[token("?")]
    QuestionMark,

    #[token("->")]
    Arrow,

    #[token("++")]
    PlusPlus,

    #[token("--")]
    MinusMinus,

    #[token("+=")]
    PlusAssign,

    #[token("-=")]
    MinusAssign,

    #[token("*=")]
    StarAssign,

    #[token("/=")]
    SlashAssign,

    #[token("%=")]
    PercentAssign,

    #[token("&=")]
    AmpAssign,

    #[token("|=")]
    PipeAssign,

    #[token("^=")]
    CaretAssign,

    #[token("<<=")]
    ShiftLeftAssign,

    #[token(">>=")]
    ShiftRightAssign,

    #[token("===")]
    EqEqEq,

    #[token("!==")]
    BangEqEq,

    #[token("==")]
    EqEq,

    #[token("!=")]
    BangEq,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("<<")]
    ShiftLeft,

    #[token(">>")]
    ShiftRight,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("&&")]
    AmpAmp,

    #[token("||")]
    PipePipe,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    #[token("^")]
    Caret,

    #[token("~")]
    Tilde,

    #[token("!")]
    Bang,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    /// `/#` opens a dev block. Defined before `/` so it wins.
    #[token("/#")]
    DevOpen,

    #[token("#/")]
    DevClose,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("=")]
    Assign,

    #[token("\\")]
    Backslash,

    // --- Directives ---
    #[token("#using_animtree", ignore(case))]
    AnimTreeDirective,

    #[token("#using", ignore(case))]
    UsingDirective,

    #[token("#insert", ignore(case))]
    InsertDirective,

    #[token("#namespace", ignore(case))]
    NamespaceDirective,

    #[token("#precache", ignore(case))]
    PrecacheDirective,

    // --- Keywords ---
    #[token("function", ignore(case))]
    KwFunction,

    #[token("class", ignore(case))]
    KwClass,

    #[token("var", ignore(case))]
    KwVar,

    #[token("constructor", ignore(case))]
    KwConstructor,

    #[token("destructor", ignore(case))]
    KwDestructor,

    #[token("if", ignore(case))]
    KwIf,

    #[token("else", ignore(case))]
    KwElse,

    #[token("while", ignore(case))]
    KwWhile,

    #[token("do", ignore(case))]
    KwDo,

    #[token("foreach", ignore(case))]
    KwForeach,

    #[token("for", ignore(case))]
    KwFor,

    #[token("in", ignore(case))]
    KwIn,

    #[token("switch", ignore(case))]
    KwSwitch,

    #[token("case", ignore(case))]
    KwCase,

    #[token("default", ignore(case))]
    KwDefault,

    #[token("return", ignore(case))]
    KwReturn,

    #[token("break", ignore(case))]
    KwBreak,

    #[token("continue", ignore(case))]
    KwContinue,

    #[token("waittillframeend", ignore(case))]
    KwWaittillFrameEnd,

    #[token("waittillmatch", ignore(case))]
    KwWaittillMatch,

    #[token("waittill", ignore(case))]
    KwWaittill,

    #[token("waitrealtime", ignore(case))]
    KwWaitRealTime,

    #[token("wait", ignore(case))]
    KwWait,

    #[token("const", ignore(case))]
    KwConst,

    #[token("thread", ignore(case))]
    KwThread,

    #[token("new", ignore(case))]
    KwNew,

    #[token("private", ignore(case))]
    KwPrivate,

    #[token("autoexec", ignore(case))]
    KwAutoexec,

    #[token("true", ignore(case))]
    KwTrue,

    #[token("false", ignore(case))]
    KwFalse,

    #[token("undefined", ignore(case))]
    KwUndefined,

    // --- Literals ---
    /// Float before Int so `1.5` does not lex as `1` `.` `5`.
    #[regex(r"[0-9]+\.[0-9]*|\.[0-9]+")]
    FloatLit,

    #[regex(r"0[xX][0-9a-fA-F]+|[0-9]+")]
    IntLit,

    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    StringLit,

    /// Localized string: `&"REF"`.
    #[regex(r#"&"(?:[^"\\]|\\.)*""#)]
    IStringLit,

    /// Hash literal: `#"name"`.
    #[regex(r##"#"(?:[^"\\]|\\.)*""##)]
    HashLit,

    /// Identifier. Keywords are defined earlier so they take precedence.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // --- Trivia ---
    #[regex(r"[ \t]+")]
    Whitespace,

    #[token("\n")]
    #[token("\r\n")]
    Newline,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*(?:[^*]|\*[^/])*\*/")]
    BlockComment,

    /// Coalesced unrecognized characters
    Garbage,
    Error,

    // --- Node kinds (non-terminals) ---
    Script,
    Using,
    Insert,
    Precache,
    UsingAnimTree,
    Namespace,
    Path,
    FunDefn,
    ParamList,
    Param,
    ClassDefn,
    MemberDecl,
    Structor,
    Block,
    EmptyStmt,
    IfStmt,
    DoWhileStmt,
    WhileStmt,
    ForStmt,
    ForeachStmt,
    SwitchStmt,
    CaseLabel,
    CaseBody,
    ReturnStmt,
    WaitStmt,
    WaitRealTimeStmt,
    WaittillFrameEndStmt,
    BreakStmt,
    ContinueStmt,
    ConstStmt,
    ExprStmt,
    DevBlock,
    LiteralExpr,
    IdentExpr,
    BinaryExpr,
    PrefixExpr,
    PostfixExpr,
    TernaryExpr,
    VectorExpr,
    ArrayLit,
    AnimRefExpr,
    IndexExpr,
    MemberExpr,
    NsMemberExpr,
    FuncRefExpr,
    CallExpr,
    MethodCallExpr,
    CalledOnExpr,
    ThreadExpr,
    ConstructorExpr,
    WaittillExpr,
    WaittillMatchExpr,
    DerefExpr,
    ParenExpr,
    ArgList,

    // Must be last - used for bounds checking in `kind_from_raw`
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | Newline | LineComment | BlockComment)
    }

    #[inline]
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (KwFunction as u16) && (self as u16) <= (KwUndefined as u16)
    }

    #[inline]
    pub fn is_assign_op(self) -> bool {
        matches!(
            self,
            Assign
                | PlusAssign
                | MinusAssign
                | StarAssign
                | SlashAssign
                | PercentAssign
                | AmpAssign
                | PipeAssign
                | CaretAssign
                | ShiftLeftAssign
                | ShiftRightAssign
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language tag for Rowan's tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GscLang {}

impl Language for GscLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 < __LAST as u16);
        // SAFETY: We've verified the value is in bounds, and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for Rowan types parameterized by our language.
pub type SyntaxNode = rowan::SyntaxNode<GscLang>;
pub type SyntaxToken = rowan::SyntaxToken<GscLang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// 128-bit bitset of token `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u128);

impl TokenSet {
    /// Creates an empty token set.
    pub const EMPTY: TokenSet = TokenSet(0);

    /// Panics at compile time if any kind's discriminant >= 128.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u128;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 128, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 128 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..128u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser.
pub mod token_sets {
    use super::*;

    pub const TRIVIA: TokenSet = TokenSet::new(&[Whitespace, Newline, LineComment, BlockComment]);

    /// FIRST set of script-level items; the top-level resync target.
    pub const ITEM_FIRST: TokenSet = TokenSet::new(&[
        UsingDirective,
        InsertDirective,
        NamespaceDirective,
        PrecacheDirective,
        AnimTreeDirective,
        KwFunction,
        KwClass,
        DevOpen,
    ]);

    /// FIRST set of expressions.
    pub const EXPR_FIRST: TokenSet = TokenSet::new(&[
        Ident,
        IntLit,
        FloatLit,
        StringLit,
        IStringLit,
        HashLit,
        KwTrue,
        KwFalse,
        KwUndefined,
        ParenOpen,
        BracketOpen,
        DoubleBracketOpen,
        Amp,
        Percent,
        KwThread,
        KwNew,
        Bang,
        Tilde,
        Plus,
        Minus,
    ]);

    /// FIRST set of statements (statement keywords plus everything that can
    /// start an expression statement).
    pub const STMT_FIRST: TokenSet = EXPR_FIRST.union(TokenSet::new(&[
        Semicolon,
        BraceOpen,
        DevOpen,
        KwIf,
        KwWhile,
        KwDo,
        KwFor,
        KwForeach,
        KwSwitch,
        KwReturn,
        KwBreak,
        KwContinue,
        KwWait,
        KwWaitRealTime,
        KwWaittillFrameEnd,
        KwConst,
    ]));

    /// Synchronization points for statement-level recovery.
    pub const STMT_RECOVERY: TokenSet = TokenSet::new(&[Semicolon, BraceOpen, BraceClose]);

    pub const ASSIGN_OPS: TokenSet = TokenSet::new(&[
        Assign,
        PlusAssign,
        MinusAssign,
        StarAssign,
        SlashAssign,
        PercentAssign,
        AmpAssign,
        PipeAssign,
        CaretAssign,
        ShiftLeftAssign,
        ShiftRightAssign,
    ]);

    pub const EQUALITY_OPS: TokenSet = TokenSet::new(&[EqEq, BangEq, EqEqEq, BangEqEq]);
    pub const RELATIONAL_OPS: TokenSet = TokenSet::new(&[Lt, LtEq, Gt, GtEq]);
    pub const SHIFT_OPS: TokenSet = TokenSet::new(&[ShiftLeft, ShiftRight]);
    pub const ADDITIVE_OPS: TokenSet = TokenSet::new(&[Plus, Minus]);
    pub const MULTIPLICATIVE_OPS: TokenSet = TokenSet::new(&[Star, Slash, Percent]);

    /// Tokens that may follow a primary to form a called-on expression:
    /// `target fn()`, `target thread fn()`, `target waittill(...)`.
    pub const CALLED_ON_FOLLOW: TokenSet =
        TokenSet::new(&[Ident, KwThread, KwWaittill, KwWaittillMatch, DoubleBracketOpen]);

    pub const CASE_FIRST: TokenSet = TokenSet::new(&[KwCase, KwDefault]);
}
