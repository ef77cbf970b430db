//! Typed AST wrappers over CST nodes.
//!
//! Each struct wraps a `SyntaxNode` and provides typed accessors.
//! Cast is infallible for correct `SyntaxKind` - validation happens elsewhere.

use rowan::TextRange;

use super::cst::{SyntaxKind, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl $name {
            pub fn cast(node: SyntaxNode) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node))
            }

            pub fn as_cst(&self) -> &SyntaxNode {
                &self.0
            }

            pub fn range(&self) -> TextRange {
                self.0.text_range()
            }
        }
    };
}

ast_node!(Script, Script);
ast_node!(Using, Using);
ast_node!(Insert, Insert);
ast_node!(Precache, Precache);
ast_node!(UsingAnimTree, UsingAnimTree);
ast_node!(Namespace, Namespace);
ast_node!(Path, Path);
ast_node!(FunDefn, FunDefn);
ast_node!(ParamList, ParamList);
ast_node!(Param, Param);
ast_node!(ClassDefn, ClassDefn);
ast_node!(MemberDecl, MemberDecl);
ast_node!(Structor, Structor);
ast_node!(Block, Block);
ast_node!(EmptyStmt, EmptyStmt);
ast_node!(IfStmt, IfStmt);
ast_node!(DoWhileStmt, DoWhileStmt);
ast_node!(WhileStmt, WhileStmt);
ast_node!(ForStmt, ForStmt);
ast_node!(ForeachStmt, ForeachStmt);
ast_node!(SwitchStmt, SwitchStmt);
ast_node!(CaseLabel, CaseLabel);
ast_node!(ReturnStmt, ReturnStmt);
ast_node!(WaitStmt, WaitStmt);
ast_node!(WaitRealTimeStmt, WaitRealTimeStmt);
ast_node!(WaittillFrameEndStmt, WaittillFrameEndStmt);
ast_node!(BreakStmt, BreakStmt);
ast_node!(ContinueStmt, ContinueStmt);
ast_node!(ConstStmt, ConstStmt);
ast_node!(ExprStmt, ExprStmt);
ast_node!(DevBlock, DevBlock);
ast_node!(LiteralExpr, LiteralExpr);
ast_node!(IdentExpr, IdentExpr);
ast_node!(BinaryExpr, BinaryExpr);
ast_node!(PrefixExpr, PrefixExpr);
ast_node!(PostfixExpr, PostfixExpr);
ast_node!(TernaryExpr, TernaryExpr);
ast_node!(VectorExpr, VectorExpr);
ast_node!(ArrayLit, ArrayLit);
ast_node!(AnimRefExpr, AnimRefExpr);
ast_node!(IndexExpr, IndexExpr);
ast_node!(MemberExpr, MemberExpr);
ast_node!(NsMemberExpr, NsMemberExpr);
ast_node!(FuncRefExpr, FuncRefExpr);
ast_node!(CallExpr, CallExpr);
ast_node!(MethodCallExpr, MethodCallExpr);
ast_node!(CalledOnExpr, CalledOnExpr);
ast_node!(ThreadExpr, ThreadExpr);
ast_node!(ConstructorExpr, ConstructorExpr);
ast_node!(WaittillExpr, WaittillExpr);
ast_node!(WaittillMatchExpr, WaittillMatchExpr);
ast_node!(DerefExpr, DerefExpr);
ast_node!(ParenExpr, ParenExpr);
ast_node!(ArgList, ArgList);

fn tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + '_ {
    node.children_with_tokens().filter_map(|it| it.into_token())
}

fn token_of(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    tokens(node).find(|t| t.kind() == kind)
}

fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    token_of(node, kind).is_some()
}

fn nth_expr(node: &SyntaxNode, n: usize) -> Option<Expr> {
    node.children().filter_map(Expr::cast).nth(n)
}

fn nth_stmt(node: &SyntaxNode, n: usize) -> Option<Stmt> {
    node.children().filter_map(Stmt::cast).nth(n)
}

/// A script-level item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Using(Using),
    Insert(Insert),
    Precache(Precache),
    UsingAnimTree(UsingAnimTree),
    Namespace(Namespace),
    Function(FunDefn),
    Class(ClassDefn),
    DevBlock(DevBlock),
}

impl Item {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::Using => Using::cast(node).map(Item::Using),
            SyntaxKind::Insert => Insert::cast(node).map(Item::Insert),
            SyntaxKind::Precache => Precache::cast(node).map(Item::Precache),
            SyntaxKind::UsingAnimTree => UsingAnimTree::cast(node).map(Item::UsingAnimTree),
            SyntaxKind::Namespace => Namespace::cast(node).map(Item::Namespace),
            SyntaxKind::FunDefn => FunDefn::cast(node).map(Item::Function),
            SyntaxKind::ClassDefn => ClassDefn::cast(node).map(Item::Class),
            SyntaxKind::DevBlock => DevBlock::cast(node).map(Item::DevBlock),
            _ => None,
        }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Empty(EmptyStmt),
    Block(Block),
    If(IfStmt),
    DoWhile(DoWhileStmt),
    While(WhileStmt),
    For(ForStmt),
    Foreach(ForeachStmt),
    Switch(SwitchStmt),
    Return(ReturnStmt),
    Wait(WaitStmt),
    WaitRealTime(WaitRealTimeStmt),
    WaittillFrameEnd(WaittillFrameEndStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Const(ConstStmt),
    Expr(ExprStmt),
    Dev(DevBlock),
}

impl Stmt {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::EmptyStmt => EmptyStmt::cast(node).map(Stmt::Empty),
            SyntaxKind::Block => Block::cast(node).map(Stmt::Block),
            SyntaxKind::IfStmt => IfStmt::cast(node).map(Stmt::If),
            SyntaxKind::DoWhileStmt => DoWhileStmt::cast(node).map(Stmt::DoWhile),
            SyntaxKind::WhileStmt => WhileStmt::cast(node).map(Stmt::While),
            SyntaxKind::ForStmt => ForStmt::cast(node).map(Stmt::For),
            SyntaxKind::ForeachStmt => ForeachStmt::cast(node).map(Stmt::Foreach),
            SyntaxKind::SwitchStmt => SwitchStmt::cast(node).map(Stmt::Switch),
            SyntaxKind::ReturnStmt => ReturnStmt::cast(node).map(Stmt::Return),
            SyntaxKind::WaitStmt => WaitStmt::cast(node).map(Stmt::Wait),
            SyntaxKind::WaitRealTimeStmt => WaitRealTimeStmt::cast(node).map(Stmt::WaitRealTime),
            SyntaxKind::WaittillFrameEndStmt => {
                WaittillFrameEndStmt::cast(node).map(Stmt::WaittillFrameEnd)
            }
            SyntaxKind::BreakStmt => BreakStmt::cast(node).map(Stmt::Break),
            SyntaxKind::ContinueStmt => ContinueStmt::cast(node).map(Stmt::Continue),
            SyntaxKind::ConstStmt => ConstStmt::cast(node).map(Stmt::Const),
            SyntaxKind::ExprStmt => ExprStmt::cast(node).map(Stmt::Expr),
            SyntaxKind::DevBlock => DevBlock::cast(node).map(Stmt::Dev),
            _ => None,
        }
    }

    pub fn as_cst(&self) -> &SyntaxNode {
        match self {
            Stmt::Empty(n) => n.as_cst(),
            Stmt::Block(n) => n.as_cst(),
            Stmt::If(n) => n.as_cst(),
            Stmt::DoWhile(n) => n.as_cst(),
            Stmt::While(n) => n.as_cst(),
            Stmt::For(n) => n.as_cst(),
            Stmt::Foreach(n) => n.as_cst(),
            Stmt::Switch(n) => n.as_cst(),
            Stmt::Return(n) => n.as_cst(),
            Stmt::Wait(n) => n.as_cst(),
            Stmt::WaitRealTime(n) => n.as_cst(),
            Stmt::WaittillFrameEnd(n) => n.as_cst(),
            Stmt::Break(n) => n.as_cst(),
            Stmt::Continue(n) => n.as_cst(),
            Stmt::Const(n) => n.as_cst(),
            Stmt::Expr(n) => n.as_cst(),
            Stmt::Dev(n) => n.as_cst(),
        }
    }

    pub fn range(&self) -> TextRange {
        self.as_cst().text_range()
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(LiteralExpr),
    Ident(IdentExpr),
    Binary(BinaryExpr),
    Prefix(PrefixExpr),
    Postfix(PostfixExpr),
    Ternary(TernaryExpr),
    Vector(VectorExpr),
    Array(ArrayLit),
    AnimRef(AnimRefExpr),
    Index(IndexExpr),
    Member(MemberExpr),
    NsMember(NsMemberExpr),
    FuncRef(FuncRefExpr),
    Call(CallExpr),
    MethodCall(MethodCallExpr),
    CalledOn(CalledOnExpr),
    Thread(ThreadExpr),
    Constructor(ConstructorExpr),
    Waittill(WaittillExpr),
    WaittillMatch(WaittillMatchExpr),
    Deref(DerefExpr),
    Paren(ParenExpr),
}

impl Expr {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::LiteralExpr => LiteralExpr::cast(node).map(Expr::Literal),
            SyntaxKind::IdentExpr => IdentExpr::cast(node).map(Expr::Ident),
            SyntaxKind::BinaryExpr => BinaryExpr::cast(node).map(Expr::Binary),
            SyntaxKind::PrefixExpr => PrefixExpr::cast(node).map(Expr::Prefix),
            SyntaxKind::PostfixExpr => PostfixExpr::cast(node).map(Expr::Postfix),
            SyntaxKind::TernaryExpr => TernaryExpr::cast(node).map(Expr::Ternary),
            SyntaxKind::VectorExpr => VectorExpr::cast(node).map(Expr::Vector),
            SyntaxKind::ArrayLit => ArrayLit::cast(node).map(Expr::Array),
            SyntaxKind::AnimRefExpr => AnimRefExpr::cast(node).map(Expr::AnimRef),
            SyntaxKind::IndexExpr => IndexExpr::cast(node).map(Expr::Index),
            SyntaxKind::MemberExpr => MemberExpr::cast(node).map(Expr::Member),
            SyntaxKind::NsMemberExpr => NsMemberExpr::cast(node).map(Expr::NsMember),
            SyntaxKind::FuncRefExpr => FuncRefExpr::cast(node).map(Expr::FuncRef),
            SyntaxKind::CallExpr => CallExpr::cast(node).map(Expr::Call),
            SyntaxKind::MethodCallExpr => MethodCallExpr::cast(node).map(Expr::MethodCall),
            SyntaxKind::CalledOnExpr => CalledOnExpr::cast(node).map(Expr::CalledOn),
            SyntaxKind::ThreadExpr => ThreadExpr::cast(node).map(Expr::Thread),
            SyntaxKind::ConstructorExpr => ConstructorExpr::cast(node).map(Expr::Constructor),
            SyntaxKind::WaittillExpr => WaittillExpr::cast(node).map(Expr::Waittill),
            SyntaxKind::WaittillMatchExpr => {
                WaittillMatchExpr::cast(node).map(Expr::WaittillMatch)
            }
            SyntaxKind::DerefExpr => DerefExpr::cast(node).map(Expr::Deref),
            SyntaxKind::ParenExpr => ParenExpr::cast(node).map(Expr::Paren),
            _ => None,
        }
    }

    pub fn as_cst(&self) -> &SyntaxNode {
        match self {
            Expr::Literal(n) => n.as_cst(),
            Expr::Ident(n) => n.as_cst(),
            Expr::Binary(n) => n.as_cst(),
            Expr::Prefix(n) => n.as_cst(),
            Expr::Postfix(n) => n.as_cst(),
            Expr::Ternary(n) => n.as_cst(),
            Expr::Vector(n) => n.as_cst(),
            Expr::Array(n) => n.as_cst(),
            Expr::AnimRef(n) => n.as_cst(),
            Expr::Index(n) => n.as_cst(),
            Expr::Member(n) => n.as_cst(),
            Expr::NsMember(n) => n.as_cst(),
            Expr::FuncRef(n) => n.as_cst(),
            Expr::Call(n) => n.as_cst(),
            Expr::MethodCall(n) => n.as_cst(),
            Expr::CalledOn(n) => n.as_cst(),
            Expr::Thread(n) => n.as_cst(),
            Expr::Constructor(n) => n.as_cst(),
            Expr::Waittill(n) => n.as_cst(),
            Expr::WaittillMatch(n) => n.as_cst(),
            Expr::Deref(n) => n.as_cst(),
            Expr::Paren(n) => n.as_cst(),
        }
    }

    pub fn range(&self) -> TextRange {
        self.as_cst().text_range()
    }
}

impl Script {
    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.0.children().filter_map(Item::cast)
    }

    pub fn functions(&self) -> impl Iterator<Item = FunDefn> + '_ {
        self.0.children().filter_map(FunDefn::cast)
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassDefn> + '_ {
        self.0.children().filter_map(ClassDefn::cast)
    }
}

impl Using {
    pub fn path(&self) -> Option<Path> {
        self.0.children().find_map(Path::cast)
    }
}

impl Insert {
    pub fn path(&self) -> Option<Path> {
        self.0.children().find_map(Path::cast)
    }
}

impl Path {
    /// The path as written, e.g. `scripts\shared\util`.
    pub fn text(&self) -> String {
        tokens(&self.0)
            .filter(|t| !t.kind().is_trivia())
            .map(|t| t.text().to_owned())
            .collect()
    }

    /// The final path segment, which names the script.
    pub fn script_name(&self) -> Option<SyntaxToken> {
        tokens(&self.0)
            .filter(|t| t.kind() == SyntaxKind::Ident)
            .last()
    }
}

impl Namespace {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }
}

impl UsingAnimTree {
    pub fn tree_name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::StringLit)
    }
}

impl FunDefn {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }

    pub fn is_private(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwPrivate)
    }

    pub fn is_autoexec(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwAutoexec)
    }

    pub fn params(&self) -> Option<ParamList> {
        self.0.children().find_map(ParamList::cast)
    }

    pub fn body(&self) -> Option<Block> {
        self.0.children().find_map(Block::cast)
    }

    /// Contiguous line comments immediately above the definition.
    pub fn doc_comment(&self) -> Option<String> {
        doc_comment_above(&self.0)
    }
}

impl ParamList {
    pub fn params(&self) -> impl Iterator<Item = Param> + '_ {
        self.0.children().filter_map(Param::cast)
    }
}

impl Param {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }

    pub fn is_by_ref(&self) -> bool {
        has_token(&self.0, SyntaxKind::Amp)
    }

    pub fn is_vararg(&self) -> bool {
        has_token(&self.0, SyntaxKind::Ellipsis)
    }

    pub fn default_value(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

impl ClassDefn {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }

    /// The inherit target after `:`, if any.
    pub fn parent_name(&self) -> Option<SyntaxToken> {
        tokens(&self.0)
            .filter(|t| t.kind() == SyntaxKind::Ident)
            .nth(1)
    }

    pub fn members(&self) -> impl Iterator<Item = MemberDecl> + '_ {
        self.0.children().filter_map(MemberDecl::cast)
    }

    pub fn structors(&self) -> impl Iterator<Item = Structor> + '_ {
        self.0.children().filter_map(Structor::cast)
    }

    pub fn methods(&self) -> impl Iterator<Item = FunDefn> + '_ {
        self.0.children().filter_map(FunDefn::cast)
    }

    pub fn doc_comment(&self) -> Option<String> {
        doc_comment_above(&self.0)
    }
}

impl MemberDecl {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }
}

impl Structor {
    pub fn is_constructor(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwConstructor)
    }

    pub fn keyword(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|t| {
            matches!(t.kind(), SyntaxKind::KwConstructor | SyntaxKind::KwDestructor)
        })
    }

    pub fn params(&self) -> Option<ParamList> {
        self.0.children().find_map(ParamList::cast)
    }

    pub fn body(&self) -> Option<Block> {
        self.0.children().find_map(Block::cast)
    }
}

impl Block {
    pub fn stmts(&self) -> impl Iterator<Item = Stmt> + '_ {
        self.0.children().filter_map(Stmt::cast)
    }
}

impl IfStmt {
    pub fn condition(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn then_branch(&self) -> Option<Stmt> {
        nth_stmt(&self.0, 0)
    }

    pub fn else_branch(&self) -> Option<Stmt> {
        nth_stmt(&self.0, 1)
    }
}

impl WhileStmt {
    pub fn condition(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn body(&self) -> Option<Stmt> {
        nth_stmt(&self.0, 0)
    }
}

impl DoWhileStmt {
    pub fn condition(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn body(&self) -> Option<Stmt> {
        nth_stmt(&self.0, 0)
    }
}

impl ForStmt {
    /// The three header clauses, each optional, split on the header `;` tokens.
    pub fn clauses(&self) -> (Option<Expr>, Option<Expr>, Option<Expr>) {
        let mut init = None;
        let mut cond = None;
        let mut incr = None;
        let mut semis = 0;

        for element in self.0.children_with_tokens() {
            match element {
                rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::Semicolon => semis += 1,
                rowan::NodeOrToken::Node(n) => {
                    if let Some(expr) = Expr::cast(n) {
                        match semis {
                            0 => init = Some(expr),
                            1 => cond = Some(expr),
                            _ => incr = Some(expr),
                        }
                    }
                }
                _ => {}
            }
        }

        (init, cond, incr)
    }

    pub fn body(&self) -> Option<Stmt> {
        nth_stmt(&self.0, 0)
    }
}

impl ForeachStmt {
    /// `(key, value)` bindings; a single binding is the value.
    pub fn bindings(&self) -> (Option<SyntaxToken>, Option<SyntaxToken>) {
        let idents: Vec<SyntaxToken> = tokens(&self.0)
            .filter(|t| t.kind() == SyntaxKind::Ident)
            .collect();
        match idents.len() {
            0 => (None, None),
            1 => (None, Some(idents[0].clone())),
            _ => (Some(idents[0].clone()), Some(idents[1].clone())),
        }
    }

    pub fn collection(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn body(&self) -> Option<Stmt> {
        nth_stmt(&self.0, 0)
    }
}

/// A case label or a statement inside a switch body, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SwitchElement {
    Label(CaseLabel),
    Stmt(Stmt),
}

impl SwitchStmt {
    pub fn subject(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn elements(&self) -> impl Iterator<Item = SwitchElement> + '_ {
        self.0.children().filter_map(|n| {
            if n.kind() == SyntaxKind::CaseLabel {
                CaseLabel::cast(n).map(SwitchElement::Label)
            } else {
                Stmt::cast(n).map(SwitchElement::Stmt)
            }
        })
    }
}

impl CaseLabel {
    pub fn is_default(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwDefault)
    }

    pub fn value(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl ReturnStmt {
    pub fn value(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl WaitStmt {
    pub fn duration(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl WaitRealTimeStmt {
    pub fn duration(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl ConstStmt {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }

    pub fn value(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl ExprStmt {
    pub fn expr(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl DevBlock {
    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.0.children().filter_map(Item::cast)
    }

    pub fn stmts(&self) -> impl Iterator<Item = Stmt> + '_ {
        self.0.children().filter_map(Stmt::cast)
    }
}

impl LiteralExpr {
    pub fn token(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|t| !t.kind().is_trivia())
    }
}

impl IdentExpr {
    pub fn token(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }

    pub fn name(&self) -> Option<String> {
        self.token().map(|t| t.text().to_owned())
    }
}

impl BinaryExpr {
    pub fn lhs(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn rhs(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }

    /// The operator is the only direct token child.
    pub fn op(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|t| !t.kind().is_trivia())
    }
}

impl PrefixExpr {
    pub fn op(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|t| !t.kind().is_trivia())
    }

    pub fn operand(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl PostfixExpr {
    pub fn op(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|t| {
            matches!(t.kind(), SyntaxKind::PlusPlus | SyntaxKind::MinusMinus)
        })
    }

    pub fn operand(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl TernaryExpr {
    pub fn condition(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn then_expr(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }

    pub fn else_expr(&self) -> Option<Expr> {
        nth_expr(&self.0, 2)
    }
}

impl VectorExpr {
    pub fn components(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }
}

impl ArrayLit {
    pub fn elements(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }
}

impl AnimRefExpr {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }
}

impl IndexExpr {
    pub fn base(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn index(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }
}

impl MemberExpr {
    pub fn base(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn member(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }
}

impl NsMemberExpr {
    /// The namespace side, an identifier expression when well-formed.
    pub fn namespace(&self) -> Option<SyntaxToken> {
        self.0
            .children()
            .find_map(IdentExpr::cast)
            .and_then(|e| e.token())
    }

    /// The member name after `::`.
    pub fn member(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }
}

impl FuncRefExpr {
    /// `(namespace, name)`: `&ns::f` yields both, `&f` only the name.
    pub fn parts(&self) -> (Option<SyntaxToken>, Option<SyntaxToken>) {
        let idents: Vec<SyntaxToken> = tokens(&self.0)
            .filter(|t| t.kind() == SyntaxKind::Ident)
            .collect();
        match idents.len() {
            0 => (None, None),
            1 => (None, Some(idents[0].clone())),
            _ => (Some(idents[0].clone()), Some(idents[1].clone())),
        }
    }
}

impl CallExpr {
    pub fn callee(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn args(&self) -> Option<ArgList> {
        self.0.children().find_map(ArgList::cast)
    }
}

impl ArgList {
    pub fn args(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }

    pub fn count(&self) -> usize {
        self.args().count()
    }
}

impl MethodCallExpr {
    pub fn receiver(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn method(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }

    pub fn args(&self) -> Option<ArgList> {
        self.0.children().find_map(ArgList::cast)
    }
}

impl CalledOnExpr {
    pub fn target(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn call(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }
}

impl ThreadExpr {
    pub fn inner(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl ConstructorExpr {
    pub fn class_name(&self) -> Option<SyntaxToken> {
        token_of(&self.0, SyntaxKind::Ident)
    }

    pub fn args(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }
}

impl WaittillExpr {
    pub fn target(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn args(&self) -> Option<ArgList> {
        self.0.children().find_map(ArgList::cast)
    }
}

impl WaittillMatchExpr {
    pub fn target(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn args(&self) -> Option<ArgList> {
        self.0.children().find_map(ArgList::cast)
    }
}

impl DerefExpr {
    pub fn inner(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

impl ParenExpr {
    pub fn inner(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

/// Contiguous `//` comments (or a `/* */` block) directly above a node.
/// A blank line ends the run.
fn doc_comment_above(node: &SyntaxNode) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut newlines = 0;

    let mut cursor = node.prev_sibling_or_token();
    while let Some(rowan::NodeOrToken::Token(token)) = cursor {
        match token.kind() {
            SyntaxKind::Whitespace => {}
            SyntaxKind::Newline => {
                newlines += 1;
                if newlines > 1 {
                    break;
                }
            }
            SyntaxKind::LineComment => {
                newlines = 0;
                lines.push(token.text().trim_start_matches('/').trim().to_owned());
            }
            SyntaxKind::BlockComment => {
                if lines.is_empty() {
                    let text = token
                        .text()
                        .trim_start_matches("/*")
                        .trim_end_matches("*/")
                        .trim()
                        .to_owned();
                    lines.push(text);
                }
                break;
            }
            _ => break,
        }
        cursor = token.prev_sibling_or_token();
    }

    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}
