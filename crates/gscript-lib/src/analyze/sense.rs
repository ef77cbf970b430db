//! Editor facts: sense tokens, folding ranges and exported definition
//! locations. Computed during the non-silent analysis pass and handed to the
//! host verbatim.

use rowan::TextRange;
use serde::Serialize;

use crate::parser::{Script, SyntaxKind, SyntaxNode};

/// Semantic classification of one identifier token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SenseKind {
    Variable,
    Parameter,
    Field,
    Property,
    Function,
    Method,
    Namespace,
    Class,
}

/// Modifier bitset, in the same const-bitset style as `TokenSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SenseModifiers(u8);

impl SenseModifiers {
    pub const DECLARATION: SenseModifiers = SenseModifiers(1 << 0);
    pub const READONLY: SenseModifiers = SenseModifiers(1 << 1);
    pub const LOCAL: SenseModifiers = SenseModifiers(1 << 2);
    pub const DEFAULT_LIBRARY: SenseModifiers = SenseModifiers(1 << 3);

    pub const fn empty() -> SenseModifiers {
        SenseModifiers(0)
    }

    pub const fn contains(self, other: SenseModifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SenseModifiers {
    type Output = SenseModifiers;

    fn bitor(self, rhs: SenseModifiers) -> SenseModifiers {
        SenseModifiers(self.0 | rhs.0)
    }
}

/// One classified identifier with hover content.
#[derive(Debug, Clone)]
pub struct SenseToken {
    pub range: TextRange,
    pub kind: SenseKind,
    pub modifiers: SenseModifiers,
    pub hover: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FoldingKind {
    Braces,
    DevBlock,
    Switch,
}

#[derive(Debug, Clone)]
pub struct FoldingRange {
    pub range: TextRange,
    pub kind: FoldingKind,
}

/// A definition exported for cross-file go-to-definition.
#[derive(Debug, Clone)]
pub struct DefinitionLocation {
    pub namespace: String,
    pub name: String,
    pub range: TextRange,
    pub is_class: bool,
}

/// Folding ranges at `{...}` bodies, dev blocks and switch bodies.
pub fn collect_folding_ranges(script: &Script) -> Vec<FoldingRange> {
    let mut ranges = Vec::new();
    collect_folding(script.as_cst(), &mut ranges);
    ranges
}

fn collect_folding(node: &SyntaxNode, out: &mut Vec<FoldingRange>) {
    for child in node.children() {
        match child.kind() {
            SyntaxKind::Block => out.push(FoldingRange {
                range: child.text_range(),
                kind: FoldingKind::Braces,
            }),
            SyntaxKind::DevBlock => out.push(FoldingRange {
                range: child.text_range(),
                kind: FoldingKind::DevBlock,
            }),
            SyntaxKind::SwitchStmt | SyntaxKind::ClassDefn => out.push(FoldingRange {
                range: child.text_range(),
                kind: if child.kind() == SyntaxKind::SwitchStmt {
                    FoldingKind::Switch
                } else {
                    FoldingKind::Braces
                },
            }),
            _ => {}
        }
        collect_folding(&child, out);
    }
}
