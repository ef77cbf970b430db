use super::cst::SyntaxKind;
use super::lexer::{lex, token_text};

fn kinds(source: &str) -> Vec<SyntaxKind> {
    lex(source)
        .iter()
        .map(|t| t.kind)
        .filter(|k| !k.is_trivia())
        .collect()
}

#[test]
fn punctuation_and_literals() {
    assert_eq!(
        kinds("x = 1 + 2.5;"),
        vec![
            SyntaxKind::Ident,
            SyntaxKind::Assign,
            SyntaxKind::IntLit,
            SyntaxKind::Plus,
            SyntaxKind::FloatLit,
            SyntaxKind::Semicolon,
        ]
    );
}

#[test]
fn keywords_are_case_insensitive() {
    assert_eq!(kinds("function"), vec![SyntaxKind::KwFunction]);
    assert_eq!(kinds("FUNCTION"), vec![SyntaxKind::KwFunction]);
    assert_eq!(kinds("If Else WHILE"), vec![
        SyntaxKind::KwIf,
        SyntaxKind::KwElse,
        SyntaxKind::KwWhile,
    ]);
}

#[test]
fn keyword_prefix_is_still_an_identifier() {
    assert_eq!(kinds("iffy"), vec![SyntaxKind::Ident]);
    assert_eq!(kinds("format"), vec![SyntaxKind::Ident]);
    assert_eq!(kinds("waittill_helper"), vec![SyntaxKind::Ident]);
}

#[test]
fn string_flavors() {
    assert_eq!(kinds(r#""plain""#), vec![SyntaxKind::StringLit]);
    assert_eq!(kinds(r#"&"LOCALIZED""#), vec![SyntaxKind::IStringLit]);
    assert_eq!(kinds(r##"#"hashed""##), vec![SyntaxKind::HashLit]);
}

#[test]
fn double_brackets() {
    assert_eq!(
        kinds("[[f]]()"),
        vec![
            SyntaxKind::DoubleBracketOpen,
            SyntaxKind::Ident,
            SyntaxKind::DoubleBracketClose,
            SyntaxKind::ParenOpen,
            SyntaxKind::ParenClose,
        ]
    );
}

#[test]
fn nested_index_close_lexes_as_double_bracket() {
    // The parser splits this back into two `]`.
    assert_eq!(
        kinds("a[b[0]]"),
        vec![
            SyntaxKind::Ident,
            SyntaxKind::BracketOpen,
            SyntaxKind::Ident,
            SyntaxKind::BracketOpen,
            SyntaxKind::IntLit,
            SyntaxKind::DoubleBracketClose,
        ]
    );
}

#[test]
fn dev_block_markers() {
    assert_eq!(
        kinds("/# x = 1; #/"),
        vec![
            SyntaxKind::DevOpen,
            SyntaxKind::Ident,
            SyntaxKind::Assign,
            SyntaxKind::IntLit,
            SyntaxKind::Semicolon,
            SyntaxKind::DevClose,
        ]
    );
}

#[test]
fn directives() {
    assert_eq!(
        kinds("#using scripts\\shared\\util;"),
        vec![
            SyntaxKind::UsingDirective,
            SyntaxKind::Ident,
            SyntaxKind::Backslash,
            SyntaxKind::Ident,
            SyntaxKind::Backslash,
            SyntaxKind::Ident,
            SyntaxKind::Semicolon,
        ]
    );
    assert_eq!(kinds("#using_animtree"), vec![SyntaxKind::AnimTreeDirective]);
    assert_eq!(kinds("#namespace"), vec![SyntaxKind::NamespaceDirective]);
}

#[test]
fn comments_are_trivia() {
    let tokens = lex("x // line\n/* block */ y");
    let trivia: Vec<SyntaxKind> = tokens
        .iter()
        .map(|t| t.kind)
        .filter(|k| k.is_trivia())
        .collect();
    assert!(trivia.contains(&SyntaxKind::LineComment));
    assert!(trivia.contains(&SyntaxKind::BlockComment));
    assert_eq!(kinds("x // line\n/* block */ y").len(), 2);
}

#[test]
fn garbage_coalesces() {
    let source = "x @@@ y";
    let tokens = lex(source);
    let garbage: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == SyntaxKind::Garbage)
        .collect();
    assert_eq!(garbage.len(), 1);
    assert_eq!(token_text(source, garbage[0]), "@@@");
}

#[test]
fn spans_cover_source() {
    let source = "wait 0.5;";
    let tokens = lex(source);
    let mut end = 0u32;
    for token in &tokens {
        assert_eq!(u32::from(token.span.start()), end);
        end = token.span.end().into();
    }
    assert_eq!(end as usize, source.len());
}
