#![allow(dead_code)] // Shared across test binaries; each uses a subset.

use core_ast::{Ast, AstBuilder, NodeId, NodeKind};
use core_selection::{Direction, SelectionChanger, SelectionRange};

/// A document plus the AST a front end would have produced for it. Trees
/// are built by hand through `AstBuilder` with hardcoded token indices; the
/// builder asserts the token count so a fixture text edit fails loudly.
pub struct Fixture {
    pub text: &'static str,
    pub ast: Ast,
}

pub fn expand(ch: &mut SelectionChanger, range: &mut SelectionRange, fx: &Fixture) -> bool {
    ch.begin_change();
    let changed = ch.change_selection(Direction::ExpandSelection, range, &fx.ast, fx.text);
    ch.end_change();
    changed
}

pub fn shrink(ch: &mut SelectionChanger, range: &mut SelectionRange, fx: &Fixture) -> bool {
    ch.begin_change();
    let changed = ch.change_selection(Direction::ShrinkSelection, range, &fx.ast, fx.text);
    ch.end_change();
    changed
}

/// Selected text for assertion messages that read like the editor looks.
pub fn sel<'a>(fx: &'a Fixture, range: &SelectionRange) -> &'a str {
    let r = range.normalized();
    &fx.text[r.anchor..r.position]
}

/// Changer with its initial cursor captured at `pos`.
pub fn changer_at(pos: usize) -> SelectionChanger {
    let mut ch = SelectionChanger::new();
    ch.on_cursor_moved(SelectionRange::caret(pos));
    ch
}

fn assert_token_count(b: &AstBuilder, expected: usize) {
    assert_eq!(b.tokens().len(), expected, "fixture text/token drift");
}

/// `void f() { g(1, 2); }`
pub fn call_in_function() -> Fixture {
    let text = "void f() { g(1, 2); }";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 13);
    b.open(NodeKind::TranslationUnit, 0, 13);
    b.open(
        NodeKind::FunctionDefinition {
            first_specifier: Some(0),
            body: Some(NodeId(2)), // the compound statement opened next
        },
        0,
        13,
    );
    b.open(NodeKind::CompoundStatement, 4, 13);
    b.open(NodeKind::ExpressionStatement, 5, 12);
    b.open(
        NodeKind::Call {
            lparen: 6,
            rparen: 10,
        },
        5,
        11,
    );
    b.leaf(NodeKind::SimpleName, 5, 6);
    b.leaf(NodeKind::NumericLiteral { char_literal: false }, 7, 8);
    b.leaf(NodeKind::NumericLiteral { char_literal: false }, 9, 10);
    b.close();
    b.close();
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// Same tree, but the document continues past the AST so the
/// whole-document ceiling is strictly larger than the outermost node.
pub fn call_with_trailer() -> Fixture {
    let text = "void f() { g(1, 2); } // x";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 14); // trailing comment token
    b.open(NodeKind::TranslationUnit, 0, 13);
    b.open(
        NodeKind::FunctionDefinition {
            first_specifier: Some(0),
            body: Some(NodeId(2)),
        },
        0,
        13,
    );
    b.open(NodeKind::CompoundStatement, 4, 13);
    b.open(NodeKind::ExpressionStatement, 5, 12);
    b.leaf(
        NodeKind::Call {
            lparen: 6,
            rparen: 10,
        },
        5,
        11,
    );
    b.close();
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `const char *s = "abc";`
pub fn string_literal_decl() -> Fixture {
    let text = "const char *s = \"abc\";";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 7);
    b.open(NodeKind::TranslationUnit, 0, 7);
    b.open(NodeKind::DeclarationStatement, 0, 7);
    b.leaf(NodeKind::StringLiteral, 5, 6);
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `char c = 'x';`
pub fn char_literal_decl() -> Fixture {
    let text = "char c = 'x';";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 5);
    b.open(NodeKind::TranslationUnit, 0, 5);
    b.open(NodeKind::DeclarationStatement, 0, 5);
    b.leaf(NodeKind::NumericLiteral { char_literal: true }, 3, 4);
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `for (i = 0; i < n; ++i) body();`
pub fn for_statement() -> Fixture {
    let text = "for (i = 0; i < n; ++i) body();";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 17);
    b.open(NodeKind::TranslationUnit, 0, 17);
    b.open(
        NodeKind::ForStatement {
            lparen: 1,
            rparen: 12,
        },
        0,
        17,
    );
    b.open(NodeKind::ExpressionStatement, 13, 17);
    b.open(
        NodeKind::Call {
            lparen: 14,
            rparen: 15,
        },
        13,
        16,
    );
    b.leaf(NodeKind::SimpleName, 13, 14);
    b.close();
    b.close();
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `namespace foo { int x; }`
pub fn namespace_block() -> Fixture {
    let text = "namespace foo { int x; }";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 7);
    b.open(NodeKind::TranslationUnit, 0, 7);
    b.open(
        NodeKind::Namespace {
            keyword: 0,
            identifier: Some(1),
        },
        0,
        7,
    );
    b.leaf(NodeKind::DeclarationStatement, 3, 6);
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `class C { int x; };`
pub fn class_specifier() -> Fixture {
    let text = "class C { int x; };";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 8);
    b.open(NodeKind::TranslationUnit, 0, 8);
    b.open(NodeKind::DeclarationStatement, 0, 8);
    b.open(
        NodeKind::ClassSpecifier {
            class_key: 0,
            name: Some(1),
            lbrace: 2,
            rbrace: 6,
        },
        0,
        7,
    );
    b.leaf(NodeKind::DeclarationStatement, 3, 6);
    b.close();
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `auto g = [a](int x) -> int { return x; };`
pub fn lambda_with_return_type() -> Fixture {
    let text = "auto g = [a](int x) -> int { return x; };";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 18);
    b.open(NodeKind::TranslationUnit, 0, 18);
    b.open(NodeKind::DeclarationStatement, 0, 18);
    b.open(
        NodeKind::LambdaExpression {
            lbracket: 3,
            declarator_rparen: Some(9),
            trailing_return_last: Some(11),
        },
        3,
        17,
    );
    b.leaf(NodeKind::CompoundStatement, 12, 17);
    b.close();
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `template <class T> void f();`
pub fn template_declaration() -> Fixture {
    let text = "template <class T> void f();";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 10);
    b.open(NodeKind::TranslationUnit, 0, 10);
    b.open(
        NodeKind::TemplateDeclaration {
            keyword: 0,
            greater: 4,
        },
        0,
        10,
    );
    b.leaf(NodeKind::DeclarationStatement, 5, 10);
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `foo<int>(x);`
pub fn template_id_call() -> Fixture {
    let text = "foo<int>(x);";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 8);
    b.open(NodeKind::TranslationUnit, 0, 8);
    b.open(NodeKind::ExpressionStatement, 0, 8);
    b.open(
        NodeKind::Call {
            lparen: 4,
            rparen: 6,
        },
        0,
        7,
    );
    b.leaf(NodeKind::TemplateId { identifier: 0 }, 0, 4);
    b.close();
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `x = (a, b);`
pub fn expression_list_paren() -> Fixture {
    let text = "x = (a, b);";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 8);
    b.open(NodeKind::TranslationUnit, 0, 8);
    b.open(NodeKind::ExpressionStatement, 0, 8);
    b.leaf(
        NodeKind::ExpressionListParen {
            lparen: 2,
            rparen: 6,
        },
        2,
        7,
    );
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `void f() const` — declarator with a trailing cv-qualifier.
pub fn declarator_with_cv() -> Fixture {
    let text = "void f() const";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 5);
    b.open(NodeKind::TranslationUnit, 0, 5);
    b.leaf(NodeKind::Declarator { first_cv: Some(4) }, 1, 5);
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}

/// `void f(int a, int b);`
pub fn function_declarator() -> Fixture {
    let text = "void f(int a, int b);";
    let mut b = AstBuilder::new(text);
    assert_token_count(&b, 10);
    b.open(NodeKind::TranslationUnit, 0, 10);
    b.open(NodeKind::DeclarationStatement, 0, 10);
    b.leaf(
        NodeKind::FunctionDeclarator {
            lparen: 2,
            rparen: 8,
            first_cv: None,
        },
        1,
        9,
    );
    b.close();
    b.close();
    Fixture {
        text,
        ast: b.finish(),
    }
}
