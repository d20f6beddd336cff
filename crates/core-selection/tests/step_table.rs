//! The step-count table, pinned per node kind. The counts decide how many
//! discrete stops a node contributes before the walk moves along the path,
//! so any change here is a behavior change for every expand/shrink
//! sequence touching that kind.

mod common;

use common::*;
use core_ast::NodeKind;
use core_selection::SelectionChanger;

fn count_of(fx: &Fixture, pick: impl Fn(&NodeKind) -> bool) -> i32 {
    let ch = SelectionChanger::new();
    let mut found = None;
    // The fixtures are small; scan the whole arena through the root path
    // positions instead of exposing arena iteration for tests only.
    for pos in 0..fx.text.len() {
        for id in fx.ast.path_to(pos) {
            if pick(&fx.ast.node(id).kind) {
                found = Some(id);
            }
        }
    }
    let id = found.expect("fixture lacks expected node kind");
    ch.possible_step_count(&fx.ast, id)
}

#[test]
fn single_step_kinds() {
    let fx = call_in_function();
    assert_eq!(count_of(&fx, |k| matches!(k, NodeKind::TranslationUnit)), 1);
    assert_eq!(
        count_of(&fx, |k| matches!(k, NodeKind::ExpressionStatement)),
        1
    );
    assert_eq!(count_of(&fx, |k| matches!(k, NodeKind::SimpleName)), 1);
    assert_eq!(
        count_of(&fx, |k| matches!(
            k,
            NodeKind::NumericLiteral {
                char_literal: false
            }
        )),
        1
    );
    let fdecl = function_declarator();
    assert_eq!(
        count_of(&fdecl, |k| matches!(k, NodeKind::FunctionDeclarator { .. })),
        1
    );
}

#[test]
fn two_step_kinds() {
    let fx = call_in_function();
    assert_eq!(
        count_of(&fx, |k| matches!(k, NodeKind::CompoundStatement)),
        2
    );
    assert_eq!(
        count_of(&fx, |k| matches!(k, NodeKind::FunctionDefinition { .. })),
        2
    );
    let s = string_literal_decl();
    assert_eq!(count_of(&s, |k| matches!(k, NodeKind::StringLiteral)), 2);
    let c = char_literal_decl();
    assert_eq!(
        count_of(&c, |k| matches!(k, NodeKind::NumericLiteral { char_literal: true })),
        2
    );
    let e = expression_list_paren();
    assert_eq!(
        count_of(&e, |k| matches!(k, NodeKind::ExpressionListParen { .. })),
        2
    );
    let t = template_id_call();
    assert_eq!(count_of(&t, |k| matches!(k, NodeKind::TemplateId { .. })), 2);
    let d = declarator_with_cv();
    assert_eq!(count_of(&d, |k| matches!(k, NodeKind::Declarator { .. })), 2);
}

#[test]
fn three_step_kinds() {
    let fx = call_in_function();
    assert_eq!(count_of(&fx, |k| matches!(k, NodeKind::Call { .. })), 3);
    let f = for_statement();
    assert_eq!(
        count_of(&f, |k| matches!(k, NodeKind::ForStatement { .. })),
        3
    );
    let c = class_specifier();
    assert_eq!(
        count_of(&c, |k| matches!(k, NodeKind::ClassSpecifier { .. })),
        3
    );
    let n = namespace_block();
    assert_eq!(count_of(&n, |k| matches!(k, NodeKind::Namespace { .. })), 3);
    let t = template_declaration();
    assert_eq!(
        count_of(&t, |k| matches!(k, NodeKind::TemplateDeclaration { .. })),
        3
    );
    let l = lambda_with_return_type();
    assert_eq!(
        count_of(&l, |k| matches!(k, NodeKind::LambdaExpression { .. })),
        3
    );
}
