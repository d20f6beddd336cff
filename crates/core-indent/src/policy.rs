//! Qt-style indent policy.
//!
//! The scanner decides *what* construct a token opens or closes; this module
//! decides what that means for depths. Two hooks:
//!
//! * [`QtStyle::on_enter`] runs when a state is pushed and rewrites the
//!   running depths for everything nested in the new state.
//! * [`QtStyle::adjust_indent`] runs against the first tokens of a line and
//!   corrects the line's own display depths; closing braces, `else`, case
//!   labels and access specifiers belong visually to their parent construct,
//!   not to the state that is still on top of the stack when the line
//!   starts.
//!
//! Depths are unit counts. Rendering units to columns is `core_style`'s job.
//!
//! Switch bodies are the one place where running depth and display depth
//! drift apart: case labels display at the switch brace level (plus the
//! label flag) while the running depth tracks the statement level, so all
//! case-related rules compute from the saved depth of the switch's brace
//! state rather than from the current depth.

use crate::state::{State, StateKind};
use core_lexer::{LexState, Token, TokenKind};
use core_style::{CodeStyleSettings, TabSettings};

fn unit(flag: bool) -> i32 {
    i32::from(flag)
}

/// The style policy: one value, injected into the formatter.
#[derive(Debug, Clone, Copy)]
pub struct QtStyle {
    pub style: CodeStyleSettings,
    pub tabs: TabSettings,
}

impl QtStyle {
    pub fn new(style: CodeStyleSettings, tabs: TabSettings) -> Self {
        Self { style, tabs }
    }

    /// States that begin a fresh statement context: continuation padding from
    /// the surrounding expression must not leak into them.
    pub fn clears_padding_on_enter(kind: StateKind) -> bool {
        matches!(
            kind,
            StateKind::DefunOpen
                | StateKind::ClassOpen
                | StateKind::NamespaceOpen
                | StateKind::ExternOpen
                | StateKind::EnumOpen
                | StateKind::BraceListOpen
                | StateKind::BlockOpen
                | StateKind::SubstatementOpen
                | StateKind::Substatement
                | StateKind::LambdaStatement
                | StateKind::CaseCont
        )
    }

    /// Depth rewrite on state entry. `below` is the stack the new state is
    /// being pushed onto; the saved pair a later `leave` restores was
    /// captured by the caller before this hook runs.
    pub fn on_enter(&self, kind: StateKind, below: &[State], indent: &mut i32, padding: &mut i32) {
        let s = &self.style;
        if Self::clears_padding_on_enter(kind) {
            *padding = 0;
        }
        match kind {
            StateKind::ClassOpen => {
                *indent += unit(s.indent_class_braces)
                    + unit(s.indent_access_specifiers)
                    + unit(s.indent_declarations_relative_to_access_specifiers);
            }
            StateKind::DefunOpen => {
                *indent += unit(s.indent_function_braces) + unit(s.indent_function_body);
            }
            StateKind::BlockOpen | StateKind::SubstatementOpen => {
                if let Some(label) = Self::case_label_indent(s, below) {
                    *indent = label
                        + unit(s.indent_blocks_relative_to_switch_labels)
                        + unit(s.indent_block_body);
                } else {
                    *indent += unit(s.indent_block_braces) + unit(s.indent_block_body);
                }
            }
            StateKind::NamespaceOpen => {
                *indent += unit(s.indent_namespace_braces) + unit(s.indent_namespace_body);
            }
            StateKind::EnumOpen => {
                *indent += unit(s.indent_enum_braces) + 1;
            }
            StateKind::BraceListOpen => {
                *indent += 1;
            }
            StateKind::LambdaStatement => {
                *indent += unit(s.indent_function_body);
            }
            StateKind::Substatement => {
                *indent += 1;
            }
            StateKind::CaseCont => {
                // Statements hang off the label position, not off whatever
                // running depth the switch body happens to have.
                if let Some(top) = below.last().filter(|st| st.kind.is_brace_open()) {
                    *indent = top.saved_indent_depth
                        + unit(s.indent_switch_labels)
                        + unit(s.indent_statements_relative_to_switch_labels);
                } else {
                    *indent += unit(s.indent_statements_relative_to_switch_labels);
                }
            }
            StateKind::ConditionOpen => {
                *padding += if s.extra_padding_for_conditions_if_confusing_align {
                    2
                } else {
                    1
                };
            }
            StateKind::ConditionParenOpen
            | StateKind::ArglistOpen
            | StateKind::BraceinitOpen
            | StateKind::MemberInitNestOpen
            | StateKind::MemberInitOpen
            | StateKind::TemplateParam
            | StateKind::LambdaIntroducerOrSubscription
            | StateKind::LambdaIntroducer
            | StateKind::LambdaDeclaratorOrExpression
            | StateKind::ReturnStatement
            | StateKind::TernaryOp
            | StateKind::AssignOpen
            | StateKind::AssignOpenOrInitializer
            | StateKind::StreamOp
            | StateKind::CppMacroCont => {
                *padding += 1;
            }
            _ => {}
        }
    }

    /// Correct a line's display depths from its leading tokens. `stack` and
    /// the depth pair describe the situation at the start of the line.
    pub fn adjust_indent(
        &self,
        tokens: &[Token],
        begin_lex: &LexState,
        stack: &[State],
        indent: &mut i32,
        padding: &mut i32,
    ) {
        let s = &self.style;

        // Lines that start inside a multi-line comment or string keep
        // whatever depth the construct started with; reformatting literal or
        // comment interiors is not this policy's business.
        if !matches!(begin_lex, LexState::Normal) {
            return;
        }
        let Some(first) = tokens.iter().find(|t| !t.kind.is_comment()) else {
            return;
        };
        let Some(&top) = stack.last() else { return };

        match first.kind {
            TokenKind::Pound => {
                *indent = 0;
                *padding = 0;
            }
            TokenKind::RBrace => {
                if let Some(open_idx) = stack.iter().rposition(|st| st.kind.is_brace_open()) {
                    let (i, p) = self.closing_brace_depths(stack, open_idx);
                    *indent = i;
                    *padding = p;
                }
            }
            TokenKind::LBrace => match top.kind {
                StateKind::ClassStart => {
                    *indent = top.saved_indent_depth + unit(s.indent_class_braces);
                    *padding = 0;
                }
                StateKind::NamespaceStart => {
                    *indent = top.saved_indent_depth + unit(s.indent_namespace_braces);
                    *padding = 0;
                }
                StateKind::EnumStart => {
                    *indent = top.saved_indent_depth + unit(s.indent_enum_braces);
                    *padding = 0;
                }
                StateKind::ExternStart => {
                    *indent = top.saved_indent_depth;
                    *padding = 0;
                }
                StateKind::Substatement => {
                    *indent = top.saved_indent_depth + unit(s.indent_block_braces);
                    *padding = 0;
                }
                StateKind::DeclarationStart
                | StateKind::MemberInitOpen
                | StateKind::MemberInit => {
                    *indent = top.saved_indent_depth + unit(s.indent_function_braces);
                    *padding = 0;
                }
                StateKind::CaseCont => {
                    if let Some(label) = Self::case_label_indent(s, stack) {
                        *indent = label + unit(s.indent_blocks_relative_to_switch_labels);
                        *padding = 0;
                    }
                }
                _ => {
                    *indent += unit(s.indent_block_braces);
                    *padding = 0;
                }
            },
            TokenKind::KwCase | TokenKind::KwDefault => match top.kind {
                StateKind::CaseCont => {
                    if let Some(label) = Self::case_label_indent(s, stack) {
                        *indent = label;
                        *padding = 0;
                    }
                }
                StateKind::SubstatementOpen | StateKind::BlockOpen => {
                    *indent = top.saved_indent_depth + unit(s.indent_switch_labels);
                    *padding = 0;
                }
                _ => {}
            },
            TokenKind::KwElse => {
                if top.kind == StateKind::MaybeElse {
                    *indent = top.saved_indent_depth;
                    *padding = top.saved_padding_depth;
                }
            }
            TokenKind::KwPublic | TokenKind::KwProtected | TokenKind::KwPrivate => {
                if top.kind == StateKind::ClassOpen {
                    *indent = top.saved_indent_depth
                        + unit(s.indent_class_braces)
                        + unit(s.indent_access_specifiers);
                    *padding = 0;
                }
            }
            TokenKind::KwIf
            | TokenKind::KwFor
            | TokenKind::KwWhile
            | TokenKind::KwDo
            | TokenKind::KwSwitch => {
                if top.kind == StateKind::CaseCont
                    && let Some(label) = Self::case_label_indent(s, stack)
                {
                    *indent = label + unit(s.indent_control_flow_relative_to_switch_labels);
                    *padding = 0;
                }
            }
            TokenKind::Colon => {
                // A member-initializer list colon starting its own line.
                if top.kind == StateKind::DeclarationStart {
                    *padding = 1;
                }
            }
            TokenKind::RParen => match top.kind {
                StateKind::ConditionOpen
                | StateKind::ConditionParenOpen
                | StateKind::ArglistOpen => {
                    *indent = top.saved_indent_depth;
                    *padding = top.saved_padding_depth;
                }
                _ => {}
            },
            _ => {}
        }
    }

    /// Display position of the case labels governing the top of `stack`:
    /// the saved depth of the innermost switch-body brace, plus the label
    /// flag. `None` when the stack top is not inside a case body.
    fn case_label_indent(s: &CodeStyleSettings, stack: &[State]) -> Option<i32> {
        let top = stack.last()?;
        if top.kind != StateKind::CaseCont {
            return None;
        }
        let below = stack.get(stack.len().checked_sub(2)?)?;
        if !below.kind.is_brace_open() {
            return None;
        }
        Some(below.saved_indent_depth + unit(s.indent_switch_labels))
    }

    /// Depths for a closing-brace line, mirroring the opening-brace
    /// placement rules for the state at `open_idx`.
    fn closing_brace_depths(&self, stack: &[State], open_idx: usize) -> (i32, i32) {
        let s = &self.style;
        let open = stack[open_idx];
        match open.kind {
            // Structural closing braces never carry continuation padding,
            // even when the construct header wrapped.
            StateKind::ClassOpen => (open.saved_indent_depth + unit(s.indent_class_braces), 0),
            StateKind::DefunOpen => (open.saved_indent_depth + unit(s.indent_function_braces), 0),
            StateKind::NamespaceOpen => {
                (open.saved_indent_depth + unit(s.indent_namespace_braces), 0)
            }
            StateKind::ExternOpen => (open.saved_indent_depth, 0),
            StateKind::EnumOpen => (open.saved_indent_depth + unit(s.indent_enum_braces), 0),
            StateKind::BlockOpen | StateKind::SubstatementOpen => {
                let label = Self::case_label_indent(s, &stack[..open_idx]);
                if let Some(label) = label {
                    (label + unit(s.indent_blocks_relative_to_switch_labels), 0)
                } else {
                    (open.saved_indent_depth + unit(s.indent_block_braces), 0)
                }
            }
            StateKind::LambdaStatement => (open.saved_indent_depth, 0),
            _ => (open.saved_indent_depth, open.saved_padding_depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::initial_stack;

    fn default_policy() -> QtStyle {
        QtStyle::new(CodeStyleSettings::default(), TabSettings::default())
    }

    #[test]
    fn preprocessor_lines_are_flush_left() {
        let policy = default_policy();
        let lt = core_lexer::tokenize_line("#define X 1", &LexState::Normal);
        let stack = initial_stack();
        let (mut indent, mut padding) = (3, 2);
        policy.adjust_indent(&lt.tokens, &LexState::Normal, &stack, &mut indent, &mut padding);
        assert_eq!((indent, padding), (0, 0));
    }

    #[test]
    fn substatement_entry_indents_one_unit() {
        let policy = default_policy();
        let below = [
            State::new(StateKind::TopmostIntro, 0, 0),
            State::new(StateKind::IfStatement, 0, 0),
        ];
        let (mut indent, mut padding) = (0, 2);
        policy.on_enter(StateKind::Substatement, &below, &mut indent, &mut padding);
        assert_eq!(indent, 1);
        assert_eq!(padding, 0); // continuation padding does not leak in
    }

    #[test]
    fn condition_padding_honors_extra_flag() {
        let mut style = CodeStyleSettings::default();
        style.extra_padding_for_conditions_if_confusing_align = false;
        let policy = QtStyle::new(style, TabSettings::default());
        let below = [State::new(StateKind::IfStatement, 0, 0)];
        let (mut indent, mut padding) = (0, 0);
        policy.on_enter(StateKind::ConditionOpen, &below, &mut indent, &mut padding);
        assert_eq!(padding, 1);
        assert_eq!(indent, 0);
    }

    #[test]
    fn case_statements_hang_off_the_label() {
        let policy = default_policy();
        // switch at indent 1, its body brace saved at (1, 0).
        let below = [
            State::new(StateKind::TopmostIntro, 0, 0),
            State::new(StateKind::SwitchStatement, 1, 0),
            State::new(StateKind::SubstatementOpen, 1, 0),
        ];
        let (mut indent, mut padding) = (2, 0);
        policy.on_enter(StateKind::CaseCont, &below, &mut indent, &mut padding);
        assert_eq!(indent, 2); // label at 1, statements one past it
        assert_eq!(padding, 0);
    }
}
