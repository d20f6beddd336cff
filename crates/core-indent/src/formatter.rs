//! The incremental line scanner.
//!
//! One pass over one line: restore the context stack the line starts in,
//! classify each token against the state on top of the stack, and push/pop
//! states as constructs open and close. The depths reported for a line are
//! the restored begin depths corrected by the policy's `adjust_indent` (a
//! closing brace line belongs visually to the construct it closes, even
//! though that construct is still open when the line starts).
//!
//! Results are cached per line together with the revision of the line they
//! were computed from. `update_state_until` walks the cache and re-scans
//! only from the first line whose revision or inherited begin state went
//! stale, so re-indenting line N after an edit near N does not re-lex the
//! whole document.
//!
//! There is no error path. Malformed input (unbalanced braces, half-typed
//! statements) degrades to a visually wrong but recoverable stack; the
//! bottom sentinel is never popped and every state has a defined reaction
//! to every token.

use crate::policy::QtStyle;
use crate::state::{State, StateKind, initial_stack};
use core_doc::Buffer;
use core_lexer::{LexState, Token, TokenKind, tokenize_line};
use tracing::{debug, trace};

/// Cached per-line scan result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    pub begin_state: Vec<State>,
    pub end_state: Vec<State>,
    pub begin_lex: LexState,
    pub end_lex: LexState,
    /// Display depths for this line.
    pub indent_depth: i32,
    pub padding_depth: i32,
    /// Running depths carried into the next line.
    pub end_indent_depth: i32,
    pub end_padding_depth: i32,
    /// `Buffer::line_revision` at computation time.
    pub revision: u64,
}

enum Step {
    Consume,
    /// Re-dispatch the same token against the new top state.
    Reprocess,
}
use Step::{Consume, Reprocess};

/// Incremental indentation engine for one document.
pub struct CodeFormatter {
    policy: QtStyle,
    cache: Vec<Option<BlockData>>,

    // Scratch state while scanning one line.
    stack: Vec<State>,
    indent_depth: i32,
    padding_depth: i32,
    tokens: Vec<Token>,
    current_line: String,
    token_index: usize,
}

impl CodeFormatter {
    pub fn new(policy: QtStyle) -> Self {
        Self {
            policy,
            cache: Vec::new(),
            stack: initial_stack(),
            indent_depth: 0,
            padding_depth: 0,
            tokens: Vec::new(),
            current_line: String::new(),
            token_index: 0,
        }
    }

    /// Ensure cached state is valid for all lines up to and including
    /// `line`. Safe to call repeatedly; does nothing when the cache is
    /// already coherent.
    pub fn update_state_until(&mut self, doc: &Buffer, line: usize) {
        let last = doc.line_count().saturating_sub(1);
        let line = line.min(last);
        self.cache.resize(doc.line_count(), None);

        let mut begin_stack = initial_stack();
        let mut begin_lex = LexState::Normal;
        let mut begin_indent = 0;
        let mut begin_padding = 0;

        // Skip the coherent prefix.
        let mut next = 0;
        while next <= line {
            match &self.cache[next] {
                Some(bd)
                    if bd.revision == doc.line_revision(next)
                        && bd.begin_state == begin_stack
                        && bd.begin_lex == begin_lex =>
                {
                    begin_indent = bd.end_indent_depth;
                    begin_padding = bd.end_padding_depth;
                    begin_lex = bd.end_lex.clone();
                    begin_stack = bd.end_state.clone();
                    next += 1;
                }
                _ => break,
            }
        }
        if next > line {
            return;
        }
        debug!(from = next, to = line, "re-scanning stale lines");
        for l in next..=line {
            let bd =
                self.recalculate_line(doc, l, begin_stack, begin_lex, begin_indent, begin_padding);
            begin_indent = bd.end_indent_depth;
            begin_padding = bd.end_padding_depth;
            begin_lex = bd.end_lex.clone();
            begin_stack = bd.end_state.clone();
            self.cache[l] = Some(bd);
        }
    }

    /// Recompute only the state transition of one edited line. Downstream
    /// lines are not touched here; if the line's end state changed, their
    /// cached begin states no longer match and the next
    /// [`Self::update_state_until`] re-scans them.
    pub fn update_line_state_change(&mut self, doc: &Buffer, line: usize) {
        if line >= doc.line_count() {
            return;
        }
        self.cache.resize(doc.line_count(), None);
        let begin = if line == 0 {
            Some((initial_stack(), LexState::Normal, 0, 0))
        } else {
            self.cache.get(line - 1).and_then(|o| o.as_ref()).map(|bd| {
                (
                    bd.end_state.clone(),
                    bd.end_lex.clone(),
                    bd.end_indent_depth,
                    bd.end_padding_depth,
                )
            })
        };
        let Some((begin_stack, begin_lex, bi, bp)) = begin else {
            // No usable predecessor cache; fall back to a prefix scan.
            self.update_state_until(doc, line);
            return;
        };
        let old_end = self
            .cache
            .get(line)
            .and_then(|o| o.as_ref())
            .map(|bd| bd.end_state.clone());
        let bd = self.recalculate_line(doc, line, begin_stack, begin_lex, bi, bp);
        if old_end.as_ref() != Some(&bd.end_state) {
            debug!(line, "line end state changed; downstream refreshes lazily");
        }
        self.cache[line] = Some(bd);
    }

    /// Display depths for `line` as currently cached (freshens first).
    pub fn indent_for(&mut self, doc: &Buffer, line: usize) -> (i32, i32) {
        self.update_state_until(doc, line);
        self.cache
            .get(line)
            .and_then(|o| o.as_ref())
            .map(|bd| (bd.indent_depth, bd.padding_depth))
            .unwrap_or((0, 0))
    }

    /// Depths for a hypothetical empty line inserted directly after `line`
    /// (auto-indent on Enter). Does not cache anything for the new line.
    pub fn indent_for_new_line_after(&mut self, doc: &Buffer, line: usize) -> (i32, i32) {
        self.update_state_until(doc, line);
        let Some(bd) = self.cache.get(line).and_then(|o| o.as_ref()) else {
            return (0, 0);
        };
        let mut indent = bd.end_indent_depth;
        let mut padding = bd.end_padding_depth;
        self.policy
            .adjust_indent(&[], &bd.end_lex, &bd.end_state, &mut indent, &mut padding);
        (indent, padding)
    }

    /// True when the whole line lies inside a raw string literal; such lines
    /// must never be re-indented.
    pub fn is_in_raw_string_literal(&mut self, doc: &Buffer, line: usize) -> bool {
        self.update_state_until(doc, line);
        self.cache
            .get(line)
            .and_then(|o| o.as_ref())
            .is_some_and(|bd| matches!(bd.begin_lex, LexState::RawString { .. }))
    }

    /// Tab size lives in the policy's tab settings; changing it invalidates
    /// everything computed so far.
    pub fn set_tab_size(&mut self, tab_size: usize) {
        self.policy.tabs.tab_size = tab_size;
        self.invalidate_cache();
    }

    /// Drop all cached per-line state (settings change, external reload).
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    /// Cached data for a line, if any. Mainly for tests and diagnostics.
    pub fn block_data(&self, line: usize) -> Option<&BlockData> {
        self.cache.get(line).and_then(|o| o.as_ref())
    }

    fn recalculate_line(
        &mut self,
        doc: &Buffer,
        line: usize,
        begin_stack: Vec<State>,
        begin_lex: LexState,
        begin_indent: i32,
        begin_padding: i32,
    ) -> BlockData {
        self.current_line = doc.line(line).unwrap_or_default();
        let lexed = tokenize_line(&self.current_line, &begin_lex);
        self.tokens = lexed.tokens;
        self.stack = begin_stack.clone();
        self.indent_depth = begin_indent;
        self.padding_depth = begin_padding;

        // Display depths for this line are the begin depths corrected by the
        // leading tokens; the running depths keep evolving separately.
        let mut display_indent = begin_indent;
        let mut display_padding = begin_padding;
        self.policy.adjust_indent(
            &self.tokens,
            &begin_lex,
            &self.stack,
            &mut display_indent,
            &mut display_padding,
        );

        self.token_index = 0;
        let mut reprocess_budget = 0usize;
        while self.token_index < self.tokens.len() {
            let kind = self.tokens[self.token_index].kind;
            match self.process_token(kind) {
                Consume => {
                    self.token_index += 1;
                    reprocess_budget = 0;
                }
                Reprocess => {
                    reprocess_budget += 1;
                    // A reprocessed token always sees a changed stack; the
                    // budget only exists so broken transitions cannot spin.
                    if reprocess_budget > self.stack.len() + 8 {
                        self.token_index += 1;
                        reprocess_budget = 0;
                    }
                }
            }
        }

        // Line-end bookkeeping: preprocessor continuation and multi-line
        // lexical constructs.
        match self.top().kind {
            StateKind::CppMacroStart | StateKind::CppMacro => {
                if lexed.ended_joined {
                    self.turn_into(StateKind::CppMacroCont);
                } else {
                    self.leave(false);
                }
            }
            StateKind::CppMacroCont => {
                if !lexed.ended_joined {
                    self.leave(false);
                }
            }
            StateKind::QtLikeMacro => self.leave(true),
            _ => {}
        }
        match &lexed.end_state {
            LexState::BlockComment => {
                if !self.top().kind.is_comment() {
                    self.enter(StateKind::MultilineCommentStart);
                }
            }
            LexState::RawString { .. } => {
                if self.top().kind != StateKind::RawStringOpen {
                    self.enter(StateKind::RawStringOpen);
                }
            }
            LexState::String => {
                if self.top().kind != StateKind::StringOpen {
                    self.enter(StateKind::StringOpen);
                }
            }
            LexState::Normal => {}
        }

        debug_assert_eq!(self.stack[0].kind, StateKind::TopmostIntro);
        trace!(
            line,
            depth = self.stack.len(),
            indent = display_indent,
            padding = display_padding,
            "scanned line"
        );

        BlockData {
            begin_state: begin_stack,
            end_state: self.stack.clone(),
            begin_lex,
            end_lex: lexed.end_state,
            indent_depth: display_indent,
            padding_depth: display_padding,
            end_indent_depth: self.indent_depth,
            end_padding_depth: self.padding_depth,
            revision: doc.line_revision(line),
        }
    }

    fn top(&self) -> State {
        self.stack
            .last()
            .copied()
            .unwrap_or_else(|| State::new(StateKind::TopmostIntro, 0, 0))
    }

    fn next_token_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.token_index + 1).map(|t| t.kind)
    }

    fn previous_token_kind(&self) -> Option<TokenKind> {
        self.token_index
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.kind)
    }

    fn enter(&mut self, kind: StateKind) {
        let saved_indent = self.indent_depth;
        let saved_padding = self.padding_depth;
        self.policy
            .on_enter(kind, &self.stack, &mut self.indent_depth, &mut self.padding_depth);
        self.stack.push(State::new(kind, saved_indent, saved_padding));
        trace!(?kind, indent = self.indent_depth, padding = self.padding_depth, "enter");
    }

    fn leave(&mut self, statement_done: bool) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(popped) = self.stack.pop() else {
            return;
        };
        self.indent_depth = popped.saved_indent_depth;
        self.padding_depth = popped.saved_padding_depth;
        trace!(kind = ?popped.kind, "leave");

        if statement_done {
            match self.top().kind {
                // A finished substatement under an `if` waits for `else`
                // instead of closing the `if` outright.
                StateKind::IfStatement => {
                    if popped.kind != StateKind::MaybeElse {
                        self.enter(StateKind::MaybeElse);
                    } else {
                        self.leave(true);
                    }
                }
                // Finishing the else branch finishes the whole construct;
                // another `else` cannot attach anymore.
                StateKind::ElseClause => {
                    self.leave(false);
                    self.leave(true);
                }
                kind if kind.is_braceless() => self.leave(true),
                _ => {}
            }
        }
    }

    fn turn_into(&mut self, kind: StateKind) {
        self.leave(false);
        self.enter(kind);
    }

    fn try_declaration(&mut self, kind: TokenKind) -> bool {
        let entered = match kind {
            TokenKind::KwTemplate => StateKind::TemplateStart,
            TokenKind::KwNamespace => StateKind::NamespaceStart,
            TokenKind::KwExtern => StateKind::ExternStart,
            TokenKind::KwClass | TokenKind::KwStruct | TokenKind::KwUnion => StateKind::ClassStart,
            TokenKind::KwEnum => StateKind::EnumStart,
            TokenKind::KwUsing | TokenKind::KwTypedef => StateKind::UsingStart,
            TokenKind::KwPublic | TokenKind::KwProtected | TokenKind::KwPrivate => {
                StateKind::AccessSpecifierStart
            }
            TokenKind::Identifier => {
                let text = self.tokens[self.token_index].text(&self.current_line);
                let qt_macro = self.token_index == 0
                    && (text.starts_with("Q_") || text.starts_with("QT_"));
                let label = self.token_index == 0
                    && self.next_token_kind() == Some(TokenKind::Colon);
                if qt_macro {
                    StateKind::QtLikeMacro
                } else if label {
                    StateKind::Label
                } else {
                    StateKind::DeclarationStart
                }
            }
            TokenKind::KwBuiltinType
            | TokenKind::KwConst
            | TokenKind::KwVolatile
            | TokenKind::KwStatic
            | TokenKind::KwInline
            | TokenKind::KwVirtual
            | TokenKind::KwConstexpr
            | TokenKind::KwAuto
            | TokenKind::KwTypename
            | TokenKind::KwFriend
            | TokenKind::KwExplicit
            | TokenKind::KwMutable
            | TokenKind::ColonColon => StateKind::DeclarationStart,
            TokenKind::Operator => {
                // A destructor declaration starts with `~`.
                let text = self.tokens[self.token_index].text(&self.current_line);
                if text == "~" {
                    StateKind::DeclarationStart
                } else {
                    return false;
                }
            }
            _ => return false,
        };
        self.enter(entered);
        true
    }

    fn try_statement(&mut self, kind: TokenKind) -> bool {
        let entered = match kind {
            TokenKind::KwCase | TokenKind::KwDefault => StateKind::CaseStart,
            TokenKind::KwIf => StateKind::IfStatement,
            TokenKind::KwSwitch => StateKind::SwitchStatement,
            TokenKind::KwFor => StateKind::ForStatement,
            TokenKind::KwWhile => StateKind::StatementWithCondition,
            TokenKind::KwDo => StateKind::DoStatement,
            TokenKind::KwReturn
            | TokenKind::KwBreak
            | TokenKind::KwContinue
            | TokenKind::KwGoto
            | TokenKind::KwThrow => StateKind::ReturnStatement,
            // `try` takes its block directly; `catch` takes a condition.
            TokenKind::KwTry => StateKind::Substatement,
            TokenKind::KwCatch => StateKind::StatementWithCondition,
            TokenKind::LBrace => StateKind::BlockOpen,
            _ => return self.try_declaration(kind),
        };
        self.enter(entered);
        true
    }

    fn try_expression(&mut self, kind: TokenKind, also_expression: bool) -> bool {
        let entered = match kind {
            TokenKind::LParen => StateKind::ArglistOpen,
            TokenKind::Question => StateKind::TernaryOp,
            TokenKind::LBrace => StateKind::BraceinitOpen,
            TokenKind::LBracket => StateKind::LambdaIntroducerOrSubscription,
            TokenKind::LessLess | TokenKind::GreaterGreater => StateKind::StreamOp,
            _ => return false,
        };
        if also_expression {
            self.enter(StateKind::Expression);
        }
        self.enter(entered);
        true
    }

    fn process_token(&mut self, kind: TokenKind) -> Step {
        use StateKind::*;
        use TokenKind as T;

        let top = self.top().kind;

        if !top.is_comment() && !matches!(top, StringOpen | RawStringOpen) {
            // Comments are transparent everywhere outside comment states.
            if kind.is_comment() {
                return Consume;
            }
            // A leading `#` starts a preprocessor directive.
            if kind == T::Pound
                && self.token_index == 0
                && !matches!(top, CppMacroStart | CppMacro | CppMacroCont)
            {
                self.enter(CppMacroStart);
                return Consume;
            }
        }

        match top {
            TopmostIntro => {
                // Statements are not valid at the top level, but accepting
                // them keeps snippet and mid-edit indentation sensible.
                self.try_statement(kind);
                Consume
            }

            MultilineCommentStart => match kind {
                T::BlockComment { terminated: true } => {
                    self.leave(false);
                    Consume
                }
                T::BlockComment { terminated: false } => {
                    self.turn_into(MultilineCommentCont);
                    Consume
                }
                _ => {
                    self.leave(false);
                    Reprocess
                }
            },
            MultilineCommentCont => match kind {
                T::BlockComment { terminated: true } => {
                    self.leave(false);
                    Consume
                }
                T::BlockComment { terminated: false } => Consume,
                _ => {
                    self.leave(false);
                    Reprocess
                }
            },

            CppMacroStart => {
                self.turn_into(CppMacro);
                Consume
            }
            CppMacro | CppMacroCont => Consume,
            QtLikeMacro => Consume,

            Label | AccessSpecifierStart => match kind {
                T::Colon => {
                    self.leave(false);
                    Consume
                }
                _ => {
                    self.leave(false);
                    Reprocess
                }
            },

            NamespaceStart => match kind {
                // No trailing `;` after a namespace body, so the start
                // state is replaced rather than stacked under the open.
                T::LBrace => {
                    self.turn_into(NamespaceOpen);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Consume
                }
                T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },
            NamespaceOpen => match kind {
                T::RBrace => {
                    self.leave(false);
                    Consume
                }
                _ => {
                    self.try_declaration(kind);
                    Consume
                }
            },

            ExternStart => match kind {
                T::StringLiteral => Consume,
                T::LBrace => {
                    self.turn_into(ExternOpen);
                    Consume
                }
                _ => {
                    self.turn_into(DeclarationStart);
                    Reprocess
                }
            },
            ExternOpen => match kind {
                T::RBrace => {
                    self.leave(false);
                    Consume
                }
                _ => {
                    self.try_declaration(kind);
                    Consume
                }
            },

            ClassStart => match kind {
                T::LBrace => {
                    self.enter(ClassOpen);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Consume
                }
                T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },
            ClassOpen => match kind {
                T::RBrace => {
                    self.leave(false);
                    Consume
                }
                _ => {
                    self.try_declaration(kind);
                    Consume
                }
            },

            EnumStart => match kind {
                T::LBrace => {
                    self.enter(EnumOpen);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Consume
                }
                T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },
            EnumOpen => match kind {
                T::RBrace => {
                    self.leave(false);
                    Consume
                }
                T::LBrace => {
                    self.enter(BraceListOpen);
                    Consume
                }
                _ => Consume,
            },
            BraceListOpen => match kind {
                T::RBrace => {
                    self.leave(false);
                    Consume
                }
                T::LBrace => {
                    self.enter(BraceListOpen);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            UsingStart => match kind {
                T::Semicolon => {
                    self.leave(false);
                    Consume
                }
                T::KwClass | T::KwStruct | T::KwUnion => {
                    self.turn_into(ClassStart);
                    Consume
                }
                T::KwEnum => {
                    self.turn_into(EnumStart);
                    Consume
                }
                T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },

            TemplateStart => match kind {
                T::Less => {
                    self.enter(TemplateParam);
                    Consume
                }
                T::KwClass | T::KwStruct | T::KwUnion => {
                    self.turn_into(ClassStart);
                    Consume
                }
                T::KwUsing => {
                    self.turn_into(UsingStart);
                    Consume
                }
                _ => {
                    self.turn_into(DeclarationStart);
                    Reprocess
                }
            },
            TemplateParam => match kind {
                T::Less => {
                    self.enter(TemplateParam);
                    Consume
                }
                T::Greater => {
                    self.leave(false);
                    Consume
                }
                T::GreaterGreater => {
                    self.leave(false);
                    if self.top().kind == TemplateParam {
                        self.leave(false);
                    }
                    Consume
                }
                T::Semicolon | T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },

            OperatorDeclaration => match kind {
                T::LParen | T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },

            DeclarationStart => match kind {
                T::RBrace => {
                    self.leave(true);
                    Reprocess
                }
                T::Semicolon => {
                    self.leave(true);
                    Consume
                }
                T::Equal => {
                    self.enter(AssignOpenOrInitializer);
                    Consume
                }
                T::LBrace => {
                    self.enter(DefunOpen);
                    Consume
                }
                T::Colon => {
                    self.enter(MemberInitOpen);
                    self.enter(MemberInitExpected);
                    Consume
                }
                T::KwOperator => {
                    self.enter(OperatorDeclaration);
                    Consume
                }
                T::KwClass | T::KwStruct | T::KwUnion => {
                    self.turn_into(ClassStart);
                    Consume
                }
                // Parameter lists are part of the declarator, not an
                // expression; no expression grouping state around them.
                T::LParen => {
                    self.enter(ArglistOpen);
                    Consume
                }
                T::GreaterGreater => Consume,
                _ => {
                    self.try_expression(kind, true);
                    Consume
                }
            },

            AssignOpenOrInitializer => match kind {
                T::LBrace => {
                    self.turn_into(BraceinitOpen);
                    Consume
                }
                T::RBrace | T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.turn_into(AssignOpen);
                    Reprocess
                }
            },
            AssignOpen => match kind {
                T::RBrace | T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },
            Expression => match kind {
                T::RBrace | T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                T::Colon => Consume,
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            ReturnStatement => match kind {
                T::Semicolon => {
                    self.leave(true);
                    Consume
                }
                T::RBrace => {
                    self.leave(true);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            ArglistOpen => match kind {
                T::RParen => {
                    self.leave(false);
                    Consume
                }
                T::Semicolon | T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                T::LBrace => {
                    self.enter(BraceinitOpen);
                    Consume
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },
            BraceinitOpen => match kind {
                T::RBrace => {
                    self.leave(false);
                    Consume
                }
                T::RParen | T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            TernaryOp => match kind {
                T::Colon => Consume,
                T::Semicolon | T::RParen | T::RBrace | T::RBracket | T::Comma => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            StreamOp => match kind {
                T::LessLess | T::GreaterGreater => {
                    self.enter(StreamOpCont);
                    Consume
                }
                T::Semicolon | T::RParen | T::RBrace | T::RBracket | T::Comma => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },
            StreamOpCont => match kind {
                T::LessLess | T::GreaterGreater => Consume,
                T::Semicolon | T::RParen | T::RBrace | T::RBracket | T::Comma => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            MemberInitOpen => match kind {
                T::LBrace => {
                    self.enter(DefunOpen);
                    Consume
                }
                T::Semicolon | T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },
            MemberInitExpected => match kind {
                T::Identifier => {
                    self.turn_into(MemberInit);
                    Consume
                }
                _ => {
                    self.leave(false);
                    Reprocess
                }
            },
            MemberInit => match kind {
                T::LParen => {
                    self.enter(MemberInitNestOpen);
                    Consume
                }
                T::LBrace => {
                    // `x{1}` brace init vs the function body brace: the
                    // former directly follows the member identifier.
                    if self.previous_token_kind() == Some(T::Identifier) {
                        self.enter(MemberInitNestOpen);
                        Consume
                    } else {
                        self.leave(false);
                        Reprocess
                    }
                }
                T::Comma => {
                    self.turn_into(MemberInitExpected);
                    Consume
                }
                T::Semicolon | T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },
            MemberInitNestOpen => match kind {
                T::RParen | T::RBrace => {
                    self.leave(false);
                    Consume
                }
                T::LParen | T::LBrace => {
                    self.enter(MemberInitNestOpen);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            DefunOpen => match kind {
                T::RBrace => {
                    self.leave(false);
                    if self.top().kind == MemberInitOpen {
                        self.leave(false);
                    }
                    if self.top().kind == DeclarationStart {
                        self.leave(true);
                    }
                    Consume
                }
                _ => {
                    self.try_statement(kind);
                    Consume
                }
            },
            LambdaStatement => match kind {
                T::RBrace => {
                    self.leave(false);
                    Consume
                }
                _ => {
                    self.try_statement(kind);
                    Consume
                }
            },

            IfStatement => match kind {
                T::LParen => {
                    self.enter(ConditionOpen);
                    Consume
                }
                T::KwConstexpr => Consume,
                _ => {
                    self.leave(true);
                    Reprocess
                }
            },
            SwitchStatement | StatementWithCondition => match kind {
                T::LParen => {
                    self.enter(ConditionOpen);
                    Consume
                }
                _ => {
                    self.leave(true);
                    Reprocess
                }
            },
            ConditionOpen => match kind {
                T::RParen => {
                    self.turn_into(Substatement);
                    Consume
                }
                T::LParen => {
                    self.enter(ConditionParenOpen);
                    Consume
                }
                T::Semicolon => Consume,
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },
            ConditionParenOpen => match kind {
                T::RParen => {
                    self.leave(false);
                    Consume
                }
                T::LParen => {
                    self.enter(ConditionParenOpen);
                    Consume
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },

            MaybeElse => match kind {
                T::KwElse => {
                    self.turn_into(ElseClause);
                    self.enter(Substatement);
                    Consume
                }
                _ => {
                    self.leave(true);
                    Reprocess
                }
            },
            ElseClause => {
                // Tokens normally reach the substatement pushed on entry;
                // anything else means the construct fell apart mid-edit.
                self.leave(true);
                Reprocess
            }

            ForStatement => match kind {
                T::LParen => {
                    self.enter(ForStatementParenOpen);
                    Consume
                }
                _ => {
                    self.leave(true);
                    Reprocess
                }
            },
            ForStatementParenOpen => match kind {
                T::RParen => {
                    self.turn_into(Substatement);
                    Consume
                }
                _ => {
                    self.enter(ForStatementInit);
                    Reprocess
                }
            },
            ForStatementInit => match kind {
                T::Semicolon => {
                    self.turn_into(ForStatementCondition);
                    Consume
                }
                T::Colon => Consume,
                T::RParen => {
                    self.leave(false);
                    Reprocess
                }
                T::LParen => {
                    self.enter(ConditionParenOpen);
                    Consume
                }
                T::LBrace => {
                    self.enter(BraceinitOpen);
                    Consume
                }
                _ => Consume,
            },
            ForStatementCondition => match kind {
                T::Semicolon => {
                    self.turn_into(ForStatementExpression);
                    Consume
                }
                T::RParen => {
                    self.leave(false);
                    Reprocess
                }
                T::LParen => {
                    self.enter(ConditionParenOpen);
                    Consume
                }
                _ => Consume,
            },
            ForStatementExpression => match kind {
                T::RParen => {
                    self.leave(false);
                    Reprocess
                }
                T::LParen => {
                    self.enter(ConditionParenOpen);
                    Consume
                }
                _ => Consume,
            },

            CaseStart => match kind {
                T::Colon => {
                    self.turn_into(CaseCont);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Consume
                }
                T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },
            CaseCont => match kind {
                T::KwCase | T::KwDefault | T::RBrace => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_statement(kind);
                    Consume
                }
            },

            Substatement => match kind {
                T::LBrace => {
                    self.turn_into(SubstatementOpen);
                    Consume
                }
                T::Semicolon => {
                    self.leave(true);
                    Consume
                }
                T::RBrace => {
                    self.leave(true);
                    Reprocess
                }
                _ => {
                    self.try_statement(kind);
                    Consume
                }
            },
            SubstatementOpen | BlockOpen => match kind {
                T::RBrace => {
                    self.leave(true);
                    Consume
                }
                _ => {
                    self.try_statement(kind);
                    Consume
                }
            },

            DoStatement => match kind {
                T::Semicolon => {
                    self.leave(true);
                    Consume
                }
                _ => {
                    self.enter(Substatement);
                    Reprocess
                }
            },

            LambdaIntroducerOrSubscription => match kind {
                T::RBracket => {
                    self.turn_into(LambdaDeclaratorExpected);
                    Consume
                }
                T::Equal | T::Amp | T::Comma => {
                    self.turn_into(LambdaIntroducer);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },
            LambdaIntroducer => match kind {
                T::RBracket => {
                    self.turn_into(LambdaDeclarator);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => Consume,
            },
            LambdaDeclaratorExpected => match kind {
                T::LParen => {
                    self.turn_into(LambdaDeclaratorOrExpression);
                    Consume
                }
                T::LBrace => {
                    self.turn_into(LambdaStatement);
                    Consume
                }
                _ => {
                    // It was a subscription after all.
                    self.leave(false);
                    Reprocess
                }
            },
            LambdaDeclarator => match kind {
                T::LParen => {
                    self.turn_into(LambdaDeclaratorOrExpression);
                    Consume
                }
                T::LBrace => {
                    self.turn_into(LambdaStatement);
                    Consume
                }
                _ => Consume,
            },
            LambdaDeclaratorOrExpression => match kind {
                T::RParen => {
                    self.turn_into(LambdaStatementExpected);
                    Consume
                }
                T::Semicolon => {
                    self.leave(false);
                    Reprocess
                }
                _ => {
                    self.try_expression(kind, false);
                    Consume
                }
            },
            LambdaStatementExpected => match kind {
                T::LBrace => {
                    self.turn_into(LambdaStatement);
                    Consume
                }
                T::Arrow
                | T::KwMutable
                | T::KwConst
                | T::KwConstexpr
                | T::Identifier
                | T::KwBuiltinType
                | T::Less
                | T::Greater
                | T::ColonColon
                | T::Star
                | T::Amp => Consume,
                _ => {
                    self.leave(false);
                    Reprocess
                }
            },

            StringOpen => match kind {
                T::StringLiteral => {
                    self.leave(false);
                    Consume
                }
                _ => {
                    self.leave(false);
                    Reprocess
                }
            },
            RawStringOpen => match kind {
                T::RawStringLiteral { terminated: true } => {
                    self.leave(false);
                    Consume
                }
                T::RawStringLiteral { terminated: false } => Consume,
                _ => {
                    self.leave(false);
                    Reprocess
                }
            },
        }
    }
}
