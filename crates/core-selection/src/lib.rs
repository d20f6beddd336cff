//! AST-driven selection expansion and shrinking.
//!
//! Given the AST path under the position where the user started (captured
//! once and held fixed across a whole expand/shrink sequence), each call
//! moves one step: either to the next sub-span of the current node, or to
//! the neighboring node on the path. How many sub-spans a node has, and
//! what they are, is decided per node kind — a compound statement first
//! offers its interior without braces, then with them; a call offers the
//! area inside the parentheses, then parentheses included, then the whole
//! call.
//!
//! The step-count table ([`SelectionChanger::possible_step_count`]) and the
//! fine-tuning dispatch (`fine_tune`) are two matches over the same
//! [`NodeKind`] tag, kept adjacent in this file; a test asserts they agree
//! for every kind, so they cannot drift apart silently.
//!
//! Candidate spans that do not strictly grow (expand) or shrink (shrink),
//! or that stop containing the captured start position, are skipped — this
//! is what makes repeated calls monotonic and free of oscillation.

use core_ast::{Ast, NodeId, NodeKind};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ExpandSelection,
    ShrinkSelection,
}

/// A selection as `anchor`/`position` byte offsets; a caret has both equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
    pub anchor: usize,
    pub position: usize,
}

impl SelectionRange {
    pub fn new(anchor: usize, position: usize) -> Self {
        Self { anchor, position }
    }

    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            position: pos,
        }
    }

    pub fn has_selection(&self) -> bool {
        self.anchor != self.position
    }

    /// Flip so that `anchor <= position`.
    pub fn normalized(self) -> Self {
        if self.anchor > self.position {
            Self {
                anchor: self.position,
                position: self.anchor,
            }
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.position.abs_diff(self.anchor)
    }

    pub fn is_empty(&self) -> bool {
        !self.has_selection()
    }
}

/// The character span a node (or one of its sub-steps) maps to.
#[derive(Debug, Clone, Copy)]
struct NodePositions {
    node: NodeId,
    start: usize,
    end: usize,
}

/// Where we are within the captured AST path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StepCursor {
    /// No change-selection sequence in progress.
    #[default]
    NotSet,
    /// Expansion hit the ceiling; a shrink steps back down from here.
    WholeDocument,
    At {
        node_index: usize,
        step: i32,
    },
}

/// Selection stepper. One instance per editor view; reset via
/// [`SelectionChanger::on_cursor_moved`] whenever the caret moves outside a
/// change-selection operation, and unconditionally after a reparse (node
/// indices do not survive AST generations).
#[derive(Debug, Default)]
pub struct SelectionChanger {
    initial_cursor: SelectionRange,
    cursor: StepCursor,
    in_change: bool,
}

impl SelectionChanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caller notification: the cursor moved. Ignored while a change
    /// operation is applying its own cursor updates.
    pub fn on_cursor_moved(&mut self, new_cursor: SelectionRange) {
        if !self.in_change {
            self.initial_cursor = new_cursor;
            self.cursor = StepCursor::NotSet;
            trace!(?new_cursor, "captured new initial cursor");
        }
    }

    /// Bracket a change operation so the editor's cursor-moved notification
    /// does not clobber the captured initial cursor.
    pub fn begin_change(&mut self) {
        self.in_change = true;
    }

    pub fn end_change(&mut self) {
        self.in_change = false;
    }

    /// The AST was regenerated: all captured indices are void.
    pub fn on_reparse(&mut self) {
        self.cursor = StepCursor::NotSet;
    }

    /// Compute the next selection in `direction`. Mutates `range` and
    /// returns true when a change was made; degenerate requests (shrinking
    /// a caret, expanding past the whole document, no usable AST) return
    /// false and leave `range` untouched.
    pub fn change_selection(
        &mut self,
        direction: Direction,
        range: &mut SelectionRange,
        ast: &Ast,
        text: &str,
    ) -> bool {
        let mut working = *range;

        if direction == Direction::ShrinkSelection && !working.has_selection() {
            return false;
        }
        let whole = SelectionRange::new(0, text.len());
        if direction == Direction::ExpandSelection
            && working.has_selection()
            && working.normalized() == whole
        {
            return false;
        }
        if ast.is_empty() {
            return false;
        }

        working = working.normalized();

        if self.perform(direction, &mut working, ast, text) {
            *range = working;
            true
        } else {
            false
        }
    }

    fn perform(
        &mut self,
        direction: Direction,
        working: &mut SelectionRange,
        ast: &Ast,
        text: &str,
    ) -> bool {
        loop {
            match self.find_next_step_positions(direction, ast, text) {
                Some(positions) => {
                    if self.should_skip(direction, positions, *working) {
                        trace!(node = ?positions.node, "skipping candidate span");
                        continue;
                    }
                    *working = SelectionRange::new(positions.start, positions.end);
                    return true;
                }
                None if direction == Direction::ShrinkSelection => {
                    // Nothing smaller: collapse to a caret at the position
                    // the sequence started from.
                    *working = SelectionRange::caret(self.initial_cursor.position);
                    self.cursor = StepCursor::NotSet;
                    return true;
                }
                None => {
                    // Nothing bigger: the whole document, including any
                    // leading preprocessor prelude outside the AST.
                    *working = SelectionRange::new(0, text.len());
                    self.cursor = StepCursor::WholeDocument;
                    return true;
                }
            }
        }
    }

    fn find_next_step_positions(
        &mut self,
        direction: Direction,
        ast: &Ast,
        text: &str,
    ) -> Option<NodePositions> {
        // The path is always derived from the captured initial position so
        // stepping stays stable while the selection grows away from it.
        let path = ast.path_to(self.initial_cursor.position);
        if path.is_empty() {
            return None;
        }
        match self.cursor {
            StepCursor::NotSet => self.find_from_cursor(direction, &path, None, ast, text),
            StepCursor::WholeDocument => {
                if direction == Direction::ExpandSelection {
                    return None;
                }
                self.find_from_cursor(direction, &path, None, ast, text)
            }
            StepCursor::At { node_index, step } => {
                self.find_from_previous(direction, &path, node_index, step, ast, text)
            }
        }
    }

    /// Pick a node on the path and its first step: innermost for expansion,
    /// outermost for shrinking, unless `starting_index` overrides.
    fn find_from_cursor(
        &mut self,
        direction: Direction,
        path: &[NodeId],
        starting_index: Option<usize>,
        ast: &Ast,
        text: &str,
    ) -> Option<NodePositions> {
        let index = starting_index.unwrap_or(match direction {
            Direction::ExpandSelection => path.len() - 1,
            Direction::ShrinkSelection => 0,
        });
        let Some(&node) = path.get(index) else {
            self.cursor = StepCursor::NotSet;
            return None;
        };
        let step = match direction {
            Direction::ExpandSelection => 1,
            Direction::ShrinkSelection => self.possible_step_count(ast, node),
        };
        self.cursor = StepCursor::At {
            node_index: index,
            step,
        };
        Some(self.fine_tuned_positions(node, step, ast, text))
    }

    /// Resume from the recorded node/step: advance the step if the node has
    /// more, otherwise move along the path.
    fn find_from_previous(
        &mut self,
        direction: Direction,
        path: &[NodeId],
        node_index: usize,
        step: i32,
        ast: &Ast,
        text: &str,
    ) -> Option<NodePositions> {
        let Some(&node) = path.get(node_index) else {
            // The path changed length under us (reparse without reset);
            // restart cleanly.
            return self.find_from_cursor(direction, path, None, ast, text);
        };

        let last_step = match direction {
            Direction::ExpandSelection => step >= self.possible_step_count(ast, node),
            Direction::ShrinkSelection => step <= 1,
        };
        if last_step {
            let next_index = match direction {
                Direction::ExpandSelection => node_index.checked_sub(1)?,
                Direction::ShrinkSelection => {
                    let next = node_index + 1;
                    if next >= path.len() {
                        return None;
                    }
                    next
                }
            };
            self.find_from_cursor(direction, path, Some(next_index), ast, text)
        } else {
            let next_step = match direction {
                Direction::ExpandSelection => step + 1,
                Direction::ShrinkSelection => step - 1,
            };
            self.cursor = StepCursor::At {
                node_index,
                step: next_step,
            };
            Some(self.fine_tuned_positions(node, next_step, ast, text))
        }
    }

    /// Skip candidates that would not make monotonic progress or that no
    /// longer contain the captured initial cursor.
    fn should_skip(
        &self,
        direction: Direction,
        positions: NodePositions,
        working: SelectionRange,
    ) -> bool {
        let is_equal = working.anchor == positions.start && working.position == positions.end;

        let mut includes_initial = self.initial_cursor.anchor >= positions.start
            && self.initial_cursor.position <= positions.end;
        // For a plain caret, prefer spans the caret position lies within.
        if !self.initial_cursor.has_selection() {
            includes_initial = self.initial_cursor.position < positions.end;
        }

        let smaller = positions.start > working.anchor || positions.end < working.position;
        let bigger = positions.start < working.anchor || positions.end > working.position;

        match direction {
            Direction::ExpandSelection => smaller || is_equal || !includes_initial,
            Direction::ShrinkSelection => bigger || is_equal || !includes_initial,
        }
    }

    /// Token-boundary span of a node: start of its first token up to the
    /// end of its last included token (start of the single token's
    /// successor when the node is one token wide).
    fn node_positions(&self, node: NodeId, ast: &Ast) -> NodePositions {
        let n = ast.node(node);
        let tokens = ast.tokens();
        let start = tokens.start(n.first_token);
        let mut end = tokens.start(n.last_token);
        if n.last_token != n.first_token {
            end = tokens.end(n.last_token.saturating_sub(1));
        }
        NodePositions { node, start, end }
    }

    fn fine_tuned_positions(
        &self,
        node: NodeId,
        step: i32,
        ast: &Ast,
        text: &str,
    ) -> NodePositions {
        let mut positions = self.node_positions(node, ast);
        self.fine_tune(&mut positions, step, ast, text);
        positions
    }

    /// How many discrete stops a node offers before moving along the path.
    /// Must agree with `fine_tune` for every kind.
    pub fn possible_step_count(&self, ast: &Ast, node: NodeId) -> i32 {
        match ast.node(node).kind {
            NodeKind::CompoundStatement
            | NodeKind::StringLiteral
            | NodeKind::ExpressionListParen { .. }
            | NodeKind::FunctionDefinition { .. }
            | NodeKind::TemplateId { .. }
            | NodeKind::Declarator { .. } => 2,
            NodeKind::NumericLiteral { char_literal } => {
                if char_literal {
                    2
                } else {
                    1
                }
            }
            NodeKind::Call { .. }
            | NodeKind::ForStatement { .. }
            | NodeKind::RangeForStatement { .. }
            | NodeKind::ClassSpecifier { .. }
            | NodeKind::Namespace { .. }
            | NodeKind::TemplateDeclaration { .. }
            | NodeKind::LambdaExpression { .. } => 3,
            _ => 1,
        }
    }

    /// Per-kind sub-span selection for the given step. Steps beyond the
    /// ones handled here fall through to the node's default span.
    fn fine_tune(&self, positions: &mut NodePositions, step: i32, ast: &Ast, text: &str) {
        let tokens = ast.tokens();
        let node = ast.node(positions.node);
        let initial = self.initial_cursor;

        match node.kind {
            NodeKind::CompoundStatement => {
                // First the contents without braces, then contents plus
                // braces (the default span).
                if step == 1 {
                    let second_to_last = node.last_token.saturating_sub(1);
                    if second_to_last.saturating_sub(node.first_token) <= 1 {
                        // Empty body: select the blank space between the
                        // braces.
                        positions.start = tokens.end(node.first_token);
                        positions.end = tokens.start(second_to_last);
                    } else {
                        positions.start = tokens.start(node.first_token + 1);
                        positions.end = tokens.end(node.last_token.saturating_sub(2));
                    }
                }
            }
            NodeKind::Call { lparen, rparen } => {
                let open = tokens.start(lparen);
                let close = tokens.end(rparen);
                // With the cursor in the callee name the paren steps are
                // skipped; the name is its own AST node and the whole call
                // is one stop.
                let in_callee = initial.position <= open;
                if step == 1 && !in_callee {
                    positions.start = open + 1;
                    positions.end = close.saturating_sub(1);
                } else if step == 2 && !in_callee {
                    positions.start = open;
                    positions.end = close;
                }
            }
            NodeKind::StringLiteral => {
                if step == 1
                    && let Some((start, end)) =
                        string_contents_span(text, positions.start, positions.end, '"')
                {
                    positions.start = start;
                    positions.end = end;
                }
            }
            NodeKind::NumericLiteral { char_literal } => {
                if char_literal
                    && step == 1
                    && let Some((start, end)) =
                        string_contents_span(text, positions.start, positions.end, '\'')
                {
                    positions.start = start;
                    positions.end = end;
                }
            }
            NodeKind::ForStatement { lparen, rparen }
            | NodeKind::RangeForStatement { lparen, rparen } => {
                self.fine_tune_paren_steps(positions, step, tokens.start(lparen), tokens.end(rparen));
            }
            NodeKind::ClassSpecifier {
                class_key,
                name,
                lbrace,
                rbrace,
            } => {
                let braces_start = tokens.start(lbrace);
                let braces_end = tokens.end(rbrace);
                let inside_braces = initial.position > braces_start;

                let key_start = tokens.start(class_key);
                let key_end = tokens.end(class_key);
                let in_class_keyword = initial.anchor >= key_start && initial.position <= key_end;

                let name_end = name.map_or(braces_end, |id| tokens.end(id));
                let in_class_name = name.is_some_and(|id| {
                    initial.anchor >= tokens.start(id) && initial.position <= tokens.end(id)
                });

                if inside_braces {
                    if step == 1 {
                        positions.start = braces_start + 1;
                        positions.end = braces_end.saturating_sub(1);
                    } else if step == 2 {
                        positions.start = braces_start;
                        positions.end = braces_end;
                    }
                } else if in_class_keyword {
                    if step == 1 {
                        positions.start = key_start;
                        positions.end = key_end;
                    } else if step == 2 {
                        positions.start = key_start;
                        positions.end = name_end;
                    }
                } else if in_class_name && step == 1 {
                    positions.start = key_start;
                    positions.end = name_end;
                }
            }
            NodeKind::Namespace {
                keyword,
                identifier,
            } => {
                let key_start = tokens.start(keyword);
                let key_end = tokens.end(keyword);
                let in_keyword = initial.position <= key_end;
                let in_identifier = identifier.is_some_and(|id| {
                    initial.anchor >= tokens.start(id) && initial.position <= tokens.end(id)
                });
                let identifier_span =
                    identifier.map(|id| (tokens.start(id), tokens.end(id)));

                if step == 1 {
                    if in_keyword {
                        positions.start = key_start;
                        positions.end = key_end;
                    } else if let (true, Some((start, end))) = (in_identifier, identifier_span) {
                        positions.start = start;
                        positions.end = end;
                    }
                } else if step == 2
                    && (in_keyword || in_identifier)
                    && let Some((_, id_end)) = identifier_span
                {
                    positions.start = key_start;
                    positions.end = id_end;
                }
            }
            NodeKind::ExpressionListParen { lparen, rparen } => {
                let open = tokens.start(lparen);
                let close = tokens.end(rparen);
                if step == 1 {
                    positions.start = open + 1;
                    positions.end = close.saturating_sub(1);
                } else if step == 2 {
                    positions.start = open;
                    positions.end = close;
                }
            }
            NodeKind::FunctionDeclarator { lparen, rparen, .. } => {
                if step == 1 {
                    positions.start = tokens.start(lparen);
                    positions.end = tokens.end(rparen);
                }
            }
            NodeKind::FunctionDefinition {
                first_specifier,
                body,
            } => {
                let (Some(first_specifier), Some(body)) = (first_specifier, body) else {
                    return;
                };
                let brace_start = tokens.start(ast.node(body).first_token);
                let outside_body = initial.position <= brace_start;
                if step == 1 && outside_body {
                    // Everything left of the body brace: specifiers plus
                    // declarator.
                    positions.start = tokens.start(first_specifier);
                    positions.end = brace_start.saturating_sub(1);
                }
            }
            NodeKind::Declarator { first_cv } => {
                let Some(first_cv) = first_cv else { return };
                let cv_start = tokens.start(first_cv);
                if step == 1 && initial.position < cv_start {
                    positions.end = cv_start.saturating_sub(1);
                }
            }
            NodeKind::TemplateId { identifier } => {
                let id_start = tokens.start(identifier);
                let id_end = tokens.end(identifier);
                let inside = initial.anchor >= id_start && initial.position <= id_end;
                if step == 1 && inside {
                    positions.start = id_start;
                    positions.end = id_end;
                }
            }
            NodeKind::TemplateDeclaration { keyword, greater } => {
                let key_start = tokens.start(keyword);
                let key_end = tokens.end(keyword);
                let in_keyword = initial.anchor >= key_start && initial.position <= key_end;
                if step == 1 && in_keyword {
                    positions.start = key_start;
                    positions.end = key_end;
                } else if step == 2 && in_keyword {
                    positions.start = key_start;
                    positions.end = tokens.end(greater);
                }
            }
            NodeKind::LambdaExpression {
                lbracket,
                declarator_rparen,
                trailing_return_last,
            } => {
                let Some(rparen) = declarator_rparen else {
                    return;
                };
                let bracket_start = tokens.start(lbracket);
                let declarator_end = tokens.end(rparen);
                let in_declarator =
                    initial.anchor >= bracket_start && initial.position <= declarator_end;
                if step == 1 && in_declarator {
                    // Capture list plus parameter list.
                    positions.start = bracket_start;
                    positions.end = declarator_end;
                } else if step == 2
                    && in_declarator
                    && let Some(last) = trailing_return_last
                {
                    // The full prototype including the trailing return type.
                    positions.start = bracket_start;
                    positions.end = tokens.end(last);
                }
            }
            _ => {}
        }
    }

    /// Shared `for`/range-`for` stepping: inside the parens, then parens
    /// included — only when the sequence started inside them.
    fn fine_tune_paren_steps(
        &self,
        positions: &mut NodePositions,
        step: i32,
        open: usize,
        close: usize,
    ) {
        let outside = self.initial_cursor.position <= open;
        if step == 1 && !outside {
            positions.start = open + 1;
            positions.end = close.saturating_sub(1);
        } else if step == 2 && !outside {
            positions.start = open;
            positions.end = close;
        }
    }
}

/// Contents of a quoted literal, without quotes; handles raw string
/// delimiters and literal prefixes (`u8"..."`, `L'...'`).
fn string_contents_span(
    text: &str,
    token_start: usize,
    token_end: usize,
    quote: char,
) -> Option<(usize, usize)> {
    let token_end = token_end.min(text.len());
    let tok = text.get(token_start..token_end)?;
    let quote_rel = tok.find(quote)?;
    let is_raw = quote == '"' && tok[..quote_rel].contains('R');
    if is_raw {
        let open_rel = tok[quote_rel..].find('(')? + quote_rel;
        let delim_len = open_rel - quote_rel - 1;
        let end = token_end.checked_sub(delim_len + 2)?;
        Some((token_start + open_rel + 1, end))
    } else {
        Some((token_start + quote_rel + 1, token_end.saturating_sub(1)))
    }
}
