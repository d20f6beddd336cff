//! Arena AST over a document-wide token table.
//!
//! Nodes live in a flat `Vec` and refer to each other through [`NodeId`]
//! indices; a reparse replaces the whole arena, so consumers hold indices
//! only as long as one AST generation and drop them wholesale afterwards
//! (no per-node validity tracking).
//!
//! Token-boundary convention: a node's `last_token` is one *past* the last
//! token belonging to it, i.e. a node spans
//! `[start of first_token, start of last_token)`. The last token actually
//! included is `last_token - 1`; position helpers on [`Ast`] encode this so
//! callers don't repeat the bookkeeping.
//!
//! This crate does not parse C++. Front ends produce trees through
//! [`AstBuilder`]; the selection tests build the exact shapes they need the
//! same way.

use core_lexer::{LexState, TokenKind, tokenize_line};

/// A token of the whole document, with an absolute byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocToken {
    pub kind: TokenKind,
    pub start: usize,
    pub len: usize,
}

impl DocToken {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Index into a [`TokenTable`].
pub type TokenId = usize;

/// All tokens of a document in order, produced by running the line lexer
/// over the buffer with carry state threaded through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    tokens: Vec<DocToken>,
    text_len: usize,
}

impl TokenTable {
    pub fn scan(text: &str) -> Self {
        let mut tokens = Vec::new();
        let mut state = LexState::Normal;
        let mut offset = 0;
        for line in text.split('\n') {
            let lexed = tokenize_line(line, &state);
            tokens.extend(lexed.tokens.iter().map(|t| DocToken {
                kind: t.kind,
                start: offset + t.offset,
                len: t.len,
            }));
            state = lexed.end_state;
            offset += line.len() + 1;
        }
        Self {
            tokens,
            text_len: text.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, id: TokenId) -> Option<DocToken> {
        self.tokens.get(id).copied()
    }

    /// Start position of a token; out-of-range ids clamp to the document
    /// end, which is exactly what the one-past-last convention needs.
    pub fn start(&self, id: TokenId) -> usize {
        self.tokens.get(id).map_or(self.text_len, |t| t.start)
    }

    /// End position of a token; out-of-range ids clamp to the document end.
    pub fn end(&self, id: TokenId) -> usize {
        self.tokens.get(id).map_or(self.text_len, |t| t.end())
    }

    /// Byte length of the underlying document.
    pub fn text_len(&self) -> usize {
        self.text_len
    }
}

/// Stable index of a node within one AST generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Node classification, with the landmark tokens the selection stepper
/// needs for its per-kind sub-spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    TranslationUnit,
    CompoundStatement,
    ExpressionStatement,
    DeclarationStatement,
    Call {
        lparen: TokenId,
        rparen: TokenId,
    },
    StringLiteral,
    NumericLiteral {
        char_literal: bool,
    },
    ForStatement {
        lparen: TokenId,
        rparen: TokenId,
    },
    RangeForStatement {
        lparen: TokenId,
        rparen: TokenId,
    },
    ClassSpecifier {
        class_key: TokenId,
        name: Option<TokenId>,
        lbrace: TokenId,
        rbrace: TokenId,
    },
    Namespace {
        keyword: TokenId,
        identifier: Option<TokenId>,
    },
    ExpressionListParen {
        lparen: TokenId,
        rparen: TokenId,
    },
    FunctionDeclarator {
        lparen: TokenId,
        rparen: TokenId,
        first_cv: Option<TokenId>,
    },
    FunctionDefinition {
        first_specifier: Option<TokenId>,
        body: Option<NodeId>,
    },
    Declarator {
        first_cv: Option<TokenId>,
    },
    TemplateId {
        identifier: TokenId,
    },
    TemplateDeclaration {
        keyword: TokenId,
        greater: TokenId,
    },
    LambdaExpression {
        lbracket: TokenId,
        declarator_rparen: Option<TokenId>,
        trailing_return_last: Option<TokenId>,
    },
    SimpleName,
    /// Anything without special stepping behavior.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub first_token: TokenId,
    /// One past the last token belonging to this node.
    pub last_token: TokenId,
    pub children: Vec<NodeId>,
}

/// One AST generation: arena plus the token table it indexes into.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    tokens: TokenTable,
    root: Option<NodeId>,
}

impl Ast {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Character span a node covers per the token-boundary convention.
    pub fn span(&self, id: NodeId) -> (usize, usize) {
        let node = self.node(id);
        (
            self.tokens.start(node.first_token),
            self.tokens.start(node.last_token),
        )
    }

    /// Root-to-leaf chain of nodes whose spans contain `pos`. Empty when
    /// there is no root or the position lies outside the root span.
    pub fn path_to(&self, pos: usize) -> Vec<NodeId> {
        let mut path = Vec::new();
        let Some(root) = self.root else {
            return path;
        };
        if !self.contains(root, pos) {
            return path;
        }
        let mut current = root;
        loop {
            path.push(current);
            let next = self
                .node(current)
                .children
                .iter()
                .copied()
                .find(|&child| self.contains(child, pos));
            match next {
                Some(child) => current = child,
                None => break,
            }
        }
        path
    }

    fn contains(&self, id: NodeId, pos: usize) -> bool {
        let (start, end) = self.span(id);
        pos >= start && pos < end.max(start + 1)
    }
}

/// Tree construction in containment order: `open` a node, add its children
/// (nested opens or `leaf` calls), then `close` it. The first node opened
/// becomes the root.
pub struct AstBuilder {
    tokens: TokenTable,
    nodes: Vec<Node>,
    open_stack: Vec<NodeId>,
    root: Option<NodeId>,
}

impl AstBuilder {
    pub fn new(text: &str) -> Self {
        Self::from_tokens(TokenTable::scan(text))
    }

    pub fn from_tokens(tokens: TokenTable) -> Self {
        Self {
            tokens,
            nodes: Vec::new(),
            open_stack: Vec::new(),
            root: None,
        }
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Open a node spanning `[first_token, last_token)`; subsequent nodes
    /// become its children until the matching [`Self::close`].
    pub fn open(&mut self, kind: NodeKind, first_token: TokenId, last_token: TokenId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            first_token,
            last_token,
            children: Vec::new(),
        });
        if let Some(&parent) = self.open_stack.last() {
            self.nodes[parent.0 as usize].children.push(id);
        } else if self.root.is_none() {
            self.root = Some(id);
        }
        self.open_stack.push(id);
        id
    }

    pub fn close(&mut self) {
        self.open_stack.pop();
    }

    /// A childless node.
    pub fn leaf(&mut self, kind: NodeKind, first_token: TokenId, last_token: TokenId) -> NodeId {
        let id = self.open(kind, first_token, last_token);
        self.close();
        id
    }

    pub fn finish(self) -> Ast {
        Ast {
            nodes: self.nodes,
            tokens: self.tokens,
            root: self.root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_table_spans_lines() {
        let table = TokenTable::scan("int x;\nint y;");
        assert_eq!(table.len(), 6);
        let y = table.get(4).unwrap();
        assert_eq!(y.start, 11); // "int x;\nint " is 11 bytes
        assert_eq!(y.len, 1);
    }

    #[test]
    fn token_table_threads_lexer_state() {
        let table = TokenTable::scan("/* a\nb */ int x;");
        // Two comment pieces, then the declaration.
        assert_eq!(
            table.get(0).unwrap().kind,
            TokenKind::BlockComment { terminated: false }
        );
        assert_eq!(
            table.get(1).unwrap().kind,
            TokenKind::BlockComment { terminated: true }
        );
        assert_eq!(table.get(2).unwrap().kind, TokenKind::KwBuiltinType);
    }

    #[test]
    fn out_of_range_token_positions_clamp_to_text_end() {
        let table = TokenTable::scan("int x;");
        assert_eq!(table.start(999), 6);
        assert_eq!(table.end(999), 6);
    }

    #[test]
    fn path_walks_containment_chain() {
        // void f() { g(); }
        let text = "void f() { g(); }";
        let mut b = AstBuilder::new(text);
        assert_eq!(b.tokens().len(), 10);
        let total = b.tokens().len();
        b.open(NodeKind::TranslationUnit, 0, total);
        b.open(
            NodeKind::FunctionDefinition {
                first_specifier: Some(0),
                body: None,
            },
            0,
            total,
        );
        b.open(NodeKind::CompoundStatement, 4, total);
        b.open(NodeKind::ExpressionStatement, 5, 9);
        b.leaf(
            NodeKind::Call {
                lparen: 6,
                rparen: 7,
            },
            5,
            8,
        );
        b.close();
        b.close();
        b.close();
        b.close();
        let ast = b.finish();

        // Position inside `g()`'s parens (the second `()` in the text).
        let pos = text.rfind("()").unwrap() + 1;
        let path = ast.path_to(pos);
        assert_eq!(path.len(), 5);
        assert!(matches!(ast.node(path[4]).kind, NodeKind::Call { .. }));
        assert!(matches!(ast.node(path[0]).kind, NodeKind::TranslationUnit));
    }

    #[test]
    fn path_is_empty_without_root() {
        let ast = AstBuilder::new("").finish();
        assert!(ast.path_to(0).is_empty());
    }
}
