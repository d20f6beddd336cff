//! Single-line C++ lexer with cross-line carry state.
//!
//! The indentation engine processes one line at a time; constructs that span
//! lines (block comments, raw string literals, backslash-joined preprocessor
//! lines) are carried through a small [`LexState`] that the caller threads
//! from each line's end into the next line's start. Tokens carry byte spans
//! relative to the line they came from.
//!
//! The lexer is total: any byte sequence tokenizes. Unknown characters become
//! [`TokenKind::Unknown`] tokens rather than errors, because the engine must
//! keep producing sensible output mid-edit on arbitrarily broken input.

use tracing::trace;

/// Token classification. Only the distinctions the indentation engine and the
/// selection stepper actually branch on get their own variant; the long tail
/// of C++ operators collapses into [`TokenKind::Operator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    CharLiteral,
    /// A simple (possibly prefixed: `L`, `u8`, ...) string literal.
    StringLiteral,
    /// A raw string literal (`R"delim(...)delim"`, possibly prefixed).
    RawStringLiteral {
        terminated: bool,
    },
    LineComment,
    BlockComment {
        terminated: bool,
    },

    KwClass,
    KwStruct,
    KwUnion,
    KwEnum,
    KwNamespace,
    KwExtern,
    KwUsing,
    KwTemplate,
    KwOperator,
    KwIf,
    KwElse,
    KwFor,
    KwWhile,
    KwDo,
    KwSwitch,
    KwCase,
    KwDefault,
    KwReturn,
    KwPublic,
    KwProtected,
    KwPrivate,
    KwConst,
    KwVolatile,
    KwStatic,
    KwInline,
    KwVirtual,
    KwConstexpr,
    KwTypedef,
    KwAuto,
    KwTypename,
    KwFriend,
    KwExplicit,
    KwMutable,
    KwBreak,
    KwContinue,
    KwGoto,
    KwTry,
    KwCatch,
    KwThrow,
    KwNew,
    KwDelete,
    KwSizeof,
    /// Builtin type names: `void`, `bool`, `int`, `unsigned`, ...
    KwBuiltinType,

    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Colon,
    ColonColon,
    Comma,
    Question,
    Less,
    Greater,
    LessLess,
    GreaterGreater,
    /// Plain assignment `=`. Compound assignments are [`TokenKind::AssignOp`].
    Equal,
    AssignOp,
    Arrow,
    Dot,
    Star,
    Amp,
    AmpAmp,
    PipePipe,
    Pound,
    /// Any other operator or punctuation character sequence.
    Operator,
    Unknown,
}

impl TokenKind {
    /// True for comment tokens of either flavor.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment { .. }
        )
    }

    /// True for any literal token.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
                | TokenKind::RawStringLiteral { .. }
        )
    }
}

/// A token within a single line: kind plus byte span `[offset, offset + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub len: usize,
}

impl Token {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Slice this token's text out of the line it was produced from.
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.offset..self.offset + self.len]
    }
}

/// Lexer carry state at a line boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LexState {
    #[default]
    Normal,
    /// Inside an unterminated `/* ... */` comment.
    BlockComment,
    /// Inside an unterminated simple string literal whose line ended with a
    /// backslash join.
    String,
    /// Inside an unterminated raw string literal; `delim` is the raw
    /// delimiter between `"` and `(`.
    RawString {
        delim: String,
    },
}

/// Result of tokenizing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    pub tokens: Vec<Token>,
    /// Carry state to seed the next line with.
    pub end_state: LexState,
    /// The line ended with a backslash join (relevant inside preprocessor
    /// directives).
    pub ended_joined: bool,
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "class" => TokenKind::KwClass,
        "struct" => TokenKind::KwStruct,
        "union" => TokenKind::KwUnion,
        "enum" => TokenKind::KwEnum,
        "namespace" => TokenKind::KwNamespace,
        "extern" => TokenKind::KwExtern,
        "using" => TokenKind::KwUsing,
        "template" => TokenKind::KwTemplate,
        "operator" => TokenKind::KwOperator,
        "if" => TokenKind::KwIf,
        "else" => TokenKind::KwElse,
        "for" => TokenKind::KwFor,
        "while" => TokenKind::KwWhile,
        "do" => TokenKind::KwDo,
        "switch" => TokenKind::KwSwitch,
        "case" => TokenKind::KwCase,
        "default" => TokenKind::KwDefault,
        "return" => TokenKind::KwReturn,
        "public" => TokenKind::KwPublic,
        "protected" => TokenKind::KwProtected,
        "private" => TokenKind::KwPrivate,
        "const" => TokenKind::KwConst,
        "volatile" => TokenKind::KwVolatile,
        "static" => TokenKind::KwStatic,
        "inline" => TokenKind::KwInline,
        "virtual" => TokenKind::KwVirtual,
        "constexpr" => TokenKind::KwConstexpr,
        "typedef" => TokenKind::KwTypedef,
        "auto" => TokenKind::KwAuto,
        "typename" => TokenKind::KwTypename,
        "friend" => TokenKind::KwFriend,
        "explicit" => TokenKind::KwExplicit,
        "mutable" => TokenKind::KwMutable,
        "break" => TokenKind::KwBreak,
        "continue" => TokenKind::KwContinue,
        "goto" => TokenKind::KwGoto,
        "try" => TokenKind::KwTry,
        "catch" => TokenKind::KwCatch,
        "throw" => TokenKind::KwThrow,
        "new" => TokenKind::KwNew,
        "delete" => TokenKind::KwDelete,
        "sizeof" => TokenKind::KwSizeof,
        "void" | "bool" | "char" | "wchar_t" | "char8_t" | "char16_t" | "char32_t" | "short"
        | "int" | "long" | "float" | "double" | "signed" | "unsigned" => TokenKind::KwBuiltinType,
        _ => return None,
    };
    Some(kind)
}

/// String-literal prefixes. Returns `(is_raw)` when `text` is a valid prefix
/// for a literal that starts right after it.
fn string_prefix(text: &str) -> Option<bool> {
    match text {
        "L" | "u" | "U" | "u8" => Some(false),
        "R" | "LR" | "uR" | "UR" | "u8R" => Some(true),
        _ => None,
    }
}

struct Lexer<'a> {
    line: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            bytes: line.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            offset: start,
            len: self.pos - start,
        });
    }

    /// Scan for `*/` starting at the current position. Returns the carry
    /// state after this comment piece.
    fn block_comment_rest(&mut self, start: usize) -> LexState {
        match self.line[self.pos..].find("*/") {
            Some(rel) => {
                self.pos += rel + 2;
                self.push(TokenKind::BlockComment { terminated: true }, start);
                LexState::Normal
            }
            None => {
                self.pos = self.bytes.len();
                self.push(TokenKind::BlockComment { terminated: false }, start);
                LexState::BlockComment
            }
        }
    }

    /// Scan for `)delim"` starting at the current position.
    fn raw_string_rest(&mut self, start: usize, delim: &str) -> LexState {
        let close = format!("){delim}\"");
        match self.line[self.pos..].find(&close) {
            Some(rel) => {
                self.pos += rel + close.len();
                self.push(TokenKind::RawStringLiteral { terminated: true }, start);
                LexState::Normal
            }
            None => {
                self.pos = self.bytes.len();
                self.push(TokenKind::RawStringLiteral { terminated: false }, start);
                LexState::RawString {
                    delim: delim.to_string(),
                }
            }
        }
    }

    /// Lex a simple string or char literal body; `self.pos` is just past the
    /// opening quote. Returns true if the closing quote was found.
    fn quoted_rest(&mut self, quote: u8) -> bool {
        while let Some(b) = self.peek(0) {
            self.pos += 1;
            if b == b'\\' {
                if self.peek(0).is_some() {
                    self.pos += 1;
                }
            } else if b == quote {
                return true;
            }
        }
        false
    }

    /// Lex a raw string literal; `self.pos` is at the opening `"`. Parses the
    /// delimiter up to `(` and then delegates to [`Self::raw_string_rest`].
    fn raw_string(&mut self, start: usize) -> LexState {
        self.pos += 1; // opening quote
        let delim_start = self.pos;
        while let Some(b) = self.peek(0) {
            if b == b'(' {
                break;
            }
            // Delimiters are short and never contain spaces or quotes; bail
            // out into plain-string handling for nonsense input.
            if b == b'"' || b == b' ' || self.pos - delim_start > 16 {
                self.pos = delim_start;
                let terminated = self.quoted_rest(b'"');
                self.push(TokenKind::StringLiteral, start);
                return string_end_state(terminated, self.line);
            }
            self.pos += 1;
        }
        let delim = self.line[delim_start..self.pos].to_string();
        if self.peek(0) == Some(b'(') {
            self.pos += 1;
        }
        self.raw_string_rest(start, &delim)
    }

    fn identifier(&mut self, start: usize) -> Option<LexState> {
        while let Some(b) = self.peek(0) {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.line[start..self.pos];
        // A string prefix directly followed by a quote is part of the literal.
        if let Some(raw) = string_prefix(text)
            && self.peek(0) == Some(b'"')
        {
            if raw {
                return Some(self.raw_string(start));
            }
            self.pos += 1;
            let terminated = self.quoted_rest(b'"');
            self.push(TokenKind::StringLiteral, start);
            return Some(string_end_state(terminated, self.line));
        }
        let kind = keyword_kind(text).unwrap_or(TokenKind::Identifier);
        self.push(kind, start);
        None
    }

    fn number(&mut self, start: usize) {
        while let Some(b) = self.peek(0) {
            // Good enough for indentation purposes: digits, digit separators,
            // radix/exponent letters, and a decimal point all glue together.
            if b.is_ascii_alphanumeric() || b == b'.' || b == b'\'' || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn punctuation(&mut self, start: usize) {
        let b = self.bytes[self.pos];
        let b1 = self.peek(1);
        let b2 = self.peek(2);
        let (kind, len) = match (b, b1, b2) {
            (b'<', Some(b'<'), Some(b'=')) | (b'>', Some(b'>'), Some(b'=')) => {
                (TokenKind::AssignOp, 3)
            }
            (b'.', Some(b'.'), Some(b'.')) => (TokenKind::Operator, 3),
            (b':', Some(b':'), _) => (TokenKind::ColonColon, 2),
            (b'-', Some(b'>'), _) => (TokenKind::Arrow, 2),
            (b'<', Some(b'<'), _) => (TokenKind::LessLess, 2),
            (b'>', Some(b'>'), _) => (TokenKind::GreaterGreater, 2),
            (b'&', Some(b'&'), _) => (TokenKind::AmpAmp, 2),
            (b'|', Some(b'|'), _) => (TokenKind::PipePipe, 2),
            (b'=', Some(b'='), _) | (b'!', Some(b'='), _) => (TokenKind::Operator, 2),
            (b'<', Some(b'='), _) | (b'>', Some(b'='), _) => (TokenKind::Operator, 2),
            (b'+', Some(b'='), _)
            | (b'-', Some(b'='), _)
            | (b'*', Some(b'='), _)
            | (b'/', Some(b'='), _)
            | (b'%', Some(b'='), _)
            | (b'&', Some(b'='), _)
            | (b'|', Some(b'='), _)
            | (b'^', Some(b'='), _) => (TokenKind::AssignOp, 2),
            (b'+', Some(b'+'), _) | (b'-', Some(b'-'), _) => (TokenKind::Operator, 2),
            (b'{', ..) => (TokenKind::LBrace, 1),
            (b'}', ..) => (TokenKind::RBrace, 1),
            (b'(', ..) => (TokenKind::LParen, 1),
            (b')', ..) => (TokenKind::RParen, 1),
            (b'[', ..) => (TokenKind::LBracket, 1),
            (b']', ..) => (TokenKind::RBracket, 1),
            (b';', ..) => (TokenKind::Semicolon, 1),
            (b':', ..) => (TokenKind::Colon, 1),
            (b',', ..) => (TokenKind::Comma, 1),
            (b'?', ..) => (TokenKind::Question, 1),
            (b'<', ..) => (TokenKind::Less, 1),
            (b'>', ..) => (TokenKind::Greater, 1),
            (b'=', ..) => (TokenKind::Equal, 1),
            (b'#', ..) => (TokenKind::Pound, 1),
            (b'*', ..) => (TokenKind::Star, 1),
            (b'&', ..) => (TokenKind::Amp, 1),
            (b'.', ..) => (TokenKind::Dot, 1),
            (b'+' | b'-' | b'/' | b'%' | b'!' | b'^' | b'|' | b'~', ..) => {
                (TokenKind::Operator, 1)
            }
            _ => (TokenKind::Unknown, 1),
        };
        self.pos += len;
        self.push(kind, start);
    }
}

/// Carry state after a simple string literal: an unterminated literal only
/// survives the line boundary when the line ends with a backslash join.
fn string_end_state(terminated: bool, line: &str) -> LexState {
    if !terminated && line.ends_with('\\') {
        LexState::String
    } else {
        LexState::Normal
    }
}

/// Tokenize one line of C++ source, seeded with the carry state from the end
/// of the previous line.
pub fn tokenize_line(line: &str, begin_state: &LexState) -> LineTokens {
    let mut lx = Lexer::new(line);
    let mut state = LexState::Normal;

    // Resume a multi-line construct first; the rest of the line (if the
    // construct closes here) lexes normally afterwards.
    match begin_state {
        LexState::Normal => {}
        LexState::BlockComment => state = lx.block_comment_rest(0),
        LexState::String => {
            let terminated = lx.quoted_rest(b'"');
            lx.push(TokenKind::StringLiteral, 0);
            state = string_end_state(terminated, line);
        }
        LexState::RawString { delim } => state = lx.raw_string_rest(0, delim),
    }

    while state == LexState::Normal {
        while lx.peek(0).is_some_and(|b| b == b' ' || b == b'\t') {
            lx.pos += 1;
        }
        let Some(b) = lx.peek(0) else { break };
        let start = lx.pos;
        match b {
            b'/' if lx.peek(1) == Some(b'/') => {
                lx.pos = lx.bytes.len();
                lx.push(TokenKind::LineComment, start);
            }
            b'/' if lx.peek(1) == Some(b'*') => {
                lx.pos += 2;
                state = lx.block_comment_rest(start);
            }
            b'"' => {
                lx.pos += 1;
                let terminated = lx.quoted_rest(b'"');
                lx.push(TokenKind::StringLiteral, start);
                state = string_end_state(terminated, line);
            }
            b'\'' => {
                lx.pos += 1;
                lx.quoted_rest(b'\'');
                lx.push(TokenKind::CharLiteral, start);
            }
            _ if b.is_ascii_alphabetic() || b == b'_' => {
                if let Some(next) = lx.identifier(start) {
                    state = next;
                }
            }
            _ if b.is_ascii_digit() => lx.number(start),
            b'.' if lx.peek(1).is_some_and(|c| c.is_ascii_digit()) => lx.number(start),
            _ if !b.is_ascii() => {
                // Skip one whole UTF-8 scalar so spans stay on char
                // boundaries.
                let ch_len = line[lx.pos..].chars().next().map_or(1, char::len_utf8);
                lx.pos += ch_len;
                lx.push(TokenKind::Unknown, start);
            }
            _ => lx.punctuation(start),
        }
    }

    let mut tokens = lx.tokens;
    let mut ended_joined = false;
    // A trailing backslash is a line join, not a token.
    if state == LexState::Normal || state == LexState::String {
        let trailing_join = tokens.last().is_some_and(|last| {
            last.kind == TokenKind::Unknown && last.text(line) == "\\" && last.end() == line.len()
        });
        if trailing_join {
            tokens.pop();
            ended_joined = true;
        }
        if state == LexState::String {
            ended_joined = true;
        }
    }

    trace!(
        token_count = tokens.len(),
        ?state,
        ended_joined,
        "tokenized line"
    );

    LineTokens {
        tokens,
        end_state: state,
        ended_joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        tokenize_line(line, &LexState::Normal)
            .tokens
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_and_punctuation() {
        assert_eq!(
            kinds("if (a && b) {"),
            vec![
                TokenKind::KwIf,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::AmpAmp,
                TokenKind::Identifier,
                TokenKind::RParen,
                TokenKind::LBrace,
            ]
        );
    }

    #[test]
    fn scope_and_template_angles() {
        assert_eq!(
            kinds("std::vector<int> v;"),
            vec![
                TokenKind::Identifier,
                TokenKind::ColonColon,
                TokenKind::Identifier,
                TokenKind::Less,
                TokenKind::KwBuiltinType,
                TokenKind::Greater,
                TokenKind::Identifier,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn compound_assign_is_not_equal() {
        assert_eq!(
            kinds("a += b = c;"),
            vec![
                TokenKind::Identifier,
                TokenKind::AssignOp,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Identifier,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn token_spans_are_byte_accurate() {
        let line = "  foo(bar);";
        let toks = tokenize_line(line, &LexState::Normal).tokens;
        assert_eq!(toks[0].text(line), "foo");
        assert_eq!(toks[1].text(line), "(");
        assert_eq!(toks[2].text(line), "bar");
        assert_eq!(toks[0].offset, 2);
    }

    #[test]
    fn block_comment_carries_across_lines() {
        let first = tokenize_line("int a; /* start", &LexState::Normal);
        assert_eq!(first.end_state, LexState::BlockComment);
        assert_eq!(
            first.tokens.last().unwrap().kind,
            TokenKind::BlockComment { terminated: false }
        );

        let second = tokenize_line("still inside", &first.end_state);
        assert_eq!(second.end_state, LexState::BlockComment);

        let third = tokenize_line("end */ int b;", &second.end_state);
        assert_eq!(third.end_state, LexState::Normal);
        assert_eq!(
            third.tokens[0].kind,
            TokenKind::BlockComment { terminated: true }
        );
        assert_eq!(third.tokens[1].kind, TokenKind::KwBuiltinType);
    }

    #[test]
    fn raw_string_carries_delimiter() {
        let first = tokenize_line("auto s = R\"EOF(one", &LexState::Normal);
        assert_eq!(
            first.end_state,
            LexState::RawString {
                delim: "EOF".to_string()
            }
        );

        let second = tokenize_line("two)WRONG\"", &first.end_state);
        assert_eq!(
            second.end_state,
            LexState::RawString {
                delim: "EOF".to_string()
            }
        );

        let third = tokenize_line("three)EOF\"; int x;", &second.end_state);
        assert_eq!(third.end_state, LexState::Normal);
        assert_eq!(
            third.tokens[0].kind,
            TokenKind::RawStringLiteral { terminated: true }
        );
        assert_eq!(third.tokens[1].kind, TokenKind::Semicolon);
    }

    #[test]
    fn raw_string_single_line() {
        let toks = tokenize_line("f(R\"(no escape)\");", &LexState::Normal);
        assert_eq!(toks.end_state, LexState::Normal);
        assert_eq!(
            toks.tokens[2].kind,
            TokenKind::RawStringLiteral { terminated: true }
        );
    }

    #[test]
    fn backslash_join_detected() {
        let toks = tokenize_line("#define FOO(x) \\", &LexState::Normal);
        assert!(toks.ended_joined);
        assert_eq!(toks.tokens[0].kind, TokenKind::Pound);
        assert_eq!(toks.tokens.last().unwrap().kind, TokenKind::RParen);
    }

    #[test]
    fn string_with_escapes() {
        let toks = tokenize_line(r#"printf("a\"b\\");"#, &LexState::Normal);
        assert_eq!(toks.end_state, LexState::Normal);
        assert_eq!(toks.tokens[2].kind, TokenKind::StringLiteral);
        assert_eq!(toks.tokens[3].kind, TokenKind::RParen);
    }

    #[test]
    fn prefixed_string_literal() {
        let toks = tokenize_line("auto s = u8\"text\";", &LexState::Normal);
        assert_eq!(toks.tokens[2].kind, TokenKind::StringLiteral);
        let line = "auto s = u8\"text\";";
        assert_eq!(toks.tokens[2].text(line), "u8\"text\"");
    }

    #[test]
    fn garbage_never_errors() {
        let toks = tokenize_line("@@ $$ `?!", &LexState::Normal);
        assert_eq!(toks.end_state, LexState::Normal);
        assert!(!toks.tokens.is_empty());
    }
}
