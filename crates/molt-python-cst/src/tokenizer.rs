//! Indentation-aware tokenizer for Python source.
//!
//! Produces the token stream consumed by the parser:
//! - `Indent`/`Dedent` tokens from leading whitespace, with a stack of
//!   indentation levels (tabs advance to the next multiple of eight).
//! - `Newline` only for logical line ends; lines inside parentheses,
//!   brackets, and braces join implicitly, as do lines ending in `\`.
//! - Blank lines and comment-only lines produce no tokens.
//! - String tokens keep their full source text (prefix, quotes, body) so
//!   literals can be compared and re-emitted byte-for-byte.
//!
//! The tokenizer has no keyword table: keywords are lexed as names and
//! classified by the parser.

use crate::error::ParseError;

// ============================================================================
// Tokens
// ============================================================================

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-indexed source line.
    pub line: u32,
    /// 1-indexed source column.
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Name(String),
    /// Integer, float, or imaginary literal (textual form).
    Number(String),
    /// String literal of any flavor.
    Str(StringToken),
    /// Operator or delimiter.
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

/// A lexed string literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StringToken {
    /// Full token text: prefix + quotes + body.
    pub text: String,
    /// Prefix as written (`r`, `b`, `f`, `rb`, ... or empty).
    pub prefix: String,
    /// Opening quote sequence (`'`, `"`, `'''`, `"""`).
    pub quote: String,
    /// Raw body between the quotes, escapes untouched.
    pub body: String,
}

impl StringToken {
    pub fn is_fstring(&self) -> bool {
        self.prefix.chars().any(|c| c == 'f' || c == 'F')
    }

    pub fn is_bytes(&self) -> bool {
        self.prefix.chars().any(|c| c == 'b' || c == 'B')
    }

    pub fn is_raw(&self) -> bool {
        self.prefix.chars().any(|c| c == 'r' || c == 'R')
    }
}

/// Operators and delimiters, longest first so greedy matching is correct.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "!=", ">=", "<=", "==", "->", ":=", "+=", "-=", "*=", "/=",
    "%=", "@=", "&=", "|=", "^=", "**", "//", "<<", ">>", "(", ")", "[", "]", "{", "}", ",", ":",
    ".", ";", "@", "=", "+", "-", "*", "/", "%", "&", "|", "^", "~", "<", ">",
];

const TAB_SIZE: usize = 8;

// ============================================================================
// Tokenizer
// ============================================================================

/// Tokenize a complete module.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Tokenizer::new(source, false).run()
}

/// Tokenize an expression fragment (an f-string hole): no indentation
/// handling, newlines are plain whitespace.
pub fn tokenize_expression(source: &str) -> Result<Vec<Token>, ParseError> {
    Tokenizer::new(source, true).run()
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    /// Nesting depth of `(` `[` `{`.
    paren_depth: usize,
    indents: Vec<usize>,
    /// In expression mode there is no line structure at all.
    expression_mode: bool,
    tokens: Vec<Token>,
}

impl Tokenizer {
    fn new(source: &str, expression_mode: bool) -> Self {
        Tokenizer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            paren_depth: 0,
            indents: vec![0],
            expression_mode,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        if self.expression_mode {
            self.run_expression()?;
        } else {
            self.run_module()?;
        }
        Ok(self.tokens)
    }

    fn run_expression(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace_and_comments(true);
            if self.at_end() {
                break;
            }
            self.next_token()?;
        }
        self.push(TokenKind::EndMarker);
        Ok(())
    }

    fn run_module(&mut self) -> Result<(), ParseError> {
        let mut at_line_start = true;
        loop {
            if at_line_start && self.paren_depth == 0 {
                match self.handle_line_start()? {
                    LineStart::Eof => break,
                    LineStart::Blank => continue,
                    LineStart::Code => at_line_start = false,
                }
                continue;
            }

            self.skip_whitespace_and_comments(self.paren_depth > 0);
            if self.at_end() {
                if !at_line_start {
                    self.push(TokenKind::Newline);
                }
                break;
            }
            if self.peek() == '\n' {
                self.advance();
                if self.paren_depth == 0 {
                    self.push(TokenKind::Newline);
                    at_line_start = true;
                }
                continue;
            }
            if self.peek() == '\\' && self.peek_at(1) == Some('\n') {
                self.advance();
                self.advance();
                continue;
            }
            self.next_token()?;
        }

        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent);
        }
        self.push(TokenKind::EndMarker);
        Ok(())
    }

    /// Measure indentation at a physical line start; skip blank and
    /// comment-only lines without producing tokens.
    fn handle_line_start(&mut self) -> Result<LineStart, ParseError> {
        if self.at_end() {
            return Ok(LineStart::Eof);
        }
        let mut width = 0usize;
        while !self.at_end() {
            match self.peek() {
                ' ' => {
                    width += 1;
                    self.advance();
                }
                '\t' => {
                    width = (width / TAB_SIZE + 1) * TAB_SIZE;
                    self.advance();
                }
                _ => break,
            }
        }
        if self.at_end() {
            return Ok(LineStart::Eof);
        }
        match self.peek() {
            '\n' => {
                self.advance();
                return Ok(LineStart::Blank);
            }
            '#' => {
                while !self.at_end() && self.peek() != '\n' {
                    self.advance();
                }
                if !self.at_end() {
                    self.advance();
                }
                return Ok(LineStart::Blank);
            }
            _ => {}
        }

        let current = *self.indents.last().unwrap_or(&0);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent);
        } else if width < current {
            while *self.indents.last().unwrap_or(&0) > width {
                self.indents.pop();
                self.push(TokenKind::Dedent);
            }
            if *self.indents.last().unwrap_or(&0) != width {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        Ok(LineStart::Code)
    }

    fn skip_whitespace_and_comments(&mut self, newlines_too: bool) {
        loop {
            if self.at_end() {
                return;
            }
            match self.peek() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' if newlines_too => {
                    self.advance();
                }
                '\\' if newlines_too && self.peek_at(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '#' => {
                    while !self.at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<(), ParseError> {
        let c = self.peek();

        if is_identifier_start(c) {
            return self.lex_name_or_string();
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            return self.lex_number();
        }
        if c == '\'' || c == '"' {
            return self.lex_string(String::new());
        }

        for op in OPERATORS {
            if self.matches(op) {
                let (line, col) = (self.line, self.col);
                for _ in 0..op.chars().count() {
                    self.advance();
                }
                match *op {
                    "(" | "[" | "{" => self.paren_depth += 1,
                    ")" | "]" | "}" => self.paren_depth = self.paren_depth.saturating_sub(1),
                    _ => {}
                }
                self.tokens.push(Token {
                    kind: TokenKind::Op(op),
                    line,
                    col,
                });
                return Ok(());
            }
        }
        Err(self.error(format!("unexpected character {c:?}")))
    }

    fn lex_name_or_string(&mut self) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        let start = self.pos;
        while !self.at_end() && is_identifier_continue(self.peek()) {
            self.advance();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        if word.len() <= 2
            && word
                .chars()
                .all(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'f' | 'F' | 'u' | 'U'))
            && !self.at_end()
            && matches!(self.peek(), '\'' | '"')
        {
            return self.lex_string(word);
        }
        self.tokens.push(Token {
            kind: TokenKind::Name(word),
            line,
            col,
        });
        Ok(())
    }

    fn lex_string(&mut self, prefix: String) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        let quote_char = self.peek();
        let triple = self.peek_at(1) == Some(quote_char) && self.peek_at(2) == Some(quote_char);
        let quote: String = if triple {
            self.advance();
            self.advance();
            self.advance();
            std::iter::repeat(quote_char).take(3).collect()
        } else {
            self.advance();
            quote_char.to_string()
        };

        let mut body = String::new();
        loop {
            if self.at_end() {
                return Err(ParseError::unterminated_string(line, col));
            }
            let c = self.peek();
            if c == '\\' {
                body.push(c);
                self.advance();
                if self.at_end() {
                    return Err(ParseError::unterminated_string(line, col));
                }
                body.push(self.peek());
                self.advance();
                continue;
            }
            if c == '\n' && !triple {
                return Err(ParseError::unterminated_string(line, col));
            }
            if c == quote_char {
                if !triple {
                    self.advance();
                    break;
                }
                if self.peek_at(1) == Some(quote_char) && self.peek_at(2) == Some(quote_char) {
                    self.advance();
                    self.advance();
                    self.advance();
                    break;
                }
            }
            body.push(c);
            self.advance();
        }

        let text = format!("{prefix}{quote}{body}{quote}");
        self.tokens.push(Token {
            kind: TokenKind::Str(StringToken {
                text,
                prefix,
                quote,
                body,
            }),
            line,
            col,
        });
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        let start = self.pos;
        let radix_prefixed = self.peek() == '0'
            && matches!(
                self.peek_at(1),
                Some('x') | Some('X') | Some('o') | Some('O') | Some('b') | Some('B')
            );
        while !self.at_end() {
            let c = self.peek();
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.advance();
                // decimal exponent may carry a sign
                if !radix_prefixed
                    && (c == 'e' || c == 'E')
                    && matches!(self.peek_at(0), Some('+') | Some('-'))
                    && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())
                {
                    self.advance();
                }
            } else {
                break;
            }
        }
        let value: String = self.chars[start..self.pos].iter().collect();
        self.tokens.push(Token {
            kind: TokenKind::Number(value),
            line,
            col,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn matches(&self, op: &str) -> bool {
        op.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn advance(&mut self) {
        if let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
            col: self.col,
        });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, self.line, self.col)
    }
}

enum LineStart {
    Eof,
    Blank,
    Code,
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn op(s: &'static str) -> TokenKind {
        TokenKind::Op(s)
    }

    fn name(s: &str) -> TokenKind {
        TokenKind::Name(s.to_string())
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![
                name("x"),
                op("="),
                TokenKind::Number("1".to_string()),
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn test_indent_dedent_pairing() {
        let toks = kinds("def f():\n    pass\n");
        assert!(toks.contains(&TokenKind::Indent));
        assert!(toks.contains(&TokenKind::Dedent));
        assert_eq!(toks.last(), Some(&TokenKind::EndMarker));
    }

    #[test]
    fn test_nested_indentation_produces_matching_dedents() {
        let toks = kinds("if a:\n    if b:\n        x\n");
        let indents = toks.iter().filter(|t| **t == TokenKind::Indent).count();
        let dedents = toks.iter().filter(|t| **t == TokenKind::Dedent).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let toks = kinds("x = 1\n\n# comment\n   # indented comment\ny = 2\n");
        let newlines = toks.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
        assert!(!toks.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_implicit_line_joining_in_brackets() {
        let toks = kinds("x = (1 +\n     2)\n");
        let newlines = toks.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_backslash_continuation() {
        let toks = kinds("x = 1 + \\\n    2\n");
        let newlines = toks.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_string_token_keeps_full_text() {
        let toks = tokenize("s = 'a\\'b'\n").unwrap();
        let found = toks.iter().find_map(|t| match &t.kind {
            TokenKind::Str(s) => Some(s.clone()),
            _ => None,
        });
        let s = found.expect("string token");
        assert_eq!(s.text, "'a\\'b'");
        assert_eq!(s.body, "a\\'b");
        assert_eq!(s.quote, "'");
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let toks = tokenize("s = \"\"\"line1\nline2\"\"\"\n").unwrap();
        let found = toks.iter().any(|t| match &t.kind {
            TokenKind::Str(s) => s.body == "line1\nline2",
            _ => false,
        });
        assert!(found);
    }

    #[test]
    fn test_fstring_prefix_detected() {
        let toks = tokenize("s = f'{x}'\n").unwrap();
        let found = toks.iter().find_map(|t| match &t.kind {
            TokenKind::Str(s) => Some(s.clone()),
            _ => None,
        });
        let s = found.expect("string token");
        assert!(s.is_fstring());
        assert!(!s.is_raw());
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(tokenize("s = 'abc\n").is_err());
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("x **= 2\n")[1],
            op("**="),
            "**= must not lex as ** ="
        );
        assert_eq!(kinds("x := 1\n")[1], op(":="));
        assert_eq!(kinds("xs[...]\n")[2], op("..."));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1_000\n")[0], TokenKind::Number("1_000".to_string()));
        assert_eq!(kinds("0xFF\n")[0], TokenKind::Number("0xFF".to_string()));
        assert_eq!(
            kinds("1.5e-3\n")[0],
            TokenKind::Number("1.5e-3".to_string())
        );
        assert_eq!(kinds("2j\n")[0], TokenKind::Number("2j".to_string()));
    }

    #[test]
    fn test_bad_dedent_is_an_error() {
        assert!(tokenize("if a:\n    x\n  y\n").is_err());
    }

    #[test]
    fn test_expression_mode_ignores_newlines() {
        let toks = tokenize_expression("a +\nb").unwrap();
        assert_eq!(
            toks.into_iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![name("a"), op("+"), name("b"), TokenKind::EndMarker]
        );
    }
}
