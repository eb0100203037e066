//! A module implementing lexical analysis (tokenization) for the interpreter's command language.

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// End of the line (or a line terminator).
    Eof,
    /// The background marker, `&`.
    Ampersand,
    /// The history directive, `!!`.
    HistoryRepeat,
    /// Output redirection symbol, `>`.
    RedirectRight,
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// The pipe operator, `|`.
    PipeOp,
    /// A word. Owns a copy of its text, independent of the input line.
    Word(String),
}

impl Token {
    /// Short form of the token used in diagnostics.
    pub fn describe(&self) -> &str {
        match self {
            Token::Eof => "end of line",
            Token::Ampersand => "&",
            Token::HistoryRepeat => "!!",
            Token::RedirectRight => ">",
            Token::RedirectLeft => "<",
            Token::PipeOp => "|",
            Token::Word(word) => word,
        }
    }
}

/// Byte range of a token inside the line it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

/// A token together with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
}

/// Cursor over a single input line.
///
/// The lexer never fails: anything that is not an operator becomes part of a
/// word, and ill-formed sequences are left for the parser to reject.
pub struct Lexer<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Lexer { line, pos: 0 }
    }

    /// Returns the next token, advancing the cursor past it.
    ///
    /// Once the end of the line (or a `\n`) is reached every further call
    /// yields [`Token::Eof`] at the same position.
    pub fn next_token(&mut self) -> Lexeme {
        self.skip_whitespace();
        let Some(c) = self.peek(0) else {
            return self.make(Token::Eof, 0);
        };

        match c {
            b'\n' => self.make(Token::Eof, 0),
            b'&' => self.make(Token::Ampersand, 1),
            b'>' => self.make(Token::RedirectRight, 1),
            b'<' => self.make(Token::RedirectLeft, 1),
            b'|' => self.make(Token::PipeOp, 1),
            b'!' if self.peek(1) == Some(b'!') => self.make(Token::HistoryRepeat, 2),
            _ => self.read_word(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.line.as_bytes().get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn make(&mut self, token: Token, len: usize) -> Lexeme {
        let span = Span {
            start: self.pos,
            len,
        };
        self.pos += len;
        Lexeme { token, span }
    }

    fn read_word(&mut self) -> Lexeme {
        let start = self.pos;
        let mut end = start;
        while self.line.as_bytes().get(end).copied().is_some_and(is_word) {
            end += 1;
        }
        // Word boundaries are ASCII bytes, so the slice is valid UTF-8.
        let word = self.line[start..end].to_owned();
        self.make(Token::Word(word), end - start)
    }
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r')
}

fn is_word(c: u8) -> bool {
    !(is_whitespace(c) || matches!(c, b'\n' | b'&' | b'>' | b'<' | b'|'))
}
