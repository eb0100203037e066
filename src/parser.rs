use crate::command::Command;
use crate::lexer::{Lexeme, Lexer, Span, Token};
use std::fmt;

/// Result of parsing one line.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    /// Blank line, nothing to do.
    Empty,
    /// The line was exactly `!!`.
    History,
    /// Head (right-most stage) of the parsed pipeline.
    Ready(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// A stage has more words than the configured limit.
    TooManyArguments { limit: usize },
    /// A token that cannot appear at this position.
    UnexpectedToken { token: Token, span: Span },
    /// `<` or `>` not followed by a word.
    MissingRedirectTarget { span: Span },
    /// Second `<` (or second `>`) on the same stage.
    DuplicateRedirect { span: Span },
    /// `<` on a stage that already reads from a pipe.
    InputAfterPipe { span: Span },
    /// `|` after a stage that already writes to a file.
    OutputBeforePipe { span: Span },
    /// `|` or `&` with nothing in front of it, or a pipe with nothing after it.
    EmptyStage { span: Span },
}

impl ParsingError {
    pub fn is_syntax_error(&self) -> bool {
        !matches!(self, ParsingError::TooManyArguments { .. })
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (reason, span) = match self {
            ParsingError::TooManyArguments { .. } => return write!(f, "Too many arguments."),
            ParsingError::UnexpectedToken { token, span } => {
                (format!("unexpected '{}'", token.describe()), span)
            }
            ParsingError::MissingRedirectTarget { span } => {
                ("missing file name after redirection".to_string(), span)
            }
            ParsingError::DuplicateRedirect { span } => ("duplicate redirection".to_string(), span),
            ParsingError::InputAfterPipe { span } => {
                ("input redirection on a piped stage".to_string(), span)
            }
            ParsingError::OutputBeforePipe { span } => {
                ("output redirection before a pipe".to_string(), span)
            }
            ParsingError::EmptyStage { span } => ("missing command".to_string(), span),
        };
        write!(f, "Syntax error: {} at column {}.", reason, span.start + 1)
    }
}

impl std::error::Error for ParsingError {}

enum Direction {
    Input,
    Output,
}

struct PipelineBuilder<'a> {
    lexer: Lexer<'a>,
    max_args: usize,
}

impl<'a> PipelineBuilder<'a> {
    fn new(line: &'a str, max_args: usize) -> Self {
        PipelineBuilder {
            lexer: Lexer::new(line),
            max_args,
        }
    }

    fn build(mut self) -> Result<Parsed, ParsingError> {
        let first = self.lexer.next_token();
        if first.token == Token::HistoryRepeat {
            self.expect_end()?;
            return Ok(Parsed::History);
        }

        let mut current = Command::new();
        let mut lexeme = first;
        loop {
            let Lexeme { token, span } = lexeme;
            match token {
                Token::Word(word) => self.push_argument(&mut current, word)?,
                Token::RedirectLeft => self.parse_redirect(&mut current, Direction::Input, span)?,
                Token::RedirectRight => {
                    self.parse_redirect(&mut current, Direction::Output, span)?
                }
                Token::PipeOp => current = Self::chain(current, span)?,
                Token::Ampersand => {
                    if current.is_empty() {
                        return Err(ParsingError::EmptyStage { span });
                    }
                    current.background = true;
                    self.expect_end()?;
                    break;
                }
                Token::HistoryRepeat => {
                    return Err(ParsingError::UnexpectedToken { token, span });
                }
                Token::Eof => {
                    if current.is_empty() && current.predecessor.is_some() {
                        return Err(ParsingError::EmptyStage { span });
                    }
                    break;
                }
            }
            lexeme = self.lexer.next_token();
        }

        if current.is_empty() {
            Ok(Parsed::Empty)
        } else {
            Ok(Parsed::Ready(current))
        }
    }

    fn expect_end(&mut self) -> Result<(), ParsingError> {
        let Lexeme { token, span } = self.lexer.next_token();
        match token {
            Token::Eof => Ok(()),
            token => Err(ParsingError::UnexpectedToken { token, span }),
        }
    }

    fn push_argument(&self, current: &mut Command, word: String) -> Result<(), ParsingError> {
        if current.argv.len() >= self.max_args {
            return Err(ParsingError::TooManyArguments {
                limit: self.max_args,
            });
        }
        current.argv.push(word);
        Ok(())
    }

    /// Parse the target of a redirect: '<' word or '>' word
    fn parse_redirect(
        &mut self,
        current: &mut Command,
        direction: Direction,
        span: Span,
    ) -> Result<(), ParsingError> {
        let slot = match direction {
            Direction::Input if current.predecessor.is_some() => {
                return Err(ParsingError::InputAfterPipe { span });
            }
            Direction::Input => &mut current.input,
            Direction::Output => &mut current.output,
        };
        if slot.is_some() {
            return Err(ParsingError::DuplicateRedirect { span });
        }
        match self.lexer.next_token().token {
            Token::Word(path) => {
                *slot = Some(path);
                Ok(())
            }
            _ => Err(ParsingError::MissingRedirectTarget { span }),
        }
    }

    /// Finish `current` and start a new stage fed by it.
    fn chain(current: Command, span: Span) -> Result<Command, ParsingError> {
        if current.is_empty() {
            return Err(ParsingError::EmptyStage { span });
        }
        if current.output.is_some() {
            return Err(ParsingError::OutputBeforePipe { span });
        }
        let mut next = Command::new();
        next.predecessor = Some(Box::new(current));
        Ok(next)
    }
}

/// Parses one line into a command chain.
///
/// At most `max_args` words are accepted per stage. The returned chain's head
/// is the right-most stage of the pipeline.
pub fn parse(line: &str, max_args: usize) -> Result<Parsed, ParsingError> {
    PipelineBuilder::new(line, max_args).build()
}
