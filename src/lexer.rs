//! Lexical analysis for the command language.
//!
//! A single left-to-right scan turns a raw input line into a flat token
//! sequence. The only state carried across the scan is one bit: whether the
//! next bare word sits in command position. Operators that start a new
//! command (`|`, `;`, `&&`, `||`, `&`) set it; everything else clears it.

use thiserror::Error;

/// Token kinds produced by [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare word in command position.
    Command,
    /// A bare word in argument position.
    Arg,
    /// A quoted string with the quotes stripped.
    StringLiteral,
    /// `|`
    Pipe,
    /// `>`
    RedirectOut,
    /// `>>`
    RedirectOutAppend,
    /// `<`
    RedirectIn,
    /// `;`
    Semicolon,
    /// `&`
    Background,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    /// `$name`, kept verbatim including the leading `$`; never expanded.
    Variable,
    /// `#` to end of line. Recognized and discarded, never emitted.
    Comment,
}

/// One lexed token: kind, source text and character offset of its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, pos: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            pos,
        }
    }
}

/// Non-fatal lexical problems. The offending character is skipped and the
/// scan continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("lex error: illegal character '{ch}' at position {pos}")]
    IllegalCharacter { ch: char, pos: usize },
}

/// Characters that terminate a bare word.
fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '|' | '&' | ';' | '<' | '>' | '#' | '$' | '"' | '\'')
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
    /// True when the next bare word names a command.
    command_position: bool,
}

impl Lexer {
    fn new(line: &str) -> Self {
        Lexer {
            input: line.chars().collect(),
            pos: 0,
            command_position: true,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn run(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        while let Some(ch) = self.peek() {
            let start = self.pos;
            match ch {
                '\n' => {
                    self.bump();
                    self.command_position = true;
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '"' | '\'' => {
                    let literal = self.read_quoted(ch);
                    tokens.push(Token::new(TokenKind::StringLiteral, literal, start));
                    self.command_position = false;
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.pos += 2;
                    tokens.push(Token::new(TokenKind::LogicalOr, "||", start));
                    self.command_position = true;
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.pos += 2;
                    tokens.push(Token::new(TokenKind::LogicalAnd, "&&", start));
                    self.command_position = true;
                }
                '>' if self.peek_at(1) == Some('>') => {
                    self.pos += 2;
                    tokens.push(Token::new(TokenKind::RedirectOutAppend, ">>", start));
                    self.command_position = false;
                }
                '|' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::Pipe, "|", start));
                    self.command_position = true;
                }
                '&' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::Background, "&", start));
                    self.command_position = true;
                }
                '>' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::RedirectOut, ">", start));
                    self.command_position = false;
                }
                '<' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::RedirectIn, "<", start));
                    self.command_position = false;
                }
                ';' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::Semicolon, ";", start));
                    self.command_position = true;
                }
                '$' => match self.peek_at(1) {
                    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                        let name = self.read_variable();
                        tokens.push(Token::new(TokenKind::Variable, name, start));
                        self.command_position = false;
                    }
                    _ => {
                        self.bump();
                        errors.push(LexError::IllegalCharacter { ch: '$', pos: start });
                    }
                },
                '#' => {
                    // Comment runs to end of line; nothing is emitted.
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => {
                    let word = self.read_word();
                    let kind = if self.command_position {
                        TokenKind::Command
                    } else {
                        TokenKind::Arg
                    };
                    tokens.push(Token::new(kind, word, start));
                    self.command_position = false;
                }
            }
        }

        (tokens, errors)
    }

    /// Read a quoted literal, consuming the opening quote first. An
    /// unterminated quote is recovered leniently: the rest of the input
    /// becomes the literal's value.
    fn read_quoted(&mut self, quote: char) -> String {
        self.bump();
        let mut value = String::new();
        while let Some(c) = self.bump() {
            if c == quote {
                break;
            }
            value.push(c);
        }
        value
    }

    /// Read `$` plus a name: one alphabetic/underscore character followed by
    /// alphanumerics/underscores. The `$` is kept in the value.
    fn read_variable(&mut self) -> String {
        let mut value = String::new();
        value.push(self.bump().unwrap());
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                value.push(c);
                self.bump();
            } else {
                break;
            }
        }
        value
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_word_boundary(c) {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }
}

/// Tokenize one input line.
///
/// Returns the token sequence together with any non-fatal lexical errors
/// encountered along the way. Empty or whitespace-only input yields an empty
/// token sequence; callers treat that as a no-op.
pub fn tokenize(line: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer::new(line).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn quoted_literal_keeps_spaces() {
        let (tokens, errors) = tokenize("echo \"a b\" c");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Command);
        assert_eq!(tokens[0].value, "echo");
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].value, "a b");
        assert_eq!(tokens[2].kind, TokenKind::Arg);
        assert_eq!(tokens[2].value, "c");
    }

    #[test]
    fn combined_operators_take_priority() {
        let (tokens, _) = tokenize("a && b || c");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Command,
                TokenKind::LogicalAnd,
                TokenKind::Command,
                TokenKind::LogicalOr,
                TokenKind::Command,
            ]
        );
    }

    #[test]
    fn append_beats_single_redirect() {
        let (tokens, _) = tokenize("a >> f > g");
        assert_eq!(tokens[1].kind, TokenKind::RedirectOutAppend);
        assert_eq!(tokens[3].kind, TokenKind::RedirectOut);
        // Redirect targets sit in argument position.
        assert_eq!(tokens[2].kind, TokenKind::Arg);
    }

    #[test]
    fn command_position_resets_after_operators() {
        let (tokens, _) = tokenize("a | b ; c & d");
        let commands: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Command)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(commands, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn variable_token_keeps_dollar() {
        let (tokens, errors) = tokenize("echo $HOME_dir2");
        assert!(errors.is_empty());
        assert_eq!(tokens[1].kind, TokenKind::Variable);
        assert_eq!(tokens[1].value, "$HOME_dir2");
    }

    #[test]
    fn lone_dollar_is_skipped_not_fatal() {
        let (tokens, errors) = tokenize("echo $ x");
        assert_eq!(
            errors,
            vec![LexError::IllegalCharacter { ch: '$', pos: 5 }]
        );
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].value, "x");
    }

    #[test]
    fn comment_discards_rest_of_line() {
        let (tokens, _) = tokenize("ls -a # show everything");
        assert_eq!(tokens.len(), 2);
        let (tokens, _) = tokenize("# nothing here");
        assert!(tokens.is_empty());
    }

    #[test]
    fn unterminated_quote_is_lenient() {
        let (tokens, errors) = tokenize("echo \"rest of line");
        assert!(errors.is_empty());
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].value, "rest of line");
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").0.is_empty());
        assert!(tokenize("   \t ").0.is_empty());
    }

    #[test]
    fn leading_operator_is_lexically_valid() {
        let (tokens, errors) = tokenize("| a");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Pipe);
        assert_eq!(tokens[1].kind, TokenKind::Command);
    }

    #[test]
    fn token_positions_are_start_offsets() {
        let (tokens, _) = tokenize("echo hi");
        assert_eq!(tokens[0].pos, 0);
        assert_eq!(tokens[1].pos, 5);
    }
}
