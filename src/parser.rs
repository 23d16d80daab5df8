//! Recursive-descent parser for the command grammar.
//!
//! Grammar, precedence low to high, all binary operators left-associative:
//!
//! ```text
//! statement       := sequence
//! sequence        := conditional (';' conditional)*
//! conditional     := pipeline (('&&' | '||') pipeline)*
//! pipeline        := simple_command ('|' simple_command)*
//! simple_command  := COMMAND arg* ['&']
//! arg             := ARG | STRING_LITERAL
//! ```
//!
//! The first error aborts the parse; no partial tree is ever returned, and
//! the whole token stream must be consumed for a statement to succeed.

use crate::checker::CommandTarget;
use crate::lexer::{Token, TokenKind};
use thiserror::Error;

/// A command name with its ordered arguments.
///
/// `target` is `None` straight out of the parser; the semantic checker
/// resolves it exactly once before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommand {
    pub name: String,
    pub args: Vec<String>,
    pub target: Option<CommandTarget>,
}

impl SimpleCommand {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        SimpleCommand {
            name: name.into(),
            args,
            target: None,
        }
    }
}

/// One grammar production per variant; each carries only the fields its
/// production needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// `left ; right`: both sides run regardless of outcome.
    Sequence(Box<Ast>, Box<Ast>),
    /// `left && right`: right runs only if left succeeded.
    And(Box<Ast>, Box<Ast>),
    /// `left || right`: right runs only if left failed.
    Or(Box<Ast>, Box<Ast>),
    /// Two or more stages in left-to-right execution order. Every element is
    /// a `Command` or `Background` node; a single command is never wrapped.
    Pipeline(Vec<Ast>),
    /// A command with a trailing `&`. Backgrounding is per-command.
    Background(SimpleCommand),
    Command(SimpleCommand),
}

/// The single root of a parsed line.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement(pub Ast);

/// Syntax errors. The parse stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("syntax error: unexpected token {kind:?} ('{value}')")]
    UnexpectedToken { kind: TokenKind, value: String },
    #[error("syntax error: unexpected end of input")]
    UnexpectedEnd,
}

impl SyntaxError {
    fn unexpected(token: &Token) -> Self {
        SyntaxError::UnexpectedToken {
            kind: token.kind,
            value: token.value.clone(),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// sequence := conditional (';' conditional)*
    ///
    /// Repeated separators fold left: `a;b;c` nests as
    /// `Sequence(Sequence(a,b),c)`, matching evaluation order.
    fn parse_sequence(&mut self) -> Result<Ast, SyntaxError> {
        let mut node = self.parse_conditional()?;
        while self.peek_kind() == Some(TokenKind::Semicolon) {
            self.consume();
            let right = self.parse_conditional()?;
            node = Ast::Sequence(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    /// conditional := pipeline (('&&' | '||') pipeline)*
    fn parse_conditional(&mut self) -> Result<Ast, SyntaxError> {
        let mut node = self.parse_pipeline()?;
        loop {
            let op = match self.peek_kind() {
                Some(k @ (TokenKind::LogicalAnd | TokenKind::LogicalOr)) => k,
                _ => break,
            };
            self.consume();
            let right = self.parse_pipeline()?;
            node = match op {
                TokenKind::LogicalAnd => Ast::And(Box::new(node), Box::new(right)),
                _ => Ast::Or(Box::new(node), Box::new(right)),
            };
        }
        Ok(node)
    }

    /// pipeline := simple_command ('|' simple_command)*
    ///
    /// A pipeline of exactly one command yields the bare command node.
    fn parse_pipeline(&mut self) -> Result<Ast, SyntaxError> {
        let first = self.parse_simple_command()?;
        if self.peek_kind() != Some(TokenKind::Pipe) {
            return Ok(first);
        }
        let mut stages = vec![first];
        while self.peek_kind() == Some(TokenKind::Pipe) {
            self.consume();
            stages.push(self.parse_simple_command()?);
        }
        Ok(Ast::Pipeline(stages))
    }

    /// simple_command := COMMAND arg* ['&']
    fn parse_simple_command(&mut self) -> Result<Ast, SyntaxError> {
        let name = match self.consume() {
            Some(token) if token.kind == TokenKind::Command => token.value,
            Some(token) => return Err(SyntaxError::unexpected(&token)),
            None => return Err(SyntaxError::UnexpectedEnd),
        };

        let mut args = Vec::new();
        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::Arg | TokenKind::StringLiteral => {
                    args.push(self.consume().unwrap().value);
                }
                _ => break,
            }
        }

        let command = SimpleCommand::new(name, args);
        if self.peek_kind() == Some(TokenKind::Background) {
            self.consume();
            Ok(Ast::Background(command))
        } else {
            Ok(Ast::Command(command))
        }
    }
}

/// Parse a token sequence into a single [`Statement`].
///
/// Any token left over after the statement is an "unexpected trailing token"
/// syntax error.
pub fn parse(tokens: Vec<Token>) -> Result<Statement, SyntaxError> {
    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.parse_sequence()?;
    if let Some(trailing) = parser.peek() {
        return Err(SyntaxError::unexpected(trailing));
    }
    Ok(Statement(ast))
}

/// Render the tree with box-drawing connectors for the `--log` diagnostic
/// echo.
pub fn render_tree(statement: &Statement) -> String {
    let mut out = String::from("Statement\n");
    render_node(&statement.0, "", true, &mut out);
    out
}

fn render_node(node: &Ast, prefix: &str, is_last: bool, out: &mut String) {
    let connector = if is_last { "└── " } else { "├── " };
    let label = match node {
        Ast::Sequence(..) => "Sequence".to_string(),
        Ast::And(..) => "And".to_string(),
        Ast::Or(..) => "Or".to_string(),
        Ast::Pipeline(_) => "Pipeline".to_string(),
        Ast::Background(_) => "Background".to_string(),
        Ast::Command(cmd) => format!("Command({})", cmd.name),
    };
    out.push_str(prefix);
    out.push_str(connector);
    out.push_str(&label);
    out.push('\n');

    let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
    match node {
        Ast::Sequence(l, r) | Ast::And(l, r) | Ast::Or(l, r) => {
            render_node(l, &child_prefix, false, out);
            render_node(r, &child_prefix, true, out);
        }
        Ast::Pipeline(stages) => {
            for (i, stage) in stages.iter().enumerate() {
                render_node(stage, &child_prefix, i == stages.len() - 1, out);
            }
        }
        Ast::Background(cmd) => {
            render_node(&Ast::Command(cmd.clone()), &child_prefix, true, out);
        }
        Ast::Command(cmd) => {
            for (i, arg) in cmd.args.iter().enumerate() {
                out.push_str(&child_prefix);
                out.push_str(if i == cmd.args.len() - 1 {
                    "└── "
                } else {
                    "├── "
                });
                out.push_str(&format!("Arg({})\n", arg));
            }
        }
    }
}
