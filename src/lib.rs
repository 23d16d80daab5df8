//! A small single-user interactive command interpreter.
//!
//! One line of shell-like text at a time flows through a fixed pipeline:
//! tokenizer → grammar-driven parser → semantic checker → executor. The
//! checker validates the whole statement (command resolution plus
//! per-command argument rules) before anything runs, so a bad statement has
//! no partial side effects. Execution dispatches between in-process
//! built-ins (`cd`, `pwd`, `mkdir`, `rm`, `ls` and the continuous monitor
//! views `cpu`, `mem`, `disk`, `ps`) and external processes found on the
//! search path.
//!
//! The main entry point is [`Interpreter`], which drives single lines via
//! [`Interpreter::eval_line`] or an interactive loop via
//! [`Interpreter::repl`].

mod builtin;
pub mod checker;
pub mod env;
pub mod executor;
mod external;
mod interpreter;
pub mod lexer;
mod monitor;
pub mod parser;
pub mod translate;

pub use interpreter::Interpreter;
