//! Semantic analysis: fail fast, before any side effect.
//!
//! The checker walks the tree depth-first, left to right. For every command
//! it resolves the name against the built-in registry or the search path and
//! stores the result on the node, then validates arguments against the
//! per-command rule table. The first violation aborts the whole statement;
//! the executor is never invoked for a statement that fails here.

use crate::env::Environment;
use crate::external;
use crate::parser::{Ast, SimpleCommand, Statement};
use std::path::PathBuf;
use thiserror::Error;

/// Resolved dispatch target for one command, computed once at check time so
/// the executor never repeats the string lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandTarget {
    Cd,
    Pwd,
    Mkdir,
    Rm,
    Ls,
    Cpu,
    Mem,
    Disk,
    Ps,
    External(PathBuf),
}

impl CommandTarget {
    /// Look a name up in the built-in registry.
    pub fn builtin(name: &str) -> Option<CommandTarget> {
        match name {
            "cd" => Some(CommandTarget::Cd),
            "pwd" => Some(CommandTarget::Pwd),
            "mkdir" => Some(CommandTarget::Mkdir),
            "rm" => Some(CommandTarget::Rm),
            "ls" => Some(CommandTarget::Ls),
            "cpu" => Some(CommandTarget::Cpu),
            "mem" => Some(CommandTarget::Mem),
            "disk" => Some(CommandTarget::Disk),
            "ps" => Some(CommandTarget::Ps),
            _ => None,
        }
    }

    /// Monitor views block on their own redraw loop and are never detached,
    /// even with a trailing `&`.
    pub fn is_monitor(&self) -> bool {
        matches!(
            self,
            CommandTarget::Cpu | CommandTarget::Mem | CommandTarget::Disk | CommandTarget::Ps
        )
    }
}

#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("semantic error: command not found: {0}")]
    CommandNotFound(String),
    #[error("semantic error: {command}: directory does not exist: {path}")]
    DirectoryNotFound { command: String, path: String },
    #[error("semantic error: {command}: no such file or directory: {path}")]
    PathNotFound { command: String, path: String },
}

/// Read-only validation pass over a parsed statement; its only write is the
/// resolved [`CommandTarget`] stored on each command node.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticChecker;

impl SemanticChecker {
    pub fn new() -> Self {
        SemanticChecker
    }

    /// Validate the whole statement against `env`. On success every command
    /// node carries a resolved target.
    pub fn check(&self, statement: &mut Statement, env: &Environment) -> Result<(), SemanticError> {
        self.check_node(&mut statement.0, env)
    }

    fn check_node(&self, node: &mut Ast, env: &Environment) -> Result<(), SemanticError> {
        match node {
            Ast::Sequence(left, right) | Ast::And(left, right) | Ast::Or(left, right) => {
                self.check_node(left, env)?;
                self.check_node(right, env)
            }
            Ast::Pipeline(stages) => {
                for stage in stages {
                    self.check_node(stage, env)?;
                }
                Ok(())
            }
            Ast::Background(command) | Ast::Command(command) => self.check_command(command, env),
        }
    }

    fn check_command(
        &self,
        command: &mut SimpleCommand,
        env: &Environment,
    ) -> Result<(), SemanticError> {
        let target = match CommandTarget::builtin(&command.name) {
            Some(target) => target,
            None => match external::find_executable(env, &command.name) {
                Some(path) => CommandTarget::External(path),
                None => return Err(SemanticError::CommandNotFound(command.name.clone())),
            },
        };

        self.check_arguments(&command.name, &target, &command.args, env)?;
        command.target = Some(target);
        Ok(())
    }

    /// Per-command argument rules. Commands without a rule accept their
    /// arguments as-is; `mkdir` deliberately has no pre-existence constraint.
    fn check_arguments(
        &self,
        name: &str,
        target: &CommandTarget,
        args: &[String],
        env: &Environment,
    ) -> Result<(), SemanticError> {
        match target {
            CommandTarget::Cd => {
                if let Some(path) = args.first() {
                    if !env.resolve(path).is_dir() {
                        return Err(SemanticError::DirectoryNotFound {
                            command: name.to_string(),
                            path: path.clone(),
                        });
                    }
                }
                Ok(())
            }
            CommandTarget::Rm => {
                for path in args {
                    if !env.resolve(path).exists() {
                        return Err(SemanticError::PathNotFound {
                            command: name.to_string(),
                            path: path.clone(),
                        });
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
