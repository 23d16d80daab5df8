//! Execution of a validated statement.
//!
//! Dispatch works off the [`CommandTarget`] the checker stored on each
//! command node; no name is re-resolved here. Composite nodes carry real
//! shell semantics: sequences run both sides, `&&`/`||` short-circuit on exit
//! codes, pipelines connect stages through captured byte streams, and `&`
//! detaches the command onto its own thread over a cloned environment.
//!
//! An execution failure is local to its node: it is reported as one line and
//! traversal continues; the interpreter process never dies because a command
//! failed.

use crate::builtin::{self, BuiltinCommand};
use crate::checker::CommandTarget;
use crate::env::Environment;
use crate::external;
use crate::monitor;
use crate::parser::{Ast, SimpleCommand, Statement};
use std::io::Write;
use std::thread;
use thiserror::Error;

/// Conventional process exit code: 0 is success, anything else is failure.
pub type ExitCode = i32;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("execution error: command not found: {0}")]
    CommandNotFound(String),
    #[error("execution error: {0}: permission denied")]
    PermissionDenied(String),
    #[error("execution error: failed to run {command}: {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error("execution error: {command}: {source}")]
    Builtin {
        command: String,
        source: anyhow::Error,
    },
    #[error("execution error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tree-walking executor over checked statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Executor
    }

    /// Execute a checked statement, writing all command output and error
    /// reports to `out`. Returns the exit code of the last node executed.
    pub fn execute(&self, statement: &Statement, env: &mut Environment, out: &mut dyn Write) -> ExitCode {
        self.exec_node(&statement.0, env, out)
    }

    fn exec_node(&self, node: &Ast, env: &mut Environment, out: &mut dyn Write) -> ExitCode {
        match node {
            Ast::Sequence(left, right) => {
                self.exec_node(left, env, out);
                self.exec_node(right, env, out)
            }
            Ast::And(left, right) => {
                let code = self.exec_node(left, env, out);
                if code == 0 {
                    self.exec_node(right, env, out)
                } else {
                    code
                }
            }
            Ast::Or(left, right) => {
                let code = self.exec_node(left, env, out);
                if code != 0 {
                    self.exec_node(right, env, out)
                } else {
                    code
                }
            }
            Ast::Pipeline(stages) => self.exec_pipeline(stages, env, out),
            Ast::Background(command) => self.exec_background(command, env, out),
            Ast::Command(command) => self.exec_command(command, env, out),
        }
    }

    fn exec_command(&self, command: &SimpleCommand, env: &mut Environment, out: &mut dyn Write) -> ExitCode {
        match run_command(command, None, false, env, out) {
            Ok((code, _)) => code,
            Err(e) => {
                let _ = writeln!(out, "{}", e);
                1
            }
        }
    }

    /// Connect stages left to right through captured byte streams. A failing
    /// stage is reported and the rest of the pipeline continues with empty
    /// input.
    fn exec_pipeline(&self, stages: &[Ast], env: &mut Environment, out: &mut dyn Write) -> ExitCode {
        let mut carried: Option<Vec<u8>> = None;
        let mut code = 0;
        let last = stages.len().saturating_sub(1);

        for (i, stage) in stages.iter().enumerate() {
            let command = match stage {
                Ast::Command(c) | Ast::Background(c) => c,
                other => {
                    let _ = writeln!(out, "execution error: malformed pipeline stage {:?}", other);
                    code = 1;
                    continue;
                }
            };
            let capture = i != last;
            match run_command(command, carried.take().as_deref(), capture, env, out) {
                Ok((stage_code, bytes)) => {
                    code = stage_code;
                    if capture {
                        carried = Some(bytes);
                    }
                }
                Err(e) => {
                    let _ = writeln!(out, "{}", e);
                    code = 1;
                    carried = Some(Vec::new());
                }
            }
        }
        code
    }

    /// Detach a command onto its own thread. The thread gets a clone of the
    /// environment, so a backgrounded `cd` does not move the interpreter.
    /// Monitor views are excluded: they run in the foreground regardless.
    fn exec_background(&self, command: &SimpleCommand, env: &mut Environment, out: &mut dyn Write) -> ExitCode {
        if matches!(&command.target, Some(t) if t.is_monitor()) {
            return self.exec_command(command, env, out);
        }

        let command = command.clone();
        let mut env = env.clone();
        thread::spawn(move || {
            let mut stdout = std::io::stdout();
            if let Err(e) = run_command(&command, None, false, &mut env, &mut stdout) {
                let _ = writeln!(stdout, "{}", e);
            }
        });
        0
    }
}

/// Run one command against its resolved target.
///
/// `input` feeds the command's stdin (pipeline plumbing); with `capture` set,
/// stdout bytes are returned instead of written to `out`. Builtins ignore
/// `input`; none of them reads stdin.
fn run_command(
    command: &SimpleCommand,
    input: Option<&[u8]>,
    capture: bool,
    env: &mut Environment,
    out: &mut dyn Write,
) -> Result<(ExitCode, Vec<u8>), ExecutionError> {
    let target = command
        .target
        .as_ref()
        .ok_or_else(|| ExecutionError::Builtin {
            command: command.name.clone(),
            source: anyhow::anyhow!("command was not checked before execution"),
        })?;

    match target {
        CommandTarget::External(path) => {
            external::run(path, &command.name, &command.args, input, env, out, capture)
        }
        CommandTarget::Cd => run_builtin::<builtin::Cd>(command, capture, env, out),
        CommandTarget::Pwd => run_builtin::<builtin::Pwd>(command, capture, env, out),
        CommandTarget::Mkdir => run_builtin::<builtin::Mkdir>(command, capture, env, out),
        CommandTarget::Rm => run_builtin::<builtin::Rm>(command, capture, env, out),
        CommandTarget::Ls => run_builtin::<builtin::Ls>(command, capture, env, out),
        CommandTarget::Cpu => run_builtin::<monitor::Cpu>(command, capture, env, out),
        CommandTarget::Mem => run_builtin::<monitor::Mem>(command, capture, env, out),
        CommandTarget::Disk => run_builtin::<monitor::Disk>(command, capture, env, out),
        CommandTarget::Ps => run_builtin::<monitor::Ps>(command, capture, env, out),
    }
}

/// Parse a builtin's argument vector with argh and run it. Invalid arguments
/// surface as the usage text argh generates, not as a crash.
fn run_builtin<T: BuiltinCommand>(
    command: &SimpleCommand,
    capture: bool,
    env: &mut Environment,
    out: &mut dyn Write,
) -> Result<(ExitCode, Vec<u8>), ExecutionError> {
    let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
    let parsed = match T::from_args(&[T::name()], &args) {
        Ok(parsed) => parsed,
        Err(early_exit) => {
            write!(out, "{}", early_exit.output)?;
            if !early_exit.output.ends_with('\n') {
                writeln!(out)?;
            }
            let code = if early_exit.status.is_err() { 1 } else { 0 };
            return Ok((code, Vec::new()));
        }
    };

    if capture {
        let mut buffer = Vec::new();
        let code = finish_builtin::<T>(parsed, command, env, &mut buffer)?;
        Ok((code, buffer))
    } else {
        let code = finish_builtin::<T>(parsed, command, env, out)?;
        Ok((code, Vec::new()))
    }
}

fn finish_builtin<T: BuiltinCommand>(
    parsed: T,
    command: &SimpleCommand,
    env: &mut Environment,
    out: &mut dyn Write,
) -> Result<ExitCode, ExecutionError> {
    parsed.run(out, env).map_err(|source| ExecutionError::Builtin {
        command: command.name.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::SemanticChecker;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "rsh_exec_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn run_line(line: &str, env: &mut Environment) -> (ExitCode, String) {
        let (tokens, _) = tokenize(line);
        let mut statement = parse(tokens).expect("parse");
        SemanticChecker::new()
            .check(&mut statement, env)
            .expect("check");
        let mut out = Vec::new();
        let code = Executor::new().execute(&statement, env, &mut out);
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn sequence_runs_both_sides() {
        let temp = unique_temp_dir("seq");
        let mut env = Environment::new();
        env.current_dir = temp.clone();
        let (code, _) = run_line("mkdir a ; mkdir b", &mut env);
        assert_eq!(code, 0);
        assert!(temp.join("a").is_dir());
        assert!(temp.join("b").is_dir());
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    #[cfg(unix)]
    fn and_short_circuits_on_failure() {
        let temp = unique_temp_dir("and");
        let mut env = Environment::new();
        env.current_dir = temp.clone();
        let (code, _) = run_line("false && mkdir skipped", &mut env);
        assert_ne!(code, 0);
        assert!(!temp.join("skipped").exists());
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    #[cfg(unix)]
    fn and_runs_right_side_on_success() {
        let temp = unique_temp_dir("and_ok");
        let mut env = Environment::new();
        env.current_dir = temp.clone();
        let (code, _) = run_line("true && mkdir made", &mut env);
        assert_eq!(code, 0);
        assert!(temp.join("made").is_dir());
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    #[cfg(unix)]
    fn or_runs_right_side_only_on_failure() {
        let mut env = Environment::new();
        let (code, out) = run_line("false || pwd", &mut env);
        assert_eq!(code, 0);
        assert!(out.contains(&env.current_dir.display().to_string()));

        let (_, out) = run_line("true || pwd", &mut env);
        assert!(out.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn pipeline_connects_stages_through_bytes() {
        let mut env = Environment::new();
        let (code, out) = run_line("echo hi | cat", &mut env);
        assert_eq!(code, 0);
        assert_eq!(out, "hi\n");
    }

    #[test]
    #[cfg(unix)]
    fn builtin_output_flows_into_a_pipeline() {
        let mut env = Environment::new();
        let (code, out) = run_line("pwd | cat", &mut env);
        assert_eq!(code, 0);
        assert_eq!(out.trim_end(), env.current_dir.display().to_string());
    }

    #[test]
    fn failure_is_reported_and_siblings_still_run() {
        let temp = unique_temp_dir("local_fail");
        let mut env = Environment::new();
        env.current_dir = temp.clone();
        // mkdir with no operand fails at runtime; the sequence carries on.
        let (code, out) = run_line("mkdir ; mkdir survivor", &mut env);
        assert_eq!(code, 0);
        assert!(out.contains("execution error"));
        assert!(temp.join("survivor").is_dir());
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn invalid_builtin_flags_print_usage_instead_of_crashing() {
        let mut env = Environment::new();
        let (code, out) = run_line("ls --bogus-flag", &mut env);
        assert_eq!(code, 1);
        assert!(!out.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn background_detaches_and_returns_immediately() {
        let temp = unique_temp_dir("bg");
        let mut env = Environment::new();
        env.current_dir = temp.clone();
        let started = std::time::Instant::now();
        let (code, _) = run_line("sleep 2 &", &mut env);
        assert_eq!(code, 0);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn cd_moves_only_this_interpreter_context() {
        let temp = unique_temp_dir("cd_ctx");
        fs::create_dir_all(temp.join("inner")).unwrap();
        let mut env = Environment::new();
        env.current_dir = temp.clone();
        let other = env.clone();

        let (code, _) = run_line("cd inner", &mut env);
        assert_eq!(code, 0);
        assert_eq!(env.current_dir, fs::canonicalize(temp.join("inner")).unwrap());
        assert_eq!(other.current_dir, temp);
        let _ = fs::remove_dir_all(temp);
    }
}
