//! The line driver: one input line in, side effects and report lines out.
//!
//! Each cycle handles the reserved literals first (`bye`, `clear`, `--log`,
//! `--nolog`), forwards `!`-prefixed lines to the translator, and otherwise
//! pushes the line through tokenize → parse → check → execute. Syntax and
//! semantic failures abort the statement before any side effect; execution
//! failures are reported per node and the loop always continues.

use crate::checker::SemanticChecker;
use crate::env::Environment;
use crate::executor::Executor;
use crate::lexer;
use crate::parser;
use crate::translate::Translator;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const GRAY: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// A single-user interactive command interpreter.
pub struct Interpreter {
    env: Environment,
    checker: SemanticChecker,
    executor: Executor,
    translator: Option<Box<dyn Translator>>,
    /// Diagnostic echo of tokens and the parse tree, toggled by `--log`.
    trace: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            checker: SemanticChecker::new(),
            executor: Executor::new(),
            translator: None,
            trace: false,
        }
    }

    /// Install a natural-language translator for `!` lines.
    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// True once `bye` has been evaluated.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Shared flag a SIGINT handler should raise to stop monitor views.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.env.interrupted.clone()
    }

    /// Process one interpreter cycle. Every handled failure surfaces as
    /// exactly one line on `out`; only I/O trouble with `out` itself errors.
    pub fn eval_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        // A stale interrupt (e.g. Ctrl-C that already killed a child) must
        // not cancel the next monitor run.
        self.env.interrupted.store(false, Ordering::SeqCst);

        let line = line.trim();
        match line {
            "" => return Ok(()),
            "bye" => {
                self.env.should_exit = true;
                return Ok(());
            }
            "clear" => {
                write!(out, "\x1b[2J\x1b[H")?;
                out.flush()?;
                return Ok(());
            }
            "--log" => {
                self.trace = true;
                writeln!(out, "diagnostic logging enabled")?;
                return Ok(());
            }
            "--nolog" => {
                self.trace = false;
                writeln!(out, "diagnostic logging disabled")?;
                return Ok(());
            }
            _ => {}
        }

        if let Some(request) = line.strip_prefix('!') {
            return self.eval_translated(request.trim(), out);
        }

        self.run_source(line, out)
    }

    fn eval_translated(&mut self, request: &str, out: &mut dyn Write) -> Result<()> {
        let translated = match &self.translator {
            Some(translator) => translator.translate(request),
            None => Err(anyhow::anyhow!("no translator configured")),
        };
        match translated {
            Ok(command_line) => {
                if self.trace {
                    writeln!(out, "{}translated: {}{}", GRAY, command_line, RESET)?;
                }
                self.run_source(&command_line, out)
            }
            Err(e) => {
                writeln!(out, "execution error: translator: {}", e)?;
                Ok(())
            }
        }
    }

    /// Tokenize → parse → check → execute one command line.
    fn run_source(&mut self, source: &str, out: &mut dyn Write) -> Result<()> {
        let (tokens, lex_errors) = lexer::tokenize(source);
        for e in lex_errors {
            writeln!(out, "{}", e)?;
        }
        // Whitespace- or comment-only input is a no-op, not an error.
        if tokens.is_empty() {
            return Ok(());
        }
        if self.trace {
            writeln!(out, "{}tokens: {:?}{}", GRAY, tokens, RESET)?;
        }

        let mut statement = match parser::parse(tokens) {
            Ok(statement) => statement,
            Err(e) => {
                writeln!(out, "{}", e)?;
                return Ok(());
            }
        };
        if self.trace {
            write!(out, "{}{}{}", GRAY, parser::render_tree(&statement), RESET)?;
        }

        if let Err(e) = self.checker.check(&mut statement, &self.env) {
            writeln!(out, "{}", e)?;
            return Ok(());
        }

        self.executor.execute(&statement, &mut self.env, out);
        Ok(())
    }

    /// Interactive Read-Eval-Print loop with per-user history persistence.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let history = self.history_path();
        if let Some(path) = &history {
            let _ = rl.load_history(path);
        }

        let mut stdout = std::io::stdout();
        loop {
            match rl.readline("rsh$ ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                        if let Some(path) = &history {
                            let _ = rl.append_history(path);
                        }
                    }
                    self.eval_line(&line, &mut stdout)?;
                    if self.env.should_exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl-C at the prompt just gives a fresh prompt.
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn history_path(&self) -> Option<PathBuf> {
        self.env
            .get_var("HOME")
            .map(|home| PathBuf::from(home).join(".rsh_history"))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
