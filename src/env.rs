use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Mutable interpreter context threaded through every dispatch call.
///
/// The interpreter never mutates the process-wide working directory; `cd`
/// updates `current_dir` here and external children receive it explicitly.
/// This keeps multiple interpreter instances (e.g. under test) from
/// interfering with each other.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Environment variables visible to executed commands (PATH, HOME, ...).
    pub vars: HashMap<String, String>,
    /// The working directory for command execution and path validation.
    pub current_dir: PathBuf,
    /// Set by `bye`; the REPL checks it after every line.
    pub should_exit: bool,
    /// Raised by the SIGINT handler; monitor loops poll it to stop redrawing.
    pub interrupted: Arc<AtomicBool>,
}

impl Environment {
    /// Capture the current process state into a fresh `Environment`.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the value of an environment variable, falling back to the process
    /// environment for keys not overridden locally.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Resolve a user-supplied path against the interpreter working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.current_dir.join(p)
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_var() {
        let mut env = Environment::new();
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
        env.set_var("KEY", "VALUE");
        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn resolve_joins_relative_paths() {
        let mut env = Environment::new();
        env.current_dir = PathBuf::from("/base");
        assert_eq!(env.resolve("sub/file"), PathBuf::from("/base/sub/file"));
        assert_eq!(env.resolve("/abs"), PathBuf::from("/abs"));
    }
}
