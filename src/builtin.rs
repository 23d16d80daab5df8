//! Built-in commands executed in-process.
//!
//! Builtins parse their arguments with [`argh`] (`FromArgs`) and run against
//! the explicit [`Environment`] context instead of process-wide state. The
//! continuous monitor views live in [`crate::monitor`] and implement the same
//! trait.

use crate::env::Environment;
use crate::executor::ExitCode;
use anyhow::{Context, Result, bail};
use argh::FromArgs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A command implemented inside the interpreter rather than launched as a
/// separate process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name, e.g. "cd" or "ls".
    fn name() -> &'static str;

    /// Run the command against the given output stream and context.
    ///
    /// Returns a shell-convention exit code: 0 for success, non-zero for
    /// failure. An `Err` is a runtime failure the executor reports as a
    /// single error line.
    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

#[derive(FromArgs)]
/// Change the working directory. Defaults to $HOME when no target is given.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, absolute or relative to the current directory
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => env.resolve(t),
            _ => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => bail!("cd: no target and HOME not set"),
            },
        };

        let canonical = fs::canonicalize(&target)
            .with_context(|| format!("cd: cannot resolve {}", target.display()))?;
        if !canonical.is_dir() {
            bail!("cd: not a directory: {}", canonical.display());
        }

        // Only the interpreter context moves; the process working directory
        // is left alone so interpreter instances stay independent.
        env.current_dir = canonical;
        writeln!(out, "Changed to directory: {}", env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(out, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create directories, including missing parents. Existing targets are fine.
pub struct Mkdir {
    #[argh(positional, greedy)]
    /// directories to create
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if self.dirs.is_empty() {
            bail!("mkdir: missing operand");
        }
        for dir in &self.dirs {
            fs::create_dir_all(env.resolve(dir))
                .with_context(|| format!("mkdir: cannot create {}", dir))?;
        }
        writeln!(out, "Created directories: {}", self.dirs.join(", "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove files, or directories recursively.
pub struct Rm {
    #[argh(positional, greedy)]
    /// files or directories to remove
    pub targets: Vec<String>,
}

impl BuiltinCommand for Rm {
    fn name() -> &'static str {
        "rm"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if self.targets.is_empty() {
            bail!("rm: missing operand");
        }
        let mut code = 0;
        for target in &self.targets {
            let resolved = env.resolve(target);
            if resolved.is_dir() {
                fs::remove_dir_all(&resolved)
                    .with_context(|| format!("rm: cannot remove {}", target))?;
                writeln!(out, "Removed directory: {}", target)?;
            } else if resolved.exists() {
                fs::remove_file(&resolved)
                    .with_context(|| format!("rm: cannot remove {}", target))?;
                writeln!(out, "Removed file: {}", target)?;
            } else {
                writeln!(
                    out,
                    "rm: cannot remove '{}': No such file or directory",
                    target
                )?;
                code = 1;
            }
        }
        Ok(code)
    }
}

#[derive(FromArgs)]
/// List directory entries in sorted order. Hidden entries are skipped unless
/// -a is given.
pub struct Ls {
    #[argh(switch, short = 'a')]
    /// also show entries whose names begin with a dot
    pub all: bool,

    #[argh(positional, greedy)]
    /// paths to list; defaults to the current directory
    pub paths: Vec<String>,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let paths = if self.paths.is_empty() {
            vec![".".to_string()]
        } else {
            self.paths
        };

        let mut code = 0;
        let mut items = Vec::new();
        for path in &paths {
            let resolved = env.resolve(path);
            if resolved.is_dir() {
                let entries = fs::read_dir(&resolved)
                    .with_context(|| format!("ls: cannot open {}", path))?;
                for entry in entries {
                    let name = entry
                        .with_context(|| format!("ls: cannot read {}", path))?
                        .file_name()
                        .to_string_lossy()
                        .into_owned();
                    if !self.all && name.starts_with('.') {
                        continue;
                    }
                    if path == "." {
                        items.push(name);
                    } else {
                        items.push(Path::new(path).join(name).display().to_string());
                    }
                }
            } else if resolved.exists() {
                items.push(path.clone());
            } else {
                writeln!(out, "ls: cannot access '{}': No such file or directory", path)?;
                code = 1;
            }
        }

        items.sort();
        for item in items {
            writeln!(out, "{}", item)?;
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "rsh_builtin_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn env_in(dir: &Path) -> Environment {
        let mut env = Environment::new();
        env.current_dir = dir.to_path_buf();
        env
    }

    #[test]
    fn pwd_prints_context_dir_not_process_dir() {
        let temp = unique_temp_dir("pwd");
        let mut env = env_in(&temp);
        let mut out = Vec::new();
        let code = Pwd {}.run(&mut out, &mut env).unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{}\n", temp.display())
        );
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn cd_moves_the_context_only() {
        let temp = unique_temp_dir("cd");
        fs::create_dir_all(temp.join("inner")).unwrap();
        let process_dir = std::env::current_dir().unwrap();

        let mut env = env_in(&temp);
        let mut out = Vec::new();
        let cmd = Cd {
            target: Some("inner".to_string()),
        };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 0);

        assert_eq!(env.current_dir, fs::canonicalize(temp.join("inner")).unwrap());
        // The process-wide working directory must not move.
        assert_eq!(std::env::current_dir().unwrap(), process_dir);
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn cd_without_target_goes_home() {
        let temp = unique_temp_dir("cd_home");
        let mut env = env_in(&std::env::temp_dir());
        env.set_var("HOME", temp.display().to_string());
        let mut out = Vec::new();
        let cmd = Cd { target: None };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 0);
        assert_eq!(env.current_dir, fs::canonicalize(&temp).unwrap());
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn mkdir_is_idempotent() {
        let temp = unique_temp_dir("mkdir");
        let mut env = env_in(&temp);

        let mut out = Vec::new();
        let cmd = Mkdir {
            dirs: vec!["a/b".to_string()],
        };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 0);
        assert!(temp.join("a/b").is_dir());

        // Creating the same directory again is not an error.
        let cmd = Mkdir {
            dirs: vec!["a/b".to_string()],
        };
        assert_eq!(cmd.run(&mut Vec::new(), &mut env).unwrap(), 0);
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn mkdir_without_operands_is_a_runtime_failure() {
        let mut env = Environment::new();
        let err = Mkdir { dirs: vec![] }
            .run(&mut Vec::new(), &mut env)
            .unwrap_err();
        assert!(err.to_string().contains("missing operand"));
    }

    #[test]
    fn rm_removes_files_and_directories() {
        let temp = unique_temp_dir("rm");
        fs::write(temp.join("file.txt"), "x").unwrap();
        fs::create_dir_all(temp.join("dir/nested")).unwrap();
        let mut env = env_in(&temp);

        let mut out = Vec::new();
        let cmd = Rm {
            targets: vec!["file.txt".to_string(), "dir".to_string()],
        };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 0);
        assert!(!temp.join("file.txt").exists());
        assert!(!temp.join("dir").exists());

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Removed file: file.txt"));
        assert!(printed.contains("Removed directory: dir"));
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn rm_reports_misses_without_aborting_the_batch() {
        let temp = unique_temp_dir("rm_miss");
        fs::write(temp.join("real.txt"), "x").unwrap();
        let mut env = env_in(&temp);

        let mut out = Vec::new();
        let cmd = Rm {
            targets: vec!["ghost".to_string(), "real.txt".to_string()],
        };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 1);
        assert!(!temp.join("real.txt").exists());
        assert!(String::from_utf8(out).unwrap().contains("cannot remove 'ghost'"));
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn ls_hides_dot_entries_unless_asked() {
        let temp = unique_temp_dir("ls");
        fs::write(temp.join(".hidden"), "").unwrap();
        fs::write(temp.join("visible.txt"), "").unwrap();
        let mut env = env_in(&temp);

        let mut out = Vec::new();
        let cmd = Ls {
            all: false,
            paths: vec![".".to_string()],
        };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "visible.txt\n");

        let mut out = Vec::new();
        let cmd = Ls {
            all: true,
            paths: vec![".".to_string()],
        };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), ".hidden\nvisible.txt\n");
        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn ls_sorts_across_multiple_operands_and_reports_misses() {
        let temp = unique_temp_dir("ls_multi");
        fs::create_dir_all(temp.join("d")).unwrap();
        fs::write(temp.join("d/zeta"), "").unwrap();
        fs::write(temp.join("d/alpha"), "").unwrap();
        fs::write(temp.join("plain.txt"), "").unwrap();
        let mut env = env_in(&temp);

        let mut out = Vec::new();
        let cmd = Ls {
            all: false,
            paths: vec![
                "d".to_string(),
                "missing_path".to_string(),
                "plain.txt".to_string(),
            ],
        };
        assert_eq!(cmd.run(&mut out, &mut env).unwrap(), 1);
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ls: cannot access 'missing_path': No such file or directory",
                "d/alpha",
                "d/zeta",
                "plain.txt",
            ]
        );
        let _ = fs::remove_dir_all(temp);
    }
}
