//! Resolution and execution of commands that are not built in.

use crate::env::Environment;
use crate::executor::{ExecutionError, ExitCode};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// Resolve a command name to an executable the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - A name containing a separator (including `./foo`): resolved against the
///   interpreter working directory, returned if it exists.
/// - A single component: searched in each directory of the PATH variable, in
///   order; the first executable file wins.
pub fn find_executable(env: &Environment, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }

    if path.components().count() > 1 {
        let resolved = env.resolve(name);
        return resolved.exists().then_some(resolved);
    }

    let search_paths = env.get_var("PATH")?;
    for dir in std::env::split_paths(&search_paths) {
        let candidate = dir.join(name);
        if candidate.is_file() && is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

/// Spawn an already-resolved external command and wait for it.
///
/// Both of the child's output streams are captured; stderr is always relayed
/// onto `out`, stdout is either relayed too or returned as bytes when
/// `capture` is set (pipeline plumbing). The interleaving of the two streams
/// is a documented simplification, not a stream-accurate relay.
pub fn run(
    path: &Path,
    name: &str,
    args: &[String],
    input: Option<&[u8]>,
    env: &Environment,
    out: &mut dyn Write,
    capture: bool,
) -> Result<(ExitCode, Vec<u8>), ExecutionError> {
    let mut command = std::process::Command::new(path);
    command
        .args(args)
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExecutionError::CommandNotFound(name.to_string()),
        std::io::ErrorKind::PermissionDenied => ExecutionError::PermissionDenied(name.to_string()),
        _ => ExecutionError::Launch {
            command: name.to_string(),
            source: e,
        },
    })?;

    if let Some(bytes) = input {
        // Dropping the handle closes the child's stdin once the buffer is fed.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(bytes)?;
        }
    }

    let output = child.wait_with_output().map_err(|e| ExecutionError::Launch {
        command: name.to_string(),
        source: e,
    })?;

    if !capture {
        out.write_all(&output.stdout)?;
    }
    out.write_all(&output.stderr)?;

    let code = output
        .status
        .code()
        .unwrap_or_else(|| terminated_by_signal(output.status));
    let captured = if capture { output.stdout } else { Vec::new() };
    Ok((code, captured))
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match ExitStatusExt::signal(&exit_status) {
        Some(signal) => 128 + signal,
        None => -1,
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
