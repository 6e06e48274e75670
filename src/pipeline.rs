// pipeline.rs

use crate::parser::{Instruction, Redirect};
use itertools::Itertools;
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, pipe2, ForkResult, Pid};
use std::ffi::{CString, NulError};
use std::io::Write;
use std::os::unix::io::RawFd;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

const EXIT_SETUP_FAILED: i32 = 1;
const EXIT_EXEC_FAILED: i32 = 127;

/// Failures inside a forked child before `exec`. Only the child dies of these.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("Unable to open output file '{}': {source}", .path.display())]
    OpenOutput { path: PathBuf, source: Errno },
    #[error("Unable to open input file '{}': {source}", .path.display())]
    OpenInput { path: PathBuf, source: Errno },
    #[error("Unable to redirect {stream}: {source}")]
    Dup { stream: &'static str, source: Errno },
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("pipe failed: {0}")]
    Pipe(#[source] Errno),
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),
    #[error("argument contains a NUL byte: {0}")]
    Nul(#[from] NulError),
    #[error("no command to run")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launched {
    /// Every spawned child has been waited for.
    Finished,
    /// Running unattended. The shell keeps no record of it and never reaps it.
    Background(Pid),
}

pub fn execute(instruction: &Instruction) -> Result<Launched, ExecError> {
    debug!(%instruction, "executing");
    match instruction {
        Instruction::Simple { argv, redirect, background } => {
            run_instruction(argv, redirect.as_ref(), *background)
        }
        Instruction::Pipeline { left, right } => {
            run_pipeline(left, right)?;
            Ok(Launched::Finished)
        }
    }
}

/// Starts `argv` in a child with the optional redirection applied and returns
/// its pid without waiting.
pub fn spawn(argv: &[String], redirect: Option<&Redirect>) -> Result<Pid, ExecError> {
    let args = to_cstrings(argv)?;
    flush_stdout();
    match unsafe { fork() }.map_err(ExecError::Fork)? {
        ForkResult::Child => exec_child(&args, || match redirect {
            Some(r) => apply_redirect(r),
            None => Ok(()),
        }),
        ForkResult::Parent { child } => {
            debug!(pid = %child, argv = %argv.iter().join(" "), "spawned");
            Ok(child)
        }
    }
}

pub fn run_instruction(
    argv: &[String],
    redirect: Option<&Redirect>,
    background: bool,
) -> Result<Launched, ExecError> {
    let pid = spawn(argv, redirect)?;
    if background {
        return Ok(Launched::Background(pid));
    }
    let _ = wait(pid);
    Ok(Launched::Finished)
}

/// Runs `left | right` and waits for both sides.
pub fn run_pipeline(left: &[String], right: &[String]) -> Result<(), ExecError> {
    let left_args = to_cstrings(left)?;
    let right_args = to_cstrings(right)?;
    // Close-on-exec keeps these ends out of unrelated children; dup2 clears the
    // flag on the copies that become stdin/stdout.
    let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?;
    let ends = (read_end, write_end);
    flush_stdout();

    let first = match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            exec_child(&left_args, || attach(write_end, libc::STDOUT_FILENO, ends))
        }
        Ok(ForkResult::Parent { child }) => child,
        Err(e) => {
            close_pair(ends);
            return Err(ExecError::Fork(e));
        }
    };

    let second = match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            exec_child(&right_args, || attach(read_end, libc::STDIN_FILENO, ends))
        }
        Ok(ForkResult::Parent { child }) => child,
        Err(e) => {
            close_pair(ends);
            let _ = wait(first);
            return Err(ExecError::Fork(e));
        }
    };

    // The reader only sees EOF once every write end is closed, ours included.
    close_pair(ends);
    debug!(left = %first, right = %second, "pipeline spawned");
    let _ = wait(first);
    let _ = wait(second);
    Ok(())
}

/// Blocks until `pid` changes state, retrying on `EINTR`.
pub fn wait(pid: Pid) -> nix::Result<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                debug!(%pid, ?status, "child finished");
                return Ok(status);
            }
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!(%pid, error = %e, "waitpid failed");
                return Err(e);
            }
        }
    }
}

fn to_cstrings(argv: &[String]) -> Result<Vec<CString>, ExecError> {
    if argv.is_empty() {
        return Err(ExecError::Empty);
    }
    argv.iter()
        .map(|a| CString::new(a.as_str()).map_err(ExecError::from))
        .collect()
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

fn close_pair((read_end, write_end): (RawFd, RawFd)) {
    let _ = close(read_end);
    let _ = close(write_end);
}

fn stream_name(fd: RawFd) -> &'static str {
    match fd {
        libc::STDIN_FILENO => "standard input",
        libc::STDOUT_FILENO => "standard output",
        _ => "descriptor",
    }
}

fn attach(fd: RawFd, target: RawFd, ends: (RawFd, RawFd)) -> Result<(), RedirectError> {
    dup2(fd, target).map_err(|source| RedirectError::Dup { stream: stream_name(target), source })?;
    close_pair(ends);
    Ok(())
}

fn apply_redirect(redirect: &Redirect) -> Result<(), RedirectError> {
    let (fd, target) = match redirect {
        Redirect::Output(path) => {
            let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC | OFlag::O_CLOEXEC;
            let mode = Mode::from_bits_truncate(0o644);
            let fd = open(path.as_path(), flags, mode)
                .map_err(|source| RedirectError::OpenOutput { path: path.clone(), source })?;
            (fd, libc::STDOUT_FILENO)
        }
        Redirect::Input(path) => {
            let fd = open(path.as_path(), OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty())
                .map_err(|source| RedirectError::OpenInput { path: path.clone(), source })?;
            (fd, libc::STDIN_FILENO)
        }
    };
    dup2(fd, target).map_err(|source| RedirectError::Dup { stream: stream_name(target), source })?;
    let _ = close(fd);
    Ok(())
}

/// Child side of a fork: run `setup`, then replace the process image.
/// Never returns to the shell's code.
fn exec_child<F>(argv: &[CString], setup: F) -> !
where
    F: FnOnce() -> Result<(), RedirectError>,
{
    if let Err(e) = setup() {
        eprintln!("Error: {}", e);
        unsafe { libc::_exit(EXIT_SETUP_FAILED) }
    }
    if let Some(program) = argv.first() {
        if let Err(e) = execvp(program, argv) {
            eprintln!("execvp failed: {}: {}", program.to_string_lossy(), e);
        }
    }
    unsafe { libc::_exit(EXIT_EXEC_FAILED) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn output_redirection_truncates_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        fs::write(&out, "old content that is longer\n").unwrap();

        let redirect = Redirect::Output(out.clone());
        let res = run_instruction(&args(&["echo", "hello"]), Some(&redirect), false).unwrap();

        assert_eq!(res, Launched::Finished);
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
    }

    #[test]
    fn input_redirection_feeds_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("sorted.txt");
        fs::write(&input, "b\na\nc\n").unwrap();

        let script = format!("sort > '{}'", out.display());
        let redirect = Redirect::Input(input);
        run_instruction(&args(&["sh", "-c", &script]), Some(&redirect), false).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn missing_input_file_fails_only_the_child() {
        let redirect = Redirect::Input("/definitely/not/here".into());
        let pid = spawn(&args(&["cat"]), Some(&redirect)).unwrap();
        assert_eq!(wait(pid).unwrap(), WaitStatus::Exited(pid, EXIT_SETUP_FAILED));
    }

    #[test]
    fn unknown_program_exits_nonzero() {
        let pid = spawn(&args(&["osc-no-such-program-xyz"]), None).unwrap();
        assert_eq!(wait(pid).unwrap(), WaitStatus::Exited(pid, EXIT_EXEC_FAILED));
    }

    #[test]
    fn background_returns_pid_without_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bg.txt");
        let redirect = Redirect::Output(out.clone());

        let res = run_instruction(&args(&["echo", "bg"]), Some(&redirect), true).unwrap();
        let Launched::Background(pid) = res else {
            panic!("expected background launch, got {:?}", res);
        };
        assert_eq!(wait(pid).unwrap(), WaitStatus::Exited(pid, 0));
        assert_eq!(fs::read_to_string(&out).unwrap(), "bg\n");
    }

    #[test]
    fn pipeline_connects_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("piped.txt");
        let script = format!("tr a-z A-Z > '{}'", out.display());

        run_pipeline(&args(&["printf", "hi"]), &args(&["sh", "-c", &script])).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "HI");
    }

    #[test]
    fn execute_dispatches_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("count.txt");
        let script = format!("wc -l > '{}'", out.display());
        let instruction = Instruction::Pipeline {
            left: args(&["printf", "a\\nb\\n"]),
            right: args(&["sh", "-c", &script]),
        };

        assert_eq!(execute(&instruction).unwrap(), Launched::Finished);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "2");
    }

    #[test]
    fn nul_byte_is_rejected_before_fork() {
        let err = spawn(&args(&["echo", "a\0b"]), None).unwrap_err();
        assert!(matches!(err, ExecError::Nul(_)));
        assert!(matches!(spawn(&[], None).unwrap_err(), ExecError::Empty));
    }
}
