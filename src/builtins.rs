// builtins.rs

use crate::util::writeln_ignore_broken_pipe;
use std::env;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `exit`: the caller should stop the shell with status 0.
    Exit,
    /// The command ran (or failed) inside the shell; nothing to spawn.
    Handled,
    NotBuiltin,
}

/// Runs `cd` or recognises `exit`. Error messages go to `err`.
pub fn dispatch<W: Write>(args: &[String], err: W) -> Builtin {
    let Some(command) = args.first() else {
        return Builtin::NotBuiltin;
    };
    match command.as_str() {
        "exit" => Builtin::Exit,
        "cd" => {
            match args.get(1) {
                None => {
                    let _ = writeln_ignore_broken_pipe(err, "cd: expected argument");
                }
                Some(target) => {
                    if let Err(e) = env::set_current_dir(target) {
                        let _ = writeln_ignore_broken_pipe(err, format!("chdir failed: {}", e));
                    }
                }
            }
            Builtin::Handled
        }
        _ => Builtin::NotBuiltin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_support::lock_current_dir;
    use pretty_assertions::assert_eq;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exit_is_recognised() {
        assert_eq!(dispatch(&args(&["exit"]), Vec::new()), Builtin::Exit);
        assert_eq!(dispatch(&args(&["exit", "3"]), Vec::new()), Builtin::Exit);
    }

    #[test]
    fn other_commands_fall_through() {
        assert_eq!(dispatch(&args(&["ls", "-l"]), Vec::new()), Builtin::NotBuiltin);
        assert_eq!(dispatch(&[], Vec::new()), Builtin::NotBuiltin);
    }

    #[test]
    fn cd_without_argument_reports() {
        let mut err = Vec::new();
        assert_eq!(dispatch(&args(&["cd"]), &mut err), Builtin::Handled);
        assert_eq!(String::from_utf8(err).unwrap(), "cd: expected argument\n");
    }

    #[test]
    fn cd_changes_directory() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();

        let mut err = Vec::new();
        let res = dispatch(&args(&["cd", target.to_str().unwrap()]), &mut err);
        let now = env::current_dir().unwrap();
        env::set_current_dir(orig).unwrap();

        assert_eq!(res, Builtin::Handled);
        assert!(err.is_empty());
        assert_eq!(now, target);
    }

    #[test]
    fn cd_to_missing_directory_reports_os_error() {
        let _lock = lock_current_dir();
        let mut err = Vec::new();
        let res = dispatch(&args(&["cd", "/definitely/not/here"]), &mut err);
        assert_eq!(res, Builtin::Handled);
        assert!(String::from_utf8(err).unwrap().starts_with("chdir failed: "));
    }
}
