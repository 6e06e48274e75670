// repl.rs

use crate::builtins::{dispatch, Builtin};
use crate::config::Limits;
use crate::editor::{LineEditor, ReadOutcome};
use crate::history::History;
use crate::parser::{resolve, tokenize};
use crate::pipeline::{execute, Launched};
use crate::util::{format_prompt, writeln_ignore_broken_pipe};
use anyhow::Context;
use std::io::{Read, Write};
use tracing::debug;

const RECALL_LAST: &str = "!!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The read-eval loop: prompt, edit, record, dispatch.
///
/// Normal output (prompt, echo, recall, background pids) goes to the editor's
/// writer; error messages go to `errors`.
pub struct Shell<R, W, E> {
    editor: LineEditor<R, W>,
    history: History,
    errors: E,
    limits: Limits,
}

impl<R: Read, W: Write, E: Write> Shell<R, W, E> {
    pub fn new(input: R, output: W, errors: E, limits: Limits) -> Self {
        Self {
            editor: LineEditor::new(input, output, limits.max_line_length),
            history: History::new(limits.history_capacity),
            errors,
            limits,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn output_mut(&mut self) -> &mut W {
        self.editor.output_mut()
    }

    /// Runs until `exit` or end of input.
    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let prompt = self.prompt();
            let out = self.editor.output_mut();
            out.write_all(prompt.as_bytes()).context("writing prompt")?;
            out.flush().context("writing prompt")?;

            let line = match self.editor.read_line(&prompt, &mut self.history) {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Eof) => {
                    debug!("end of input");
                    return Ok(());
                }
                Err(e) => return Err(e).context("reading from terminal"),
            };

            if self.handle_line(&line) == Flow::Exit {
                debug!("exit requested");
                return Ok(());
            }
        }
    }

    /// Processes one completed line.
    pub fn handle_line(&mut self, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }

        let line = if line == RECALL_LAST {
            let Some(last) = self.history.last().map(str::to_owned) else {
                self.say("No commands in history.");
                return Flow::Continue;
            };
            self.say(&last);
            last
        } else {
            self.history.add(line);
            line.to_owned()
        };

        let tokens = tokenize(&line, self.limits.max_args);
        if tokens.is_empty() {
            return Flow::Continue;
        }

        match dispatch(&tokens.args, &mut self.errors) {
            Builtin::Exit => return Flow::Exit,
            Builtin::Handled => return Flow::Continue,
            Builtin::NotBuiltin => {}
        }

        let instruction = match resolve(tokens) {
            Ok(instruction) => instruction,
            Err(e) => {
                self.complain(&e.to_string());
                return Flow::Continue;
            }
        };

        match execute(&instruction) {
            Ok(Launched::Background(pid)) => {
                self.say(&format!("Process running in background (PID: {})", pid));
            }
            Ok(Launched::Finished) => {}
            Err(e) => self.complain(&e.to_string()),
        }
        Flow::Continue
    }

    fn prompt(&mut self) -> String {
        match std::env::current_dir() {
            Ok(cwd) => format_prompt(Some(&cwd)),
            Err(e) => {
                self.complain(&format!("getcwd() error: {}", e));
                format_prompt(None)
            }
        }
    }

    fn say(&mut self, message: &str) {
        let _ = writeln_ignore_broken_pipe(self.editor.output_mut(), message);
    }

    fn complain(&mut self, message: &str) {
        let _ = writeln_ignore_broken_pipe(&mut self.errors, message);
    }
}
