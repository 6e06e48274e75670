// parser.rs

use itertools::Itertools;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokens {
    pub args: Vec<String>,
    pub background: bool,
}

impl Tokens {
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Splits `line` on whitespace. A lone `&` marks the command for background
/// execution instead of becoming an argument. At most `max_args - 1`
/// arguments are kept; the rest of the line is ignored.
pub fn tokenize(line: &str, max_args: usize) -> Tokens {
    let limit = max_args.saturating_sub(1);
    let mut tokens = Tokens::default();
    for word in line.split_whitespace() {
        if tokens.args.len() >= limit {
            debug!(limit, "argument limit reached, dropping rest of line");
            break;
        }
        if word == "&" {
            tokens.background = true;
        } else {
            tokens.args.push(word.to_string());
        }
    }
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Input(PathBuf),
    Output(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Simple {
        argv: Vec<String>,
        redirect: Option<Redirect>,
        background: bool,
    },
    Pipeline {
        left: Vec<String>,
        right: Vec<String>,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Simple { argv, redirect, background } => {
                write!(f, "{}", argv.iter().join(" "))?;
                match redirect {
                    Some(Redirect::Input(p)) => write!(f, " < {}", p.display())?,
                    Some(Redirect::Output(p)) => write!(f, " > {}", p.display())?,
                    None => {}
                }
                if *background {
                    write!(f, " &")?;
                }
                Ok(())
            }
            Instruction::Pipeline { left, right } => {
                write!(f, "{} | {}", left.iter().join(" "), right.iter().join(" "))
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing command before '{0}'")]
    MissingCommand(&'static str),
    #[error("missing command after '|'")]
    MissingPipeTarget,
}

/// Builds an instruction from tokens.
///
/// The first `|` makes a two-stage pipeline and redirection operators are then
/// left as plain arguments. Without a pipe, only the first `<` or `>` is
/// honoured: argv ends at the operator and everything after its target is
/// discarded.
pub fn resolve(tokens: Tokens) -> Result<Instruction, ParseError> {
    let Tokens { mut args, background } = tokens;

    if let Some(split) = args.iter().position(|a| a == "|") {
        let right = args.split_off(split + 1);
        args.truncate(split);
        if args.is_empty() {
            return Err(ParseError::MissingCommand("|"));
        }
        if right.is_empty() {
            return Err(ParseError::MissingPipeTarget);
        }
        if background {
            debug!("background flag ignored for pipelines");
        }
        return Ok(Instruction::Pipeline { left: args, right });
    }

    let mut redirect = None;
    if let Some(at) = args.iter().position(|a| a == "<" || a == ">") {
        let target = args.get(at + 1).map(PathBuf::from);
        redirect = match (args[at].as_str(), target) {
            (">", Some(path)) => Some(Redirect::Output(path)),
            ("<", Some(path)) => Some(Redirect::Input(path)),
            _ => None,
        };
        let op = if args[at] == ">" { ">" } else { "<" };
        args.truncate(at);
        if args.is_empty() {
            return Err(ParseError::MissingCommand(op));
        }
    }

    Ok(Instruction::Simple { argv: args, redirect, background })
}
