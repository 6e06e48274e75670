use anyhow::Context;
use osc::config::Limits;
use osc::repl::Shell;
use osc::terminal::{FdReader, RawMode};
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_ansi(false)
        .without_time()
        .init();

    // Dropped after the loop returns, which puts the terminal back.
    let _raw = RawMode::enable_if_tty(libc::STDIN_FILENO).context("enabling raw terminal mode")?;

    let mut shell = Shell::new(FdReader::stdin(), io::stdout(), io::stderr(), Limits::default());
    shell.run()
}
