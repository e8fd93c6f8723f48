//! C2 -- a pipeline-executing shell: parse a line, run its pipelines with
//! `&&`/`||` short-circuiting and an optional trailing redirection, reap
//! backgrounded jobs asynchronously.

mod builtins;
mod command;
mod exec;
mod parser;
mod pipeline;
mod reaper;

pub use command::{ChainKind, Command, Exe, Pipeline, PipelineCondition};
pub use exec::ChainOutcome;
pub use parser::{parse, ParseError};
pub use reaper::ChildReaper;

use std::io::{self, BufRead, Write};

/// Drives an interactive read-eval-print loop over `input`/`output`,
/// printing `prompt` before each line and reaping background jobs between
/// commands. Returns the shell's exit code once an `exit` built-in fires or
/// input is exhausted.
pub struct Shell {
    prompt: String,
    reaper: ChildReaper,
}

impl Shell {
    pub fn new(prompt: impl Into<String>) -> io::Result<Shell> {
        Ok(Shell { prompt: prompt.into(), reaper: ChildReaper::install()? })
    }

    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> io::Result<i32> {
        let mut line = String::new();
        loop {
            for (pid, code) in self.reaper.drain() {
                log::debug!("reaped background pid {pid} (status {code})");
            }

            write!(output, "{}", self.prompt)?;
            output.flush()?;

            line.clear();
            let bytes_read = input.read_line(&mut line)?;
            if bytes_read == 0 {
                return Ok(0);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let command = match parse(trimmed) {
                Ok(c) => c,
                Err(e) => {
                    writeln!(output, "parse error: {e}")?;
                    continue;
                }
            };

            match exec::run(&command) {
                Ok(ChainOutcome::Exited(_)) => {}
                Ok(ChainOutcome::Backgrounded(pid)) => {
                    log::debug!("started background job {pid}");
                }
                Ok(ChainOutcome::ShellExit(code)) => return Ok(code),
                Err(e) => writeln!(output, "error: {e}")?,
            }
        }
    }
}
