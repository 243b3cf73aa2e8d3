/*!
Operator console: the input provider and output sink the dispatcher talks to.

  Console          - trait: read_line(prompt) -> Input, write_line(text)
  Input            - Line | Interrupted | Closed
  TerminalConsole  - stdin/stdout, Ctrl-C observed while waiting for input
  Interrupts       - Ctrl-C listener living as long as the console

Lines are returned with the terminator stripped and nothing else touched;
whether whitespace matters is up to the caller.
*/

use anyhow::{Context, Result};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::runtime::{Builder, Runtime};

/// Outcome of one read from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Interrupt signal while waiting for input.
    Interrupted,
    /// End of input.
    Closed,
}

pub trait Console {
    /// Write `prompt` without a newline, then wait for one line.
    fn read_line(&mut self, prompt: &str) -> Result<Input>;
    fn write_line(&mut self, text: &str) -> Result<()>;
}

/// Ctrl-C listener registered once and kept for the life of the console.
///
/// Tokio broadcasts a signal to the listeners that exist when it arrives,
/// whichever runtime's driver reads it. A listener created per prompt misses
/// an interrupt that lands during a remote call; this one keeps it pending
/// until the next read.
pub(crate) struct Interrupts {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
    #[cfg(windows)]
    inner: tokio::signal::windows::CtrlC,
}

impl Interrupts {
    /// Must run inside a runtime context.
    pub(crate) fn install() -> io::Result<Self> {
        #[cfg(unix)]
        let inner = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
        #[cfg(windows)]
        let inner = tokio::signal::windows::ctrl_c()?;
        Ok(Self { inner })
    }

    /// `None` once the signal driver is gone.
    pub(crate) async fn recv(&mut self) -> Option<()> {
        self.inner.recv().await
    }
}

/// Console bound to the process stdin/stdout.
///
/// Stdin is read on a private current-thread runtime so the read can race
/// the interrupt listener. The blocking reader thread tokio uses for stdin
/// cannot be cancelled, so the runtime is shut down in the background on drop.
pub struct TerminalConsole {
    lines: Lines<BufReader<Stdin>>,
    interrupts: Interrupts,
    runtime: Option<Runtime>,
}

impl TerminalConsole {
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime")?;
        let interrupts = {
            let _guard = runtime.enter();
            Interrupts::install().context("failed to listen for interrupt")?
        };
        Ok(Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            interrupts,
            runtime: Some(runtime),
        })
    }
}

enum Wake {
    Line(io::Result<Option<String>>),
    Signal(Option<()>),
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        let mut out = io::stdout().lock();
        out.write_all(prompt.as_bytes())?;
        out.flush()?;
        drop(out);

        let runtime = self
            .runtime
            .as_ref()
            .context("console runtime already shut down")?;
        let lines = &mut self.lines;
        let interrupts = &mut self.interrupts;
        let woke = runtime.block_on(async {
            tokio::select! {
                line = lines.next_line() => Wake::Line(line),
                signal = interrupts.recv() => Wake::Signal(signal),
            }
        });
        match woke {
            Wake::Line(line) => match line.context("failed to read from stdin")? {
                Some(line) => Ok(Input::Line(line)),
                None => Ok(Input::Closed),
            },
            Wake::Signal(signal) => {
                signal.context("interrupt listener closed")?;
                Ok(Input::Interrupted)
            }
        }
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{text}")?;
        out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
