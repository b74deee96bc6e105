//! jobsh REPL: interactive job shell.
//!
//! Reads one command per line, hands it to the kernel and prints the reply.
//! Jobs run concurrently with the prompt; `job`, `kill` and `dash` inspect
//! them. The loop ends when the kernel's shutdown procedure has finished,
//! whether that was started by `quit`, a signal, end of input or a fault.

use std::collections::VecDeque;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use jobsh_kernel::{Kernel, KernelConfig, Reply, ShutdownReason, listen_for_signals, serve_worker};

const PROMPT: &str = "jobsh> ";

/// REPL state: a kernel and nothing else.
pub struct Repl {
    kernel: Kernel,
}

impl Repl {
    /// Create a REPL with an HTTP-backed kernel. Must be called inside a tokio runtime.
    pub fn new(config: KernelConfig) -> Result<Self> {
        let kernel = Kernel::new(config).context("Failed to create kernel")?;
        Ok(Self { kernel })
    }

    pub fn with_kernel(kernel: Kernel) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Process a single line of input. Returns the text to print, if any.
    pub fn process_line(&mut self, line: &str) -> Option<String> {
        match self.kernel.execute(line) {
            Ok(Reply::Empty) => None,
            Ok(Reply::Output(text)) => Some(text),
            Ok(Reply::Submitted(index)) => Some(format!("Task {index} is submitted")),
            Err(e) => Some(format!("Error: {e}")),
        }
    }
}

/// One read from a [`LineSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupt,
    EndOfInput,
}

/// Where command lines come from.
#[async_trait]
pub trait LineSource: Send {
    async fn next_line(&mut self) -> Input;
}

/// Fixed input, for tests and piped sessions.
pub struct ScriptSource {
    inputs: VecDeque<Input>,
    pause: Duration,
}

impl ScriptSource {
    pub fn new(inputs: impl IntoIterator<Item = Input>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            pause: Duration::ZERO,
        }
    }

    pub fn from_lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self::new(lines.into_iter().map(|l| Input::Line(l.into())))
    }

    /// Sleep this long before handing out each input.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

#[async_trait]
impl LineSource for ScriptSource {
    async fn next_line(&mut self) -> Input {
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        self.inputs.pop_front().unwrap_or(Input::EndOfInput)
    }
}

/// Interactive input through rustyline.
///
/// The editor lives on its own thread and reads a line only when asked, so
/// the prompt never appears before the previous command has been dispatched.
pub struct EditorSource {
    requests: mpsc::Sender<()>,
    lines: mpsc::Receiver<Input>,
}

impl EditorSource {
    pub fn spawn(prompt: impl Into<String>) -> Result<Self> {
        let prompt = prompt.into();
        let (request_tx, mut request_rx) = mpsc::channel::<()>(1);
        let (line_tx, line_rx) = mpsc::channel::<Input>(1);
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<(), String>>(1);

        std::thread::Builder::new()
            .name("jobsh-editor".into())
            .spawn(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => {
                        let _ = ready_tx.send(Ok(()));
                        editor
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                let history = history_path();
                if let Some(path) = &history {
                    let _ = editor.load_history(path);
                }

                while request_rx.blocking_recv().is_some() {
                    let input = match editor.readline(&prompt) {
                        Ok(line) => {
                            let _ = editor.add_history_entry(line.as_str());
                            if let Some(path) = &history {
                                if let Err(e) = editor.save_history(path) {
                                    tracing::debug!(error = %e, "could not save history");
                                }
                            }
                            Input::Line(line)
                        }
                        Err(ReadlineError::Interrupted) => Input::Interrupt,
                        Err(ReadlineError::Eof) => Input::EndOfInput,
                        Err(e) => {
                            tracing::warn!(error = %e, "line editor failed");
                            Input::EndOfInput
                        }
                    };
                    if line_tx.blocking_send(input).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to start editor thread")?;

        ready_rx
            .recv()
            .context("Editor thread exited during startup")?
            .map_err(anyhow::Error::msg)
            .context("Failed to create editor")?;

        Ok(Self {
            requests: request_tx,
            lines: line_rx,
        })
    }
}

#[async_trait]
impl LineSource for EditorSource {
    async fn next_line(&mut self) -> Input {
        if self.requests.send(()).await.is_err() {
            return Input::EndOfInput;
        }
        self.lines.recv().await.unwrap_or(Input::EndOfInput)
    }
}

/// `<data dir>/history.txt`, creating the directory if needed.
fn history_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "jobsh")?;
    let dir = dirs.data_dir();
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::debug!(error = %e, path = %dir.display(), "no history directory");
        return None;
    }
    Some(dir.join("history.txt"))
}

/// Read, evaluate and print until the kernel has shut down.
///
/// Once shutdown has started no further input is read; the driver only waits
/// for the procedure to finish.
pub async fn drive<S, W>(repl: &mut Repl, source: &mut S, out: &mut W) -> Result<()>
where
    S: LineSource + ?Sized,
    W: Write,
{
    let shutdown = repl.kernel().shutdown().clone();

    loop {
        if shutdown.is_exiting() {
            shutdown.stopped().await;
            break;
        }

        let input = tokio::select! {
            _ = shutdown.stopped() => break,
            input = source.next_line() => input,
        };

        match input {
            Input::Line(line) => {
                if let Some(text) = repl.process_line(&line) {
                    writeln!(out, "{text}")?;
                    out.flush()?;
                }
            }
            Input::Interrupt => {
                shutdown.trigger(ShutdownReason::Signal("SIGINT"));
            }
            Input::EndOfInput => {
                shutdown.trigger(ShutdownReason::EndOfInput);
            }
        }
    }

    Ok(())
}

const COMMANDS: &[(&str, &str)] = &[
    ("dex <id>", "look up a catalog entry"),
    ("dex-multi <id>...", "look up several entries, one after another"),
    ("fib <n>", "compute the nth fibonacci number off the loop"),
    ("fib-multi <n>...", "compute several fibonacci numbers as one job"),
    ("job <index>", "show a job's result, or \"Still waiting\""),
    ("kill <index>", "cancel a job"),
    ("dash", "show every job"),
    ("quit", "cancel everything and exit"),
];

/// Startup banner listing every command.
pub fn banner(color: bool) -> String {
    use owo_colors::OwoColorize;

    let title = format!("jobsh v{}", env!("CARGO_PKG_VERSION"));
    let mut text = if color {
        title.bold().to_string()
    } else {
        title
    };
    text.push_str("\nCommands:\n");

    for (usage, about) in COMMANDS {
        let usage = format!("{usage:<20}");
        if color {
            text.push_str(&format!("  {} {about}\n", usage.cyan()));
        } else {
            text.push_str(&format!("  {usage} {about}\n"));
        }
    }
    text
}

fn use_color() -> bool {
    std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none()
        && std::env::var("TERM").map(|t| t != "dumb").unwrap_or(true)
}

/// Run the interactive REPL on a single-threaded runtime.
pub fn run(config: KernelConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let result = runtime.block_on(async {
        let mut repl = Repl::new(config)?;
        listen_for_signals(repl.kernel().shutdown());

        println!("{}", banner(use_color()));
        let mut source = EditorSource::spawn(PROMPT)?;
        let mut stdout = std::io::stdout();
        drive(&mut repl, &mut source, &mut stdout).await
    });

    runtime.shutdown_timeout(Duration::from_secs(5));
    result
}

/// Serve one offloaded unit over stdin/stdout.
pub fn run_worker() -> Result<()> {
    let input = std::io::BufReader::new(std::io::stdin());
    let output = std::io::stdout().lock();
    serve_worker(input, output).context("Worker failed")
}
