use std::{
    io::{self, BufRead, Write},
    process::Command,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use botscope_system_diagnostics::{
    config_table, parse_line, stats_table, CancelToken, Diagnostics, KeyValueStore, LiveFrames,
    Outcome, ParsedLine, StatusBoard,
};
use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

use crate::net::PrimitiveSender;

const PROMPT: &str = "⚡ ";
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Spawns a thread forwarding stdin lines until end of input.
pub(crate) fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let _ = thread::Builder::new()
        .name("stdin-reader".to_owned())
        .spawn(move || forward_lines(io::stdin().lock(), &sender))
        .context("failed to start stdin reader thread")?;
    Ok(receiver)
}

fn forward_lines<R: BufRead>(input: R, lines: &Sender<String>) {
    for line in input.lines() {
        match line {
            Ok(line) => {
                if lines.send(line).is_err() {
                    return;
                }
            }
            Err(error) => {
                warn!(%error, "failed to read from stdin");
                return;
            }
        }
    }
}

/// Interactive diagnostics shell driving one robot.
pub(crate) struct Shell<S, K> {
    diagnostics: Diagnostics,
    sender: S,
    board: Arc<StatusBoard>,
    store: K,
    refresh_interval: Duration,
    restart_command: Option<String>,
}

impl<S, K> Shell<S, K>
where
    S: PrimitiveSender,
    K: KeyValueStore,
{
    pub(crate) fn new(sender: S, board: Arc<StatusBoard>, store: K) -> Self {
        Self {
            diagnostics: Diagnostics::default(),
            sender,
            board,
            store,
            refresh_interval: botscope_system_diagnostics::DEFAULT_REFRESH_INTERVAL,
            restart_command: None,
        }
    }

    pub(crate) fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub(crate) fn with_restart_command(mut self, restart_command: Option<String>) -> Self {
        self.restart_command = restart_command;
        self
    }

    /// Reads commands from `lines` until `quit` or end of input.
    pub(crate) fn run<W: Write>(&mut self, lines: &Receiver<String>, output: &mut W) -> Result<()> {
        writeln!(
            output,
            "Botscope diagnostics shell. Type 'help' for the list of commands."
        )?;

        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            let Ok(line) = lines.recv() else {
                writeln!(output)?;
                break;
            };
            if self.dispatch(&line, lines, output)? {
                break;
            }
        }

        writeln!(output, "Goodbye!")?;
        Ok(())
    }

    /// Handles one line and reports whether the shell should exit.
    fn dispatch<W: Write>(
        &mut self,
        line: &str,
        lines: &Receiver<String>,
        output: &mut W,
    ) -> Result<bool> {
        let command = match parse_line(line) {
            ParsedLine::Empty => return Ok(false),
            ParsedLine::Help(text) | ParsedLine::Invalid(text) => {
                writeln!(output, "{}", text.trim_end())?;
                return Ok(false);
            }
            ParsedLine::Command(command) => command,
        };

        let outcome = match self.diagnostics.handle(&command) {
            Ok(outcome) => outcome,
            Err(error) => {
                writeln!(output, "{error}")?;
                return Ok(false);
            }
        };

        match outcome {
            Outcome::Send { primitive, message } => match self.sender.send(&primitive) {
                Ok(()) => writeln!(output, "{message}")?,
                Err(error) => {
                    warn!(error = %format!("{error:#}"), "failed to send primitive");
                    writeln!(output, "Failed to send primitive: {error:#}")?;
                }
            },
            Outcome::ShowStats { frames } => {
                let board = Arc::clone(&self.board);
                let render =
                    move || stats_table(board.latest().as_deref(), Instant::now()).to_string();
                show_live(render, frames, self.refresh_interval, lines, output)?;
            }
            Outcome::ShowConfig { frames } => {
                let store = &self.store;
                let render = || config_table(store).to_string();
                show_live(render, frames, self.refresh_interval, lines, output)?;
            }
            Outcome::Restart => self.restart(output)?,
            Outcome::Quit => return Ok(true),
        }
        Ok(false)
    }

    fn restart<W: Write>(&self, output: &mut W) -> Result<()> {
        let Some(command) = self.restart_command.as_deref() else {
            writeln!(
                output,
                "No restart command configured; set robot.restart_command in the configuration file."
            )?;
            return Ok(());
        };

        info!(command, "restarting robot services");
        match Command::new("sh").args(["-c", command]).status() {
            Ok(status) if status.success() => writeln!(output, "Restarted robot services")?,
            Ok(status) => writeln!(output, "Restart command failed ({status})")?,
            Err(error) => writeln!(output, "Failed to run restart command: {error}")?,
        }
        Ok(())
    }
}

/// Streams live frames to `output`.
///
/// Without a frame limit the display runs until the next input line arrives.
fn show_live<F, W>(
    render: F,
    frame_limit: Option<usize>,
    interval: Duration,
    lines: &Receiver<String>,
    output: &mut W,
) -> Result<()>
where
    F: FnMut() -> String,
    W: Write,
{
    let frames = LiveFrames::new(render, interval).with_frame_limit(frame_limit);
    let interactive = frame_limit.is_none();
    let (stop, stopped) = crossbeam_channel::bounded::<()>(0);
    let watcher = if interactive {
        writeln!(output, "Press Enter to return to the shell.")?;
        Some(watch_for_enter(lines.clone(), stopped, frames.cancel_token())?)
    } else {
        None
    };

    for frame in frames {
        if interactive {
            write!(output, "{CLEAR_SCREEN}")?;
        }
        write!(output, "{frame}")?;
        output.flush()?;
    }

    drop(stop);
    if let Some(watcher) = watcher {
        watcher
            .join()
            .map_err(|_| anyhow!("live display watcher panicked"))?;
    }
    Ok(())
}

fn watch_for_enter(
    lines: Receiver<String>,
    stopped: Receiver<()>,
    cancel: CancelToken,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("live-display-watcher".to_owned())
        .spawn(move || {
            crossbeam_channel::select! {
                recv(lines) -> _ => cancel.cancel(),
                recv(stopped) -> _ => {}
            }
        })
        .context("failed to start live display watcher")
}
