// Encoder process startup and output capture

use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::job::{JobError, JobPlan};

/// How an encoder process ended. `code` is `None` when it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

/// A started encoder that can be polled without blocking.
pub trait EncoderProcess: Send {
    fn try_exit(&mut self) -> io::Result<Option<ProcessExit>>;
}

impl EncoderProcess for Child {
    fn try_exit(&mut self) -> io::Result<Option<ProcessExit>> {
        Ok(self.try_wait()?.map(|status| ProcessExit {
            code: status.code(),
        }))
    }
}

/// A started process plus the receiving end of its output feed.
pub struct Launched {
    pub process: Box<dyn EncoderProcess>,
    pub output: UnboundedReceiver<String>,
}

/// Starts encoder processes for job plans.
pub trait Launcher {
    fn launch(&self, plan: &JobPlan) -> Result<Launched, JobError>;
}

/// Spawns the encoder with tokio and forwards its stdout and stderr lines into
/// one channel. Must be called from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl Launcher for TokioLauncher {
    fn launch(&self, plan: &JobPlan) -> Result<Launched, JobError> {
        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args);
        // The encoder must not read keystrokes meant for the terminal
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| JobError::Spawn {
            program: plan.program.clone(),
            input: plan.source.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| JobError::MissingPipe {
            input: plan.source.clone(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| JobError::MissingPipe {
            input: plan.source.clone(),
            stream: "stderr",
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_lines(stdout, tx.clone()));
        tokio::spawn(forward_lines(stderr, tx));

        Ok(Launched {
            process: Box::new(child),
            output: rx,
        })
    }
}

/// Read `reader` until EOF, sending every non-empty line to `tx`.
///
/// stdout and stderr each get their own task, so lines from the two pipes may
/// interleave out of order. ffmpeg writes all status text to stderr, which
/// keeps the status stream itself ordered.
async fn forward_lines<R>(reader: R, tx: UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut splitter = StatusLineSplitter::default();

    loop {
        let chunk = match reader.fill_buf().await {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Encoder output read failed: {}", e);
                break;
            }
        };
        if chunk.is_empty() {
            break;
        }

        let consumed = chunk.len();
        for line in splitter.push(chunk) {
            if tx.send(line).is_err() {
                // Job was dropped, nobody is listening
                return;
            }
        }
        reader.consume(consumed);
    }

    if let Some(line) = splitter.finish() {
        let _ = tx.send(line);
    }
}

/// Splits a byte stream into lines on both `\n` and `\r`.
///
/// ffmpeg redraws its status line with a bare carriage return, so splitting on
/// newlines alone would hold back every update until the encode finishes.
#[derive(Debug, Default)]
pub struct StatusLineSplitter {
    pending: Vec<u8>,
}

impl StatusLineSplitter {
    /// Consume `bytes`, returning every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// The unterminated tail left at EOF, if any.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}
