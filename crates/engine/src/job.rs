use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::config::ConvertConfig;
use crate::launch::{EncoderProcess, Launcher, ProcessExit};
use crate::progress::{parse_status_line, ProgressState};

/// Drained lines shorter than this (after trimming) end the drain for this tick.
const MIN_DRAIN_CHARS: usize = 3;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir { path: PathBuf, source: io::Error },

    #[error("failed to start encoder {} for {}: {source}", program.display(), input.display())]
    Spawn {
        program: PathBuf,
        input: PathBuf,
        source: io::Error,
    },

    #[error("encoder for {} has no {stream} pipe", input.display())]
    MissingPipe { input: PathBuf, stream: &'static str },
}

/// Everything needed to start one conversion: paths and the encoder command.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub output_dir: PathBuf,
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl JobPlan {
    pub fn new(source: &Path, config: &ConvertConfig) -> Self {
        let output_dir = output_dir_for(source, &config.output_subdir);
        let destination = destination_for(source, &output_dir, &config.output_extension);
        let args = build_args(source, &destination, config);

        Self {
            source: source.to_path_buf(),
            destination,
            output_dir,
            program: config.encoder_bin.clone(),
            args,
        }
    }

    /// Create the output directory if it does not exist yet.
    pub fn prepare_output_dir(&self) -> Result<(), JobError> {
        if self.output_dir.as_os_str().is_empty() || self.output_dir.is_dir() {
            return Ok(());
        }
        debug!("Creating output directory {:?}", self.output_dir);
        std::fs::create_dir_all(&self.output_dir).map_err(|source| JobError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })
    }
}

fn output_dir_for(source: &Path, subdir: &Path) -> PathBuf {
    match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(subdir),
        _ => subdir.to_path_buf(),
    }
}

fn destination_for(source: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();

    let mut file_name = stem;
    file_name.push(".");
    file_name.push(extension);
    let mut destination = output_dir.join(file_name);

    // Never let the encoder write over its own input
    if without_cur_dir(&destination) == without_cur_dir(source) {
        let mut disambiguated = destination.into_os_string();
        disambiguated.push(".");
        disambiguated.push(extension);
        destination = PathBuf::from(disambiguated);
    }

    destination
}

/// `./song.mp3` and `song.mp3` name the same file.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `<skip> -i <input> -vn -c:a <codec> -b:a <bitrate> [-ar <rate>] [-ac <channels>] <output>`
pub fn build_args(source: &Path, destination: &Path, config: &ConvertConfig) -> Vec<OsString> {
    let overwrite_flag = if config.skip_existing { "-n" } else { "-y" };

    let mut args: Vec<OsString> = vec![
        overwrite_flag.into(),
        "-i".into(),
        source.as_os_str().to_os_string(),
        "-vn".into(),
        "-c:a".into(),
        config.audio_codec.as_str().into(),
        "-b:a".into(),
        config.bitrate.as_str().into(),
    ];

    if let Some(rate) = config.sample_rate {
        args.push("-ar".into());
        args.push(rate.to_string().into());
    }

    if let Some(channels) = config.channels {
        args.push("-ac".into());
        args.push(channels.to_string().into());
    }

    args.push(destination.as_os_str().to_os_string());
    args
}

/// A running conversion: the encoder process, its output feed and parsed progress.
pub struct ConversionJob {
    plan: JobPlan,
    process: Box<dyn EncoderProcess>,
    output: UnboundedReceiver<String>,
    progress: ProgressState,
    started_at: DateTime<Local>,
}

impl ConversionJob {
    pub fn start(plan: JobPlan, launcher: &dyn Launcher) -> Result<Self, JobError> {
        let launched = launcher.launch(&plan)?;
        debug!("Started encoder for {:?} -> {:?}", plan.source, plan.destination);

        Ok(Self {
            plan,
            process: launched.process,
            output: launched.output,
            progress: ProgressState::default(),
            started_at: Local::now(),
        })
    }

    pub fn plan(&self) -> &JobPlan {
        &self.plan
    }

    pub fn source(&self) -> &Path {
        &self.plan.source
    }

    pub fn progress(&self) -> ProgressState {
        self.progress
    }

    /// Feed every line the reader has buffered so far through the parser.
    /// Never blocks. Returns the number of lines parsed.
    pub fn drain_output(&mut self) -> usize {
        let mut parsed = 0;
        loop {
            match self.output.try_recv() {
                Ok(line) => {
                    let line = line.trim();
                    if line.chars().count() < MIN_DRAIN_CHARS {
                        break;
                    }
                    parse_status_line(line, &mut self.progress);
                    parsed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        parsed
    }

    /// Non-blocking liveness check; `Some` once the encoder has exited.
    ///
    /// A process whose status cannot be queried is reported as exited so the
    /// job still reaches the completed list.
    pub fn poll_exit(&mut self) -> Option<ProcessExit> {
        match self.process.try_exit() {
            Ok(exit) => exit,
            Err(e) => {
                warn!("Failed to poll encoder for {:?}: {}", self.plan.source, e);
                Some(ProcessExit { code: None })
            }
        }
    }

    pub(crate) fn into_completed(self, exit: ProcessExit) -> CompletedJob {
        CompletedJob {
            source: self.plan.source,
            destination: self.plan.destination,
            exit_code: exit.code,
            started_at: self.started_at,
            finished_at: Local::now(),
        }
    }
}

impl std::fmt::Debug for ConversionJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionJob")
            .field("plan", &self.plan)
            .field("progress", &self.progress)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// A job whose encoder has exited. Success and failure are not distinguished.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}
