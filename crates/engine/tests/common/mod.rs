// Scripted stand-ins for the encoder process

#![allow(dead_code)]

use convaudio_engine::job::{JobError, JobPlan};
use convaudio_engine::launch::{EncoderProcess, Launched, Launcher, ProcessExit};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Exits after being polled `remaining + 1` times.
pub struct ScriptedProcess {
    remaining: usize,
    code: Option<i32>,
}

impl EncoderProcess for ScriptedProcess {
    fn try_exit(&mut self) -> io::Result<Option<ProcessExit>> {
        if self.remaining == 0 {
            Ok(Some(ProcessExit { code: self.code }))
        } else {
            self.remaining -= 1;
            Ok(None)
        }
    }
}

/// Launcher whose processes print `lines` up front and live for a scripted
/// number of polls. Lifetimes are taken from `lifetimes` in launch order,
/// cycling when exhausted.
pub struct ScriptedLauncher {
    pub lifetimes: Vec<usize>,
    pub lines: Vec<String>,
    pub exit_code: Option<i32>,
    pub fail_for: Option<PathBuf>,
    pub launched: Mutex<Vec<PathBuf>>,
}

impl ScriptedLauncher {
    pub fn new(lifetimes: Vec<usize>) -> Self {
        Self {
            lifetimes,
            lines: Vec::new(),
            exit_code: Some(0),
            fail_for: None,
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().unwrap().clone()
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, plan: &JobPlan) -> Result<Launched, JobError> {
        if self.fail_for.as_deref() == Some(plan.source.as_path()) {
            return Err(JobError::Spawn {
                program: plan.program.clone(),
                input: plan.source.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted failure"),
            });
        }

        let mut launched = self.launched.lock().unwrap();
        let lifetime = if self.lifetimes.is_empty() {
            0
        } else {
            self.lifetimes[launched.len() % self.lifetimes.len()]
        };
        launched.push(plan.source.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        for line in &self.lines {
            tx.send(line.clone()).unwrap();
        }

        Ok(Launched {
            process: Box::new(ScriptedProcess {
                remaining: lifetime,
                code: self.exit_code,
            }),
            output: rx,
        })
    }
}
