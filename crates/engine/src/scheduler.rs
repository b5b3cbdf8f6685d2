use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::ConvertConfig;
use crate::job::{CompletedJob, ConversionJob, JobError, JobPlan};
use crate::launch::{Launcher, TokioLauncher};
use crate::progress::ProgressState;

/// What happened during one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    /// Sources whose encoder was started this pass, in start order
    pub started: Vec<PathBuf>,
    /// Sources whose encoder exited this pass, in the order observed
    pub finished: Vec<PathBuf>,
    /// Nothing pending and nothing running
    pub drained: bool,
}

/// Read-only snapshot of the scheduler for rendering.
#[derive(Debug, Clone)]
pub struct SchedulerView<'a> {
    pub pending: usize,
    pub active: Vec<ActiveJobView<'a>>,
    pub completed: &'a [CompletedJob],
    pub worker_limit: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ActiveJobView<'a> {
    pub source: &'a Path,
    pub progress: ProgressState,
}

/// Bounded worker pool over a FIFO queue of conversions.
///
/// All state is owned here and mutated only by the caller of [`tick`], so the
/// driver needs no locking.
///
/// [`tick`]: JobScheduler::tick
pub struct JobScheduler<L: Launcher = TokioLauncher> {
    config: ConvertConfig,
    launcher: L,
    worker_limit: usize,
    pending: VecDeque<PathBuf>,
    active: Vec<ConversionJob>,
    completed: Vec<CompletedJob>,
    submitted: usize,
}

impl<L: Launcher> JobScheduler<L> {
    /// A `worker_limit` of 0 is raised to 1.
    pub fn new(config: ConvertConfig, worker_limit: usize, launcher: L) -> Self {
        Self {
            config,
            launcher,
            worker_limit: worker_limit.max(1),
            pending: VecDeque::new(),
            active: Vec::new(),
            completed: Vec::new(),
            submitted: 0,
        }
    }

    /// Queue sources for conversion, keeping their order.
    pub fn submit<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for path in paths {
            self.pending.push_back(path);
            self.submitted += 1;
        }
        debug!("{} files queued", self.pending.len());
    }

    /// One scheduling pass: drain output, retire exited jobs, start new ones.
    ///
    /// Fails only when a job cannot be started. That source is put back at the
    /// head of the queue so it stays accounted for.
    pub fn tick(&mut self) -> Result<TickSummary, JobError> {
        let mut summary = TickSummary::default();

        let mut still_running = Vec::with_capacity(self.active.len());
        for mut job in self.active.drain(..) {
            job.drain_output();
            match job.poll_exit() {
                Some(exit) => {
                    debug!("Encoder for {:?} exited with {:?}", job.source(), exit.code);
                    summary.finished.push(job.source().to_path_buf());
                    self.completed.push(job.into_completed(exit));
                }
                None => still_running.push(job),
            }
        }
        self.active = still_running;

        while self.active.len() < self.worker_limit {
            let Some(source) = self.pending.pop_front() else {
                break;
            };
            match self.start_job(&source) {
                Ok(job) => {
                    summary.started.push(source);
                    self.active.push(job);
                }
                Err(e) => {
                    error!("Could not start conversion of {:?}: {}", source, e);
                    self.pending.push_front(source);
                    return Err(e);
                }
            }
        }

        summary.drained = self.is_drained();
        if summary.drained {
            info!("All {} conversions finished", self.completed.len());
        }
        Ok(summary)
    }

    fn start_job(&self, source: &Path) -> Result<ConversionJob, JobError> {
        let plan = JobPlan::new(source, &self.config);
        plan.prepare_output_dir()?;
        ConversionJob::start(plan, &self.launcher)
    }

    pub fn is_drained(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }

    pub fn view(&self) -> SchedulerView<'_> {
        SchedulerView {
            pending: self.pending.len(),
            active: self
                .active
                .iter()
                .map(|job| ActiveJobView {
                    source: job.source(),
                    progress: job.progress(),
                })
                .collect(),
            completed: &self.completed,
            worker_limit: self.worker_limit,
            total: self.submitted,
        }
    }

    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active(&self) -> &[ConversionJob] {
        &self.active
    }

    pub fn completed(&self) -> &[CompletedJob] {
        &self.completed
    }

    pub fn total_submitted(&self) -> usize {
        self.submitted
    }
}
