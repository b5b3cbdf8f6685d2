use anyhow::{Context, Result};
use convaudio_engine::launch::Launcher;
use convaudio_engine::{ConvertConfig, JobScheduler, SchedulerView, TickSummary, UiMode};
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Something that shows the run to the user once per tick.
pub trait Frontend {
    fn frame(&mut self, view: &SchedulerView<'_>, summary: &TickSummary) -> Result<()>;

    /// Whether the user asked to stop since the last frame.
    fn interrupt_requested(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// Timing of the driver loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub poll_interval: Duration,
    /// Extra wait after the last job so the final screen stays readable
    pub linger: Duration,
}

impl Pacing {
    pub fn from_config(config: &ConvertConfig) -> Self {
        let linger = match config.ui_mode {
            UiMode::Interactive => Duration::from_millis(config.linger_ms),
            UiMode::Plain => Duration::ZERO,
        };
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            linger,
        }
    }
}

/// Tick, show, sleep until every queued file has been converted.
pub async fn run<L, F>(scheduler: &mut JobScheduler<L>, frontend: &mut F, pacing: Pacing) -> Result<()>
where
    L: Launcher,
    F: Frontend,
{
    loop {
        let summary = scheduler.tick().context("Conversion run aborted")?;
        frontend.frame(&scheduler.view(), &summary)?;

        if frontend.interrupt_requested()? {
            warn!(
                "Stopped by user with {} running and {} queued",
                scheduler.active().len(),
                scheduler.pending_len()
            );
            anyhow::bail!("Interrupted");
        }

        tokio::time::sleep(pacing.poll_interval).await;

        if summary.drained {
            if !pacing.linger.is_zero() {
                tokio::time::sleep(pacing.linger).await;
            }
            info!("Converted {} files", scheduler.completed().len());
            return Ok(());
        }
    }
}

/// [`run`], cut short by SIGINT.
///
/// Encoders that are already running are not signalled; they finish or die
/// with the terminal's process group.
pub async fn run_until_interrupted<L, F>(
    scheduler: &mut JobScheduler<L>,
    frontend: &mut F,
    pacing: Pacing,
) -> Result<()>
where
    L: Launcher,
    F: Frontend,
{
    tokio::select! {
        result = run(scheduler, frontend, pacing) => return result,
        Ok(()) = tokio::signal::ctrl_c() => {}
    }

    warn!(
        "Interrupted with {} running and {} queued",
        scheduler.active().len(),
        scheduler.pending_len()
    );
    anyhow::bail!("Interrupted")
}

/// Line-per-event frontend for dumb terminals and logs.
pub struct PlainFrontend<W: Write = Stdout> {
    out: W,
    started: usize,
}

impl PlainFrontend<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PlainFrontend<W> {
    pub fn new(out: W) -> Self {
        Self { out, started: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Frontend for PlainFrontend<W> {
    fn frame(&mut self, view: &SchedulerView<'_>, summary: &TickSummary) -> Result<()> {
        for source in &summary.finished {
            writeln!(self.out, "Finished: {}", display_name(source))?;
        }
        for source in &summary.started {
            self.started += 1;
            writeln!(
                self.out,
                "[{:>3}/{:>3}] {}",
                self.started,
                view.total,
                display_name(source)
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}
