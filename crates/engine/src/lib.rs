// Batch audio conversion engine

pub mod config;
pub mod job;
pub mod launch;
pub mod progress;
pub mod scan;
pub mod scheduler;
pub mod startup;

// Re-export commonly used types
pub use config::{ConvertConfig, UiMode};
pub use job::{CompletedJob, ConversionJob, JobError, JobPlan};
pub use launch::{Launcher, TokioLauncher};
pub use progress::{parse_status_line, ProgressState};
pub use scheduler::{ActiveJobView, JobScheduler, SchedulerView, TickSummary};
