pub mod daily_worker;

pub use daily_worker::run as run_daily_worker;
pub use daily_worker::{run_iteration, run_with_source, IterationOutcome, StopHandle};
