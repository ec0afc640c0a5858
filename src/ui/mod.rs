pub mod progress;
pub mod output;
pub mod signals;

pub use progress::{DayBar, OperationProgress, ProgressManager};
pub use output::{OutputFormatter, OutputMode, ProgressAwareOutput};
pub use signals::GracefulShutdown;
