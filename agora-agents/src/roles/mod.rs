mod coder;
mod coordinator;
mod runner;
mod tester;

pub use coder::CoderBehavior;
pub use coordinator::CoordinatorBehavior;
pub use runner::RunnerBehavior;
pub use tester::TesterBehavior;

/// Well-known agent ids. Role behaviors address their downstream peers by
/// these names, so a roster that renames an agent must also reroute.
pub const COORDINATOR: &str = "coordinator";
pub const CODER: &str = "coder";
pub const TESTER: &str = "tester";
pub const RUNNER: &str = "runner";
