//! Isolated, timeout-bounded execution of generated code and tests.

mod error;
mod process;
mod report;
mod runner;

pub use error::SandboxError;
pub use process::ChildOutput;
pub use process::run_with_timeout;
pub use report::TestSummary;
pub use report::TestVerdict;
pub use report::summarize;
pub use runner::CombineMode;
pub use runner::DEFAULT_TIMEOUT;
pub use runner::ExecOutcome;
pub use runner::ExecutionReport;
pub use runner::SandboxRunner;
