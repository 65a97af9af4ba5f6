//! Code-generation pipeline: extraction, validation, repair, and artifact
//! persistence for untrusted model output.

mod artifact;
mod cleaner;
mod error;
mod extract;
mod repair;
mod validate;

pub use artifact::Artifact;
pub use artifact::ArtifactKind;
pub use artifact::ArtifactStore;
pub use cleaner::CleanedCode;
pub use cleaner::CodePipeline;
pub use cleaner::CrossCheckPolicy;
pub use error::PipelineError;
pub use error::PipelineResult;
pub use extract::extract_code;
pub use extract::strip_fences;
pub use repair::FALLBACK_SOURCE;
pub use repair::FALLBACK_TESTS;
pub use repair::defined_names;
pub use repair::emergency_repair;
pub use repair::has_test_function;
pub use validate::SyntaxIssue;
pub use validate::check_python;
pub use validate::is_valid_python;
