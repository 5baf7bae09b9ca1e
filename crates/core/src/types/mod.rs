pub mod pair;
pub mod run;

// Re-export commonly used types
pub use pair::Pair;
pub use run::{Run, RunStatus};
