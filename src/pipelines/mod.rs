//! Workflow pipelines orchestrating stateless services.

pub mod session;
pub mod sign;
pub mod verify;

pub use session::{CancellationToken, SessionState, SigningSession};
pub use sign::{SigningContext, SigningOrchestrator};
pub use verify::VerifyWorkflow;
