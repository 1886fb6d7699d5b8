//! Registration and login workflow.

pub mod errors;
pub mod validation;
mod workflow;

pub use errors::{AuthError, AuthErrorKind};
pub use validation::{LoginCredentials, RegisterData, ValidationError};
pub use workflow::{AttemptPhase, AuthOutcome, AuthWorkflow};
