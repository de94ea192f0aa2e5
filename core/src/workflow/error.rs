// core/src/workflow/error.rs
use thiserror::Error;

/// Failures raised by the pipeline machinery itself rather than by business steps.
#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  /// A step ran before the step that was supposed to fill `field` in the context.
  #[error("Step '{step_name}' expected '{field}' to be set by an earlier step")]
  MissingContextValue { step_name: String, field: String },
}

impl WorkflowError {
  pub fn missing(step_name: &str, field: &str) -> Self {
    WorkflowError::MissingContextValue {
      step_name: step_name.to_string(),
      field: field.to_string(),
    }
  }
}

pub type WorkflowResult<T, E = WorkflowError> = std::result::Result<T, E>;
