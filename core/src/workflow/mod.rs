// core/src/workflow/mod.rs

//! A small asynchronous step-pipeline engine.
//!
//! A `Pipeline<TData, Err>` is an ordered list of named steps. Each step has
//! `on` handlers and optional `after` handlers, all operating on a shared
//! `ContextData<TData>`. Handlers return `PipelineControl::Continue` or
//! `PipelineControl::Stop`; an `Err` aborts the run and is returned as-is.

pub mod context_data;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use error::{WorkflowError, WorkflowResult};
pub use pipeline::{Handler, Pipeline};
pub use step::{SkipCondition, StepDef};
