//! The two executors and the pieces they share.
//!
//! - [`TraditionalExecutor`]: explicit steps, then assertions.
//! - [`AgenticExecutor`]: bounded attempts against success criteria.
//!
//! Both return an `ExecutionResult` on every path and release their
//! automation capability before returning.

pub mod agentic;
pub mod deadline;
pub mod handlers;
pub mod registry;
pub mod traditional;

pub use agentic::AgenticExecutor;
pub use deadline::Deadline;
pub use registry::{AssertionContext, AssertionHandler, HandlerRegistry, StepContext, StepHandler};
pub use traditional::TraditionalExecutor;
