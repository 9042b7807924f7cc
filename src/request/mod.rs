// Shared request pipeline: every handler runs Parse -> Authorize -> Validate -> Execute
// and returns a `PipelineError` that the HTTP boundary translates into a status and body.

pub mod context;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod stage;
pub mod validation;

pub use context::{RawRequest, RequestContext};
pub use error::PipelineError;
pub use pipeline::RequestPipeline;
pub use policy::{AccessPolicy, PolicyError, RoleSet};
pub use stage::{Entity, Operation, Stage};
pub use validation::{FieldRule, ImageContentType, Mode, PayloadValidator, Schema, Violation, Violations};
