// Parse -> Authorize -> Validate -> Execute, short-circuiting at the first failing stage

use serde_json::{Map, Value};
use std::future::Future;
use std::time::Instant;

use crate::config::BodyPolicy;
use crate::request::context::{RawRequest, RequestContext};
use crate::request::error::PipelineError;
use crate::request::policy::RoleSet;
use crate::request::stage::{Operation, Stage};
use crate::request::validation::{PayloadValidator, Schema};

/// One configured pipeline run for a single operation
pub struct RequestPipeline<'a> {
    operation: Operation,
    roles: &'a RoleSet,
    validator: Option<Box<dyn PayloadValidator + 'a>>,
    body_policy: BodyPolicy,
}

impl<'a> RequestPipeline<'a> {
    pub fn new(operation: Operation, roles: &'a RoleSet) -> Self {
        Self {
            operation,
            roles,
            validator: None,
            body_policy: BodyPolicy::Lenient,
        }
    }

    pub fn with_schema(self, schema: Schema) -> Self {
        self.with_validator(schema)
    }

    pub fn with_validator(mut self, validator: impl PayloadValidator + 'a) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn with_body_policy(mut self, policy: BodyPolicy) -> Self {
        self.body_policy = policy;
        self
    }

    /// Run every stage in order; `execute` only sees a context that passed the first three
    pub async fn run<T, F, Fut>(self, raw: RawRequest, execute: F) -> Result<T, PipelineError>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let started = Instant::now();
        tracing::info!("Request pipeline starting: operation={:?}", self.operation);

        let stage_start = Instant::now();
        let parsed = self.parse(raw);
        self.record(Stage::Parse, stage_start, &parsed);
        let mut ctx = parsed?;

        ctx.current_stage = Some(Stage::Authorize);
        let stage_start = Instant::now();
        let authorized = self.authorize(&ctx);
        self.record(Stage::Authorize, stage_start, &authorized);
        authorized?;

        ctx.current_stage = Some(Stage::Validate);
        let stage_start = Instant::now();
        let validated = self.validate(&mut ctx);
        self.record(Stage::Validate, stage_start, &validated);
        validated?;

        ctx.current_stage = Some(Stage::Execute);
        let stage_start = Instant::now();
        let result = execute(ctx).await;
        self.record(Stage::Execute, stage_start, &result);

        tracing::info!(
            "Request pipeline finished: operation={:?}, ok={}, elapsed={:?}",
            self.operation,
            result.is_ok(),
            started.elapsed()
        );
        result
    }

    fn parse(&self, raw: RawRequest) -> Result<RequestContext, PipelineError> {
        let mut ctx = RequestContext::new(self.operation);
        ctx.current_stage = Some(Stage::Parse);
        ctx.id = raw.path_id;
        ctx.role = raw.role;
        ctx.content_type = raw.content_type;
        match parse_body(raw.body.as_deref()) {
            Ok(params) => ctx.params = params,
            Err(failure) => match self.body_policy {
                BodyPolicy::Strict => ctx.body_error = Some(failure),
                BodyPolicy::Lenient => {
                    tracing::debug!("Ignoring unparseable body for {:?}: {}", self.operation, failure);
                }
            },
        }
        Ok(ctx)
    }

    fn authorize(&self, ctx: &RequestContext) -> Result<(), PipelineError> {
        if self.roles.permits(ctx.role.as_deref()) {
            Ok(())
        } else {
            Err(PipelineError::Forbidden {
                operation: self.operation,
                role: ctx.role.clone(),
            })
        }
    }

    fn validate(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        if let Some(failure) = ctx.body_error.take() {
            return Err(PipelineError::MalformedBody(failure));
        }

        match &self.validator {
            Some(validator) => {
                tracing::trace!("Running validator '{}' for {:?}", validator.name(), self.operation);
                validator.validate(ctx)
            }
            None => {
                // Operations without a payload carry no parameters forward
                ctx.params.clear();
                Ok(())
            }
        }
    }

    fn record<T>(&self, stage: Stage, started: Instant, result: &Result<T, PipelineError>) {
        match result {
            Ok(_) => tracing::debug!(
                "Stage {:?} completed for {:?} in {:?}",
                stage,
                self.operation,
                started.elapsed()
            ),
            Err(error) => tracing::warn!(
                "Stage {:?} failed for {:?} in {:?}: {}",
                stage,
                self.operation,
                started.elapsed(),
                error
            ),
        }
    }
}

/// Absent or blank bodies are an empty mapping; anything else must be a JSON object
fn parse_body(body: Option<&[u8]>) -> Result<Map<String, Value>, String> {
    let body = match body {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
        _ => return Ok(Map::new()),
    };

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
