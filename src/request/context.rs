use axum::body::Bytes;
use serde_json::{Map, Number, Value};

use crate::request::stage::{Operation, Stage};

/// Unparsed request inputs as handed over by the HTTP layer
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub body: Option<Bytes>,
    pub path_id: Option<String>,
    pub role: Option<String>,
    pub content_type: Option<String>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_path_id(mut self, id: impl Into<String>) -> Self {
        self.path_id = Some(id.into());
        self
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = role;
        self
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }
}

/// Parsed request state that flows through the pipeline stages
#[derive(Debug)]
pub struct RequestContext {
    pub operation: Operation,
    pub id: Option<String>,
    pub role: Option<String>,
    pub content_type: Option<String>,

    // Parsed body until Validate runs, validated/transformed params afterwards
    pub params: Map<String, Value>,

    /// Strict-policy parse failure, raised once the caller is authorized
    pub body_error: Option<String>,

    pub current_stage: Option<Stage>,
}

impl RequestContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            id: None,
            role: None,
            content_type: None,
            params: Map::new(),
            body_error: None,
            current_stage: None,
        }
    }

    /// Path id, or the empty string when the route carried none
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Validated string parameter
    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// Validated numeric parameter, as submitted
    pub fn number_param(&self, name: &str) -> Option<&Number> {
        match self.params.get(name) {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        }
    }
}
