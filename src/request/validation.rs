// Payload validation for the Validate stage.
//
// A `Schema` checks a parsed body against field rules and produces the transformed
// parameter set (trimmed strings, numbers coerced from numeric strings). Unknown keys
// are violations. Messages follow the `"field" ...` phrasing clients already parse.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::request::context::RequestContext;
use crate::request::error::PipelineError;

/// How many violations a schema reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Stop at the first violation
    FailFast,
    /// Report every violation
    CollectAll,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
    pub rule: &'static str,
}

impl Violation {
    fn new(field: &str, message: String, rule: &'static str) -> Self {
        Self {
            field: field.to_string(),
            message,
            rule,
        }
    }
}

/// Ordered list of violations found in one payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Violation> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|v| v.message.as_str()).collect();
        f.write_str(&messages.join(". "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Number,
}

/// Constraints on one body field
#[derive(Debug, Clone)]
pub struct FieldRule {
    name: &'static str,
    kind: Kind,
    required: bool,
    trim: bool,
    email: bool,
    min: Option<usize>,
    max: Option<usize>,
}

impl FieldRule {
    pub fn string(name: &'static str) -> Self {
        Self::of(name, Kind::String)
    }

    pub fn number(name: &'static str) -> Self {
        Self::of(name, Kind::Number)
    }

    fn of(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: false,
            trim: false,
            email: false,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn email(mut self) -> Self {
        self.email = true;
        self
    }

    /// Minimum length in characters
    pub fn min(mut self, len: usize) -> Self {
        self.min = Some(len);
        self
    }

    /// Maximum length in characters
    pub fn max(mut self, len: usize) -> Self {
        self.max = Some(len);
        self
    }

    /// Check one present value, pushing violations and returning the transformed value
    fn check(&self, value: &Value, mode: Mode, out: &mut Vec<Violation>) -> Option<Value> {
        match self.kind {
            Kind::String => self.check_string(value, mode, out),
            Kind::Number => self.check_number(value, out),
        }
    }

    fn check_string(&self, value: &Value, mode: Mode, out: &mut Vec<Violation>) -> Option<Value> {
        let name = self.name;
        let Value::String(raw) = value else {
            out.push(Violation::new(name, format!("\"{}\" must be a string", name), "string.base"));
            return None;
        };

        let text = if self.trim { raw.trim() } else { raw.as_str() };
        if text.is_empty() {
            out.push(Violation::new(
                name,
                format!("\"{}\" is not allowed to be empty", name),
                "string.empty",
            ));
            return None;
        }

        let before = out.len();
        let chars = text.chars().count();
        if let Some(min) = self.min {
            if chars < min {
                out.push(Violation::new(
                    name,
                    format!("\"{}\" length must be at least {} characters long", name, min),
                    "string.min",
                ));
            }
        }
        if let Some(max) = self.max {
            if chars > max && !(mode == Mode::FailFast && out.len() > before) {
                out.push(Violation::new(
                    name,
                    format!("\"{}\" length must be less than or equal to {} characters long", name, max),
                    "string.max",
                ));
            }
        }
        if self.email && !is_email(text) && !(mode == Mode::FailFast && out.len() > before) {
            out.push(Violation::new(name, format!("\"{}\" must be a valid email", name), "string.email"));
        }

        (out.len() == before).then(|| Value::String(text.to_string()))
    }

    fn check_number(&self, value: &Value, out: &mut Vec<Violation>) -> Option<Value> {
        let coerced = match value {
            Value::Number(n) => Some(n.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .and_then(Number::from_f64),
            _ => None,
        };

        match coerced {
            Some(n) => Some(Value::Number(n)),
            None => {
                out.push(Violation::new(
                    self.name,
                    format!("\"{}\" must be a number", self.name),
                    "number.base",
                ));
                None
            }
        }
    }
}

fn is_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| !label.is_empty())
        && labels.last().is_some_and(|tld| tld.len() >= 2)
}

/// A field list plus reporting mode
#[derive(Debug, Clone)]
pub struct Schema {
    mode: Mode,
    fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Validate a body, returning only the declared fields in transformed form
    pub fn validate(&self, body: &Map<String, Value>) -> Result<Map<String, Value>, Violations> {
        let mut violations = Vec::new();
        let mut params = Map::new();

        for rule in &self.fields {
            match body.get(rule.name) {
                None => {
                    if rule.required {
                        violations.push(Violation::new(
                            rule.name,
                            format!("\"{}\" is required", rule.name),
                            "any.required",
                        ));
                    }
                }
                Some(value) => {
                    if let Some(value) = rule.check(value, self.mode, &mut violations) {
                        params.insert(rule.name.to_string(), value);
                    }
                }
            }

            if self.mode == Mode::FailFast && !violations.is_empty() {
                violations.truncate(1);
                return Err(Violations(violations));
            }
        }

        for key in body.keys() {
            if !self.fields.iter().any(|rule| rule.name == key) {
                violations.push(Violation::new(key, format!("\"{}\" is not allowed", key), "object.unknown"));
                if self.mode == Mode::FailFast {
                    break;
                }
            }
        }

        if violations.is_empty() {
            Ok(params)
        } else {
            Err(Violations(violations))
        }
    }
}

/// A check run during the Validate stage
pub trait PayloadValidator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Replace `ctx.params` with validated parameters or fail
    fn validate(&self, ctx: &mut RequestContext) -> Result<(), PipelineError>;
}

impl PayloadValidator for Schema {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        ctx.params = Schema::validate(self, &ctx.params).map_err(PipelineError::Validation)?;
        Ok(())
    }
}

/// Accepts only PNG or JPEG upload content types.
///
/// Produces `content_type` and `image_extension` params.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageContentType;

impl ImageContentType {
    /// File extension for a supported content type header
    pub fn extension_for(content_type: &str) -> Option<&'static str> {
        let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some("png"),
            "image/jpeg" => Some("jpg"),
            _ => None,
        }
    }
}

impl PayloadValidator for ImageContentType {
    fn name(&self) -> &'static str {
        "image_content_type"
    }

    fn validate(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        let content_type = ctx.content_type.as_deref().unwrap_or("");
        let extension = Self::extension_for(content_type)
            .ok_or_else(|| PipelineError::InvalidInput("Invalid Image Type".to_string()))?;

        let mut params = Map::new();
        params.insert("content_type".into(), Value::String(content_type.to_string()));
        params.insert("image_extension".into(), Value::String(extension.to_string()));
        ctx.params = params;
        Ok(())
    }
}
