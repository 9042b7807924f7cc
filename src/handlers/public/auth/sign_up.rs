use axum::{body::Bytes, extract::State, http::HeaderMap, Extension};
use serde_json::Value;

use crate::app::AppState;
use crate::auth::ROLE_CLAIM;
use crate::handlers::raw_request;
use crate::identity::UserAttribute;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::request::{FieldRule, Mode, Operation, PipelineError, RequestContext, Schema};

/// Role given to every self-registered account
const DEFAULT_ROLE: &str = "user";

fn schema() -> Schema {
    Schema::new(Mode::CollectAll)
        .field(FieldRule::string("email").email().min(8).required())
        .field(FieldRule::string("password").trim().min(8).max(30).required())
}

/// POST /auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    state
        .pipeline(Operation::SignUp)
        .with_schema(schema())
        .run(raw_request(caller, &headers, body), |ctx| execute(&state, ctx))
        .await?;

    Ok(ApiResponse::message("Confirm code to Sign Up"))
}

async fn execute(state: &AppState, ctx: RequestContext) -> Result<(), PipelineError> {
    let email = ctx.str_param("email").unwrap_or_default();
    let password = ctx.str_param("password").unwrap_or_default();
    let attributes = [
        UserAttribute::new("email", email),
        UserAttribute::new(ROLE_CLAIM, DEFAULT_ROLE),
    ];

    state
        .identity
        .sign_up(email, password, &attributes)
        .await
        .map_err(|e| PipelineError::identity(Operation::SignUp, e))
}
