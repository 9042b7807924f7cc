use axum::{body::Bytes, extract::State, http::HeaderMap, Extension};
use serde_json::Value;

use crate::app::AppState;
use crate::handlers::raw_request;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::request::{FieldRule, Mode, Operation, PipelineError, RequestContext, Schema};

fn schema() -> Schema {
    Schema::new(Mode::FailFast)
        .field(FieldRule::string("code").trim().required())
        .field(FieldRule::string("email").email().min(5).required())
}

/// POST /auth/confirm
pub async fn confirm(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    state
        .pipeline(Operation::ConfirmSignUp)
        .with_schema(schema())
        .run(raw_request(caller, &headers, body), |ctx| execute(&state, ctx))
        .await?;

    Ok(ApiResponse::message("Sign Up Success"))
}

async fn execute(state: &AppState, ctx: RequestContext) -> Result<(), PipelineError> {
    let code = ctx.str_param("code").unwrap_or_default();
    let email = ctx.str_param("email").unwrap_or_default();

    state
        .identity
        .confirm_sign_up(code, email)
        .await
        .map_err(|e| PipelineError::identity(Operation::ConfirmSignUp, e))
}
