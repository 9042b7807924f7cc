use axum::{body::Bytes, extract::State, http::HeaderMap, Extension};

use crate::app::AppState;
use crate::handlers::raw_request;
use crate::identity::AuthTokens;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::request::{FieldRule, Mode, Operation, PipelineError, RequestContext, Schema};

fn schema() -> Schema {
    Schema::new(Mode::CollectAll)
        .field(FieldRule::string("email").trim().email().min(5).required())
        .field(FieldRule::string("password").trim().min(8).max(30).required())
}

/// POST /auth/login - returns `{idToken, accessToken, refreshToken}`
pub async fn login(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<AuthTokens> {
    let tokens = state
        .pipeline(Operation::Login)
        .with_schema(schema())
        .run(raw_request(caller, &headers, body), |ctx| execute(&state, ctx))
        .await?;

    Ok(ApiResponse::success(tokens))
}

async fn execute(state: &AppState, ctx: RequestContext) -> Result<AuthTokens, PipelineError> {
    let email = ctx.str_param("email").unwrap_or_default();
    let password = ctx.str_param("password").unwrap_or_default();

    state
        .identity
        .initiate_auth(email, password)
        .await
        .map_err(|e| PipelineError::identity(Operation::Login, e))
}
