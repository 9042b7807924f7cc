// handlers/mod.rs - handler tiers
//
// Public (account endpoints, open to anonymous callers) -> Protected (catalog operations,
// role checked per operation) -> Elevated (administrative maintenance). Every tier runs
// through the request pipeline; the tier only reflects the default access policy.
//
// Signed object storage requests are authorized by their URL signature instead.

pub mod elevated;
pub mod protected;
pub mod public;
pub mod storage;

use axum::body::Bytes;
use axum::http::{header, HeaderMap};

use crate::middleware::Caller;
use crate::request::RawRequest;

/// Raw pipeline input from the pieces every handler extracts
pub(crate) fn raw_request(caller: Caller, headers: &HeaderMap, body: Bytes) -> RawRequest {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    RawRequest::new()
        .with_body(body)
        .with_role(caller.role)
        .with_content_type(content_type)
}
