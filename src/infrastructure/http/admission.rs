//! Admission middleware.
//!
//! Runs before the route handler: resolves the client from the peer address,
//! asks the route's [`Limiter`] for a decision, and either forwards the
//! request or answers 429 without touching the handler.

use crate::application::limiter::Limiter;
use crate::domain::{bucket::Admission, client::ClientId};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::time::Duration;

/// Plain-text body of a 429 response.
pub const REJECTION_BODY: &str = "Client rate limit exceeded";

/// Gate a request on the route's limiter.
pub async fn admission_middleware(
    State(limiter): State<Limiter>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let client = ClientId::from_ip(peer.ip());

    match limiter.check(&client) {
        Admission::Admit => next.run(req).await,
        Admission::Reject { retry_after } => rejection_response(retry_after),
    }
}

/// Build the 429 response, with `Retry-After` in whole seconds (at least 1).
pub fn rejection_response(retry_after: Duration) -> Response {
    let seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;
    let mut response = (StatusCode::TOO_MANY_REQUESTS, REJECTION_BODY).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
    response
}
