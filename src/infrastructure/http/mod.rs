//! HTTP layer built on Axum.
//!
//! Serves the fixed [`routes::ROUTES`] table. Each route is wrapped in its own
//! admission middleware holding its own [`Limiter`], so a client's credits on
//! one route never affect another route.

/// Admission middleware and the 429 response.
pub mod admission;
/// API error types mapped to HTTP status codes.
pub mod errors;
/// Fixed route table and SQL text.
pub mod routes;

use crate::application::limiter::{BuildError, Limiter, DEFAULT_MAX_CLIENTS};
use crate::application::ports::{Clock, RowSource};
use crate::domain::policy::BucketPolicy;
use crate::infrastructure::clock::SystemClock;
use admission::admission_middleware;
use axum::extract::State;
use axum::routing::{get, MethodRouter};
use axum::{middleware, Json, Router};
use errors::ApiError;
use routes::{Route, RouteKind, ROUTES};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database collaborator
    pub rows: Arc<dyn RowSource>,
}

impl AppState {
    /// Create handler state around a row source.
    pub fn new(rows: Arc<dyn RowSource>) -> Self {
        Self { rows }
    }
}

/// Parameters applied to every route limiter.
#[derive(Debug, Clone)]
pub struct LimiterSettings {
    /// Bucket policy for each route
    pub policy: BucketPolicy,
    /// Client limit per route, `None` for unbounded
    pub max_clients: Option<usize>,
    /// Time source shared by all limiters
    pub clock: Arc<dyn Clock>,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            policy: BucketPolicy::default(),
            max_clients: Some(DEFAULT_MAX_CLIENTS),
            clock: Arc::new(SystemClock::new()),
        }
    }
}

/// One independent limiter per route.
#[derive(Debug, Clone)]
pub struct RouteLimiters {
    entries: Vec<(&'static Route, Limiter)>,
}

impl RouteLimiters {
    /// Build a limiter for every route of [`ROUTES`].
    ///
    /// # Errors
    /// Returns [`BuildError`] if the settings are invalid.
    pub fn build(settings: &LimiterSettings) -> Result<Self, BuildError> {
        let entries = ROUTES
            .iter()
            .map(|route| {
                let builder = Limiter::builder()
                    .with_name(route.path)
                    .with_policy(settings.policy)
                    .with_clock(Arc::clone(&settings.clock));
                let builder = match settings.max_clients {
                    Some(max_clients) => builder.with_max_clients(max_clients),
                    None => builder.with_unlimited_clients(),
                };
                builder.build().map(|limiter| (route, limiter))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// Clones of every limiter, in route order.
    pub fn limiters(&self) -> Vec<Limiter> {
        self.entries.iter().map(|(_, limiter)| limiter.clone()).collect()
    }

    /// Iterate over routes and their limiters.
    pub fn iter(&self) -> impl Iterator<Item = (&'static Route, &Limiter)> {
        self.entries.iter().map(|(route, limiter)| (*route, limiter))
    }
}

/// Builds the router with every route behind its limiter.
///
/// The server must be run with
/// `into_make_service_with_connect_info::<SocketAddr>()`: the admission
/// middleware keys clients by peer address.
pub fn create_router(state: AppState, limiters: &RouteLimiters) -> Router {
    let mut router = Router::new();

    for (route, limiter) in limiters.iter() {
        let gate = middleware::from_fn_with_state(limiter.clone(), admission_middleware);
        router = router.route(route.path, handler_for(route.kind).route_layer(gate));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handler_for(kind: RouteKind) -> MethodRouter<AppState> {
    match kind {
        RouteKind::Text(body) => get(move || async move { body }),
        RouteKind::Query(sql) => {
            get(move |State(state): State<AppState>| async move { run_query(&state, sql).await })
        }
    }
}

async fn run_query(state: &AppState, sql: &'static str) -> Result<Json<Vec<Value>>, ApiError> {
    let rows = state.rows.fetch_rows(sql).await?;
    Ok(Json(rows))
}
