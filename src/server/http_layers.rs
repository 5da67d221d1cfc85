//! Request logging middleware

use std::time::Instant;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::IntoResponse,
};
use tracing::debug;

pub async fn log_requests(request: Request<Body>, next: Next) -> impl IntoResponse {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    debug!(
        "{} {} -> {} ({}ms)",
        method,
        path,
        response.status(),
        start.elapsed().as_millis()
    );

    response
}
