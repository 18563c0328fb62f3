//! Axum middleware applying [`Gatekeeper`] decisions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::gate::pipeline::Gatekeeper;
use crate::observability::metrics;
use crate::security::Decision;

/// Runs the pipeline, then either forwards the request or answers it directly.
///
/// Forwarded requests carry a [`GateContext`](crate::gate::GateContext) and,
/// when signed in, the [`Identity`](crate::session::Identity) in their
/// extensions.
pub async fn gatekeeper_middleware(
    State(gate): State<Arc<Gatekeeper>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let (mut parts, body) = request.into_parts();
    let admission = gate.admit(&parts, peer).await;

    let mut response = match &admission.decision {
        Decision::Allow => {
            parts.extensions.insert(admission.context());
            if let Some(identity) = admission.identity.clone() {
                parts.extensions.insert(identity);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        Decision::Redirect(target) => Redirect::temporary(target).into_response(),
        Decision::Reject(err) => err.into_response(),
    };

    admission.apply_headers(response.headers_mut());

    let surface = admission.surface().as_str();
    metrics::record_decision(admission.decision.label(), surface);
    metrics::record_request(response.status().as_u16(), surface, start);
    response
}
