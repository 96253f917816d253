use std::time::Instant;

use axum::{
    body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::api::state::ProductMiss;

const PRODUCT_ROUTE_PREFIX: &str = "/api/v1/product/";

/// City addressed by a product route, if the path names one.
fn product_city(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(PRODUCT_ROUTE_PREFIX)?;
    let city = rest.strip_suffix("/readonly").unwrap_or(rest);
    (!city.is_empty() && !city.contains('/')).then_some(city)
}

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let city = product_city(uri.path()).unwrap_or("");

    if let Some(miss) = response.extensions().get::<ProductMiss>() {
        info!(
            target = "product_cache::http::response",
            status = status.as_u16(),
            method = %method,
            route = %route,
            city = city,
            not_found_policy = miss.policy.as_str(),
            request_id = request_id,
            "product not found",
        );
    }

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "product_cache::http::response",
                status = status.as_u16(),
                method = %method,
                route = %route,
                city = city,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "product_cache::http::response",
                status = status.as_u16(),
                method = %method,
                route = %route,
                city = city,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}
