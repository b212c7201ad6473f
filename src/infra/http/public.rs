//! Public listener: the redirect front layer and the sitemap/robots routes.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, Request, StatusCode,
        header::{AGE, CACHE_CONTROL, CONTENT_TYPE, LAST_MODIFIED, LOCATION},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use tracing::warn;

use crate::{
    application::{
        error::HttpError,
        resolver::{RedirectAction, RedirectResolver},
        sitemap::SitemapService,
    },
    cache::{CachedSitemaps, ServedDocument, SitemapKey},
    infra::db::PostgresRepositories,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

const HTTP_DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

#[derive(Clone)]
pub struct PublicState {
    pub resolver: Arc<RedirectResolver>,
    pub sitemaps: Arc<CachedSitemaps>,
    pub sitemap_service: Arc<SitemapService>,
    pub sitemap_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub db: Option<Arc<PostgresRepositories>>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/sitemap.xml", get(sitemap_index))
        .route("/sitemaps/{file}", get(sitemap_page))
        .route("/robots.txt", get(robots_txt))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            redirect_layer,
        ))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

/// The front-controller hook: resolve every inbound path against the rule
/// store before any route handling. A match short-circuits the request; a
/// `NoMatch` falls through to normal routing.
async fn redirect_layer(
    State(state): State<PublicState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match state.resolver.resolve(&path).await {
        RedirectAction::Redirect {
            destination,
            status,
        } => {
            let status = StatusCode::from_u16(status.as_code())
                .unwrap_or(StatusCode::MOVED_PERMANENTLY);
            match HeaderValue::from_str(&destination) {
                Ok(location) => {
                    let mut response = status.into_response();
                    response.headers_mut().insert(LOCATION, location);
                    response
                }
                Err(_) => {
                    warn!(
                        target = "infra::http::redirect_layer",
                        path = %path,
                        destination = %destination,
                        "rule destination is not a valid header value, passing through"
                    );
                    next.run(request).await
                }
            }
        }
        // 410: empty body, no destination, no further processing.
        RedirectAction::Gone => StatusCode::GONE.into_response(),
        RedirectAction::NoMatch => next.run(request).await,
    }
}

async fn sitemap_index(State(state): State<PublicState>) -> Response {
    if !state.sitemap_enabled {
        return sitemap_disabled_response();
    }
    serve_document(&state, SitemapKey::index()).await
}

async fn sitemap_page(State(state): State<PublicState>, Path(file): Path<String>) -> Response {
    if !state.sitemap_enabled {
        return sitemap_disabled_response();
    }

    match parse_sitemap_filename(&file) {
        Some((content_type, page)) => {
            serve_document(&state, SitemapKey::for_type(content_type, page)).await
        }
        None => HttpError::new(
            "infra::http::public::sitemap_page",
            StatusCode::NOT_FOUND,
            "Sitemap not found",
            format!("`{file}` is not a sitemap file name"),
        )
        .into_response(),
    }
}

async fn serve_document(state: &PublicState, key: SitemapKey) -> Response {
    match state.sitemaps.read(&key).await {
        Ok(Some(served)) => sitemap_response(served, state.cache_ttl_seconds),
        Ok(None) => HttpError::new(
            "infra::http::public::serve_document",
            StatusCode::NOT_FOUND,
            "Sitemap not found",
            format!("no eligible content for sitemap key `{key}`"),
        )
        .into_response(),
        Err(err) => HttpError::new(
            "infra::http::public::serve_document",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate sitemap",
            err.to_string(),
        )
        .into_response(),
    }
}

async fn robots_txt(State(state): State<PublicState>) -> Response {
    let body = if state.sitemap_enabled {
        state.sitemap_service.robots_txt()
    } else {
        "User-agent: *\nAllow: /\n".to_string()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn public_health(State(state): State<PublicState>) -> Response {
    match state.db.as_ref() {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// No rule matched and no route handled the path; content rendering belongs
/// to the host application, so this service answers plainly.
async fn fallback() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn sitemap_disabled_response() -> Response {
    HttpError::new(
        "infra::http::public::sitemap",
        StatusCode::NOT_FOUND,
        "Sitemap not found",
        "sitemaps are disabled in configuration",
    )
    .into_response()
}

fn sitemap_response(served: ServedDocument, ttl_seconds: u64) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/xml; charset=utf-8")
        .header(CACHE_CONTROL, format!("public, max-age={ttl_seconds}"));

    let age = (OffsetDateTime::now_utc() - served.document.generated_at)
        .whole_seconds()
        .max(0);
    builder = builder.header(AGE, age.to_string());

    if let Some(last_modified) = served
        .document
        .last_modified
        .and_then(|ts| format_http_date(ts))
    {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }

    builder
        .body(Body::from(served.document.xml))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn format_http_date(ts: OffsetDateTime) -> Option<String> {
    ts.to_offset(UtcOffset::UTC).format(HTTP_DATE_FORMAT).ok()
}

/// Split a sitemap file name into its content type and 1-based page number.
///
/// `posts.xml` is page 1 of `posts`; `posts-2.xml` is page 2. A trailing
/// `-<digits>` only counts as a page number when the digits parse, so a type
/// whose name happens to contain dashes still resolves.
fn parse_sitemap_filename(file: &str) -> Option<(String, u32)> {
    let stem = file.strip_suffix(".xml")?;
    if stem.is_empty() {
        return None;
    }

    if let Some((content_type, digits)) = stem.rsplit_once('-')
        && !content_type.is_empty()
        && let Ok(page) = digits.parse::<u32>()
    {
        return Some((content_type.to_string(), page));
    }

    Some((stem.to_string(), 1))
}
