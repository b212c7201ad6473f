//! Administrative listener: redirect rule management and the content
//! inventory write surface.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::{
    application::{
        content::ContentService,
        error::HttpError,
        repos::UpsertContentItemParams,
        rules::{RuleService, RuleSubmission, RuleWriteError},
    },
    domain::entities::{ContentItemRecord, RedirectRuleRecord},
    domain::types::ContentStatus,
    infra::db::PostgresRepositories,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
    repo_error_to_http,
};

#[derive(Clone)]
pub struct AdminState {
    pub rules: Arc<RuleService>,
    pub content: Arc<ContentService>,
    pub db: Option<Arc<PostgresRepositories>>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/v1/redirects", get(list_rules).post(create_rule))
        .route("/api/v1/redirects/lookup", get(lookup_rule))
        .route("/api/v1/redirects/{id}", axum::routing::delete(delete_rule))
        .route("/api/v1/content/{id}", put(upsert_content).delete(delete_content))
        .route("/_health/db", get(admin_health))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct RuleView {
    id: i64,
    source: String,
    destination: Option<String>,
    status_code: u16,
    is_regex: bool,
    hit_count: i64,
    created_at: String,
}

impl From<RedirectRuleRecord> for RuleView {
    fn from(record: RedirectRuleRecord) -> Self {
        Self {
            id: record.id,
            source: record.source,
            destination: record.destination,
            status_code: record.status.as_code(),
            is_regex: record.is_regex,
            hit_count: record.hit_count,
            created_at: iso_timestamp(record.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct ContentItemView {
    id: Uuid,
    content_type: String,
    address: String,
    status: ContentStatus,
    noindex: bool,
    created_at: String,
    updated_at: String,
}

impl From<ContentItemRecord> for ContentItemView {
    fn from(record: ContentItemRecord) -> Self {
        Self {
            id: record.id,
            content_type: record.content_type,
            address: record.address,
            status: record.status,
            noindex: record.noindex,
            created_at: iso_timestamp(record.created_at),
            updated_at: iso_timestamp(record.updated_at),
        }
    }
}

fn iso_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct CreateRuleBody {
    source: String,
    destination: Option<String>,
    status_code: u16,
    #[serde(default)]
    is_regex: bool,
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    source: String,
}

#[derive(Debug, Deserialize)]
struct UpsertContentBody {
    content_type: String,
    address: String,
    status: ContentStatus,
    #[serde(default)]
    noindex: bool,
}

async fn list_rules(State(state): State<AdminState>) -> Result<Json<Vec<RuleView>>, HttpError> {
    let rules = state
        .rules
        .list_rules()
        .await
        .map_err(|err| repo_error_to_http("infra::http::admin::list_rules", err))?;
    Ok(Json(rules.into_iter().map(RuleView::from).collect()))
}

async fn create_rule(
    State(state): State<AdminState>,
    Json(body): Json<CreateRuleBody>,
) -> Result<(StatusCode, Json<RuleView>), HttpError> {
    let submission = RuleSubmission {
        source: body.source,
        destination: body.destination,
        status_code: body.status_code,
        is_regex: body.is_regex,
    };

    match state.rules.add_rule(submission).await {
        Ok(record) => Ok((StatusCode::CREATED, Json(RuleView::from(record)))),
        Err(RuleWriteError::Validation(err)) => Err(HttpError::new(
            "infra::http::admin::create_rule",
            StatusCode::UNPROCESSABLE_ENTITY,
            "Rule validation failed",
            err.to_string(),
        )),
        Err(RuleWriteError::Repo(err)) => {
            Err(repo_error_to_http("infra::http::admin::create_rule", err))
        }
    }
}

async fn delete_rule(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    let deleted = state
        .rules
        .delete_rule(id)
        .await
        .map_err(|err| repo_error_to_http("infra::http::admin::delete_rule", err))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HttpError::new(
            "infra::http::admin::delete_rule",
            StatusCode::NOT_FOUND,
            "Rule not found",
            format!("no redirect rule with id {id}"),
        ))
    }
}

async fn lookup_rule(
    State(state): State<AdminState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<RuleView>, HttpError> {
    let rule = state
        .rules
        .find_by_source(&query.source)
        .await
        .map_err(|err| repo_error_to_http("infra::http::admin::lookup_rule", err))?;

    match rule {
        Some(rule) => Ok(Json(RuleView::from(rule))),
        None => Err(HttpError::new(
            "infra::http::admin::lookup_rule",
            StatusCode::NOT_FOUND,
            "Rule not found",
            format!("no redirect rule for source `{}`", query.source),
        )),
    }
}

async fn upsert_content(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpsertContentBody>,
) -> Result<Json<ContentItemView>, HttpError> {
    let record = state
        .content
        .upsert(UpsertContentItemParams {
            id,
            content_type: body.content_type,
            address: body.address,
            status: body.status,
            noindex: body.noindex,
        })
        .await
        .map_err(|err| repo_error_to_http("infra::http::admin::upsert_content", err))?;

    Ok(Json(ContentItemView::from(record)))
}

async fn delete_content(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    let deleted = state
        .content
        .delete(id)
        .await
        .map_err(|err| repo_error_to_http("infra::http::admin::delete_content", err))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HttpError::new(
            "infra::http::admin::delete_content",
            StatusCode::NOT_FOUND,
            "Content item not found",
            format!("no content item with id {id}"),
        ))
    }
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    match state.db.as_ref() {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
