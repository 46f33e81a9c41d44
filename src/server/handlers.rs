//! HTTP API request handlers

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::PipelineError;
use crate::jobs::{JobRequest, RateLimiter, ResearchPipeline};
use crate::types::JobStatus;

use super::export;
use super::geo;
use super::types::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResearchPipeline>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    /// Resolve the client IP: socket peer, or the X-Forwarded-For head
    /// when proxy trust is enabled.
    fn client_ip(&self, addr: SocketAddr, headers: &HeaderMap) -> IpAddr {
        if self.config.server.trust_proxy {
            if let Some(forwarded) = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
            {
                return forwarded;
            }
        }
        addr.ip()
    }
}

/// Map a pipeline error to its HTTP response.
fn error_response(error: PipelineError) -> Response {
    let status = match &error {
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        PipelineError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let retry_after = match &error {
        PipelineError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
        _ => None,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.public_message(),
            retry_after,
        }),
    )
        .into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    error_response(PipelineError::InvalidInput(message.into()))
}

fn not_found() -> Response {
    error_response(PipelineError::NotFound)
}

fn parse_job_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| bad_request("job id is not a valid UUID"))
}

/// POST /api/research — create a research job
pub async fn create_research(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<ResearchRequest>,
) -> Response {
    let url = match Url::parse(request.url.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return bad_request("url must be a valid http(s) URL"),
    };

    let country = request
        .country
        .unwrap_or_else(|| geo::DEFAULT_COUNTRY.to_string());
    if country.is_empty() || !country.chars().all(|c| c.is_ascii_digit()) {
        return bad_request("country must be a numeric geo code");
    }

    let requested_language = request.language.clone();
    let resolved_language = geo::resolve_language(requested_language.as_deref(), &country);

    let mut options = match request
        .options
        .unwrap_or_default()
        .resolve(state.config.scraping.max_pages)
    {
        Ok(options) => options,
        Err(message) => return bad_request(message),
    };
    if options.use_ai && !state.pipeline.ai_available() {
        debug!("AI requested but not configured, continuing without it");
        options.use_ai = false;
    }

    let ip = state.client_ip(addr, &headers);
    if let Err(retry_after_secs) = state.limiter.check(ip) {
        return error_response(PipelineError::RateLimited { retry_after_secs });
    }

    let job_id = state.pipeline.start_job(JobRequest {
        url,
        country,
        requested_language,
        resolved_language,
        options,
        source_ip: Some(ip.to_string()),
    });

    (
        StatusCode::OK,
        Json(CreateResponse {
            job_id,
            status: "processing",
        }),
    )
        .into_response()
}

/// GET /api/research/:id — job status and results
pub async fn get_research(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_job_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.pipeline.store().get(&id) {
        Some(job) => (StatusCode::OK, Json(job)).into_response(),
        None => not_found(),
    }
}

/// DELETE /api/research/:id — cancel and remove a job
pub async fn delete_research(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_job_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if state.pipeline.store().delete(&id) {
        (
            StatusCode::OK,
            Json(DeleteResponse {
                message: "Job deleted",
                job_id: id,
            }),
        )
            .into_response()
    } else {
        not_found()
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

/// GET /api/research/:id/export?format=csv|json — download results
pub async fn export_research(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let id = match parse_job_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(job) = state.pipeline.store().get(&id) else {
        return not_found();
    };
    if job.status != JobStatus::Completed {
        return bad_request("Job is not completed");
    }
    let Some(data) = &job.data else {
        return bad_request("Job has no result data");
    };

    let format = query.format.as_deref().unwrap_or("json").to_lowercase();
    let (body, content_type, extension) = match format.as_str() {
        "csv" => (export::to_csv(data), "text/csv", "csv"),
        "json" => (export::to_json(data), "application/json", "json"),
        other => return bad_request(format!("invalid export format '{}'", other)),
    };

    let disposition = format!("attachment; filename=\"keyword-research-{}.{}\"", id, extension);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// GET /api/research/config/countries — supported markets
pub async fn list_countries() -> Response {
    (StatusCode::OK, Json(geo::COUNTRIES)).into_response()
}

/// GET /api/research/config/languages — supported languages
pub async fn list_languages() -> Response {
    (StatusCode::OK, Json(geo::LANGUAGES)).into_response()
}

/// GET /health — service readiness
pub async fn health(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_seconds: state.started_at.elapsed().as_secs(),
            services: ServiceStatus {
                metrics: !state.config.services.metrics.base_url.is_empty(),
                ai: state.config.services.ai.is_configured(),
            },
        }),
    )
        .into_response()
}
