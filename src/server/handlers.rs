//! Request handlers

use super::ServerState;
use crate::reconcile::ReconcileError;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    pub asn: Option<String>,
}

/// On-demand reconciliation: `/update?asn=ASxxxxx`
///
/// The run itself is blocking (HTTP fetch plus SQLite writes), so it is
/// moved off the async workers.
pub async fn update_handler(
    State(state): State<ServerState>,
    query: Option<Query<UpdateQuery>>,
) -> Response {
    let asn = match query.and_then(|Query(q)| q.asn) {
        Some(asn) if !asn.is_empty() => asn,
        _ => return (StatusCode::BAD_REQUEST, "Missing ?asn=ASxxxxx").into_response(),
    };

    info!("[HTTP] Manual update for ASN: {}", asn);

    let runner = state.runner.clone();
    let outcome = tokio::task::spawn_blocking(move || runner.run(&asn)).await;

    match outcome {
        Ok(Ok(result)) => match serde_json::to_string_pretty(&result) {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
        },
        Ok(Err(e @ ReconcileError::Busy(_))) => {
            warn!("[HTTP] {}", e);
            error_response(StatusCode::CONFLICT, e)
        }
        Ok(Err(e)) => {
            error!("[HTTP] Update failed ({}): {}", e.kind(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
        Err(e) => {
            error!("[HTTP] Update task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

fn error_response(status: StatusCode, e: impl std::fmt::Display) -> Response {
    (status, format!("Error: {}", e)).into_response()
}

/// Health check handler
pub async fn health_handler() -> &'static str {
    "OK"
}

pub async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

#[cfg(test)]
mod tests {
    use crate::config::PfxsyncConfig;
    use crate::dataset::DatasetId;
    use crate::fetcher::{PrefixSource, StaticSource};
    use crate::reconcile::{ReconcileError, SyncRunner};
    use crate::server::{create_axum_router, ServerState};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct UnreachableSource;

    impl PrefixSource for UnreachableSource {
        fn fetch_current_prefixes(
            &self,
            dataset: &DatasetId,
        ) -> Result<Vec<String>, ReconcileError> {
            Err(ReconcileError::FetchFailed {
                identifier: dataset.to_string(),
                status: "502 Bad Gateway".to_string(),
            })
        }
    }

    fn runner_with(dir: &tempfile::TempDir, source: Arc<dyn PrefixSource>) -> SyncRunner {
        let config = PfxsyncConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            schedule_interval_secs: 0,
            ..PfxsyncConfig::default()
        };
        SyncRunner::with_source(config, source)
    }

    fn app(runner: SyncRunner) -> Router {
        create_axum_router(ServerState::new(runner))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_update_success() {
        let dir = tempfile::tempdir().unwrap();
        let source = StaticSource::new(vec![
            "192.0.2.0/24".to_string(),
            "2001:db8::/32".to_string(),
        ]);
        let runner = runner_with(&dir, Arc::new(source));

        let (status, content_type, body) = call(app(runner), "/update?asn=AS14593").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["asn"], "AS14593");
        assert_eq!(json["count"], 2);
        // pretty-printed
        assert!(body.contains('\n'));
    }

    #[tokio::test]
    async fn test_update_missing_asn() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with(&dir, Arc::new(StaticSource::default()));

        for uri in ["/update", "/update?asn=", "/update?other=1"] {
            let (status, _, body) = call(app(runner.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, "Missing ?asn=ASxxxxx");
        }
    }

    #[tokio::test]
    async fn test_update_invalid_asn() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with(&dir, Arc::new(StaticSource::default()));

        let (status, _, body) = call(app(runner), "/update?asn=as14593").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error: Invalid ASN format: as14593");
    }

    #[tokio::test]
    async fn test_update_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with(&dir, Arc::new(UnreachableSource));

        let (status, _, body) = call(app(runner), "/update?asn=AS14593").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with("Error: Failed to fetch AS14593"));
    }

    #[tokio::test]
    async fn test_update_busy() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with(&dir, Arc::new(StaticSource::default()));
        let id = DatasetId::parse("AS14593").unwrap();
        let _held = runner.locks().try_acquire(&id).unwrap();

        let (status, _, body) = call(app(runner.clone()), "/update?asn=AS14593").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("already running"));
    }

    #[tokio::test]
    async fn test_other_paths_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with(&dir, Arc::new(StaticSource::default()));

        for uri in ["/", "/updates", "/update/AS14593"] {
            let (status, _, body) = call(app(runner.clone()), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, "Not found");
        }
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with(&dir, Arc::new(StaticSource::default()));

        let (status, _, body) = call(app(runner), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
