use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, pipeline};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Pipeline
        .route("/pipeline/status", get(pipeline::get_status))
        // Prometheus
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use tubecast_core::{
        media::MediaPaths,
        pipeline::{Collaborators, PipelineDispatcher},
        testing::{MockConverter, MockDownloader, MockMessaging, MockUploader},
        Config,
    };

    struct TestFixture {
        router: Router,
        dispatcher: Arc<PipelineDispatcher>,
        _temp_dir: TempDir,
    }

    impl TestFixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let mut config = Config::default();
            config.telegram.token = "123:secret".to_string();
            config.pipeline.temp_dir = temp_dir.path().to_path_buf();

            let paths = MediaPaths::new(temp_dir.path());
            let collaborators = Collaborators {
                downloader: Arc::new(MockDownloader::new(paths.clone())),
                converter: Arc::new(MockConverter::new(paths)),
                uploader: Some(Arc::new(MockUploader::new())),
                messaging: Arc::new(MockMessaging::new()),
            };
            let dispatcher = Arc::new(PipelineDispatcher::new(
                config.pipeline_config(),
                collaborators,
            ));
            let state = Arc::new(AppState::new(config, Arc::clone(&dispatcher)));

            Self {
                router: create_router(state),
                dispatcher,
                _temp_dir: temp_dir,
            }
        }

        async fn get(&self, path: &str) -> (StatusCode, String) {
            let request = Request::builder()
                .uri(path)
                .body(Body::empty())
                .unwrap();
            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("Failed to send request");

            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .expect("Failed to collect body")
                .to_bytes();
            (status, String::from_utf8_lossy(&bytes).to_string())
        }

        async fn get_json(&self, path: &str) -> (StatusCode, Value) {
            let (status, body) = self.get(path).await;
            (status, serde_json::from_str(&body).unwrap_or(Value::Null))
        }
    }

    #[tokio::test]
    async fn test_health() {
        let fixture = TestFixture::new();
        let (status, body) = fixture.get_json("/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_config_is_sanitized() {
        let fixture = TestFixture::new();
        let (status, body) = fixture.get("/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("123:secret"));

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["telegram"]["token_configured"], true);
        assert_eq!(json["archive"]["enabled"], false);
        assert_eq!(json["pipeline"]["fetch_workers"], 5);
    }

    #[tokio::test]
    async fn test_pipeline_status() {
        let fixture = TestFixture::new();

        let (_, body) = fixture.get_json("/api/v1/pipeline/status").await;
        assert_eq!(body["running"], false);
        assert_eq!(body["message"], "Pipeline is stopped");

        fixture.dispatcher.start(3, 1, 2).await.unwrap();
        let (status, body) = fixture.get_json("/api/v1/pipeline/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["running"], true);
        assert_eq!(body["archive_enabled"], false);

        let pools = body["pools"].as_array().unwrap();
        assert_eq!(pools.len(), 3);
        assert_eq!(pools[0]["name"], "fetch");
        assert_eq!(pools[0]["max_concurrent"], 3);
        assert_eq!(pools[1]["name"], "transcode");
        assert_eq!(pools[1]["max_concurrent"], 1);
        assert_eq!(pools[2]["name"], "publish");
        assert_eq!(pools[2]["queued_jobs"], 0);

        fixture.dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let fixture = TestFixture::new();
        fixture.dispatcher.start(1, 1, 1).await.unwrap();

        let (status, body) = fixture.get("/api/v1/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("tubecast_pipeline_running"));
        assert!(body.contains("tubecast_pool_active{stage=\"transcode\"}"));

        fixture.dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let fixture = TestFixture::new();
        let (status, _) = fixture.get("/api/v1/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
