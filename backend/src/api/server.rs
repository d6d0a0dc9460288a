//! HTTP server for the DataVision API.
//!
//! # API Endpoints
//!
//! | Method | Path                   | Description                              |
//! |--------|------------------------|------------------------------------------|
//! | GET    | `/health`              | Health check                             |
//! | POST   | `/api/upload`          | Upload a CSV/JSON/Excel file (multipart) |
//! | GET    | `/api/samples`         | List built-in sample datasets            |
//! | GET    | `/api/samples/{key}`   | Get one sample dataset                   |
//! | POST   | `/api/schema/validate` | Validate edited column names             |
//! | POST   | `/api/chart/series`    | Derive chart series for a config         |
//! | POST   | `/api/datasets`        | Save a dataset summary                   |
//! | GET    | `/api/logs`            | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{
    error_response, ChartSeriesRequest, UploadResponse, ValidateSchemaRequest,
    ValidateSchemaResponse,
};
use crate::chart::{ChartConfig, ChartSeries};
use crate::config::Config;
use crate::error::{PipelineError, ServerError, ServerResult, StoreError};
use crate::models::Dataset;
use crate::pipeline::{parse_bytes, prepare_chart, ParseOptions};
use crate::samples::{self, SampleInfo};
use crate::store::{LocalStore, RemoteStore, SaveDatasetRequest, SaveDatasetResponse};
use crate::validation::validate_schema;

/// Multipart overhead allowed on top of the file itself.
const MULTIPART_SLACK_BYTES: usize = 64 * 1024;

type AppState = Arc<Config>;

/// Build the router. Split out of [`start_server`] so it can be driven in
/// tests without binding a port.
pub fn router(config: Config) -> Router {
    // Files up to twice the limit still reach the pipeline, which answers
    // with a proper "too large" message.
    let body_limit = (config.max_upload_bytes as usize)
        .saturating_mul(2)
        .saturating_add(MULTIPART_SLACK_BYTES);

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_file))
        .route("/api/samples", get(list_samples))
        .route("/api/samples/{key}", get(get_sample))
        .route("/api/schema/validate", post(validate_columns))
        .route("/api/chart/series", post(chart_series))
        .route("/api/datasets", post(save_dataset))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server on `config.port`.
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("DataVision server running on http://localhost:{}", port);
    println!("   POST /api/upload           - Upload CSV, JSON or Excel file");
    println!("   GET  /api/samples          - Sample datasets");
    println!("   POST /api/schema/validate  - Validate column names");
    println!("   POST /api/chart/series     - Chart series for a config");
    println!("   POST /api/datasets         - Save dataset summary");
    println!("   GET  /api/logs             - SSE log stream");
    println!("   GET  /health               - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Pipeline(PipelineError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Store(StoreError::MissingConfig(_) | StoreError::Io(_) | StoreError::Json(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Store(_) => StatusCode::BAD_GATEWAY,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log_error(self.to_string());
        }
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "datavision",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn upload_file(
    State(config): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            upload = Some((name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    if file_name.is_empty() {
        return Err(ServerError::BadRequest("File name is required".to_string()));
    }

    log_info(format!("New upload: {} ({} bytes)", file_name, bytes.len()));

    let options = ParseOptions::from(config.as_ref());
    let outcome = tokio::task::spawn_blocking(move || parse_bytes(&bytes, &file_name, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(Json(UploadResponse::from(outcome)))
}

async fn list_samples() -> Json<Vec<SampleInfo>> {
    Json(samples::list())
}

async fn get_sample(Path(key): Path<String>) -> Result<Json<Dataset>, (StatusCode, Json<Value>)> {
    samples::get(&key).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(error_response(&format!("Unknown sample dataset: {}", key))),
        )
    })
}

async fn validate_columns(Json(request): Json<ValidateSchemaRequest>) -> Json<ValidateSchemaResponse> {
    let issues = validate_schema(&request.columns);
    Json(ValidateSchemaResponse {
        valid: issues.is_empty(),
        issues,
    })
}

async fn chart_series(Json(request): Json<ChartSeriesRequest>) -> ServerResult<Json<Vec<ChartSeries>>> {
    // Rows are rebuilt from the columns rather than trusted from the client
    let dataset = Dataset::new(request.dataset.name, request.dataset.columns);
    dataset.check_shape()?;
    Ok(Json(prepare_chart(&dataset, &request.config)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveBody {
    dataset: Dataset,
    #[serde(default)]
    chart_config: Option<ChartConfig>,
    #[serde(default)]
    file_url: Option<String>,
}

/// Saves remotely when a save function is configured, locally otherwise.
async fn save_dataset(
    State(config): State<AppState>,
    Json(body): Json<SaveBody>,
) -> ServerResult<Json<SaveDatasetResponse>> {
    let dataset = Dataset::new(body.dataset.name, body.dataset.columns);
    dataset.check_shape()?;
    let mut request = SaveDatasetRequest::from_dataset(&dataset, body.chart_config);
    request.file_url = body.file_url;

    let response = if config.save_url.is_some() {
        RemoteStore::from_config(&config)?.save(&request).await?
    } else {
        let dir = config.store_dir.clone();
        tokio::task::spawn_blocking(move || LocalStore::with_dir(dir).save(request))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(file_name: &str, content: &str) -> Request<Body> {
        let boundary = "datavision-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
            b = boundary,
            f = file_name,
            c = content
        );
        Request::post("/api/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(router(Config::default()), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "datavision");
    }

    #[tokio::test]
    async fn test_upload_csv() {
        let (status, body) = call(router(Config::default()), multipart("sales.csv", "Month,Revenue\nJan,10\nFeb,20")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["dataset"]["name"], "sales");
        assert_eq!(body["dataset"]["columns"][1]["type"], "number");
    }

    #[tokio::test]
    async fn test_upload_rejected_with_message() {
        let (status, body) = call(router(Config::default()), multipart("notes.txt", "hello")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("Unsupported file type"));
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let config = Config { max_upload_bytes: 8, ..Config::default() };
        let (status, body) = call(router(config), multipart("wide.csv", "a,b,c,d,e\n1,2,3,4,5")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("too large"));
    }

    #[tokio::test]
    async fn test_samples() {
        let (status, body) = call(router(Config::default()), Request::get("/api/samples").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);

        let (status, body) = call(router(Config::default()), Request::get("/api/samples/stock").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Stock Prices");

        let (status, _) = call(router(Config::default()), Request::get("/api/samples/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validate_schema_endpoint() {
        let body = json!({ "columns": [
            { "name": "Region", "type": "category" },
            { "name": " region ", "type": "string" },
            { "name": "", "type": "number" }
        ]});
        let (status, body) = call(router(Config::default()), post_json("/api/schema/validate", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert_eq!(body["issues"][0]["kind"], "emptyNames");
        assert_eq!(body["issues"][1]["names"][0], "region");
    }

    #[tokio::test]
    async fn test_chart_series_endpoint() {
        let dataset = serde_json::to_value(samples::get("sales").unwrap()).unwrap();
        let body = json!({ "dataset": dataset, "config": { "type": "pie", "xAxis": "Region" } });
        let (status, body) = call(router(Config::default()), post_json("/api/chart/series", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["labels"], json!(["North", "South", "West", "East"]));
        assert_eq!(body[0]["values"], json!([2.0, 2.0, 1.0, 1.0]));
    }

    fn ragged_dataset() -> Value {
        json!({
            "name": "ragged",
            "columns": [
                { "name": "a", "type": "number", "originalType": "number", "values": [1] },
                { "name": "b", "type": "number", "originalType": "number", "values": [1, 2, 3] }
            ]
        })
    }

    #[tokio::test]
    async fn test_chart_series_rejects_ragged_columns() {
        let body = json!({
            "dataset": ragged_dataset(),
            "config": { "type": "scatter", "xAxis": "a", "yAxis": "b" }
        });
        let (status, body) = call(router(Config::default()), post_json("/api/chart/series", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("Column 'b' has 3 values"));
    }

    #[tokio::test]
    async fn test_save_rejects_ragged_columns() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { store_dir: dir.path().to_path_buf(), ..Config::default() };

        let (status, body) = call(router(config), post_json("/api/datasets", json!({ "dataset": ragged_dataset() }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "error");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_save_dataset_locally() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { store_dir: dir.path().to_path_buf(), ..Config::default() };
        let dataset = serde_json::to_value(samples::get("survey").unwrap()).unwrap();

        let (status, body) = call(router(config), post_json("/api/datasets", json!({ "dataset": dataset }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let id = body["datasetId"].as_str().unwrap();
        assert!(dir.path().join(format!("{}.json", id)).exists());
    }
}
