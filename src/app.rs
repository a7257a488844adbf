use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ExtractError;
use crate::export;
use crate::gateway::{Gateway, TableSource, VisionModel};
use crate::gemini::GeminiClient;
use crate::intake::ImageUpload;
use crate::table::TableData;

/// `kind` tag on error bodies for a model that found no table in the image.
pub const NO_TABLE_KIND: &str = "no_table";

pub struct AppState<M> {
    gateway: Gateway<M>,
}

impl<M: VisionModel> AppState<M> {
    pub fn new(model: M) -> Self {
        AppState {
            gateway: Gateway::new(model),
        }
    }
}

#[derive(Serialize)]
struct ExtractResponse<'a> {
    success: bool,
    data: &'a TableData,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

impl IntoResponse for ExtractError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("extraction failed: {}", self);
        }
        let kind = self.is_no_table().then_some(NO_TABLE_KIND);
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message,
            kind: None,
        }),
    )
        .into_response()
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let model = GeminiClient::from_config(&config)?;
    if !model.has_api_key() {
        log::warn!(
            "{} is not set; extraction requests will fail until it is configured",
            crate::config::API_KEY_VAR
        );
    }

    let app = router(Arc::new(AppState::new(model)), config.max_upload_bytes);

    let listener = TcpListener::bind(&config.addr).await?;
    log::info!("Listening on http://{} (model {})", config.addr, config.model);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router<M: VisionModel>(state: Arc<AppState<M>>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/extract", post(extract_table::<M>))
        .route("/api/export/csv", post(export_csv))
        .route("/api/export/tsv", post(export_tsv))
        .route("/api/export/xlsx", post(export_xlsx))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn extract_table<M: VisionModel>(
    State(state): State<Arc<AppState<M>>>,
    mut multipart: Multipart,
) -> Response {
    let upload = match read_image_field(&mut multipart).await {
        Ok(upload) => upload,
        Err(rejection) => return rejection,
    };

    match state.gateway.extract(&upload).await {
        Ok(table) => Json(ExtractResponse {
            success: true,
            data: &table,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn read_image_field(multipart: &mut Multipart) -> Result<ImageUpload, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ExtractError::NoFile.into_response()),
            Err(e) => return Err(error_response(e.status(), e.body_text())),
        };
        if field.name() != Some("image") {
            continue;
        }

        let mime = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(error_response(e.status(), e.body_text())),
        };

        let upload = ImageUpload::new(bytes.to_vec(), &mime).map_err(IntoResponse::into_response)?;
        return Ok(match file_name {
            Some(name) => upload.with_file_name(name),
            None => upload,
        });
    }
}

fn attachment(content_type: &str, extension: &str, body: impl IntoResponse) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::export_filename(extension)
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

async fn export_csv(Json(table): Json<TableData>) -> Response {
    match export::to_csv(&table) {
        Ok(csv) => attachment("text/csv; charset=utf-8", "csv", csv),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn export_tsv(Json(table): Json<TableData>) -> Response {
    match export::to_tsv(&table) {
        Ok(tsv) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            tsv,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn export_xlsx(Json(table): Json<TableData>) -> Response {
    match export::to_xlsx(&table) {
        Ok(bytes) => attachment(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xlsx",
            bytes,
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
