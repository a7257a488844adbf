use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::app::NO_TABLE_KIND;
use crate::error::ExtractError;
use crate::gateway::TableSource;
use crate::intake::ImageUpload;
use crate::table::TableData;

/// [`TableSource`] that uploads to a running tablesnap server.
#[derive(Debug, Clone)]
pub struct RemoteGateway {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    data: Option<TableData>,
    error: Option<String>,
    kind: Option<String>,
}

impl RemoteGateway {
    pub fn new(base_url: &str) -> Self {
        RemoteGateway {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn extract_url(&self) -> String {
        format!("{}/api/extract", self.base_url)
    }
}

impl TableSource for RemoteGateway {
    async fn extract(&self, image: &ImageUpload) -> Result<TableData, ExtractError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().unwrap_or("upload").to_string())
            .mime_str(image.media_type().mime())
            .map_err(|e| ExtractError::Transport(e.to_string()))?;
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(self.extract_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        decode_response(status.as_u16(), &body)
    }
}

fn decode_response(status: u16, body: &str) -> Result<TableData, ExtractError> {
    let parsed: Option<ExtractResponse> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let (message, kind) = match parsed {
            Some(r) => (r.error, r.kind),
            None => (None, None),
        };
        let message = message.unwrap_or_else(|| "Failed to extract data".to_string());
        if kind.as_deref() == Some(NO_TABLE_KIND) {
            return Err(ExtractError::NoTable(message));
        }
        return Err(ExtractError::Remote { status, message });
    }

    match parsed {
        Some(ExtractResponse {
            success: true,
            data: Some(table),
            ..
        }) => Ok(table),
        Some(ExtractResponse { error, .. }) => Err(ExtractError::Remote {
            status,
            message: error.unwrap_or_else(|| "No data extracted".to_string()),
        }),
        None => Err(ExtractError::MalformedReply),
    }
}
