use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::Path;

use crate::error::ExtractError;

/// Image formats the model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    Webp,
    Heic,
    Heif,
}

pub const SUPPORTED_MEDIA_TYPES: [MediaType; 5] = [
    MediaType::Png,
    MediaType::Jpeg,
    MediaType::Webp,
    MediaType::Heic,
    MediaType::Heif,
];

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Webp => "image/webp",
            MediaType::Heic => "image/heic",
            MediaType::Heif => "image/heif",
        }
    }

    /// Parses a declared MIME type; parameters such as `; charset=` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        SUPPORTED_MEDIA_TYPES
            .into_iter()
            .find(|media| media.mime() == essence)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(MediaType::Png),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "webp" => Some(MediaType::Webp),
            "heic" => Some(MediaType::Heic),
            "heif" => Some(MediaType::Heif),
            _ => None,
        }
    }
}

/// A validated image ready to be sent for extraction.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    bytes: Vec<u8>,
    media_type: MediaType,
    file_name: Option<String>,
}

impl ImageUpload {
    /// Validates raw bytes and a declared MIME type.
    pub fn new(bytes: Vec<u8>, declared_mime: &str) -> Result<Self, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::NoFile);
        }
        let media_type = MediaType::from_mime(declared_mime)
            .ok_or_else(|| ExtractError::UnsupportedMediaType(declared_mime.to_string()))?;
        Ok(ImageUpload {
            bytes,
            media_type,
            file_name: None,
        })
    }

    /// Reads a local image, inferring the media type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let media_type = MediaType::from_extension(ext)
            .ok_or_else(|| ExtractError::UnsupportedMediaType(format!(".{}", ext)))?;
        let bytes = fs::read(path)?;
        let upload = ImageUpload::new(bytes, media_type.mime())?;
        let file_name = path.file_name().and_then(|n| n.to_str()).map(str::to_string);
        Ok(match file_name {
            Some(name) => upload.with_file_name(name),
            None => upload,
        })
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URL used to preview the upload while it is being processed.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type.mime(), self.base64())
    }
}
