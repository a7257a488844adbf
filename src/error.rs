/// Everything that can go wrong between picking an image and holding a table.
///
/// The `Display` text of each variant is the message shown to the user and
/// returned in the `error` field of HTTP error bodies.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("No image file provided")]
    NoFile,

    #[error("Unsupported file type '{0}'. Please upload a PNG, JPEG, WEBP, HEIC or HEIF image.")]
    UnsupportedMediaType(String),

    #[error(
        "API key not configured. Please set GOOGLE_GENERATIVE_AI_API_KEY in the server environment."
    )]
    MissingApiKey,

    /// The model looked at the image and said there is no table in it.
    #[error("{0}")]
    NoTable(String),

    #[error("Failed to parse AI response. The image might not contain a valid table.")]
    MalformedReply,

    #[error("Invalid response structure from AI")]
    InvalidStructure,

    #[error("Failed to process image: model API returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Failed to process image: {0}")]
    Transport(String),

    /// Error body relayed from a tablesnap server.
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// HTTP status the extraction endpoint answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ExtractError::NoFile
            | ExtractError::UnsupportedMediaType(_)
            | ExtractError::NoTable(_) => 400,
            ExtractError::Remote { status, .. } => *status,
            ExtractError::MissingApiKey
            | ExtractError::MalformedReply
            | ExtractError::InvalidStructure
            | ExtractError::Upstream { .. }
            | ExtractError::Transport(_)
            | ExtractError::Io(_) => 500,
        }
    }

    /// Input problems are caught before any network call is made.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExtractError::NoFile | ExtractError::UnsupportedMediaType(_)
        )
    }

    pub fn is_no_table(&self) -> bool {
        matches!(self, ExtractError::NoTable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ExtractError::NoFile.http_status(), 400);
        assert_eq!(ExtractError::NoTable("No table detected".into()).http_status(), 400);
        assert_eq!(ExtractError::UnsupportedMediaType("text/plain".into()).http_status(), 400);
        assert_eq!(ExtractError::MissingApiKey.http_status(), 500);
        assert_eq!(ExtractError::MalformedReply.http_status(), 500);
        assert_eq!(ExtractError::Transport("reset".into()).http_status(), 500);
    }

    #[test]
    fn no_table_message_is_passed_through() {
        let err = ExtractError::NoTable("No table detected".into());
        assert_eq!(err.to_string(), "No table detected");
        assert!(err.is_no_table());
        assert!(!err.is_input_error());
    }
}
