use crate::error::ExtractError;
use crate::gateway::TableSource;
use crate::grid::GridView;
use crate::intake::ImageUpload;
use crate::table::TableData;

/// Step labels a front end cycles through while a request is in flight.
pub const PROCESSING_STEPS: [&str; 4] = [
    "Scanning Image...",
    "Detecting Columns...",
    "Structuring JSON...",
    "Ready!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The model looked at the image and found no table.
    NoTable,
    Failed,
}

/// Where the review session currently is.
#[derive(Debug)]
pub enum Phase {
    Idle,
    Processing { preview: String },
    Workspace { preview: String, grid: GridView },
    Error { message: String, kind: FailureKind },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Processing { .. } => "processing",
            Phase::Workspace { .. } => "workspace",
            Phase::Error { .. } => "error",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        action: &'static str,
    },
}

/// One user's review session: idle -> processing -> workspace | error, and
/// back to idle on reset.
///
/// A request in flight cannot be cancelled or duplicated; only a finished
/// extraction moves the session on.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session { phase: Phase::Idle }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn grid(&self) -> Option<&GridView> {
        match &self.phase {
            Phase::Workspace { grid, .. } => Some(grid),
            _ => None,
        }
    }

    pub fn grid_mut(&mut self) -> Option<&mut GridView> {
        match &mut self.phase {
            Phase::Workspace { grid, .. } => Some(grid),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// idle -> processing, keeping a preview of the upload.
    pub fn begin(&mut self, upload: &ImageUpload) -> Result<(), SessionError> {
        self.expect(matches!(self.phase, Phase::Idle), "start an upload")?;
        self.phase = Phase::Processing {
            preview: upload.data_url(),
        };
        Ok(())
    }

    /// processing -> workspace on success, processing -> error on failure.
    /// A failure never leaves a partial table behind.
    pub fn finish(&mut self, result: Result<TableData, ExtractError>) -> Result<(), SessionError> {
        self.expect(
            matches!(self.phase, Phase::Processing { .. }),
            "finish an extraction",
        )?;
        let preview = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Processing { preview } => preview,
            _ => String::new(),
        };
        self.phase = match result {
            Ok(table) => Phase::Workspace {
                preview,
                grid: GridView::new(table),
            },
            Err(err) => {
                log::warn!("extraction failed: {}", err);
                let kind = if err.is_no_table() {
                    FailureKind::NoTable
                } else {
                    FailureKind::Failed
                };
                Phase::Error {
                    message: err.to_string(),
                    kind,
                }
            }
        };
        Ok(())
    }

    /// Runs one extraction end to end. Only valid from idle.
    pub async fn extract<S: TableSource>(
        &mut self,
        source: &S,
        upload: &ImageUpload,
    ) -> Result<(), SessionError> {
        self.begin(upload)?;
        let result = source.extract(upload).await;
        self.finish(result)
    }

    /// workspace | error -> idle, discarding the table. Not allowed while a
    /// request is in flight.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.expect(
            !matches!(self.phase, Phase::Processing { .. }),
            "reset",
        )?;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn expect(&self, allowed: bool, action: &'static str) -> Result<(), SessionError> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            phase: self.phase.name(),
            action,
        }
    }
}
