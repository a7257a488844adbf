/*!
# TableSnap

Turns a photo of a table, receipt or invoice into an editable grid that can be
exported as CSV, tab-separated text or XLSX.

## Overview

A user uploads an image. The extraction gateway forwards it, together with a
fixed instruction, to a hosted multimodal model and validates the JSON the
model sends back. The result seeds an in-memory table that the user reviews
and corrects in a grid before exporting it.

## Architecture

### Intake and gateway
- **intake**: media-type validation (PNG, JPEG, WEBP, HEIC, HEIF) and data-URL previews
- **gateway**: extraction prompt, code-fence stripping, reply validation
- **gemini**: hosted model client (`generateContent` REST API)
- **remote**: client for a running tablesnap server

### Table state
- **table**: ordered headers plus header-indexed rows
- **store**: rename / edit / add / delete, with whole-table change notifications
- **grid**: focus, keyboard navigation, currency display toggle, text rendering
- **display**: uncertainty marker, numeric columns, currency formatting
- **navigation**: clamped arrow movement, Enter appends on the last row

### Session and export
- **session**: idle -> processing -> workspace | error state machine
- **export**: CSV / TSV / XLSX with uncertainty markers stripped

### Web layer
- **app**: axum router (`POST /api/extract`, `POST /api/export/{csv,tsv,xlsx}`)
- **config**: environment-driven settings

## REST API Endpoints

- `POST /api/extract` - multipart upload (field `image`) -> `{ success, data: { headers, rows } }`
- `POST /api/export/csv` - table JSON -> CSV download
- `POST /api/export/tsv` - table JSON -> tab-separated text
- `POST /api/export/xlsx` - table JSON -> XLSX download
*/

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod gateway;
pub mod grid;
pub mod intake;
pub mod navigation;
pub mod session;
pub mod store;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod gemini;
#[cfg(feature = "web")]
pub mod remote;

pub use config::Config;
pub use error::ExtractError;
pub use gateway::{Gateway, TableSource, VisionModel};
pub use grid::GridView;
pub use intake::{ImageUpload, MediaType};
pub use navigation::{CellPos, NavKey};
pub use session::{Phase, Session};
pub use store::{StoreError, TableStore};
pub use table::TableData;
