#![cfg(feature = "web")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use tablesnap::app::{AppState, router};
use tablesnap::display::strip_uncertainty;
use tablesnap::export::{export_filename, to_csv};
use tablesnap::session::FailureKind;
use tablesnap::{
    CellPos, ExtractError, Gateway, ImageUpload, NavKey, Phase, Session, TableData, VisionModel,
};

struct Canned(&'static str);

impl VisionModel for Canned {
    async fn generate(&self, _image: &ImageUpload, _prompt: &str) -> Result<String, ExtractError> {
        Ok(self.0.to_string())
    }
}

const PEN_REPLY: &str = r#"{"headers":["Item","Qty"],"rows":[{"Item":"Pen","Qty":"10[?]"}]}"#;
const NO_TABLE_REPLY: &str = r#"{"error":"No table detected"}"#;

fn upload() -> ImageUpload {
    ImageUpload::new(b"\x89PNG\r\n".to_vec(), "image/png").unwrap()
}

fn upload_request(bytes: &[u8]) -> Request<Body> {
    let boundary = "e2e-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"invoice.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/extract")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn post_image(reply: &'static str) -> (StatusCode, Value) {
    let app = router(Arc::new(AppState::new(Canned(reply))), 1024 * 1024);
    let response = app.oneshot(upload_request(b"\x89PNG")).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn flagged_cell_is_shown_and_stripped_on_export() {
    let (status, body) = post_image(PEN_REPLY).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let table: TableData = serde_json::from_value(body["data"].clone()).unwrap();

    let mut session = Session::new();
    session.begin(&upload()).unwrap();
    session.finish(Ok(table)).unwrap();

    let grid = session.grid().expect("workspace");
    assert_eq!(grid.uncertain_cells(), vec![CellPos::new(0, 1)]);
    assert!(grid.cell_view(CellPos::new(0, 1)).unwrap().uncertain);
    assert!(!grid.cell_view(CellPos::new(0, 0)).unwrap().uncertain);

    assert_eq!(to_csv(grid.table()).unwrap(), "Item,Qty\nPen,10");
}

#[tokio::test]
async fn no_table_reply_ends_in_error_state() {
    let (status, body) = post_image(NO_TABLE_REPLY).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No table detected");

    let gateway = Gateway::new(Canned(NO_TABLE_REPLY));
    let mut session = Session::new();
    session.extract(&gateway, &upload()).await.unwrap();

    match session.phase() {
        Phase::Error { message, kind } => {
            assert_eq!(message, "No table detected");
            assert_eq!(*kind, FailureKind::NoTable);
        }
        other => panic!("expected error phase, got {}", other.name()),
    }
    assert!(session.grid().is_none());

    // retry returns to the upload screen rather than replaying the request
    session.reset().unwrap();
    assert!(matches!(session.phase(), Phase::Idle));
}

#[tokio::test]
async fn editing_session_then_export_round_trips_through_csv_reader() {
    let gateway = Gateway::new(Canned(
        r#"{"headers":["Description","Qty","Price"],"rows":[
            {"Description":"Paper, A4","Qty":"5","Price":"$12.00 [?]"},
            {"Description":"Toner \"XL\"","Qty":"1[?]","Price":"80"}
        ]}"#,
    ));
    let mut session = Session::new();
    session.extract(&gateway, &upload()).await.unwrap();

    let grid = session.grid_mut().expect("workspace");
    grid.set_focus(CellPos::new(1, 0));
    grid.press(NavKey::Enter);
    grid.commit("Staples\nbox of 1000");
    grid.press(NavKey::Right);
    grid.commit("3");
    assert_eq!(grid.rename_column(2, "Unit Price"), Ok(true));

    let table = grid.table().clone();
    let csv = to_csv(&table).unwrap();

    let mut reader = csv::ReaderBuilder::new().from_reader(csv.as_bytes());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, table.headers());

    let records: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    let expected: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| strip_uncertainty(v).into_owned()).collect())
        .collect();
    assert_eq!(records, expected);
    assert_eq!(records[2], ["Staples\nbox of 1000", "3", ""]);
    assert_eq!(records[0][2], "$12.00");
}

#[test]
fn csv_export_writes_a_timestamped_file() {
    let dir = tempfile::tempdir().unwrap();
    let table = TableData::new(vec!["Item".into()], vec![vec!["Pen [?]".into()]]);

    let path = dir.path().join(export_filename("csv"));
    std::fs::write(&path, to_csv(&table).unwrap()).unwrap();

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("tablesnap-export-") && name.ends_with(".csv"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Item\nPen");
}
