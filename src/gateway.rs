//! Image-to-table extraction through a hosted multimodal model.
//!
//! The gateway is stateless: one upload in, one model call, one table (or one
//! error) out. There is no retry; a failed extraction is reported as-is.

use serde_json::Value;
use std::future::Future;

use crate::error::ExtractError;
use crate::intake::ImageUpload;
use crate::table::{TableData, WireTable};

/// Instruction sent alongside every image.
pub const EXTRACTION_PROMPT: &str = "\
You extract tabular data from images. The attached image shows a table, an invoice, a receipt \
or a similar financial document. Return its contents as strict JSON.\n\
\n\
Rules:\n\
1. Work out the column headers. If the table has none, invent short descriptive ones \
(for example \"Item\", \"Quantity\", \"Price\").\n\
2. Reply with one JSON object with exactly two keys:\n\
   - \"headers\": [\"Column A\", \"Column B\", ...]\n\
   - \"rows\": [ {\"Column A\": \"value\", \"Column B\": \"value\"}, ... ]\n\
   All cell values are strings.\n\
3. When a value is handwritten or hard to read, give your best guess and append the literal \
suffix \"[?]\" to it.\n\
4. Output raw JSON only. Never wrap it in markdown code fences.\n\
5. If the image contains no table, reply with {\"error\": \"No table detected\"}.";

/// A hosted model that answers an image plus an instruction with text.
pub trait VisionModel: Send + Sync + 'static {
    fn generate(
        &self,
        image: &ImageUpload,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;
}

/// Anything that can turn an upload into a table: the in-process gateway or a
/// remote tablesnap server.
pub trait TableSource: Send + Sync {
    fn extract(
        &self,
        image: &ImageUpload,
    ) -> impl Future<Output = Result<TableData, ExtractError>> + Send;
}

pub struct Gateway<M> {
    model: M,
}

impl<M: VisionModel> Gateway<M> {
    pub fn new(model: M) -> Self {
        Gateway { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: VisionModel> TableSource for Gateway<M> {
    async fn extract(&self, image: &ImageUpload) -> Result<TableData, ExtractError> {
        log::info!(
            "extracting table from {} image ({} bytes)",
            image.media_type().mime(),
            image.len()
        );
        let reply = self.model.generate(image, EXTRACTION_PROMPT).await?;
        let result = parse_model_reply(&reply);
        match &result {
            Ok(table) => log::info!(
                "extracted {} columns x {} rows",
                table.column_count(),
                table.row_count()
            ),
            Err(ExtractError::NoTable(reason)) => log::warn!("model reported no table: {}", reason),
            Err(err) => log::error!("{}; raw model reply: {}", err, reply),
        }
        result
    }
}

/// Removes a surrounding markdown code fence (```` ```json ... ``` ````) if the
/// model added one despite being told not to.
pub fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Validates the model's text reply and converts it into a table.
///
/// * unparseable JSON -> [`ExtractError::MalformedReply`]
/// * an object with a truthy `error` -> [`ExtractError::NoTable`] carrying that message
/// * missing `headers` or `rows`, or rows that are not objects -> [`ExtractError::InvalidStructure`]
pub fn parse_model_reply(reply: &str) -> Result<TableData, ExtractError> {
    let value: Value =
        serde_json::from_str(strip_code_fences(reply)).map_err(|_| ExtractError::MalformedReply)?;

    if let Some(message) = value.get("error").and_then(error_message) {
        return Err(ExtractError::NoTable(message));
    }

    let present = |key: &str| value.get(key).is_some_and(|v| !v.is_null());
    if !present("headers") || !present("rows") {
        return Err(ExtractError::InvalidStructure);
    }

    let wire: WireTable =
        serde_json::from_value(value).map_err(|_| ExtractError::InvalidStructure)?;
    Ok(TableData::from(wire))
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_in_all_shapes() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
        assert_eq!(strip_code_fences("{} ```"), "{}");
    }

    #[test]
    fn parses_table_reply() {
        let table = parse_model_reply(
            r#"```json
{"headers":["Item","Qty"],"rows":[{"Item":"Pen","Qty":"10[?]"}]}
```"#,
        )
        .unwrap();
        assert_eq!(table.headers(), ["Item", "Qty"]);
        assert_eq!(table.get(0, "Qty"), Some("10[?]"));
    }

    #[test]
    fn error_object_means_no_table() {
        let err = parse_model_reply(r#"{"error":"No table detected"}"#).unwrap_err();
        assert!(matches!(&err, ExtractError::NoTable(m) if m == "No table detected"));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn falsy_error_field_is_ignored() {
        let table =
            parse_model_reply(r#"{"error":"","headers":["A"],"rows":[{"A":"1"}]}"#).unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_model_reply("Sorry, I cannot help with that."),
            Err(ExtractError::MalformedReply)
        ));
        assert!(matches!(parse_model_reply(""), Err(ExtractError::MalformedReply)));
    }

    #[test]
    fn missing_keys_are_invalid_structure() {
        for reply in [
            r#"{"headers":["A"]}"#,
            r#"{"rows":[]}"#,
            r#"{"headers":null,"rows":[]}"#,
            r#"{"headers":["A"],"rows":["x"]}"#,
            r#"[1,2,3]"#,
        ] {
            assert!(
                matches!(parse_model_reply(reply), Err(ExtractError::InvalidStructure)),
                "{}",
                reply
            );
        }
    }

    #[test]
    fn empty_table_is_still_a_table() {
        let table = parse_model_reply(r#"{"headers":[],"rows":[]}"#).unwrap();
        assert_eq!(table.column_count(), 0);
        assert!(table.is_empty());
    }

    struct Canned(&'static str);

    impl VisionModel for Canned {
        async fn generate(&self, _image: &ImageUpload, prompt: &str) -> Result<String, ExtractError> {
            assert!(prompt.contains("[?]"));
            Ok(self.0.to_string())
        }
    }

    #[cfg(feature = "web")]
    #[tokio::test]
    async fn gateway_runs_model_and_parses() {
        let gateway = Gateway::new(Canned(r#"{"headers":["A"],"rows":[{"A":"1"}]}"#));
        let upload = ImageUpload::new(vec![1, 2, 3], "image/png").unwrap();
        let table = gateway.extract(&upload).await.unwrap();
        assert_eq!(table.get(0, "A"), Some("1"));

        let gateway = Gateway::new(Canned("not json"));
        assert!(matches!(
            gateway.extract(&upload).await,
            Err(ExtractError::MalformedReply)
        ));
    }
}
