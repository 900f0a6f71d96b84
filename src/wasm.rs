use wasm_bindgen::prelude::*;

use crate::dataset::{Dataset, DatasetRow};

/// Merge a design JSON against rows supplied as a JSON array of objects.
/// Pass `[]` to compile a single preview record with tokens left verbatim.
#[wasm_bindgen]
pub fn merge_docx(design_json: &str, rows_json: &str) -> Result<Vec<u8>, JsValue> {
    let rows: Vec<DatasetRow> = serde_json::from_str(rows_json)
        .map_err(|e| JsValue::from_str(&format!("Rows parse error: {}", e)))?;

    let mut headers: Vec<String> = rows
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();
    headers.sort();

    let dataset = Dataset { headers, rows };
    crate::merge_json(design_json, Some(&dataset))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
