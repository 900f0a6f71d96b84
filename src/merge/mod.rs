//! # Placeholder resolution
//!
//! `{{Name}}` tokens substituted against one data row per output record.
//! Unresolved tokens stay verbatim so a half-bound design is visibly
//! half-bound instead of silently blank.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::dataset::{Dataset, DatasetRow};
use crate::model::{DocumentData, MergeField};

/// `{{ ... }}` with any run of characters except `}` inside. There is no
/// escape syntax for a literal `{{`.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("BUG: invalid TOKEN_RE regex literal"));

/// Substitute `{{Name}}` tokens in `text` with values from `row`.
///
/// Lookup is exact and case-sensitive after trimming the token's inner
/// name, so `{{ Name }}` and `{{Name}}` resolve identically. A missing row,
/// a missing key, and an empty value all leave the token verbatim.
/// Substituted values are never re-scanned for tokens.
pub fn resolve_placeholders(text: &str, row: Option<&DatasetRow>) -> String {
    TOKEN_RE
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].trim();
            match row.and_then(|r| r.get(name)) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Resolve one record's fields: visible fields only, text substituted,
/// position and styling copied. The input fields are never mutated.
pub fn resolve_fields(fields: &[MergeField], row: Option<&DatasetRow>) -> Vec<MergeField> {
    fields
        .iter()
        .filter(|field| field.visible)
        .map(|field| {
            let mut resolved = field.clone();
            resolved.text = resolve_placeholders(&field.text, row);
            resolved
        })
        .collect()
}

/// Expand a document against a dataset: one field-set per data row, in row
/// order. With no dataset, or a dataset without rows, a single preview set
/// is produced with every token left verbatim.
pub fn build_record_sets(
    document: &DocumentData,
    dataset: Option<&Dataset>,
) -> Vec<Vec<MergeField>> {
    match dataset {
        Some(data) if !data.rows.is_empty() => data
            .rows
            .iter()
            .map(|row| resolve_fields(&document.fields, Some(row)))
            .collect(),
        _ => vec![resolve_fields(&document.fields, None)],
    }
}
