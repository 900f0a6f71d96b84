//! # Design session
//!
//! A small facade over the edit → import → align → export pipeline. It owns
//! the working document plus the last imported dataset and its summary;
//! there is no module-level state anywhere in the crate, so two sessions
//! never see each other.
//!
//! The summary is a projection, never a source of truth: any operation that
//! changes the field count or the dataset recomputes it from counts already
//! in memory. The uploaded file is read exactly once.

use log::info;

use crate::dataset::{self, AlignedFields, Dataset, ImportSummary, TableFormat};
use crate::doctype::DocumentType;
use crate::error::{DatasetError, ExportError};
use crate::model::{DocumentData, MergeField};
use crate::style::TextAlign;

pub struct DesignSession {
    document: DocumentData,
    dataset: Option<Dataset>,
    summary: Option<ImportSummary>,
}

impl DesignSession {
    /// Start a session with the given type's preset fields.
    pub fn new(document_type: DocumentType) -> Self {
        Self::with_document(DocumentData::new(document_type))
    }

    /// Resume a session around an existing document, e.g. a loaded design.
    pub fn with_document(document: DocumentData) -> Self {
        Self {
            document,
            dataset: None,
            summary: None,
        }
    }

    pub fn document(&self) -> &DocumentData {
        &self.document
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        self.summary.as_ref()
    }

    /// Switch document types. The field list is replaced by the new type's
    /// presets; an imported dataset survives the switch.
    pub fn set_document_type(&mut self, document_type: DocumentType) {
        self.document.document_type = document_type;
        self.document.fields = document_type.default_fields();
        self.refresh_summary();
    }

    /// Replace the working document wholesale, keeping the dataset.
    pub fn set_document(&mut self, document: DocumentData) {
        self.document = document;
        self.refresh_summary();
    }

    /// Add a field at the given canvas position, returning its id.
    pub fn add_field(&mut self, name: &str, text: &str, x: f64, y: f64) -> String {
        let field = MergeField::new(name, text, x, y);
        let id = field.id.clone();
        self.document.fields.push(field);
        self.refresh_summary();
        id
    }

    /// Remove a field by id. Returns false when the id is unknown or the
    /// field is the last one — the canvas always keeps at least one.
    pub fn remove_field(&mut self, id: &str) -> bool {
        if self.document.fields.len() <= 1 {
            return false;
        }
        let before = self.document.fields.len();
        self.document.fields.retain(|field| field.id != id);
        let removed = self.document.fields.len() != before;
        if removed {
            self.refresh_summary();
        }
        removed
    }

    /// Mutable access to one field for edits. Position and size writes
    /// clamp on the field itself.
    pub fn field_mut(&mut self, id: &str) -> Option<&mut MergeField> {
        self.document.fields.iter_mut().find(|field| field.id == id)
    }

    /// Update theme state. Presentation-only until export resolves it.
    pub fn set_theme(&mut self, accent: &str, background: &str, custom_background: Option<&str>) {
        self.document.accent = accent.to_string();
        self.document.background = background.to_string();
        self.document.custom_background = custom_background.map(str::to_string);
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.document.text_align = align;
    }

    /// Import a dataset, replacing any previous one wholesale.
    ///
    /// On failure both the dataset and the summary are cleared — no rows
    /// from a half-parsed file ever survive next to an error message.
    pub fn import_dataset(
        &mut self,
        bytes: &[u8],
        format: TableFormat,
    ) -> Result<ImportSummary, DatasetError> {
        match dataset::read_dataset(bytes, format) {
            Ok(data) => {
                info!(
                    "imported dataset: {} column(s), {} row(s)",
                    data.headers.len(),
                    data.rows.len()
                );
                let summary = ImportSummary::compute(
                    data.headers.len(),
                    self.document.fields.len(),
                    data.rows.len(),
                );
                self.dataset = Some(data);
                self.summary = Some(summary);
                Ok(summary)
            }
            Err(e) => {
                self.dataset = None;
                self.summary = None;
                Err(e)
            }
        }
    }

    /// Drop the imported dataset and its summary.
    pub fn clear_dataset(&mut self) {
        self.dataset = None;
        self.summary = None;
    }

    /// Rebind the field list to the imported headers, one-to-one by
    /// position. Returns the id of the field the UI should focus. A no-op
    /// without an imported dataset.
    pub fn align_fields_to_headers(&mut self) -> Option<String> {
        let headers = self.dataset.as_ref()?.headers.clone();
        let AlignedFields { fields, active_id } =
            dataset::align_fields_with_headers(&self.document.fields, &headers);
        self.document.fields = fields;
        self.refresh_summary();
        active_id
    }

    /// Compile the current document against the imported dataset.
    /// All-or-nothing; failure leaves the session untouched.
    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        crate::merge(&self.document, self.dataset.as_ref())
    }

    /// Suggested filename for the next export.
    pub fn export_filename(&self) -> String {
        crate::docx::suggested_filename_now(self.document.document_type)
    }

    /// Recompute the summary projection after a field-count change.
    /// Pure arithmetic — the imported file is never re-read.
    fn refresh_summary(&mut self) {
        self.summary = self.dataset.as_ref().map(|data| {
            ImportSummary::compute(
                data.headers.len(),
                self.document.fields.len(),
                data.rows.len(),
            )
        });
    }
}
