//! # DOCX serializer
//!
//! Takes merged field-sets and writes a Word-compatible document.
//!
//! This is a from-scratch WordprocessingML writer. We assemble the OPC
//! package ourselves because the subset a merge export needs — paragraphs,
//! runs, one table shape, section properties — is small, and owning the
//! bytes keeps the output stable for downstream diffing.
//!
//! ## Package structure
//!
//! ```text
//! [Content_Types].xml           <- part inventory
//! _rels/.rels                   <- package -> main document
//! word/document.xml             <- the generated body (this module's output)
//! word/styles.xml               <- doc defaults the spacing math relies on
//! word/settings.xml             <- enables page background rendering
//! word/_rels/document.xml.rels  <- document -> styles, settings
//! ```
//!
//! Single-record types emit one section per record, so every record starts
//! on a fresh page with the right size and orientation. Label sheets emit
//! one fixed-layout table per six records with a page break between tables;
//! leftover grid slots become empty styled cells so partial sheets keep
//! their shape.
//!
//! Output is byte-identical across runs for identical inputs: zip entries
//! carry a fixed timestamp and nothing inside the package embeds the wall
//! clock. The export timestamp lives only in the suggested filename.

use std::io::Write as IoWrite;

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::doctype::{DocumentType, LabelGrid, Orientation, CELL_PADDING_TWIPS, PAGE_MARGIN_TWIPS};
use crate::error::ExportError;
use crate::layout::{self, FieldGroup, FlowCursor};
use crate::model::{DocumentData, MergeField};
use crate::style::{self, TextAlign};

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Bottom page margin on label sheets. Kept slimmer than the centered top
/// margin so the invisible page-break paragraph between sheet tables fits
/// under the grid instead of spilling onto a blank page.
const SHEET_BOTTOM_MARGIN_TWIPS: i64 = 240;

/// Exact line height, in twips, of the invisible separator paragraphs
/// between records and between label tables.
const SEPARATOR_LINE_TWIPS: i64 = 20;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/></Relationships>"#;

/// Doc defaults pin spacing to zero and single lines; the vertical
/// reconstruction assumes nothing else adds height between paragraphs.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:before="0" w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style></w:styles>"#;

/// `displayBackgroundShape` makes Word actually paint `w:background`.
const SETTINGS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:displayBackgroundShape/></w:settings>"#;

pub struct DocxWriter;

impl DocxWriter {
    pub fn new() -> Self {
        Self
    }

    /// Compile merged field-sets into a DOCX package.
    ///
    /// `records` holds one resolved field-set per output record, already in
    /// final order. An empty slice is the one hard failure here; everything
    /// style-shaped degrades to defaults instead of erroring.
    pub fn write(
        &self,
        document: &DocumentData,
        records: &[Vec<MergeField>],
    ) -> Result<Vec<u8>, ExportError> {
        if records.is_empty() {
            return Err(ExportError::NoRecords);
        }
        debug!(
            "compiling {} record(s) as {}",
            records.len(),
            document.document_type.as_str()
        );

        let document_xml = self.build_document_xml(document, records)?;
        package(&document_xml)
    }

    fn build_document_xml(
        &self,
        document: &DocumentData,
        records: &[Vec<MergeField>],
    ) -> Result<Vec<u8>, ExportError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_error)?;

        let mut root = BytesStart::new("w:document");
        root.push_attribute(("xmlns:w", WORD_NS));
        writer.write_event(Event::Start(root)).map_err(xml_error)?;

        let background =
            style::resolve_background(&document.background, document.custom_background.as_deref());
        let grid = document.document_type.label_grid();

        // Page background only for single-document types and only when it is
        // not plain white; label sheets shade their cells instead.
        if grid.is_none() && background != "FFFFFF" {
            emit_empty(&mut writer, "w:background", &[("w:color", background.as_str())])?;
        }

        emit_start(&mut writer, "w:body")?;
        match grid {
            Some(grid) => self.write_label_body(&mut writer, document, records, &grid, &background)?,
            None => self.write_single_body(&mut writer, document, records)?,
        }
        self.write_section_properties(&mut writer, document.document_type)?;
        emit_end(&mut writer, "w:body")?;
        emit_end(&mut writer, "w:document")?;

        Ok(writer.into_inner())
    }

    /// One section per record: letter, certificate, envelope.
    fn write_single_body<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        document: &DocumentData,
        records: &[Vec<MergeField>],
    ) -> Result<(), ExportError> {
        let geometry = document.document_type.geometry();
        let usable_height = geometry.height_twips() - 2 * PAGE_MARGIN_TWIPS;
        let last = records.len() - 1;

        for (index, fields) in records.iter().enumerate() {
            self.write_record_paragraphs(writer, fields, document.text_align, usable_height)?;
            if index != last {
                self.write_section_break(writer, document.document_type)?;
            }
        }
        Ok(())
    }

    /// A record's content as positioned paragraphs, top to bottom.
    fn write_record_paragraphs<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        fields: &[MergeField],
        fallback: TextAlign,
        usable_height: i64,
    ) -> Result<(), ExportError> {
        let groups = layout::group_fields_by_line(fields);
        if groups.is_empty() {
            // A record with no visible fields still claims its page or cell.
            return emit_empty(writer, "w:p", &[]);
        }

        let mut cursor = FlowCursor::new();
        for group in &groups {
            self.write_group_paragraph(writer, group, fallback, usable_height, &mut cursor)?;
        }
        Ok(())
    }

    /// One visual line: spacing, inferred alignment, and a run per field
    /// with proportional literal spaces between neighbors.
    fn write_group_paragraph<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        group: &FieldGroup,
        fallback: TextAlign,
        usable_height: i64,
        cursor: &mut FlowCursor,
    ) -> Result<(), ExportError> {
        let line_height = layout::line_height_twips(style::clamp_font_size(group.avg_font_size()));
        let spacing = cursor.spacing_before(group.y_position, usable_height, line_height);
        let alignment = layout::infer_alignment(group, fallback);

        emit_start(writer, "w:p")?;
        emit_start(writer, "w:pPr")?;
        emit_empty(
            writer,
            "w:spacing",
            &[
                ("w:before", spacing.to_string().as_str()),
                ("w:after", "0"),
                ("w:line", "240"),
                ("w:lineRule", "auto"),
            ],
        )?;
        emit_empty(writer, "w:jc", &[("w:val", jc_value(alignment))])?;
        emit_end(writer, "w:pPr")?;

        for (index, field) in group.fields.iter().enumerate() {
            if index > 0 {
                let previous = &group.fields[index - 1];
                let gap = " ".repeat(layout::gap_spaces(field.x() - previous.x()));
                // The gap inherits the left neighbor's styling so the line's
                // baseline doesn't wobble around the filler.
                self.write_text_run(writer, &gap, previous.font_size, &previous.color)?;
            }
            self.write_text_run(writer, &field.text, field.font_size, &field.color)?;
        }

        emit_end(writer, "w:p")
    }

    fn write_text_run<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        text: &str,
        font_size: f64,
        color: &str,
    ) -> Result<(), ExportError> {
        let half_points = (style::clamp_font_size(font_size) * 2.0).round() as i64;
        let size = half_points.to_string();
        let hex = style::normalize_hex(color);

        emit_start(writer, "w:r")?;
        emit_start(writer, "w:rPr")?;
        emit_empty(writer, "w:color", &[("w:val", hex.as_str())])?;
        emit_empty(writer, "w:sz", &[("w:val", size.as_str())])?;
        emit_empty(writer, "w:szCs", &[("w:val", size.as_str())])?;
        emit_end(writer, "w:rPr")?;

        let mut t = BytesStart::new("w:t");
        t.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(t)).map_err(xml_error)?;
        emit_text(writer, text)?;
        emit_end(writer, "w:t")?;
        emit_end(writer, "w:r")
    }

    /// Closes the current section so the next record starts a fresh page.
    /// The carrier paragraph is squeezed to a hairline so it cannot push
    /// content that sits low on the page.
    fn write_section_break<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        kind: DocumentType,
    ) -> Result<(), ExportError> {
        emit_start(writer, "w:p")?;
        emit_start(writer, "w:pPr")?;
        self.write_separator_squeeze(writer)?;
        self.write_section_properties(writer, kind)?;
        emit_end(writer, "w:pPr")?;
        emit_end(writer, "w:p")
    }

    /// Hairline spacing + tiny paragraph-mark size, shared by the two
    /// separator paragraph shapes.
    fn write_separator_squeeze<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
    ) -> Result<(), ExportError> {
        emit_empty(
            writer,
            "w:spacing",
            &[
                ("w:before", "0"),
                ("w:after", "0"),
                ("w:line", SEPARATOR_LINE_TWIPS.to_string().as_str()),
                ("w:lineRule", "exact"),
            ],
        )?;
        emit_start(writer, "w:rPr")?;
        emit_empty(writer, "w:sz", &[("w:val", "2")])?;
        emit_end(writer, "w:rPr")
    }

    fn write_section_properties<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        kind: DocumentType,
    ) -> Result<(), ExportError> {
        let geometry = kind.geometry();
        emit_start(writer, "w:sectPr")?;

        let width = geometry.width_twips().to_string();
        let height = geometry.height_twips().to_string();
        let mut size = BytesStart::new("w:pgSz");
        size.push_attribute(("w:w", width.as_str()));
        size.push_attribute(("w:h", height.as_str()));
        if geometry.orientation == Orientation::Landscape {
            size.push_attribute(("w:orient", "landscape"));
        }
        writer.write_event(Event::Empty(size)).map_err(xml_error)?;

        let (horizontal, top, bottom) = page_margins(kind);
        emit_empty(
            writer,
            "w:pgMar",
            &[
                ("w:top", top.to_string().as_str()),
                ("w:right", horizontal.to_string().as_str()),
                ("w:bottom", bottom.to_string().as_str()),
                ("w:left", horizontal.to_string().as_str()),
                ("w:header", "720"),
                ("w:footer", "720"),
                ("w:gutter", "0"),
            ],
        )?;

        emit_end(writer, "w:sectPr")
    }

    /// Label sheets: one fixed table per chunk of six records, page break
    /// between tables, leftover slots as empty styled cells.
    fn write_label_body<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        document: &DocumentData,
        records: &[Vec<MergeField>],
        grid: &LabelGrid,
        background: &str,
    ) -> Result<(), ExportError> {
        let per_page = grid.labels_per_page();
        let usable_height = grid.cell_height_twips() - 2 * CELL_PADDING_TWIPS;
        let sheet_count = records.len().div_ceil(per_page);

        for (sheet, chunk) in records.chunks(per_page).enumerate() {
            self.write_label_table(writer, document, chunk, grid, background, usable_height)?;
            if sheet + 1 != sheet_count {
                self.write_sheet_break(writer)?;
            }
        }
        Ok(())
    }

    fn write_label_table<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        document: &DocumentData,
        chunk: &[Vec<MergeField>],
        grid: &LabelGrid,
        background: &str,
        usable_height: i64,
    ) -> Result<(), ExportError> {
        let cell_width = grid.cell_width_twips();
        let table_width = (cell_width * grid.labels_per_row as i64).to_string();
        let row_height = grid.cell_height_twips().to_string();
        let column_width = cell_width.to_string();

        emit_start(writer, "w:tbl")?;
        emit_start(writer, "w:tblPr")?;
        emit_empty(writer, "w:tblW", &[("w:w", table_width.as_str()), ("w:type", "dxa")])?;
        emit_empty(writer, "w:tblLayout", &[("w:type", "fixed")])?;
        emit_end(writer, "w:tblPr")?;

        emit_start(writer, "w:tblGrid")?;
        for _ in 0..grid.labels_per_row {
            emit_empty(writer, "w:gridCol", &[("w:w", column_width.as_str())])?;
        }
        emit_end(writer, "w:tblGrid")?;

        for row in 0..grid.rows_per_page {
            emit_start(writer, "w:tr")?;
            emit_start(writer, "w:trPr")?;
            // Exact rows keep the physical grid aligned with the stock even
            // when a cell's content would prefer more room.
            emit_empty(
                writer,
                "w:trHeight",
                &[("w:val", row_height.as_str()), ("w:hRule", "exact")],
            )?;
            emit_end(writer, "w:trPr")?;

            for column in 0..grid.labels_per_row {
                let slot = row * grid.labels_per_row + column;
                self.write_label_cell(
                    writer,
                    document,
                    chunk.get(slot).map(|fields| fields.as_slice()),
                    cell_width,
                    background,
                    usable_height,
                )?;
            }
            emit_end(writer, "w:tr")?;
        }

        emit_end(writer, "w:tbl")
    }

    /// One label cell. `None` fields means a leftover slot: same width,
    /// padding, and shading as its neighbors, just nothing to say.
    fn write_label_cell<W: IoWrite>(
        &self,
        writer: &mut Writer<W>,
        document: &DocumentData,
        fields: Option<&[MergeField]>,
        cell_width: i64,
        background: &str,
        usable_height: i64,
    ) -> Result<(), ExportError> {
        let width = cell_width.to_string();
        let padding = CELL_PADDING_TWIPS.to_string();

        emit_start(writer, "w:tc")?;
        emit_start(writer, "w:tcPr")?;
        emit_empty(writer, "w:tcW", &[("w:w", width.as_str()), ("w:type", "dxa")])?;
        emit_empty(
            writer,
            "w:shd",
            &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", background)],
        )?;
        emit_start(writer, "w:tcMar")?;
        for edge in ["w:top", "w:left", "w:bottom", "w:right"] {
            emit_empty(writer, edge, &[("w:w", padding.as_str()), ("w:type", "dxa")])?;
        }
        emit_end(writer, "w:tcMar")?;
        emit_end(writer, "w:tcPr")?;

        match fields {
            Some(fields) => {
                self.write_record_paragraphs(writer, fields, document.text_align, usable_height)?
            }
            None => emit_empty(writer, "w:p", &[])?,
        }

        emit_end(writer, "w:tc")
    }

    /// Page break between two sheet tables. Also a hairline paragraph —
    /// and a required one: two adjacent `w:tbl` elements would otherwise
    /// fuse into a single table.
    fn write_sheet_break<W: IoWrite>(&self, writer: &mut Writer<W>) -> Result<(), ExportError> {
        emit_start(writer, "w:p")?;
        emit_start(writer, "w:pPr")?;
        self.write_separator_squeeze(writer)?;
        emit_end(writer, "w:pPr")?;
        emit_start(writer, "w:r")?;
        emit_empty(writer, "w:br", &[("w:type", "page")])?;
        emit_end(writer, "w:r")?;
        emit_end(writer, "w:p")
    }
}

/// Page margins as (horizontal, top, bottom) twips. Label sheets derive
/// theirs from whatever the grid leaves over, centered horizontally and
/// anchored to the stock's top edge.
fn page_margins(kind: DocumentType) -> (i64, i64, i64) {
    match kind.label_grid() {
        Some(grid) => {
            let geometry = kind.geometry();
            let horizontal = (geometry.width_twips()
                - grid.labels_per_row as i64 * grid.cell_width_twips())
                / 2;
            let top = (geometry.height_twips()
                - grid.rows_per_page as i64 * grid.cell_height_twips())
                / 2;
            (horizontal.max(0), top.max(0), SHEET_BOTTOM_MARGIN_TWIPS)
        }
        None => (PAGE_MARGIN_TWIPS, PAGE_MARGIN_TWIPS, PAGE_MARGIN_TWIPS),
    }
}

fn jc_value(alignment: TextAlign) -> &'static str {
    match alignment {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
        TextAlign::Right => "right",
    }
}

/// Wrap the finished document XML in its OPC zip container.
fn package(document_xml: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    // Fixed entry timestamps keep repeated exports byte-identical.
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS_XML.as_bytes()),
        ("word/document.xml", document_xml),
        ("word/styles.xml", STYLES_XML.as_bytes()),
        ("word/settings.xml", SETTINGS_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
    ];

    for (name, bytes) in parts {
        zip.start_file(name, options).map_err(package_error)?;
        zip.write_all(bytes).map_err(package_error)?;
    }

    let cursor = zip.finish().map_err(package_error)?;
    Ok(cursor.into_inner())
}

/// Suggested download name: the document type plus an ISO 8601 stamp made
/// filesystem-safe by swapping `:` and `.` for `-`.
pub fn suggested_filename(kind: DocumentType, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("mail-merge-{}-{}.docx", kind.as_str(), stamp)
}

/// [`suggested_filename`] stamped with the current time.
pub fn suggested_filename_now(kind: DocumentType) -> String {
    suggested_filename(kind, Utc::now())
}

fn emit_start<W: IoWrite>(writer: &mut Writer<W>, name: &str) -> Result<(), ExportError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)
}

fn emit_end<W: IoWrite>(writer: &mut Writer<W>, name: &str) -> Result<(), ExportError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

fn emit_empty<W: IoWrite>(
    writer: &mut Writer<W>,
    name: &str,
    attrs: &[(&str, &str)],
) -> Result<(), ExportError> {
    let mut element = BytesStart::new(name);
    for (key, value) in attrs {
        element.push_attribute((*key, *value));
    }
    writer.write_event(Event::Empty(element)).map_err(xml_error)
}

fn emit_text<W: IoWrite>(writer: &mut Writer<W>, text: &str) -> Result<(), ExportError> {
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)
}

fn xml_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Xml(e.to_string())
}

fn package_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Package(e.to_string())
}
