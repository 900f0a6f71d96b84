//! Integration tests for the tirage merge pipeline.
//!
//! These tests exercise the full path from design + dataset to DOCX output.
//! They verify:
//! - position clamping and placeholder resolution behave per contract
//! - line grouping is deterministic and alignment follows field position
//! - the import summary tracks counts without re-reading files
//! - compiled packages are structurally valid OPC/WordprocessingML
//! - multi-record exports paginate one section per record
//! - label sheets pack a fixed 2x3 grid with styled leftover cells
//! - identical inputs compile to identical bytes

use std::io::{Cursor, Read};

use tirage::dataset::{read_dataset, Dataset, DatasetRow, SummaryStatus, TableFormat};
use tirage::doctype::DocumentType;
use tirage::docx::DocxWriter;
use tirage::error::ExportError;
use tirage::layout::{group_fields_by_line, infer_alignment};
use tirage::model::{DocumentData, MergeField};
use tirage::session::DesignSession;
use tirage::style::TextAlign;

// ─── Helpers ────────────────────────────────────────────────────

fn make_field(name: &str, text: &str, x: f64, y: f64) -> MergeField {
    MergeField::new(name, text, x, y)
}

fn make_document(kind: DocumentType, fields: Vec<MergeField>) -> DocumentData {
    let mut document = DocumentData::new(kind);
    document.fields = fields;
    document
}

fn make_row(pairs: &[(&str, &str)]) -> DatasetRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn make_dataset(headers: &[&str], rows: Vec<DatasetRow>) -> Dataset {
    Dataset {
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

fn assert_valid_docx(bytes: &[u8]) {
    assert!(bytes.len() > 500, "package is implausibly small");
    assert!(bytes.starts_with(b"PK"), "missing zip magic bytes");

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("package is not a zip archive");
    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "word/document.xml",
        "word/styles.xml",
        "word/settings.xml",
        "word/_rels/document.xml.rels",
    ] {
        assert!(archive.by_name(part).is_ok(), "missing package part {part}");
    }
}

/// Pull the generated body XML out of a compiled package.
fn document_xml(bytes: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut part = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// ─── Position Clamping Tests ────────────────────────────────────

#[test]
fn test_positions_clamp_on_every_write() {
    let mut field = make_field("A", "a", 50.0, 50.0);

    field.set_position(150.0, -20.0);
    assert_eq!((field.x(), field.y()), (100.0, 0.0));

    field.set_position(f64::NAN, f64::INFINITY);
    assert_eq!((field.x(), field.y()), (50.0, 50.0), "non-finite lands mid-canvas");

    field.nudge(f64::NEG_INFINITY, 10.0);
    assert_eq!((field.x(), field.y()), (50.0, 60.0));
}

#[test]
fn test_constructor_clamps_too() {
    let field = make_field("A", "a", -3.0, 400.0);
    assert_eq!((field.x(), field.y()), (0.0, 100.0));
}

// ─── Placeholder Resolution Tests ───────────────────────────────

#[test]
fn test_resolution_rules() {
    use tirage::merge::resolve_placeholders;

    let row = make_row(&[("Name", "Ada"), ("Empty", "")]);

    assert_eq!(resolve_placeholders("Dear {{Name}},", Some(&row)), "Dear Ada,");
    assert_eq!(resolve_placeholders("{{ Name }}", Some(&row)), "Ada");
    assert_eq!(
        resolve_placeholders("{{Missing}} / {{Empty}}", Some(&row)),
        "{{Missing}} / {{Empty}}",
        "missing keys and empty values both stay verbatim"
    );
    assert_eq!(resolve_placeholders("{{name}}", Some(&row)), "{{name}}");
}

#[test]
fn test_substitution_is_single_pass() {
    use tirage::merge::resolve_placeholders;

    let row = make_row(&[("A", "{{B}}"), ("B", "never")]);
    assert_eq!(resolve_placeholders("{{A}}", Some(&row)), "{{B}}");
}

// ─── Line Grouping Tests ────────────────────────────────────────

#[test]
fn test_grouping_clusters_and_orders() {
    let fields = vec![
        make_field("a", "a", 10.0, 50.0),
        make_field("b", "b", 80.0, 52.0),
        make_field("c", "c", 50.0, 10.0),
    ];
    let groups = group_fields_by_line(&fields);

    assert_eq!(groups.len(), 2, "y=50 and y=52 share a line; y=10 does not");
    assert_eq!(groups[0].y_position, 10.0);
    assert_eq!(groups[1].y_position, 51.0);

    let xs: Vec<f64> = groups[1].fields.iter().map(|f| f.x()).collect();
    assert_eq!(xs, vec![10.0, 80.0], "group members come back left to right");
}

#[test]
fn test_grouping_is_stable_across_runs() {
    let fields = vec![
        make_field("a", "a", 70.0, 30.0),
        make_field("b", "b", 10.0, 31.0),
        make_field("c", "c", 40.0, 29.0),
        make_field("d", "d", 50.0, 80.0),
    ];

    let shape = |groups: &[tirage::layout::FieldGroup]| -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| g.fields.iter().map(|f| f.name.clone()).collect())
            .collect()
    };

    let first = shape(&group_fields_by_line(&fields));
    for _ in 0..10 {
        assert_eq!(shape(&group_fields_by_line(&fields)), first);
    }
}

// ─── Alignment Inference Tests ──────────────────────────────────

#[test]
fn test_single_field_alignment_follows_x() {
    let cases = [
        (20.0, TextAlign::Left),
        (50.0, TextAlign::Center),
        (90.0, TextAlign::Right),
    ];
    for (x, expected) in cases {
        let groups = group_fields_by_line(&[make_field("a", "a", x, 10.0)]);
        assert_eq!(
            infer_alignment(&groups[0], TextAlign::Center),
            expected,
            "x={x} should infer {expected:?}"
        );
    }
}

#[test]
fn test_multi_field_alignment_follows_spread() {
    let wide = group_fields_by_line(&[
        make_field("a", "a", 10.0, 10.0),
        make_field("b", "b", 60.0, 10.0),
    ]);
    assert_eq!(infer_alignment(&wide[0], TextAlign::Center), TextAlign::Left);

    let tight = group_fields_by_line(&[
        make_field("a", "a", 42.0, 10.0),
        make_field("b", "b", 58.0, 10.0),
    ]);
    assert_eq!(infer_alignment(&tight[0], TextAlign::Center), TextAlign::Center);
}

// ─── Import Summary Tests ───────────────────────────────────────

#[test]
fn test_summary_recomputes_without_rereading() {
    let document = make_document(
        DocumentType::Letter,
        vec![
            make_field("A", "{{A}}", 50.0, 20.0),
            make_field("B", "{{B}}", 50.0, 40.0),
            make_field("C", "{{C}}", 50.0, 60.0),
        ],
    );
    let mut session = DesignSession::with_document(document);

    let summary = session
        .import_dataset(b"A,B,C,D,E\n1,2,3,4,5\n", TableFormat::Csv)
        .unwrap();
    assert_eq!(summary.status, SummaryStatus::NeedsLayers);
    assert_eq!(summary.header_count, 5);
    assert_eq!(summary.row_count, 1);

    session.add_field("D", "{{D}}", 50.0, 70.0);
    session.add_field("E", "{{E}}", 50.0, 80.0);
    assert_eq!(session.summary().unwrap().status, SummaryStatus::Match);

    let id = session.document().fields[0].id.clone();
    session.remove_field(&id);
    assert_eq!(session.summary().unwrap().status, SummaryStatus::NeedsLayers);
}

#[test]
fn test_blank_rows_never_become_records() {
    let dataset = read_dataset(
        b"Name,City\nAda,London\n,\n  ,  \nLin,Oslo\n",
        TableFormat::Csv,
    )
    .unwrap();
    assert_eq!(dataset.rows.len(), 2, "fully blank rows are discarded");

    let document = make_document(
        DocumentType::Letter,
        vec![make_field("Name", "{{Name}}", 50.0, 20.0)],
    );
    let bytes = tirage::merge(&document, Some(&dataset)).unwrap();
    let xml = document_xml(&bytes);
    assert_eq!(count(&xml, "<w:sectPr>"), 2, "one section per surviving row");
}

// ─── Package Structure Tests ────────────────────────────────────

#[test]
fn test_package_has_all_required_parts() {
    let document = DocumentData::new(DocumentType::Letter);
    let bytes = tirage::merge(&document, None).unwrap();
    assert_valid_docx(&bytes);

    let xml = document_xml(&bytes);
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
    assert!(xml.contains(
        "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">"
    ));
    assert!(xml.ends_with("</w:document>"));
}

#[test]
fn test_identical_inputs_compile_to_identical_bytes() {
    let document = DocumentData::new(DocumentType::Certificate);
    let dataset = make_dataset(
        &["Name"],
        vec![make_row(&[("Name", "Ada")]), make_row(&[("Name", "Lin")])],
    );

    let first = tirage::merge(&document, Some(&dataset)).unwrap();
    let second = tirage::merge(&document, Some(&dataset)).unwrap();
    assert_eq!(first, second, "exports must be byte-identical");
}

#[test]
fn test_empty_record_list_is_a_hard_error() {
    let document = DocumentData::new(DocumentType::Letter);
    let err = DocxWriter::new().write(&document, &[]).unwrap_err();
    assert!(matches!(err, ExportError::NoRecords));
    assert_eq!(err.to_string(), "No documents available to export");
}

#[test]
fn test_text_is_xml_escaped() {
    let document = make_document(
        DocumentType::Letter,
        vec![make_field("Firm", "Smith & Sons <Ltd>", 50.0, 30.0)],
    );
    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("Smith &amp; Sons &lt;Ltd&gt;"));
    assert!(!xml.contains("Smith & Sons"));
}

#[test]
fn test_preview_keeps_tokens_verbatim() {
    let document = make_document(
        DocumentType::Letter,
        vec![make_field("Name", "{{Name}}", 50.0, 30.0)],
    );
    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("{{Name}}"), "unbound preview shows the token");
}

// ─── Styling Tests ──────────────────────────────────────────────

#[test]
fn test_runs_carry_color_and_halfpoint_size() {
    let mut field = make_field("Name", "Ada", 50.0, 30.0);
    field.font_size = 24.0;
    field.color = "#b45309".to_string();
    let document = make_document(DocumentType::Letter, vec![field]);

    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("<w:color w:val=\"B45309\"/>"));
    assert!(xml.contains("<w:sz w:val=\"48\"/>"), "24pt is 48 half-points");
}

#[test]
fn test_bad_colors_and_sizes_degrade_not_fail() {
    let mut field = make_field("Name", "Ada", 50.0, 30.0);
    field.font_size = 9000.0;
    field.color = "cornflower".to_string();
    let document = make_document(DocumentType::Letter, vec![field]);

    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("<w:color w:val=\"000000\"/>"), "unknown color falls to black");
    assert!(xml.contains("<w:sz w:val=\"400\"/>"), "size caps at 200pt");
}

#[test]
fn test_named_background_paints_the_page() {
    let mut document = make_document(
        DocumentType::Letter,
        vec![make_field("Name", "Ada", 50.0, 30.0)],
    );
    document.background = "mint".to_string();

    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("<w:background w:color=\"E8F5E9\"/>"));
}

#[test]
fn test_white_background_is_omitted() {
    let document = make_document(
        DocumentType::Letter,
        vec![make_field("Name", "Ada", 50.0, 30.0)],
    );
    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(!xml.contains("<w:background"));
}

#[test]
fn test_custom_background_wins_over_palette() {
    let mut document = make_document(
        DocumentType::Letter,
        vec![make_field("Name", "Ada", 50.0, 30.0)],
    );
    document.background = "mint".to_string();
    document.custom_background = Some("#abc".to_string());

    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("<w:background w:color=\"AABBCC\"/>"));
}

// ─── Vertical Reconstruction Tests ──────────────────────────────

#[test]
fn test_spacing_positions_a_mid_page_line() {
    // Letter usable height: 15840 - 2*720 = 14400 twips. A 16pt line is
    // 384 twips tall, so a field at y=50% gets 7200 - 192 before it.
    let document = make_document(
        DocumentType::Letter,
        vec![make_field("Name", "Ada", 50.0, 50.0)],
    );
    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("w:before=\"7008\""));
}

#[test]
fn test_shared_line_emits_gap_run() {
    let fields = vec![
        make_field("Left", "left", 10.0, 50.0),
        make_field("Right", "right", 20.0, 50.0),
    ];
    let document = make_document(DocumentType::Letter, fields);
    let xml = document_xml(&tirage::merge(&document, None).unwrap());

    assert_eq!(count(&xml, "<w:r>"), 3, "field, gap filler, field");
    // x-distance of 10 becomes five literal spaces.
    assert!(xml.contains(">     </w:t>"));
}

// ─── Pagination Tests ───────────────────────────────────────────

#[test]
fn test_one_section_per_record() {
    let document = make_document(
        DocumentType::Letter,
        vec![make_field("Name", "{{Name}}", 50.0, 20.0)],
    );
    let dataset = make_dataset(
        &["Name"],
        vec![
            make_row(&[("Name", "Ada")]),
            make_row(&[("Name", "Lin")]),
            make_row(&[("Name", "Mo")]),
        ],
    );

    let xml = document_xml(&tirage::merge(&document, Some(&dataset)).unwrap());
    assert_eq!(count(&xml, "<w:sectPr>"), 3, "two inline breaks plus the body close");

    // Records appear in row order.
    let ada = xml.find("Ada").unwrap();
    let lin = xml.find("Lin").unwrap();
    let mo = xml.find("Mo").unwrap();
    assert!(ada < lin && lin < mo);
}

#[test]
fn test_certificate_sections_are_landscape() {
    let document = DocumentData::new(DocumentType::Certificate);
    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("<w:pgSz w:w=\"15840\" w:h=\"12240\" w:orient=\"landscape\"/>"));
}

#[test]
fn test_envelope_uses_number_ten_geometry() {
    let document = DocumentData::new(DocumentType::Envelope);
    let xml = document_xml(&tirage::merge(&document, None).unwrap());
    assert!(xml.contains("<w:pgSz w:w=\"13680\" w:h=\"5940\" w:orient=\"landscape\"/>"));
}

// ─── Label Sheet Tests ──────────────────────────────────────────

fn label_run(names: &[&str]) -> String {
    let document = make_document(
        DocumentType::Label,
        vec![
            make_field("Name", "{{Name}}", 50.0, 20.0),
            make_field("Street", "{{Street}}", 50.0, 40.0),
            make_field("City", "{{City}}", 50.0, 55.0),
            make_field("Note", "Handle with care", 50.0, 78.0),
        ],
    );
    let rows = names
        .iter()
        .map(|name| make_row(&[("Name", *name)]))
        .collect();
    let dataset = make_dataset(&["Name"], rows);

    let bytes = tirage::merge(&document, Some(&dataset)).unwrap();
    assert_valid_docx(&bytes);
    document_xml(&bytes)
}

#[test]
fn test_seven_labels_fill_two_sheets() {
    let names = ["R1", "R2", "R3", "R4", "R5", "R6", "R7"];
    let xml = label_run(&names);

    assert_eq!(count(&xml, "<w:tbl>"), 2, "six labels per sheet, seventh starts a new one");
    assert_eq!(count(&xml, "<w:tr>"), 6, "three rows per sheet");
    assert_eq!(count(&xml, "<w:tc>"), 12, "every sheet emits its full grid");
    assert_eq!(count(&xml, "w:type=\"page\""), 1, "one break between the two sheets");

    // All seven records present, in order, with the break between R6 and R7.
    for name in names {
        assert_eq!(count(&xml, name), 1);
    }
    let r6 = xml.find("R6").unwrap();
    let page_break = xml.find("<w:br w:type=\"page\"/>").unwrap();
    let r7 = xml.find("R7").unwrap();
    assert!(r6 < page_break && page_break < r7);
}

#[test]
fn test_leftover_slots_are_styled_empty_cells() {
    let xml = label_run(&["R1", "R2", "R3", "R4", "R5", "R6", "R7"]);

    // Every cell is shaded, filled or not; the five leftovers hold a single
    // empty paragraph.
    assert_eq!(count(&xml, "<w:shd"), 12);
    assert_eq!(count(&xml, "<w:p/>"), 5);
}

#[test]
fn test_label_table_geometry() {
    let xml = label_run(&["R1"]);

    assert!(xml.contains("<w:tblW w:w=\"11520\" w:type=\"dxa\"/>"), "two 4-inch columns");
    assert_eq!(count(&xml, "<w:gridCol w:w=\"5760\"/>"), 2);
    assert!(xml.contains("<w:trHeight w:val=\"4800\" w:hRule=\"exact\"/>"));
    assert!(xml.contains("<w:tblLayout w:type=\"fixed\"/>"));
}

#[test]
fn test_label_background_shades_cells_not_page() {
    let document = {
        let mut d = make_document(
            DocumentType::Label,
            vec![make_field("Name", "Ada", 50.0, 35.0)],
        );
        d.background = "sky".to_string();
        d
    };
    let xml = document_xml(&tirage::merge(&document, None).unwrap());

    assert!(!xml.contains("<w:background"), "label sheets have no page background");
    assert!(xml.contains("<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"E3F2FD\"/>"));
}

#[test]
fn test_exactly_six_labels_is_one_sheet_no_break() {
    let xml = label_run(&["R1", "R2", "R3", "R4", "R5", "R6"]);
    assert_eq!(count(&xml, "<w:tbl>"), 1);
    assert_eq!(count(&xml, "w:type=\"page\""), 0);
    assert_eq!(count(&xml, "<w:tc>"), 6);
}

// ─── Design JSON Tests ──────────────────────────────────────────

#[test]
fn test_merge_json_end_to_end() {
    let design = r##"{
        "documentType": "letter",
        "fields": [
            { "id": "f1", "name": "Name", "text": "Dear {{Name}},",
              "fontSize": 14, "color": "#111827", "x": 14, "y": 30 }
        ],
        "textAlign": "left"
    }"##;
    let dataset = make_dataset(&["Name"], vec![make_row(&[("Name", "Ada")])]);

    let bytes = tirage::merge_json(design, Some(&dataset)).unwrap();
    assert_valid_docx(&bytes);
    let xml = document_xml(&bytes);
    assert!(xml.contains("Dear Ada,"));
    assert!(xml.contains("<w:jc w:val=\"left\"/>"), "x=14 infers left alignment");
}

#[test]
fn test_merge_json_rejects_invalid_designs() {
    assert!(tirage::merge_json("{ not json", None).is_err());

    let wrong_shape = r#"{ "documentType": "poster", "fields": [] }"#;
    assert!(tirage::merge_json(wrong_shape, None).is_err());
}

// ─── Session Round Trip ─────────────────────────────────────────

#[test]
fn test_session_import_align_export() {
    let mut session = DesignSession::new(DocumentType::Label);
    session
        .import_dataset(
            b"Name,Address\nAda Lovelace,12 Analytical Row\nLin Chee,8 Harbor Way\n",
            TableFormat::Csv,
        )
        .unwrap();
    session.align_fields_to_headers();

    let bytes = session.export().unwrap();
    assert_valid_docx(&bytes);

    let xml = document_xml(&bytes);
    assert!(xml.contains("Ada Lovelace"));
    assert!(xml.contains("8 Harbor Way"));
    assert_eq!(count(&xml, "<w:tbl>"), 1, "two records fit one sheet");

    let filename = session.export_filename();
    assert!(filename.starts_with("mail-merge-label-"));
    assert!(filename.ends_with(".docx"));
}
