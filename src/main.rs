//! # Tirage CLI
//!
//! Usage:
//!   tirage design.json --data people.csv -o merged.docx
//!   echo '{ ... }' | tirage -o merged.docx
//!   tirage --example > certificate.json

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use tirage::dataset::{self, ImportSummary, SummaryStatus};
use tirage::docx;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // Handle --example flag
    if args.iter().any(|a| a == "--example") {
        print!("{}", example_certificate_json());
        return;
    }

    // Read the design
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).expect("Failed to read design file")
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).expect("Failed to read stdin");
        buf
    };

    let document = match tirage::model::parse_design(&input) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    // Optional dataset
    let data_path = args.windows(2).find(|w| w[0] == "--data").map(|w| w[1].clone());
    let dataset = match &data_path {
        Some(path) => match dataset::read_dataset_file(Path::new(path)) {
            Ok(data) => Some(data),
            Err(e) => {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    if let Some(data) = &dataset {
        let summary =
            ImportSummary::compute(data.headers.len(), document.fields.len(), data.rows.len());
        eprintln!(
            "  {} column(s), {} field(s), {} row(s) — {}",
            summary.header_count,
            summary.layer_count,
            summary.row_count,
            describe_status(summary.status)
        );
    } else {
        eprintln!("  no dataset — compiling a single preview record");
    }

    // Parse output path
    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| docx::suggested_filename_now(document.document_type));

    // Merge
    match tirage::merge(&document, dataset.as_ref()) {
        Ok(docx_bytes) => {
            fs::write(&output_path, &docx_bytes).expect("Failed to write document");
            eprintln!("✓ Written {} bytes to {}", docx_bytes.len(), output_path);
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

fn describe_status(status: SummaryStatus) -> &'static str {
    match status {
        SummaryStatus::Match => "columns and fields match",
        SummaryStatus::NeedsLayers => "more columns than fields; some data has nowhere to land",
        SummaryStatus::UnusedLayers => "more fields than columns; some fields will not resolve",
    }
}

fn example_certificate_json() -> &'static str {
    r##"{
  "documentType": "certificate",
  "fields": [
    {
      "id": "title",
      "name": "Title",
      "text": "Certificate of Achievement",
      "fontSize": 34,
      "color": "#1F2937",
      "x": 50,
      "y": 16,
      "visible": true
    },
    {
      "id": "lead-in",
      "name": "Lead-in",
      "text": "This certificate is proudly presented to",
      "fontSize": 12,
      "color": "#6B7280",
      "x": 50,
      "y": 34,
      "visible": true
    },
    {
      "id": "recipient",
      "name": "Recipient",
      "text": "{{Name}}",
      "fontSize": 28,
      "color": "#B45309",
      "x": 50,
      "y": 46,
      "visible": true
    },
    {
      "id": "reason",
      "name": "Reason",
      "text": "in recognition of {{Achievement}}",
      "fontSize": 13,
      "color": "#374151",
      "x": 50,
      "y": 60,
      "visible": true
    },
    {
      "id": "date",
      "name": "Date",
      "text": "{{Date}}",
      "fontSize": 11,
      "color": "#374151",
      "x": 22,
      "y": 82,
      "visible": true
    },
    {
      "id": "signature",
      "name": "Signature",
      "text": "{{Presenter}}",
      "fontSize": 11,
      "color": "#374151",
      "x": 78,
      "y": 82,
      "visible": true
    }
  ],
  "accent": "slate",
  "background": "ivory",
  "customBackground": null,
  "textAlign": "center"
}
"##
}
