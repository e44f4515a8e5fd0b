//! Tests for cache and config subcommands and metadata building.

use super::parse;
use crate::cli::CliCommand;
use std::path::Path;

#[test]
fn cli_parse_cache() {
    match parse(&["recap", "cache"]) {
        CliCommand::Cache { path } => assert!(path.is_none()),
        _ => panic!("expected Cache"),
    }
}

#[test]
fn cli_parse_cache_path() {
    match parse(&["recap", "cache", "--path", "/tmp/c.json"]) {
        CliCommand::Cache { path } => {
            assert_eq!(path.as_deref(), Some(Path::new("/tmp/c.json")))
        }
        _ => panic!("expected Cache with --path"),
    }
}

#[test]
fn cli_parse_config() {
    assert!(matches!(parse(&["recap", "config"]), CliCommand::Config));
}

fn doc_args(args: &[&str]) -> crate::cli::DocumentArgs {
    match parse(args) {
        CliCommand::Capture { doc, .. } => doc,
        _ => panic!("expected Capture"),
    }
}

#[test]
fn pdf_metadata_defaults_name_to_file_name() {
    let doc = doc_args(&[
        "recap", "capture", "/x/1234567890.pdf", "--court", "cacd", "--url", "/doc1/1",
    ]);
    let meta = doc.metadata().unwrap();
    assert_eq!(meta.name(), "1234567890.pdf");
    assert_eq!(
        meta.fields().collect::<Vec<_>>(),
        vec![
            ("mimetype", "application/pdf"),
            ("court", "cacd"),
            ("url", "/doc1/1")
        ]
    );
}

#[test]
fn pdf_metadata_requires_url() {
    let doc = doc_args(&["recap", "capture", "a.pdf", "--court", "cacd"]);
    assert!(doc.metadata().is_err());
}

#[test]
fn docket_metadata_requires_casenum_and_keeps_extra_fields() {
    let doc = doc_args(&[
        "recap", "capture", "d.html", "--kind", "docket", "--court", "nysd",
    ]);
    assert!(doc.metadata().is_err());

    let doc = doc_args(&[
        "recap", "capture", "d.html", "--kind", "docket", "--court", "nysd", "--casenum", "7",
        "--field", "extra=1",
    ]);
    let meta = doc.metadata().unwrap();
    assert_eq!(meta.get("casenum"), Some("7"));
    assert_eq!(meta.get("extra"), Some("1"));
    assert_eq!(meta.mime_type(), "text/html");
}
