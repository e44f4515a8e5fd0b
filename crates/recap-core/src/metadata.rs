//! Document metadata supplied by the interception policy before a session starts.
//!
//! The metadata is a structured record: the suggested filename (`name`) is a
//! distinct attribute carried in the file part's `filename`, and every other
//! field is an explicit, ordered `(key, value)` list that the multipart
//! encoder emits as text parts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of document types the archive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// A leaf document (PDF).
    Pdf,
    /// A docket / case index listing (HTML).
    HtmlDocket,
    /// An HTML page describing one case document.
    HtmlCaseDocument,
}

impl DocumentKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::HtmlDocket | DocumentKind::HtmlCaseDocument => "text/html",
        }
    }

    /// HTML uploads return case/document data to fold into the cache.
    pub fn is_html(self) -> bool {
        matches!(self, DocumentKind::HtmlDocket | DocumentKind::HtmlCaseDocument)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::HtmlDocket => "docket",
            DocumentKind::HtmlCaseDocument => "case-document",
        };
        f.write_str(s)
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" | "application/pdf" => Ok(DocumentKind::Pdf),
            "docket" | "html-docket" => Ok(DocumentKind::HtmlDocket),
            "case-document" | "html-case-document" => Ok(DocumentKind::HtmlCaseDocument),
            other => Err(format!("unknown document kind: {other}")),
        }
    }
}

/// Metadata for one intercepted document. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    kind: DocumentKind,
    name: String,
    fields: Vec<(String, String)>,
}

impl DocumentMetadata {
    /// Metadata with only the fields every kind carries: `mimetype` and `court`.
    pub fn new(kind: DocumentKind, court: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            fields: vec![
                ("mimetype".to_string(), kind.mime_type().to_string()),
                ("court".to_string(), court.into()),
            ],
        }
    }

    /// PDF metadata: mimetype, court, name, url.
    pub fn pdf(court: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(DocumentKind::Pdf, court, name).with_field("url", url)
    }

    /// Docket listing metadata: mimetype, court, name, casenum.
    pub fn docket(
        court: impl Into<String>,
        name: impl Into<String>,
        casenum: impl Into<String>,
    ) -> Self {
        Self::new(DocumentKind::HtmlDocket, court, name).with_field("casenum", casenum)
    }

    /// Case document page metadata: mimetype, court, name.
    pub fn case_document(court: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(DocumentKind::HtmlCaseDocument, court, name)
    }

    /// Append a field. Order is preserved on the wire.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    /// Suggested filename; never part of `fields()`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn court(&self) -> Option<&str> {
        self.get("court")
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Enumerated form fields, in wire order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
