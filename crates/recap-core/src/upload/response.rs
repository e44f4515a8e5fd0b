//! Decode the archive's reply into an `UploadResult`.
//!
//! Shape problems inside a valid object (missing `cases`, a case entry that
//! is not an object, ...) are skipped rather than reported.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::UploadError;

/// Raw HTTP outcome of an upload, before decoding.
#[derive(Debug, Clone)]
pub struct ArchiveReply {
    pub status: u32,
    pub body: Vec<u8>,
}

impl ArchiveReply {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Case fields the archive returns for a docket upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseUpdate {
    pub official_case_num: Option<String>,
    pub case_name: Option<String>,
}

/// Successful archive reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveResponse {
    pub message: Option<String>,
    pub cases: BTreeMap<String, CaseUpdate>,
    pub documents: BTreeMap<String, Map<String, Value>>,
}

pub type UploadResult = Result<ArchiveResponse, UploadError>;

pub fn decode_reply(reply: &ArchiveReply) -> UploadResult {
    if reply.status != 200 {
        return Err(UploadError::Status(reply.status));
    }
    let raw = reply.text();
    let value: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(source) => return Err(UploadError::Decode { raw, source }),
    };
    let Value::Object(obj) = value else {
        return Err(UploadError::UnexpectedShape { raw });
    };
    if let Some(err) = obj.get("error") {
        return Err(UploadError::Rejected(err.clone()));
    }

    let message = obj.get("message").and_then(scalar_to_string);

    let mut cases = BTreeMap::new();
    if let Some(entries) = obj.get("cases").and_then(Value::as_object) {
        for (case_id, entry) in entries {
            let update = CaseUpdate {
                official_case_num: entry.get("officialcasenum").and_then(scalar_to_string),
                case_name: entry.get("casename").and_then(scalar_to_string),
            };
            cases.insert(case_id.clone(), update);
        }
    }

    let mut documents = BTreeMap::new();
    if let Some(entries) = obj.get("documents").and_then(Value::as_object) {
        for (doc_id, entry) in entries {
            if let Some(fields) = entry.as_object() {
                documents.insert(doc_id.clone(), fields.clone());
            }
        }
    }

    Ok(ArchiveResponse {
        message,
        cases,
        documents,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
