//! Field-level merge of archive replies into the cache.

use crate::metadata::DocumentKind;
use crate::upload::ArchiveResponse;

use super::{write, DocumentRecord, MetadataCache};

/// What a merge touched, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub cases: usize,
    pub documents: usize,
}

impl MetadataCache {
    /// Fold a successful reply into the cache.
    ///
    /// PDF replies carry nothing to merge. HTML replies assign
    /// `officialcasenum` (and `casename` when present) per case and copy every
    /// document field, creating records on first reference. Fields the reply
    /// does not mention are left alone, so merges from different sessions
    /// never erase each other's writes.
    pub fn merge(&self, kind: DocumentKind, response: &ArchiveResponse) -> MergeSummary {
        if !kind.is_html() {
            return MergeSummary::default();
        }

        let mut summary = MergeSummary::default();

        if !response.cases.is_empty() {
            let mut cases = write(&self.cases);
            for (case_id, update) in &response.cases {
                let record = cases.entry(case_id.clone()).or_default();
                if let Some(num) = &update.official_case_num {
                    record.official_case_num = Some(num.clone());
                }
                if let Some(name) = &update.case_name {
                    record.case_name = Some(name.clone());
                }
                summary.cases += 1;
            }
        }

        if !response.documents.is_empty() {
            let mut documents = write(&self.documents);
            for (doc_id, fields) in &response.documents {
                let record = documents
                    .entry(doc_id.clone())
                    .or_insert_with(DocumentRecord::new);
                for (field, value) in fields {
                    record.set(field.clone(), value.clone());
                }
                summary.documents += 1;
            }
        }

        summary
    }
}
