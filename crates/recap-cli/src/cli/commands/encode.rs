//! `recap encode` – write the framed upload body for a file.

use anyhow::{Context, Result};
use recap_core::multipart::{self, Boundary};
use std::path::Path;

use crate::cli::DocumentArgs;

pub fn run_encode(doc: &DocumentArgs, out: &Path) -> Result<()> {
    let meta = doc.metadata()?;
    let payload =
        std::fs::read(&doc.path).with_context(|| format!("read {}", doc.path.display()))?;
    let boundary = Boundary::generate();
    let body = multipart::encode(&meta, &boundary, &payload)?;
    std::fs::write(out, &body).with_context(|| format!("write {}", out.display()))?;
    println!("Content-Type: {}", boundary.content_type());
    println!("Content-Length: {}", body.len());
    Ok(())
}
