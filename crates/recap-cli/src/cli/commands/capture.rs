//! `recap capture` – replay a file through the tee and upload it.

use anyhow::{bail, Result};
use recap_core::{Archiver, MetadataCache, RecapConfig};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::cli::sink::{replay, FileSink, StdoutNotifier};
use crate::cli::DocumentArgs;

pub async fn run_capture(
    cfg: &RecapConfig,
    doc: &DocumentArgs,
    out: Option<&Path>,
    chunk_size: usize,
) -> Result<()> {
    let cache_path = match MetadataCache::default_path() {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!("no metadata cache location, not persisting: {:#}", e);
            None
        }
    };
    capture(cfg, doc, out, chunk_size, cache_path.as_deref()).await
}

/// Capture with the cache persisted at `cache_path`. Cache problems are
/// logged and never stop the pass-through or fail the command.
async fn capture(
    cfg: &RecapConfig,
    doc: &DocumentArgs,
    out: Option<&Path>,
    chunk_size: usize,
    cache_path: Option<&Path>,
) -> Result<()> {
    if chunk_size == 0 {
        bail!("--chunk-size must be greater than zero");
    }
    let meta = doc.metadata()?;

    let archiver = Archiver::new(
        cfg.clone(),
        Arc::new(load_cache(cache_path)),
        Arc::new(StdoutNotifier),
        Handle::current(),
    );

    let mut sink = FileSink::create(out)?;
    let replayed = {
        let mut tee = archiver.intercept(meta, &mut sink)?;
        replay(&doc.path, &mut tee, chunk_size)
    };
    let status = sink.status().unwrap_or(0);
    let forwarded = sink.finish()?;
    let replayed = replayed?;
    println!(
        "captured {} ({} bytes read, {} passed through, status {})",
        doc.path.display(),
        replayed,
        forwarded,
        status
    );

    archiver.shutdown();
    let drained = archiver.drain(cfg.drain_timeout()).await;
    if !drained {
        println!(
            "upload still running after {}s; not waiting",
            cfg.drain_timeout_secs
        );
    }

    let stats = archiver.stats();
    if stats.sessions_skipped > 0 {
        println!("upload skipped (see log for the reason)");
    } else if stats.uploads_failed > 0 {
        println!("upload failed (see log for details)");
    }

    let Some(path) = cache_path else {
        return Ok(());
    };
    if !drained {
        // A merge may still land; saving now would persist a partial cache.
        println!("metadata cache not saved: upload did not finish");
        return Ok(());
    }
    if let Err(e) = archiver.cache().save_to_path(path) {
        tracing::warn!("could not save metadata cache to {}: {:#}", path.display(), e);
        println!("metadata cache not saved (see log for details)");
        return Ok(());
    }
    println!(
        "metadata cache: {} cases, {} documents ({})",
        archiver.cache().case_count(),
        archiver.cache().document_count(),
        path.display()
    );
    Ok(())
}

fn load_cache(path: Option<&Path>) -> MetadataCache {
    let Some(path) = path else {
        return MetadataCache::new();
    };
    match MetadataCache::load_from_path(path) {
        Ok(Some(cache)) => {
            tracing::debug!("loaded metadata cache from {}", path.display());
            cache
        }
        Ok(None) => MetadataCache::new(),
        Err(e) => {
            tracing::warn!("ignoring unreadable metadata cache: {:#}", e);
            MetadataCache::new()
        }
    }
}
