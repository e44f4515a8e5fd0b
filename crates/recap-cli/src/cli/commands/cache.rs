//! `recap cache` – print the persisted metadata cache.

use anyhow::Result;
use recap_core::MetadataCache;
use std::path::Path;

pub fn run_cache(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => MetadataCache::default_path()?,
    };
    match MetadataCache::load_from_path(&path)? {
        Some(cache) => println!("{}", serde_json::to_string_pretty(&cache.snapshot())?),
        None => println!("No metadata cache at {}.", path.display()),
    }
    Ok(())
}
