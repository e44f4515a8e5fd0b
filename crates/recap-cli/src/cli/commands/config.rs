//! `recap config` – show where the config lives and what is in effect.

use anyhow::Result;
use recap_core::config::{self, RecapConfig};

pub fn run_config(cfg: &RecapConfig) -> Result<()> {
    println!("config file: {}", config::config_path()?.display());
    println!("{}", serde_json::to_string_pretty(cfg)?);
    Ok(())
}
