use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Archive endpoint used when the config file does not override it.
pub const DEFAULT_UPLOAD_URL: &str = "https://recapextension.org/recap/upload/";

/// Global configuration loaded from `~/.config/recap/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecapConfig {
    /// Archive endpoint that receives the multipart POST.
    pub upload_url: String,
    /// Seconds to wait for the archive connection before giving up.
    pub connect_timeout_secs: u64,
    /// Hard timeout for one upload (request + response), in seconds.
    pub timeout_secs: u64,
    /// Largest document (framing included) a session will buffer for upload.
    /// Larger streams still pass through to the sink; only the upload is skipped.
    pub max_upload_bytes: u64,
    /// How long `recap capture` waits for in-flight uploads before exiting.
    pub drain_timeout_secs: u64,
    /// Optional User-Agent for archive requests (None = curl default).
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for RecapConfig {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            connect_timeout_secs: 15,
            timeout_secs: 300,
            max_upload_bytes: 256 * 1024 * 1024,
            drain_timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl RecapConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Reject configs the uploader cannot use (bad URL, non-HTTP scheme, zero limits).
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.upload_url)
            .with_context(|| format!("invalid upload_url: {}", self.upload_url))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("upload_url must be http or https, got {}", parsed.scheme());
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than zero");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("recap")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RecapConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RecapConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: RecapConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
