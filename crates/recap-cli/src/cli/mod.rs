//! CLI for the RECAP capture pipeline.
//!
//! Stands in for the browser host: a local file is replayed as the
//! intercepted response stream, passed through to an output file and
//! uploaded to the archive.

mod commands;
mod sink;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use recap_core::config;
use recap_core::{DocumentKind, DocumentMetadata};
use std::path::{Path, PathBuf};

use commands::{run_cache, run_capture, run_config, run_encode};

/// Top-level CLI for RECAP.
#[derive(Debug, Parser)]
#[command(name = "recap")]
#[command(about = "RECAP: capture court documents and share them with the public archive", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Replay a file through the capture pipeline and upload it.
    Capture {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Write the passed-through stream here (default: discard).
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Bytes per data event.
        #[arg(long, default_value = "65536", value_name = "N")]
        chunk_size: usize,
    },

    /// Frame a file as the multipart upload body without sending it.
    Encode {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Where to write the framed body.
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },

    /// Print the persisted metadata cache as JSON.
    Cache {
        /// Cache file (default: ~/.local/state/recap/metadata_cache.json).
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Show the config file path and effective configuration.
    Config,
}

/// The document being captured and its metadata.
#[derive(Debug, Clone, Args)]
pub struct DocumentArgs {
    /// File to replay as the response body.
    pub path: PathBuf,

    /// Document kind: pdf, docket or case-document.
    #[arg(long, default_value = "pdf")]
    pub kind: DocumentKind,

    /// Court identifier (e.g. cacd).
    #[arg(long)]
    pub court: String,

    /// Suggested filename (default: the file's own name).
    #[arg(long)]
    pub name: Option<String>,

    /// Document URL on the court site (pdf).
    #[arg(long)]
    pub url: Option<String>,

    /// Case number (docket).
    #[arg(long)]
    pub casenum: Option<String>,

    /// Extra text field, repeatable.
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

impl DocumentArgs {
    pub fn metadata(&self) -> Result<DocumentMetadata> {
        let name = match &self.name {
            Some(n) => n.clone(),
            None => file_name(&self.path)?,
        };
        let mut meta = match self.kind {
            DocumentKind::Pdf => {
                let Some(url) = &self.url else {
                    bail!("--url is required for pdf documents");
                };
                DocumentMetadata::pdf(&self.court, name, url)
            }
            DocumentKind::HtmlDocket => {
                let Some(casenum) = &self.casenum else {
                    bail!("--casenum is required for docket documents");
                };
                DocumentMetadata::docket(&self.court, name, casenum)
            }
            DocumentKind::HtmlCaseDocument => DocumentMetadata::case_document(&self.court, name),
        };
        for (key, value) in &self.fields {
            meta = meta.with_field(key, value);
        }
        Ok(meta)
    }
}

fn file_name(path: &Path) -> Result<String> {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => Ok(n.to_string()),
        None => bail!("cannot derive a name from {}; pass --name", path.display()),
    }
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Capture {
                doc,
                out,
                chunk_size,
            } => run_capture(&cfg, &doc, out.as_deref(), chunk_size).await?,
            CliCommand::Encode { doc, out } => run_encode(&doc, &out)?,
            CliCommand::Cache { path } => run_cache(path.as_deref())?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
