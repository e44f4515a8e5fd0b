//! Host-side listener and notifier used by the CLI.

use anyhow::{Context, Result};
use recap_core::notify::{IconKind, Notifier};
use recap_core::StreamListener;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// The "original listener": writes the passed-through stream to a file, or
/// only counts it when no output path is given.
#[derive(Debug)]
pub struct FileSink {
    out: Option<(PathBuf, BufWriter<File>)>,
    bytes: u64,
    status: Option<u32>,
    error: Option<io::Error>,
}

impl FileSink {
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let out = match path {
            Some(p) => {
                let file = File::create(p).with_context(|| format!("create {}", p.display()))?;
                Some((p.to_path_buf(), BufWriter::new(file)))
            }
            None => None,
        };
        Ok(Self {
            out,
            bytes: 0,
            status: None,
            error: None,
        })
    }

    /// Flush the output and return the number of bytes received.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(err) = self.error.take() {
            let path = self.out.as_ref().map(|(p, _)| p.display().to_string());
            return Err(err).with_context(|| format!("write {}", path.unwrap_or_default()));
        }
        if let Some((path, mut writer)) = self.out.take() {
            writer
                .flush()
                .with_context(|| format!("flush {}", path.display()))?;
        }
        Ok(self.bytes)
    }

    pub fn status(&self) -> Option<u32> {
        self.status
    }
}

impl StreamListener for FileSink {
    fn on_start(&mut self) {}

    fn on_data(&mut self, chunk: &[u8], _offset: u64, length: usize) {
        let bytes = &chunk[..length.min(chunk.len())];
        self.bytes += bytes.len() as u64;
        if self.error.is_some() {
            return;
        }
        if let Some((_, writer)) = self.out.as_mut() {
            if let Err(e) = writer.write_all(bytes) {
                self.error = Some(e);
            }
        }
    }

    fn on_stop(&mut self, status: u32) {
        self.status = Some(status);
    }
}

/// Replay `path` into `listener` as start, `chunk_size` data events, stop.
/// A read error ends the stream with status 0 before it is returned.
pub fn replay<L: StreamListener>(path: &Path, listener: &mut L, chunk_size: usize) -> Result<u64> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut offset = 0u64;
    listener.on_start();
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                listener.on_stop(0);
                return Err(e).with_context(|| format!("read {}", path.display()));
            }
        };
        listener.on_data(&buf[..n], offset, n);
        offset += n as u64;
    }
    listener.on_stop(200);
    Ok(offset)
}

/// Prints notifications to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, _icon: IconKind, title: &str, message: &str) {
        println!("[{title}] {message}");
    }
}
