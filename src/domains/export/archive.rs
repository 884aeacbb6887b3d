use std::path::Path;

use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, DeflateOption, ZipEntryBuilder};
use chrono::{DateTime, Utc};
use futures::io::AsyncWriteExt as _;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::domains::export::slug::slugify;
use crate::domains::export::types::ExportError;

/// Download metadata for the streamed archive, computed before streaming so
/// the HTTP layer can emit headers first.
#[derive(Debug, Clone)]
pub struct ExportAttachment {
    pub filename: String,
}

impl ExportAttachment {
    pub fn new(title: &str, project_id: Uuid, generated_at: DateTime<Utc>) -> Self {
        let slug = match slugify(title) {
            s if s.is_empty() => "project".to_string(),
            s => s,
        };
        let timestamp = generated_at.format("%Y%m%dT%H%M%S");
        Self {
            filename: format!("{slug}-{project_id}-{timestamp}.zip"),
        }
    }

    pub fn content_type(&self) -> &'static str {
        "application/zip"
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Stream a maximum-compression ZIP of the workspace contents to `sink`,
/// flattened at the archive root.
///
/// Unreadable directory entries are logged and skipped; ZIP-layer and sink
/// errors abort the stream and surface to the caller. This function does not
/// remove the workspace; the caller owns cleanup so it also fires when the
/// future is dropped mid-stream.
pub async fn stream_workspace<W>(root: &Path, sink: W) -> Result<(), ExportError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut zip = ZipFileWriter::with_tokio(sink);
    let mut buf = vec![0u8; 64 * 1024];

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Non-fatal: a vanished or unreadable entry degrades the
                // bundle, not the stream.
                warn!("Skipping unreadable workspace entry: {e}");
                continue;
            }
        };
        if entry.path() == root {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            // Directory entries keep empty skeleton directories present
            // after extraction.
            let builder = ZipEntryBuilder::new(format!("{name}/").into(), Compression::Stored);
            zip.write_entry_whole(builder, &[]).await?;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let builder = ZipEntryBuilder::new(name.clone().into(), Compression::Deflate)
            .deflate_option(DeflateOption::Maximum);
        let mut entry_writer = zip.write_entry_stream(builder).await?;

        let mut file = tokio::fs::File::open(entry.path()).await?;
        copy_chunked(&mut file, &mut entry_writer, &mut buf).await?;
        entry_writer.close().await?;
        debug!("Archived {name}");
    }

    zip.close().await?;
    Ok(())
}

async fn copy_chunked<R, W>(
    reader: &mut R,
    writer: &mut W,
    buf: &mut [u8],
) -> Result<(), ExportError>
where
    R: AsyncRead + Unpin,
    W: futures::io::AsyncWrite + Unpin,
{
    loop {
        let n = reader.read(buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
    }
}
