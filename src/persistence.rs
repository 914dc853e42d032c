//! Persistence layer for the chunk table.
//!
//! Supports both JSON (human-readable) and bincode (efficient binary) formats,
//! plus a CSV export for eyeballing segmentation results.

use crate::error::{RagError, Result};
use crate::segment::Chunk;
use std::fs;
use std::path::Path;

/// Default filename for the chunk table.
pub const DEFAULT_CHUNKS_FILENAME: &str = "chunks.json";

/// Save format for chunk tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json,
        }
    }
}

/// Save a chunk table, picking the format from the file extension.
pub fn save_chunks(chunks: &[Chunk], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let data = match SaveFormat::from_path(path) {
        SaveFormat::Json => serde_json::to_string_pretty(chunks)
            .map_err(|e| RagError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::encode_to_vec(chunks, config)
                .map_err(|e| RagError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| RagError::io(path, e))?;
    tracing::debug!(path = %path.display(), chunks = chunks.len(), "chunk table saved");

    Ok(())
}

/// Load a chunk table saved by [`save_chunks`].
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let data = fs::read(path).map_err(|e| RagError::io(path, e))?;

    let chunks = match SaveFormat::from_path(path) {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| RagError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (chunks, _): (Vec<Chunk>, usize) = bincode::decode_from_slice(&data, config)
                .map_err(|e| RagError::Serialization(e.to_string()))?;
            chunks
        }
    };

    Ok(chunks)
}

/// Write the chunk table as CSV with columns `chunk_id,text_content,source_document`.
pub fn export_chunks_csv(chunks: &[Chunk], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| RagError::Serialization(e.to_string()))?;
    writer
        .write_record(["chunk_id", "text_content", "source_document"])
        .map_err(|e| RagError::Serialization(e.to_string()))?;
    for chunk in chunks {
        writer
            .write_record([&chunk.chunk_id, &chunk.text, &chunk.source_document])
            .map_err(|e| RagError::Serialization(e.to_string()))?;
    }
    writer.flush().map_err(|e| RagError::io(path, e))?;

    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk {
                chunk_id: "acta.txt_0000".to_string(),
                text: "Primera frase. Segunda, con coma.".to_string(),
                source_document: "acta.txt".to_string(),
            },
            Chunk {
                chunk_id: "acta.txt_0001".to_string(),
                text: "Tercera \"citada\".".to_string(),
                source_document: "acta.txt".to_string(),
            },
        ]
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("chunks.json");

        save_chunks(&sample_chunks(), &path).unwrap();
        assert_eq!(load_chunks(&path).unwrap(), sample_chunks());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("acta.txt_0001"));
    }

    #[test]
    fn test_save_and_load_bincode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunks.bin");

        save_chunks(&sample_chunks(), &path).unwrap();
        assert_eq!(load_chunks(&path).unwrap(), sample_chunks());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SaveFormat::from_path(Path::new("c.json")), SaveFormat::Json);
        assert_eq!(SaveFormat::from_path(Path::new("c.bin")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("c.bincode")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("c")), SaveFormat::Json);
    }

    #[test]
    fn test_load_nonexistent() {
        assert!(matches!(
            load_chunks(Path::new("/nonexistent/chunks.json")),
            Err(RagError::Io { .. })
        ));
    }

    #[test]
    fn test_csv_export_quotes_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunks_debug.csv");

        export_chunks_csv(&sample_chunks(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("chunk_id,text_content,source_document"));
        assert_eq!(
            lines.next(),
            Some("acta.txt_0000,\"Primera frase. Segunda, con coma.\",acta.txt")
        );
        assert_eq!(lines.next(), Some("acta.txt_0001,\"Tercera \"\"citada\"\".\",acta.txt"));
    }
}
