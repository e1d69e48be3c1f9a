//! File loaders: turn an uploaded file into plain-text [`Segment`]s.
//!
//! Supported extensions are `txt`, `pdf`, `docx` and `xlsx`. PDFs yield one
//! segment per page and workbooks one segment per sheet; the other formats
//! yield a single segment. Every segment carries a `source` metadata entry
//! with the file path.
//!
//! Loading is blocking I/O and CPU work. Async callers should run it on
//! `tokio::task::spawn_blocking`.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde_json::Value;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::document::{Metadata, Segment};
use crate::error::{RagError, Result};
use crate::ooxml;

/// Metadata key holding the path the segment was loaded from.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the 0-based page number of a PDF segment.
pub const PAGE_KEY: &str = "page";
/// Metadata key holding the sheet name of a workbook segment.
pub const SHEET_KEY: &str = "sheet";

/// Extensions [`load_document`] can read.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "txt", "docx", "xlsx"];

type LoadResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Load `path` using the reader for `extension` (case-insensitive, leading
/// dot optional).
///
/// # Errors
///
/// - [`RagError::UnsupportedFileType`] for extensions without a reader.
/// - [`RagError::LoadError`] when the file cannot be read or parsed.
pub fn load_document(path: &Path, extension: &str) -> Result<Vec<Segment>> {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    let loaded = match extension.as_str() {
        "txt" => load_text(path),
        "pdf" => load_pdf(path),
        "docx" => load_docx(path),
        "xlsx" => load_xlsx(path),
        _ => return Err(RagError::UnsupportedFileType(extension)),
    };

    let segments = loaded
        .map_err(|e| RagError::LoadError { extension: extension.clone(), message: e.to_string() })?;
    debug!(path = %path.display(), %extension, segments = segments.len(), "loaded document");
    Ok(segments)
}

fn source_metadata(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(SOURCE_KEY.to_string(), Value::String(path.display().to_string()));
    metadata
}

fn load_text(path: &Path) -> LoadResult<Vec<Segment>> {
    let content = std::fs::read_to_string(path)?;
    Ok(vec![Segment::new(content, source_metadata(path))])
}

fn load_pdf(path: &Path) -> LoadResult<Vec<Segment>> {
    let bytes = std::fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| e.to_string())?;

    Ok(pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(page, text)| {
            let mut metadata = source_metadata(path);
            metadata.insert(PAGE_KEY.to_string(), Value::from(page));
            Segment::new(text, metadata)
        })
        .collect())
}

fn load_docx(path: &Path) -> LoadResult<Vec<Segment>> {
    let mut archive = open_archive(path)?;
    let document = read_entry(&mut archive, "word/document.xml")?;
    let text = ooxml::docx_paragraphs(&document).join("\n");
    Ok(vec![Segment::new(text, source_metadata(path))])
}

fn load_xlsx(path: &Path) -> LoadResult<Vec<Segment>> {
    let mut archive = open_archive(path)?;
    let workbook = read_entry(&mut archive, "xl/workbook.xml")?;
    let rels = read_entry(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let shared = read_optional_entry(&mut archive, "xl/sharedStrings.xml")?
        .map(|xml| ooxml::shared_strings(&xml))
        .unwrap_or_default();

    let mut segments = Vec::new();
    for sheet in ooxml::workbook_sheets(&workbook, &rels) {
        let xml = read_entry(&mut archive, &sheet.path)?;
        let mut text = format!("Sheet: {}\n", sheet.name);
        for row in ooxml::sheet_rows(&xml, &shared)? {
            text.push_str(&row.join("\t"));
            text.push('\n');
        }
        text.push('\n');

        let mut metadata = source_metadata(path);
        metadata.insert(SHEET_KEY.to_string(), Value::String(sheet.name));
        segments.push(Segment::new(text, metadata));
    }
    Ok(segments)
}

fn open_archive(path: &Path) -> LoadResult<ZipArchive<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> LoadResult<String> {
    read_optional_entry(archive, name)?.ok_or_else(|| format!("missing archive member {name}").into())
}

fn read_optional_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> LoadResult<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}
