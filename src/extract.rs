//! Multi-format text extraction for uploaded files.
//!
//! Uploads arrive as a name, an optional MIME type, and raw bytes; this module
//! returns plain UTF-8 text or fails without touching any shared state.
//!
//! | Format | Detection | Method |
//! |--------|-----------|--------|
//! | Plain text | `.txt`, `text/*` | UTF-8 (lossy) |
//! | Markdown | `.md` | UTF-8 (lossy) |
//! | PDF | `.pdf`, `application/pdf` | pdf-extract, page by page |
//! | Word | `.docx`, wordprocessingml MIME | `word/document.xml` runs via quick-xml |
//!
//! # Known limitations
//!
//! Word extraction reads only the main document part. Tables are flattened to
//! their cell paragraphs; headers, footers, footnotes, comments, text boxes
//! and embedded objects are not extracted. A `.docx` that is not a valid ZIP
//! container fails instead of being read as raw bytes.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Upload;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Extensions accepted at the upload boundary.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "md"];

/// Separator between consecutive PDF pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PlainText,
    Markdown,
    Pdf,
    Docx,
}

impl FileKind {
    /// Resolve the format from the file name, falling back to the MIME type.
    pub fn detect(name: &str, mime_type: Option<&str>) -> Option<Self> {
        let by_extension = extension_of(name).and_then(|ext| match ext.as_str() {
            "txt" => Some(FileKind::PlainText),
            "md" => Some(FileKind::Markdown),
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            _ => None,
        });
        by_extension.or_else(|| match mime_type? {
            MIME_PDF => Some(FileKind::Pdf),
            MIME_DOCX => Some(FileKind::Docx),
            MIME_MARKDOWN => Some(FileKind::Markdown),
            m if m.starts_with("text/") => Some(FileKind::PlainText),
            _ => None,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::PlainText => "TXT",
            FileKind::Markdown => "MD",
            FileKind::Pdf => "PDF",
            FileKind::Docx => "DOCX",
        }
    }
}

/// Lower-cased extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether a file name carries one of the accepted extensions.
pub fn has_supported_extension(name: &str) -> bool {
    extension_of(name)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Extract plain text from an upload.
pub fn extract(upload: &Upload) -> Result<String> {
    let kind = FileKind::detect(&upload.name, upload.mime_type.as_deref()).ok_or_else(|| {
        Error::UnsupportedFormat(
            upload
                .mime_type
                .clone()
                .or_else(|| extension_of(&upload.name).map(|e| format!(".{}", e)))
                .unwrap_or_else(|| upload.name.clone()),
        )
    })?;
    debug!(name = %upload.name, kind = kind.label(), bytes = upload.size(), "extracting");
    extract_bytes(&upload.bytes, kind)
}

pub fn extract_bytes(bytes: &[u8], kind: FileKind) -> Result<String> {
    match kind {
        FileKind::PlainText | FileKind::Markdown => Ok(String::from_utf8_lossy(bytes).into_owned()),
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Docx => extract_docx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::extraction("PDF", e))?;
    debug!(pages = pages.len(), "decoded pdf");
    Ok(join_pages(&pages))
}

/// Trim each page and join them in order with [`PAGE_SEPARATOR`].
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>> {
    let entry = archive
        .by_name(name)
        .map_err(|e| Error::extraction("DOCX", format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| Error::extraction("DOCX", e))?;
    if out.len() as u64 >= max_bytes {
        return Err(Error::extraction(
            "DOCX",
            format!("ZIP entry {} exceeds size limit ({} bytes)", name, max_bytes),
        ));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| Error::extraction("DOCX", e))?;
    let xml = read_zip_entry_bounded(&mut archive, DOCX_BODY_PART, MAX_XML_ENTRY_BYTES)?;
    docx_body_text(&xml)
}

/// Collect `w:t` runs, ending each `w:p` paragraph with a newline.
fn docx_body_text(xml: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| Error::extraction("DOCX", e))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::extraction("DOCX", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}
