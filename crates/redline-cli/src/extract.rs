//! Text extraction from contract files.
//!
//! Plain text is read as (lossy) UTF-8. PDF pages come from `lopdf`;
//! DOCX paragraphs are read from `word/document.xml` inside the archive.
//! Pages and paragraphs are joined by a blank line so the segmenter still
//! sees block boundaries.

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use tracing::{info, warn};

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:\r?\n){3,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
}

/// Decide the document kind. Magic bytes win over the declared MIME type,
/// which wins over the file extension.
pub fn detect_kind(path: &Path, declared_mime: Option<&str>, head: &[u8]) -> DocumentKind {
    if head.starts_with(b"%PDF") {
        return DocumentKind::Pdf;
    }
    if head.starts_with(b"PK\x03\x04") {
        return DocumentKind::Docx;
    }

    match declared_mime.map(|m| m.trim().to_ascii_lowercase()) {
        Some(m) if m == "application/pdf" => return DocumentKind::Pdf,
        Some(m) if m.contains("wordprocessingml") || m == "application/msword" => {
            return DocumentKind::Docx;
        }
        Some(m) if m.starts_with("text/") => return DocumentKind::PlainText,
        _ => {}
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => DocumentKind::Pdf,
        Some("docx") | Some("doc") => DocumentKind::Docx,
        _ => DocumentKind::PlainText,
    }
}

/// Read the text of the document at `path`.
pub fn extract_text(path: &Path, declared_mime: Option<&str>) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let kind = detect_kind(path, declared_mime, &bytes);

    let text = match kind {
        DocumentKind::PlainText => {
            let text = String::from_utf8_lossy(&bytes);
            BLANK_RUNS.replace_all(&text, "\n\n").into_owned()
        }
        DocumentKind::Pdf => join_blocks(pdf_pages(&bytes).with_context(|| format!("reading PDF {}", path.display()))?),
        DocumentKind::Docx => {
            join_blocks(docx_paragraphs(&bytes).with_context(|| format!("reading DOCX {}", path.display()))?)
        }
    };
    info!(path = %path.display(), ?kind, bytes = bytes.len(), chars = text.chars().count(), "extracted text");
    Ok(text)
}

/// Trimmed, non-empty blocks separated by one blank line.
fn join_blocks(blocks: Vec<String>) -> String {
    let joined = blocks
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

/// Text of every page in page order. A page that fails to decode is
/// logged and skipped.
fn pdf_pages(bytes: &[u8]) -> anyhow::Result<Vec<String>> {
    let doc = lopdf::Document::load_mem(bytes).context("parsing PDF structure")?;
    let mut pages = Vec::new();
    for page in doc.get_pages().into_keys() {
        match doc.extract_text(&[page]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!(page, error = %e, "failed to extract text from page"),
        }
    }
    Ok(pages)
}

/// Paragraph texts (`w:p`) from the main document part. Tabs and breaks
/// inside a paragraph are kept as whitespace.
fn docx_paragraphs(bytes: &[u8]) -> anyhow::Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("opening DOCX archive")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("archive has no word/document.xml")?
        .read_to_string(&mut xml)
        .context("reading word/document.xml")?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().context("parsing word/document.xml")? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().context("decoding DOCX text")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}
