//! Knowledge-base document loading and chunking

use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use cg_core::{Error, IndexingConfig, KnowledgeChunk, Result};

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));
static TRAILING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m) +$").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Separators tried from coarsest to finest when looking for a chunk end
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Read a document as plain text
///
/// `.pdf` files go through pdf-extract, `.md` files through pulldown-cmark,
/// anything else is read as UTF-8.
pub fn load_document(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("knowledge base document not found: {}", path.display()),
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let raw = match extension.as_str() {
        "pdf" => pdf_extract::extract_text(path)
            .map_err(|e| Error::Serialization(format!("failed to extract PDF text: {}", e)))?,
        "md" | "markdown" => markdown_to_text(&std::fs::read_to_string(path)?),
        _ => std::fs::read_to_string(path)?,
    };

    Ok(normalize_text(&raw))
}

fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::CodeBlock) => text.push_str("\n\n"),
            _ => {}
        }
    }

    text
}

/// Collapse extraction noise: CRLF, form feeds, runs of spaces, blank lines
pub fn normalize_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n").replace('\x0c', "\n\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Splits documents into overlapping chunks
///
/// Chunks are at most `chunk_size` characters. Each chunk ends at the
/// coarsest separator that still leaves room for the overlap, and the next
/// chunk starts `chunk_overlap` characters before that end.
#[derive(Debug, Clone, Default)]
pub struct DocumentIngestor {
    config: IndexingConfig,
}

impl DocumentIngestor {
    pub fn new(config: IndexingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    /// Load and chunk a document
    pub fn ingest(&self, path: &Path) -> Result<Vec<KnowledgeChunk>> {
        let text = load_document(path)?;
        Ok(self.chunk_text(&text))
    }

    /// Split text into chunks with ids in document order
    pub fn chunk_text(&self, text: &str) -> Vec<KnowledgeChunk> {
        let chars: Vec<char> = text.chars().collect();
        let size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap.min(size - 1);

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let mut end = (start + size).min(chars.len());
            if end < chars.len() {
                end = Self::split_point(&chars, start, end, overlap);
            }

            let window = &chars[start..end];
            let leading = window.iter().take_while(|c| c.is_whitespace()).count();
            let chunk_text: String = window.iter().collect();
            let chunk_text = chunk_text.trim();

            if !chunk_text.is_empty() {
                chunks.push(KnowledgeChunk {
                    id: chunks.len(),
                    text: chunk_text.to_string(),
                    source_offset: start + leading,
                });
            }

            if end >= chars.len() {
                break;
            }

            let next = end.saturating_sub(overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }

    /// Latest separator end inside `(start + overlap, end]`, or `end`
    fn split_point(chars: &[char], start: usize, end: usize, overlap: usize) -> usize {
        for separator in SEPARATORS {
            let sep: Vec<char> = separator.chars().collect();
            let mut i = end;
            while i >= start + sep.len() && i > start + overlap {
                if chars[i - sep.len()..i] == sep[..] {
                    return i;
                }
                i -= 1;
            }
        }
        end
    }
}
