//! Source file parsing and text extraction.
//!
//! Extractors work on a staged file path and return text page by page.
//! The extractor is chosen from the file extension.

use crate::types::PageText;
use orbit_core::{AppError, AppResult};
use scraper::Html;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Pdf,
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Turns a file on disk into page texts.
pub trait TextExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn extract(&self, path: &Path) -> AppResult<Vec<PageText>>;
}

/// PDF extraction via `pdf-extract`, one entry per page.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extract(&self, path: &Path) -> AppResult<Vec<PageText>> {
        let pages = pdf_extract::extract_text_by_pages(path)
            .map_err(|e| AppError::Other(format!("Failed to extract PDF text: {}", e)))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText::new(i as u32 + 1, text))
            .collect())
    }
}

/// Plain UTF-8 text, optionally cleaned of light markup.
#[derive(Debug, Clone, Copy)]
pub struct TextFileExtractor {
    content_type: ContentType,
}

impl TextFileExtractor {
    pub fn new(content_type: ContentType) -> Self {
        Self { content_type }
    }
}

impl TextExtractor for TextFileExtractor {
    fn name(&self) -> &'static str {
        self.content_type.as_str()
    }

    fn extract(&self, path: &Path) -> AppResult<Vec<PageText>> {
        let bytes = fs::read(path)?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| AppError::Other("File is not valid UTF-8 text".to_string()))?;

        if !is_likely_text(&raw) {
            return Err(AppError::Other("Binary file not supported".to_string()));
        }

        let cleaned = match self.content_type {
            ContentType::Markdown => clean_markdown(&raw),
            ContentType::Html => clean_html(&raw),
            _ => raw,
        };

        Ok(vec![PageText::new(1, cleaned)])
    }
}

/// Extractors keyed by lowercase file extension.
#[derive(Clone)]
pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn TextExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("pdf", Arc::new(PdfExtractor));
        let text: Arc<dyn TextExtractor> = Arc::new(TextFileExtractor::new(ContentType::PlainText));
        registry.register("txt", text.clone());
        registry.register("text", text);
        let markdown: Arc<dyn TextExtractor> =
            Arc::new(TextFileExtractor::new(ContentType::Markdown));
        registry.register("md", markdown.clone());
        registry.register("markdown", markdown);
        let html: Arc<dyn TextExtractor> = Arc::new(TextFileExtractor::new(ContentType::Html));
        registry.register("html", html.clone());
        registry.register("htm", html);
        registry
    }
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    pub fn register(&mut self, extension: &str, extractor: Arc<dyn TextExtractor>) {
        self.by_extension
            .insert(extension.to_ascii_lowercase(), extractor);
    }

    /// Extractor for a file name or path, if its extension is known.
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn TextExtractor>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).cloned()
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.by_extension.keys().cloned().collect();
        exts.sort();
        exts
    }
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        // Remove markdown headers
        let trimmed = line.trim_start_matches('#').trim();

        // Skip horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Elements whose text never reaches the index.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Clean HTML down to its visible text, with entities decoded.
fn clean_html(text: &str) -> String {
    let document = Html::parse_document(text);
    let mut result = String::with_capacity(text.len());

    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            result.push_str(fragment);
            // Keep words on either side of a tag apart
            result.push(' ');
        }
    }

    // Collapse whitespace
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check if text is likely UTF-8 text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_path(Path::new("a.PDF")), ContentType::Pdf);
        assert_eq!(
            ContentType::from_path(Path::new("file.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("file.txt")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::from_path(Path::new("file.docx")),
            ContentType::Unknown
        );
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\nMore text";
        let output = clean_markdown(input);
        assert!(output.contains("Header"));
        assert!(output.contains("Some text"));
        assert!(output.contains("More text"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_clean_html() {
        let input = "<html><body><p>Hello <b>world</b></p></body></html>";
        assert_eq!(clean_html(input), "Hello world");
    }

    #[test]
    fn test_clean_html_drops_scripts_and_handles_unicode() {
        let input = "<p>Café</p><SCRIPT>var x = 1;</SCRIPT><p>naïve</p>";
        assert_eq!(clean_html(input), "Café naïve");
    }

    #[test]
    fn test_clean_html_keeps_text_after_stray_angle_bracket() {
        let input = "<p>Teams of size < 5 get a mentor. Larger teams get two.</p>";
        assert_eq!(
            clean_html(input),
            "Teams of size < 5 get a mentor. Larger teams get two."
        );
    }

    #[test]
    fn test_clean_html_decodes_entities() {
        let input = "<p>Design &amp; Code &lt;Sprint&gt;</p><style>p { color: red; }</style>";
        assert_eq!(clean_html(input), "Design & Code <Sprint>");
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = ExtractorRegistry::default();
        assert_eq!(
            registry.for_path(Path::new("report.PDF")).unwrap().name(),
            "pdf"
        );
        assert_eq!(
            registry.for_path(Path::new("notes.md")).unwrap().name(),
            "markdown"
        );
        assert!(registry.for_path(Path::new("image.png")).is_none());
        assert!(registry.for_path(Path::new("no_extension")).is_none());
        assert!(registry.extensions().contains(&"html".to_string()));
    }

    #[test]
    fn test_text_extractor_single_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("about.txt");
        fs::write(&path, "  CollabCircle was founded in 2023.  ").unwrap();

        let pages = TextFileExtractor::new(ContentType::PlainText)
            .extract(&path)
            .unwrap();
        assert_eq!(pages, vec![PageText::new(1, "  CollabCircle was founded in 2023.  ")]);
    }

    #[test]
    fn test_text_extractor_rejects_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob.txt");
        fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();

        let result = TextFileExtractor::new(ContentType::PlainText).extract(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_pdf_extractor_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"this is not a pdf").unwrap();

        assert!(PdfExtractor.extract(&path).is_err());
    }
}
