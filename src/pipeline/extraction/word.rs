//! Word (.docx) extraction via docx-rs.
//!
//! A .docx file is a ZIP of XML parts; docx-rs gives a typed tree:
//! Document → Paragraph → Run → Text, and Document → Table → Row → Cell → Paragraph.
//! Paragraph text is joined with blank lines, table rows become one line of
//! space-separated cells. The joined text is also split into overlapping
//! chunks for downstream processing.
//!
//! docx-rs does not read `docProps/core.xml`, so core properties (title,
//! author, dates...) are pulled from the package directly.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use regex::Regex;
use serde_json::{json, Map, Value};
use text_splitter::{ChunkConfig, TextSplitter};

use super::types::{DocumentType, ExtractedDocument, FormatExtractor};
use super::ExtractionError;

pub const CHUNK_CHARS: usize = 1000;
pub const CHUNK_OVERLAP_CHARS: usize = 200;
pub const NO_TEXT_CHUNK: &str = "No text content found in document";
pub const NOT_AVAILABLE: &str = "Not available";

const CORE_PROPS_PART: &str = "docProps/core.xml";

/// Output key and core.xml element (local name) for each reported property.
const CORE_PROPERTIES: &[(&str, &str)] = &[
    ("title", "title"),
    ("author", "creator"),
    ("subject", "subject"),
    ("keywords", "keywords"),
    ("category", "category"),
    ("comments", "description"),
    ("created", "created"),
    ("modified", "modified"),
    ("last_modified_by", "lastModifiedBy"),
];

/// A leaf element of core.xml: `<prefix:name attrs>text</prefix:name>`.
static CORE_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:[A-Za-z]+:)?([A-Za-z]+)(?:\s[^>]*)?>([^<]*)</").unwrap()
});

pub struct WordExtractor;

impl FormatExtractor for WordExtractor {
    fn doc_type(&self) -> DocumentType {
        DocumentType::Word
    }

    fn extract_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractionError> {
        let docx = read_docx(bytes)
            .map_err(|e| ExtractionError::WordParsing(format!("{e:?}")))?;

        let mut all_text = String::new();
        let mut paragraph_count = 0usize;
        let mut paragraphs = Vec::new();
        let mut tables = Vec::new();

        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => {
                    let index = paragraph_count;
                    paragraph_count += 1;

                    let text = paragraph_text(para);
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let style = para
                        .property
                        .style
                        .as_ref()
                        .map(|s| s.val.as_str())
                        .unwrap_or("Normal");
                    paragraphs.push(json!({ "index": index, "text": text, "style": style }));
                    all_text.push_str(text);
                    all_text.push_str("\n\n");
                }
                DocumentChild::Table(table) => {
                    let rows = table_rows(table);
                    for row in &rows {
                        all_text.push_str(&row.join(" "));
                        all_text.push('\n');
                    }
                    all_text.push('\n');

                    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
                    tables.push(json!({
                        "index": tables.len(),
                        "row_count": rows.len(),
                        "column_count": column_count,
                        "rows": rows,
                    }));
                }
                _ => {}
            }
        }

        let section_count = section_count(&docx.document.children);
        let chunks = split_chunks(&all_text)?;
        let metadata = core_properties(bytes);

        let structured = json!({
            "metadata": metadata,
            "document_info": {
                "paragraph_count": paragraph_count,
                "table_count": tables.len(),
                "section_count": section_count,
                "file_size_kb": bytes.len() as f64 / 1024.0,
                "file_name": file_name,
            },
            "content": {
                "paragraphs": paragraphs,
                "tables": tables,
            },
            "text": all_text,
            "chunks": chunks,
        });

        Ok(ExtractedDocument {
            raw_text: all_text,
            structured,
        })
    }
}

/// The body's final section plus one per paragraph that closes a section.
fn section_count(children: &[DocumentChild]) -> usize {
    1 + children
        .iter()
        .filter(|child| {
            matches!(child, DocumentChild::Paragraph(p) if p.property.section_property.is_some())
        })
        .count()
}

fn split_chunks(text: &str) -> Result<Vec<String>, ExtractionError> {
    if text.trim().is_empty() {
        return Ok(vec![NO_TEXT_CHUNK.to_string()]);
    }
    let config = ChunkConfig::new(CHUNK_CHARS)
        .with_overlap(CHUNK_OVERLAP_CHARS)
        .map_err(|e| ExtractionError::WordParsing(format!("chunk config: {e}")))?;
    let splitter = TextSplitter::new(config);
    Ok(splitter.chunks(text).map(str::to_string).collect())
}

/// Core document properties, `"Not available"` for anything missing.
/// A package without a readable core part yields all defaults.
fn core_properties(bytes: &[u8]) -> Value {
    let found = read_core_xml(bytes)
        .map(|xml| parse_core_xml(&xml))
        .unwrap_or_default();

    let mut metadata = Map::new();
    for (key, element) in CORE_PROPERTIES {
        let value = found
            .iter()
            .find(|(name, value)| name == element && !value.is_empty())
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        metadata.insert((*key).to_string(), Value::String(value));
    }
    Value::Object(metadata)
}

fn read_core_xml(bytes: &[u8]) -> Option<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
    let mut part = archive.by_name(CORE_PROPS_PART).ok()?;
    let mut xml = String::new();
    if let Err(e) = part.read_to_string(&mut xml) {
        tracing::debug!(error = %e, "Unreadable core properties part");
        return None;
    }
    Some(xml)
}

/// (local element name, unescaped trimmed text) for every leaf element.
fn parse_core_xml(xml: &str) -> Vec<(String, String)> {
    CORE_ELEMENT
        .captures_iter(xml)
        .map(|c| (c[1].to_string(), unescape_xml(c[2].trim())))
        .collect()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Runs inside a paragraph belong to the same sentence, so they are
/// concatenated with no separator.
fn paragraph_text(para: &Paragraph) -> String {
    let mut parts = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let RunChild::Text(t) = rc {
                    parts.push_str(&t.text);
                }
            }
        }
    }
    parts
}

fn table_rows(table: &Table) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for row_child in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let TableChild::TableRow(row) = row_child else {
            continue;
        };
        let mut cells = Vec::new();
        for cell_child in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let TableRowChild::TableCell(cell) = cell_child else {
                continue;
            };
            let mut cell_text = Vec::new();
            for content in &cell.children {
                if let TableCellContent::Paragraph(para) = content {
                    let text = paragraph_text(para);
                    if !text.trim().is_empty() {
                        cell_text.push(text.trim().to_string());
                    }
                }
            }
            cells.push(cell_text.join(" "));
        }
        rows.push(cells);
    }
    rows
}
