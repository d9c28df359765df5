//! Excel extraction via calamine.
//!
//! The first row of each sheet is treated as the header row. Every data row
//! becomes one `header: value | header: value` line, skipping blank cells.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde_json::{json, Map, Value};

use super::types::{DocumentType, ExcelMetadata, ExtractedDocument, FormatExtractor};
use super::ExtractionError;

pub struct ExcelExtractor;

/// One parsed worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSummary {
    pub name: String,
    pub column_names: Vec<String>,
    /// Data rows, excluding the header row.
    pub rows: usize,
    pub columns: usize,
    pub lines: Vec<String>,
}

impl ExcelExtractor {
    /// Read every sheet of a workbook.
    pub fn read_sheets(&self, bytes: &[u8]) -> Result<Vec<SheetSummary>, ExtractionError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ExtractionError::ExcelParsing(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ExtractionError::ExcelParsing(format!("sheet '{name}': {e}")))?;
            sheets.push(summarize_sheet(&name, &range));
        }
        Ok(sheets)
    }
}

/// Workbook statistics across all sheets.
pub fn workbook_metadata(sheets: &[SheetSummary]) -> ExcelMetadata {
    ExcelMetadata {
        sheet_count: sheets.len(),
        total_rows: sheets.iter().map(|s| s.rows).sum(),
        total_columns: sheets.iter().map(|s| s.columns).sum(),
        sheet_names: sheets.iter().map(|s| s.name.clone()).collect(),
    }
}

/// Pull an `ExcelMetadata` back out of the structured JSON an extractor produced.
pub fn metadata_from_structured(structured: &Value) -> Option<ExcelMetadata> {
    serde_json::from_value(structured.get("metadata")?.clone()).ok()
}

pub(crate) fn summarize_sheet(name: &str, range: &Range<Data>) -> SheetSummary {
    let mut rows_iter = range.rows();

    let column_names: Vec<String> = rows_iter
        .next()
        .map(|header| header.iter().map(cell_text).collect())
        .unwrap_or_default();

    let mut lines = vec![
        format!("Sheet: {name}"),
        format!("Headers: {}", column_names.join(", ")),
    ];

    let mut data_rows = 0usize;
    for row in rows_iter {
        data_rows += 1;
        let parts: Vec<String> = row
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| {
                let value = cell_text(cell);
                if value.trim().is_empty() {
                    return None;
                }
                let header = column_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("Column {}", i + 1));
                Some(format!("{header}: {value}"))
            })
            .collect();
        if !parts.is_empty() {
            lines.push(parts.join(" | "));
        }
    }

    SheetSummary {
        name: name.to_string(),
        columns: column_names.len(),
        column_names,
        rows: data_rows,
        lines,
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

impl FormatExtractor for ExcelExtractor {
    fn doc_type(&self) -> DocumentType {
        DocumentType::Excel
    }

    fn extract_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractionError> {
        let sheets = self.read_sheets(bytes)?;
        let metadata = workbook_metadata(&sheets);

        let mut blocks = Vec::with_capacity(sheets.len());
        let mut sheet_json = Map::new();
        for sheet in &sheets {
            blocks.push(sheet.lines.join("\n"));
            sheet_json.insert(
                sheet.name.clone(),
                json!({
                    "rows": sheet.rows,
                    "columns": sheet.columns,
                    "column_names": sheet.column_names,
                }),
            );
        }
        let raw_text = blocks.join("\n\n");

        tracing::debug!(
            file_name,
            sheets = metadata.sheet_count,
            rows = metadata.total_rows,
            "Excel workbook extracted"
        );

        let structured = json!({
            "file_name": file_name,
            "metadata": metadata,
            "sheets": sheet_json,
            "text": raw_text,
        });

        Ok(ExtractedDocument {
            raw_text,
            structured,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    /// Two sheets: "Budget" (2 columns, 2 data rows) and "Crew"
    /// (3 columns, 3 data rows, one blank cell).
    pub(crate) fn make_test_xlsx() -> Vec<u8> {
        let mut workbook = Workbook::new();

        let budget = workbook.add_worksheet();
        budget.set_name("Budget").unwrap();
        budget.write_string(0, 0, "Item").unwrap();
        budget.write_string(0, 1, "Cost").unwrap();
        budget.write_string(1, 0, "Paint").unwrap();
        budget.write_number(1, 1, 120.0).unwrap();
        budget.write_string(2, 0, "Ladder").unwrap();
        budget.write_number(2, 1, 80.0).unwrap();

        let crew = workbook.add_worksheet();
        crew.set_name("Crew").unwrap();
        for (col, header) in ["Name", "Role", "Shift"].iter().enumerate() {
            crew.write_string(0, col as u16, *header).unwrap();
        }
        crew.write_string(1, 0, "Ada").unwrap();
        crew.write_string(1, 1, "Painter").unwrap();
        crew.write_string(1, 2, "Morning").unwrap();
        crew.write_string(2, 0, "Bo").unwrap();
        crew.write_string(2, 1, "Electrician").unwrap();
        crew.write_string(3, 0, "Cy").unwrap();
        crew.write_string(3, 2, "Night").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn extracts_every_sheet_of_a_workbook() {
        let extracted = ExcelExtractor
            .extract_bytes("site.xlsx", &make_test_xlsx())
            .unwrap();

        assert!(extracted.raw_text.starts_with("Sheet: Budget\nHeaders: Item, Cost"));
        assert!(extracted.raw_text.contains("Item: Paint | Cost: 120"));
        assert!(extracted.raw_text.contains("\n\nSheet: Crew\n"));
        assert!(extracted.raw_text.contains("Name: Bo | Role: Electrician"));
        assert!(extracted.raw_text.contains("Name: Cy | Shift: Night"));

        let structured = &extracted.structured;
        assert_eq!(structured["file_name"], "site.xlsx");
        assert_eq!(structured["sheets"]["Budget"]["rows"], 2);
        assert_eq!(structured["sheets"]["Crew"]["columns"], 3);
        assert_eq!(
            structured["sheets"]["Crew"]["column_names"],
            json!(["Name", "Role", "Shift"])
        );
        assert_eq!(structured["text"], extracted.raw_text.as_str());
    }

    #[test]
    fn metadata_survives_extraction() {
        let extracted = ExcelExtractor
            .extract_bytes("site.xlsx", &make_test_xlsx())
            .unwrap();
        let metadata = metadata_from_structured(&extracted.structured).unwrap();

        assert_eq!(metadata.sheet_count, 2);
        assert_eq!(metadata.total_rows, 5);
        assert_eq!(metadata.total_columns, 5);
        assert_eq!(metadata.sheet_names, vec!["Budget", "Crew"]);
    }

    fn make_range(cells: &[&[&str]]) -> Range<Data> {
        let height = cells.len() as u32;
        let width = cells.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in cells.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(value.to_string()));
                }
            }
        }
        range
    }

    #[test]
    fn first_row_becomes_headers() {
        let range = make_range(&[&["Item", "Cost"], &["Paint", "120"], &["Ladder", "80"]]);
        let sheet = summarize_sheet("Budget", &range);

        assert_eq!(sheet.column_names, vec!["Item", "Cost"]);
        assert_eq!(sheet.rows, 2);
        assert_eq!(sheet.columns, 2);
        assert_eq!(sheet.lines[0], "Sheet: Budget");
        assert_eq!(sheet.lines[1], "Headers: Item, Cost");
        assert_eq!(sheet.lines[2], "Item: Paint | Cost: 120");
    }

    #[test]
    fn blank_cells_are_skipped() {
        let range = make_range(&[&["Item", "Cost", "Note"], &["Paint", "", "urgent"]]);
        let sheet = summarize_sheet("Budget", &range);
        assert_eq!(sheet.lines[2], "Item: Paint | Note: urgent");
    }

    #[test]
    fn fully_blank_rows_produce_no_line() {
        let range = make_range(&[&["Item", "Cost"], &["", ""], &["Paint", "5"]]);
        let sheet = summarize_sheet("Budget", &range);
        assert_eq!(sheet.rows, 2);
        assert_eq!(sheet.lines.len(), 3);
    }

    #[test]
    fn metadata_totals_across_sheets() {
        let a = summarize_sheet("A", &make_range(&[&["x", "y"], &["1", "2"]]));
        let b = summarize_sheet("B", &make_range(&[&["z"], &["3"], &["4"]]));
        let metadata = workbook_metadata(&[a, b]);

        assert_eq!(metadata.sheet_count, 2);
        assert_eq!(metadata.total_rows, 3);
        assert_eq!(metadata.total_columns, 3);
        assert_eq!(metadata.sheet_names, vec!["A", "B"]);
    }

    #[test]
    fn metadata_reads_back_from_structured_json() {
        let metadata = ExcelMetadata {
            sheet_count: 1,
            total_rows: 4,
            total_columns: 2,
            sheet_names: vec!["Sheet1".into()],
        };
        let structured = json!({ "metadata": metadata });
        assert_eq!(metadata_from_structured(&structured), Some(metadata));
        assert_eq!(metadata_from_structured(&json!({})), None);
    }

    #[test]
    fn invalid_workbook_returns_error() {
        let result = ExcelExtractor.extract_bytes("broken.xlsx", b"definitely not excel");
        assert!(matches!(result, Err(ExtractionError::ExcelParsing(_))));
    }
}
