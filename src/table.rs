//! Markdown-table parsing: pipe-delimited text → ordered rows.
//!
//! Vision models return a whole Markdown document — a title, a sentence of
//! commentary, then the table. Only the table matters here, so the parser
//! runs a three-state scan:
//!
//! ```text
//! Seeking ──(first line containing '|')──▶ HeaderPending ──(header line)──▶ Collecting
//! ```
//!
//! * **Seeking** — discard everything until a line contains a pipe. Preamble
//!   prose never reaches the table region.
//! * **HeaderPending** — inside the table region but no headers captured yet.
//!   Separator rows (`--- | ---`) are skipped; the first non-separator line
//!   becomes the header list verbatim.
//! * **Collecting** — each line with exactly as many fields as there are
//!   headers becomes a [`Row`]; anything else is dropped.
//!
//! ## Tolerance over strictness
//!
//! OCR output is noisy. A body line whose field count disagrees with the
//! header count is dropped silently rather than padded or rejected — the
//! caller gets whatever rows survived, plus [`ParsedTable::dropped`] for
//! observability. Headers are captured exactly as split, so documents with
//! leading/trailing pipes produce empty first/last header columns; callers
//! must tolerate those artifacts.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// One table record: column header → cell value, in header order.
pub type Row = IndexMap<String, String>;

/// The result of parsing a Markdown document for a pipe-delimited table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Column names from the first non-separator line of the table region,
    /// split on `|` and trimmed, kept verbatim (including empty artifacts
    /// from leading/trailing pipes).
    pub headers: Vec<String>,
    /// Body rows whose field count matched the header count.
    pub rows: Vec<Row>,
    /// Lines inside the table region dropped for a field-count mismatch.
    pub dropped: usize,
}

impl ParsedTable {
    /// Number of extracted rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows were extracted (headers may still be populated).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-serialise as a pipe-delimited Markdown table.
    ///
    /// Produces the header line, a `---` separator row, and one line per
    /// row, fields joined with ` | `. For any table this parser produced,
    /// `parse_markdown_table(&t.to_markdown())` yields the same headers and
    /// rows back.
    pub fn to_markdown(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        out.push_str(&self.headers.join(" | "));
        out.push('\n');
        out.push_str(
            &self
                .headers
                .iter()
                .map(|_| "---")
                .collect::<Vec<_>>()
                .join(" | "),
        );
        out.push('\n');

        for row in &self.rows {
            let fields: Vec<&str> = self
                .headers
                .iter()
                .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
                .collect();
            out.push_str(&fields.join(" | "));
            out.push('\n');
        }

        out
    }
}

/// Scanner position. See the module docs for the transition diagram.
enum ScanState {
    /// No pipe-bearing line seen yet; everything is preamble.
    Seeking,
    /// Inside the table region, headers not yet captured.
    HeaderPending,
    /// Headers fixed; subsequent lines are candidate body rows.
    Collecting,
}

/// Header/body divider: optional leading whitespace and framing pipe, a
/// dash run (GFM alignment colons allowed), a pipe, another dash run.
/// Matches both the framed `| --- | --- |` and unframed `--- | ---` forms.
static RE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\|?\s*:?-+:?\s*\|\s*:?-+").unwrap());

/// Parse a Markdown document into structured table rows.
///
/// Pure function: no I/O, no side effects. Empty input (or input without a
/// single `|`) yields an empty table; a header-only document yields
/// populated headers and zero rows.
pub fn parse_markdown_table(markdown: &str) -> ParsedTable {
    let mut table = ParsedTable::default();
    let mut state = ScanState::Seeking;

    for line in markdown.lines() {
        if matches!(state, ScanState::Seeking) {
            if !line.contains('|') {
                continue;
            }
            // This line begins the table region and is processed below.
            state = ScanState::HeaderPending;
        }

        if RE_SEPARATOR.is_match(line) {
            continue;
        }

        let fields: Vec<String> = line.split('|').map(|f| f.trim().to_string()).collect();

        if matches!(state, ScanState::HeaderPending) {
            // Headers are fixed once set; never replaced mid-document.
            table.headers = fields;
            state = ScanState::Collecting;
        } else if fields.len() == table.headers.len() {
            let row: Row = table.headers.iter().cloned().zip(fields).collect();
            table.rows.push(row);
        } else {
            table.dropped += 1;
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Some preamble text\n\
                          | Name | Age |\n\
                          | --- | --- |\n\
                          | Alice | 30 |\n\
                          | Bob | 25 |";

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn literal_example() {
        let table = parse_markdown_table(SAMPLE);
        assert_eq!(table.headers, vec!["", "Name", "Age", ""]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0],
            row(&[("", ""), ("Name", "Alice"), ("Age", "30")])
        );
        assert_eq!(table.rows[1], row(&[("", ""), ("Name", "Bob"), ("Age", "25")]));
        assert_eq!(table.dropped, 0);
    }

    #[test]
    fn malformed_row_is_dropped() {
        let input = format!("{SAMPLE}\n| Carol |");
        let table = parse_markdown_table(&input);
        // Same two rows as without Carol; the short line produces nothing.
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["Name"], "Bob");
        assert_eq!(table.dropped, 1);
    }

    #[test]
    fn empty_input() {
        let table = parse_markdown_table("");
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(table.dropped, 0);
    }

    #[test]
    fn document_without_table() {
        let table = parse_markdown_table("just prose\nacross two lines\n");
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn header_only_table() {
        let table = parse_markdown_table("| Name | Age |\n| --- | --- |");
        assert_eq!(table.headers, vec!["", "Name", "Age", ""]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn row_keys_equal_headers() {
        let table = parse_markdown_table("Name | Age | City\nAlice | 30 | Oslo\nBob | 25 | Turin");
        for r in &table.rows {
            let keys: Vec<&String> = r.keys().collect();
            let headers: Vec<&String> = table.headers.iter().collect();
            assert_eq!(keys, headers);
        }
    }

    #[test]
    fn framed_pipes_dedupe_to_one_empty_key() {
        // Leading and trailing pipes both split off an empty header; a map
        // can hold only one "" key, so rows carry the headers deduplicated
        // in first-occurrence order.
        let table = parse_markdown_table(SAMPLE);
        for r in &table.rows {
            let keys: Vec<&str> = r.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["", "Name", "Age"]);
        }
    }

    #[test]
    fn no_surrounding_pipes() {
        let input = "Name | Age\n--- | ---\nAlice | 30";
        let table = parse_markdown_table(input);
        assert_eq!(table.headers, vec!["Name", "Age"]);
        assert_eq!(table.rows, vec![row(&[("Name", "Alice"), ("Age", "30")])]);
    }

    #[test]
    fn framed_separator_is_not_a_data_row() {
        // `| --- | --- |` splits into ["", "---", "---", ""], which matches
        // the header count of a framed table; it must be recognised as a
        // separator, never appended as a row of dashes.
        let table = parse_markdown_table("| Name | Age |\n| --- | --- |\n| Alice | 30 |");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["Name"], "Alice");
        assert!(table.rows.iter().all(|r| r.values().all(|v| v != "---")));
    }

    #[test]
    fn alignment_colons_are_separators() {
        for sep in ["| :--- | ---: |", "|:---|:---:|", ":--- | ---:"] {
            let input = format!("| Name | Age |\n{sep}\n| Alice | 30 |");
            let table = parse_markdown_table(&input);
            assert_eq!(table.rows.len(), 1, "separator not skipped: {sep:?}");
        }
    }

    #[test]
    fn separator_before_headers_is_skipped() {
        // The first pipe-bearing line opens the region but is a separator;
        // the next line becomes the header list.
        let input = "--- | ---\nName | Age\nAlice | 30";
        let table = parse_markdown_table(input);
        assert_eq!(table.headers, vec!["Name", "Age"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn trailing_prose_is_dropped_not_fatal() {
        let input = "Name | Age\nAlice | 30\n\nThat is the whole table.";
        let table = parse_markdown_table(input);
        assert_eq!(table.rows.len(), 1);
        // blank line + prose line, both field-count mismatches
        assert_eq!(table.dropped, 2);
    }

    #[test]
    fn roundtrip_is_identity() {
        for input in [
            SAMPLE,
            "Name | Age\n--- | ---\nAlice | 30\nBob | 25",
            "| Sku | Qty | Price |\n| --- | --- | --- |\n| A-1 | 2 | 9.99 |",
        ] {
            let first = parse_markdown_table(input);
            let second = parse_markdown_table(&first.to_markdown());
            assert_eq!(first.headers, second.headers);
            assert_eq!(first.rows, second.rows);
        }
    }

    #[test]
    fn rows_serialise_in_header_order() {
        let table = parse_markdown_table("Name | Age\nAlice | 30");
        let json = serde_json::to_string(&table.rows).unwrap();
        assert_eq!(json, r#"[{"Name":"Alice","Age":"30"}]"#);
    }
}
