//! Plain-text extraction from Office Open XML parts (`.docx`, `.xlsx`).
//!
//! These functions operate on already-unzipped XML strings; the loader
//! takes care of opening the zip container.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Last column a worksheet may use (`XFD`).
pub const MAX_SHEET_COLUMNS: usize = 16_384;
/// Last row a worksheet may use.
pub const MAX_SHEET_ROWS: usize = 1_048_576;
/// Largest rows x columns grid [`sheet_rows`] will materialise.
pub const MAX_SHEET_CELLS: usize = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SheetError {
    #[error("cell reference {0:?} is outside the worksheet limits")]
    CellOutOfRange(String),

    #[error("sheet spans {rows} rows x {columns} columns, more than {MAX_SHEET_CELLS} cells")]
    TooLarge { rows: usize, columns: usize },
}

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:.-]+)\s*=\s*"([^"]*)""#).expect("valid regex"));
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(lt|gt|amp|quot|apos|#x[0-9a-fA-F]+|#[0-9]+);").expect("valid regex"));

static DOCX_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p\b[^>]*?(?:/>|>(.*?)</w:p>)").expect("valid regex"));
static DOCX_RUN_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\b[^>]*/>|<w:(?:br|cr)\b[^>]*/>")
        .expect("valid regex")
});

static XLSX_SHARED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<si\b[^>]*?(?:/>|>(.*?)</si>)").expect("valid regex"));
static XLSX_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<t(?:\s[^>]*)?>(.*?)</t>").expect("valid regex"));
static XLSX_PHONETIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<rPh\b.*?</rPh>").expect("valid regex"));
static XLSX_SHEET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<sheet\b([^>]*?)/?>").expect("valid regex"));
static XLSX_RELATIONSHIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Relationship\b([^>]*?)/?>").expect("valid regex"));
static XLSX_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)").expect("valid regex"));
static XLSX_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<v(?:\s[^>]*)?>(.*?)</v>").expect("valid regex"));

/// A worksheet listed in the workbook, in tab order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    /// Path of the worksheet part inside the zip container.
    pub path: String,
}

/// Decode the predefined XML entities and numeric character references.
pub fn unescape(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| match &caps[1] {
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "amp" => "&".to_string(),
            "quot" => "\"".to_string(),
            "apos" => "'".to_string(),
            reference => {
                let code = match reference.strip_prefix("#x") {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => reference[1..].parse().ok(),
                };
                code.and_then(char::from_u32).map(String::from).unwrap_or_default()
            }
        })
        .into_owned()
}

fn attributes(raw: &str) -> HashMap<&str, &str> {
    ATTRIBUTE
        .captures_iter(raw)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}

/// Paragraph texts of a `word/document.xml` part, one entry per `<w:p>`.
pub fn docx_paragraphs(document_xml: &str) -> Vec<String> {
    DOCX_PARAGRAPH
        .captures_iter(document_xml)
        .map(|para| {
            let body = para.get(1).map_or("", |m| m.as_str());
            let mut text = String::new();
            for token in DOCX_RUN_TOKEN.captures_iter(body) {
                match token.get(1) {
                    Some(run) => text.push_str(&unescape(run.as_str())),
                    None if token[0].starts_with("<w:tab") => text.push('\t'),
                    None => text.push('\n'),
                }
            }
            text
        })
        .collect()
}

/// Entries of `xl/sharedStrings.xml`, rich-text runs concatenated.
pub fn shared_strings(xml: &str) -> Vec<String> {
    XLSX_SHARED_ITEM
        .captures_iter(xml)
        .map(|item| {
            let body = item.get(1).map_or("", |m| m.as_str());
            let body = XLSX_PHONETIC.replace_all(body, "");
            XLSX_TEXT.captures_iter(&body).map(|t| unescape(&t[1])).collect::<String>()
        })
        .collect()
}

/// Sheets of `xl/workbook.xml` resolved to their part paths through
/// `xl/_rels/workbook.xml.rels`. Sheets without a resolvable part are skipped.
pub fn workbook_sheets(workbook_xml: &str, rels_xml: &str) -> Vec<SheetEntry> {
    let targets: HashMap<String, String> = XLSX_RELATIONSHIP
        .captures_iter(rels_xml)
        .filter_map(|caps| {
            let attrs = attributes(caps.get(1)?.as_str());
            Some((attrs.get("Id")?.to_string(), attrs.get("Target")?.to_string()))
        })
        .collect();

    XLSX_SHEET
        .captures_iter(workbook_xml)
        .filter_map(|caps| {
            let attrs = attributes(caps.get(1)?.as_str());
            let name = unescape(attrs.get("name")?);
            let rel_id = attrs.iter().find(|(k, _)| k.ends_with(":id")).map(|(_, v)| *v)?;
            let target = targets.get(rel_id)?;
            let path = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{target}"),
            };
            Some(SheetEntry { name, path })
        })
        .collect()
}

/// Rows of a worksheet part as cell strings.
///
/// Rows run from 1 to the last row holding a value and columns from A to the
/// last column holding a value; gaps are empty strings.
///
/// # Errors
///
/// [`SheetError::CellOutOfRange`] for a reference past `XFD1048576` and
/// [`SheetError::TooLarge`] when the filled grid would exceed
/// [`MAX_SHEET_CELLS`].
pub fn sheet_rows(sheet_xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, SheetError> {
    let mut cells: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();
    let mut max_col = 0;

    for caps in XLSX_CELL.captures_iter(sheet_xml) {
        let attrs = attributes(caps.get(1).map_or("", |m| m.as_str()));
        let Some(reference) = attrs.get("r").copied() else {
            continue;
        };
        let Some((row, col)) = parse_cell_ref(reference) else {
            continue;
        };
        if row > MAX_SHEET_ROWS || col > MAX_SHEET_COLUMNS {
            return Err(SheetError::CellOutOfRange(reference.to_string()));
        }
        let body = caps.get(2).map_or("", |m| m.as_str());
        let Some(value) = cell_value(attrs.get("t").copied(), body, shared) else {
            continue;
        };
        max_col = max_col.max(col);
        cells.entry(row).or_default().insert(col, value);
    }

    let max_row = cells.keys().next_back().copied().unwrap_or(0);
    if max_row.saturating_mul(max_col) > MAX_SHEET_CELLS {
        return Err(SheetError::TooLarge { rows: max_row, columns: max_col });
    }

    Ok((1..=max_row)
        .map(|row| {
            let values = cells.get(&row);
            (1..=max_col)
                .map(|col| values.and_then(|v| v.get(&col)).cloned().unwrap_or_default())
                .collect()
        })
        .collect())
}

fn cell_value(cell_type: Option<&str>, body: &str, shared: &[String]) -> Option<String> {
    if cell_type == Some("inlineStr") {
        let text: String = XLSX_TEXT.captures_iter(body).map(|t| unescape(&t[1])).collect();
        return Some(text);
    }

    let raw = unescape(XLSX_VALUE.captures(body)?.get(1)?.as_str());
    match cell_type {
        Some("s") => raw.trim().parse::<usize>().ok().and_then(|i| shared.get(i).cloned()),
        Some("b") => Some(if raw.trim() == "1" { "True" } else { "False" }.to_string()),
        _ => Some(raw),
    }
}

/// `"B3"` → `(3, 2)`. `None` for malformed or arithmetically overflowing
/// references.
fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let col = letters.chars().try_fold(0usize, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })?;
    let row = digits.parse().ok()?;
    Some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("AB12"), Some((12, 28)));
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("XFD1048576"), Some((1_048_576, 16_384)));
        assert_eq!(parse_cell_ref("ZZZZZZZZZZZZZZZZZZZZ1"), None);
    }

    #[test]
    fn refs_past_worksheet_limits_are_rejected() {
        let wide = r#"<c r="XFE1"><v>1</v></c>"#;
        assert_eq!(sheet_rows(wide, &[]), Err(SheetError::CellOutOfRange("XFE1".to_string())));

        let tall = r#"<c r="A1048577"><v>1</v></c>"#;
        assert!(matches!(sheet_rows(tall, &[]), Err(SheetError::CellOutOfRange(_))));

        let overflowing = r#"<c r="ZZZZZZZZZZZZZZZZZZZZ1"><v>1</v></c><c r="A1"><v>ok</v></c>"#;
        assert_eq!(sheet_rows(overflowing, &[]), Ok(vec![vec!["ok".to_string()]]));
    }

    #[test]
    fn one_distant_cell_does_not_allocate_a_huge_grid() {
        let xml = r#"<c r="XFD100"><v>1</v></c>"#;
        assert_eq!(sheet_rows(xml, &[]), Err(SheetError::TooLarge { rows: 100, columns: 16_384 }));
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(unescape("a &amp; b &lt;c&gt; &#65;&#x42;"), "a & b <c> AB");
    }

    #[test]
    fn paragraph_runs_are_concatenated() {
        let xml = r#"<w:body><w:p w:rsidR="1"><w:pPr><w:jc/></w:pPr><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t></w:r></w:p></w:body>"#;
        assert_eq!(docx_paragraphs(xml), vec!["Hello world", "", "a\tb"]);
    }

    #[test]
    fn sheet_cells_fill_gaps() {
        let shared = vec!["name".to_string(), "qty".to_string()];
        let xml = r#"<sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row><row r="3"><c r="A3" t="inlineStr"><is><t>bolt</t></is></c><c r="B3" s="2"/><c r="C3"><v>12</v></c></row></sheetData>"#;
        assert_eq!(
            sheet_rows(xml, &shared).unwrap(),
            vec![
                vec!["name".to_string(), String::new(), "qty".to_string()],
                vec![String::new(), String::new(), String::new()],
                vec!["bolt".to_string(), String::new(), "12".to_string()],
            ]
        );
    }
}
