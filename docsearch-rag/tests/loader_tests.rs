//! Loader tests against small files written to a temp directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use docsearch_rag::error::RagError;
use docsearch_rag::loader::load_document;
use serde_json::json;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn write_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (entry, body) in entries {
        zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

#[test]
fn loads_text_file_as_one_segment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello\nworld").unwrap();

    let segments = load_document(&path, "txt").unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].content, "hello\nworld");
    assert_eq!(segments[0].metadata["source"], json!(path.display().to_string()));
}

#[test]
fn extension_is_case_insensitive_and_dot_optional() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.TXT");
    std::fs::write(&path, "x").unwrap();

    assert_eq!(load_document(&path, ".TXT").unwrap().len(), 1);
}

#[test]
fn loads_docx_paragraphs() {
    let dir = TempDir::new().unwrap();
    let document = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Quarterly report</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Revenue &amp; costs </w:t></w:r><w:r><w:t>rose.</w:t></w:r></w:p>
</w:body></w:document>"#;
    let path = write_zip(dir.path(), "report.docx", &[("word/document.xml", document)]);

    let segments = load_document(&path, "docx").unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].content, "Quarterly report\nRevenue & costs rose.");
}

#[test]
fn loads_one_segment_per_sheet() {
    let dir = TempDir::new().unwrap();
    let workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>
<sheet name="Parts" sheetId="1" r:id="rId1"/><sheet name="Totals" sheetId="2" r:id="rId2"/>
</sheets></workbook>"#;
    let rels = r#"<Relationships>
<Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;
    let shared = r#"<sst><si><t>part</t></si><si><t>qty</t></si><si><r><t>bo</t></r><r><t>lt</t></r></si></sst>"#;
    let sheet1 = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>12</v></c></row>
</sheetData></worksheet>"#;
    let sheet2 = r#"<worksheet><sheetData><row r="1"><c r="A1" t="b"><v>1</v></c></row></sheetData></worksheet>"#;
    let path = write_zip(
        dir.path(),
        "parts.xlsx",
        &[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet1),
            ("xl/worksheets/sheet2.xml", sheet2),
        ],
    );

    let segments = load_document(&path, "xlsx").unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].content, "Sheet: Parts\npart\tqty\nbolt\t12\n\n");
    assert_eq!(segments[0].metadata["sheet"], json!("Parts"));
    assert_eq!(segments[1].content, "Sheet: Totals\nTrue\n\n");
    assert_eq!(segments[1].metadata["sheet"], json!("Totals"));
}

fn single_sheet_xlsx(dir: &Path, name: &str, sheet: &str) -> PathBuf {
    let workbook = r#"<workbook><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    let rels = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/></Relationships>"#;
    write_zip(
        dir,
        name,
        &[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/worksheets/sheet1.xml", sheet),
        ],
    )
}

#[test]
fn distant_cell_is_a_load_error_not_a_dense_grid() {
    let dir = TempDir::new().unwrap();
    let sheet = r#"<worksheet><sheetData><row r="100"><c r="XFD100"><v>1</v></c></row></sheetData></worksheet>"#;
    let path = single_sheet_xlsx(dir.path(), "sparse.xlsx", sheet);

    let err = load_document(&path, "xlsx").unwrap_err();
    assert!(matches!(err, RagError::LoadError { ref extension, .. } if extension == "xlsx"));
}

#[test]
fn overlong_column_letters_are_skipped() {
    let dir = TempDir::new().unwrap();
    let sheet = r#"<worksheet><sheetData><row r="1"><c r="ZZZZZZZZZZZZZZZZZZZZ1"><v>x</v></c><c r="A1"><v>kept</v></c></row></sheetData></worksheet>"#;
    let path = single_sheet_xlsx(dir.path(), "wide.xlsx", sheet);

    let segments = load_document(&path, "xlsx").unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].content, "Sheet: Data\nkept\n\n");
}

#[test]
fn cell_past_last_column_is_rejected() {
    let dir = TempDir::new().unwrap();
    let sheet = r#"<worksheet><sheetData><row r="1"><c r="XFE1"><v>1</v></c></row></sheetData></worksheet>"#;
    let path = single_sheet_xlsx(dir.path(), "past.xlsx", sheet);

    let err = load_document(&path, "xlsx").unwrap_err();
    assert!(err.to_string().contains("XFE1"), "{err}");
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, "a,b").unwrap();

    match load_document(&path, "csv") {
        Err(RagError::UnsupportedFileType(ext)) => assert_eq!(ext, "csv"),
        other => panic!("expected UnsupportedFileType, got {other:?}"),
    }
}

#[test]
fn read_failures_are_wrapped_with_extension() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.txt");
    let err = load_document(&missing, "txt").unwrap_err();
    assert!(matches!(err, RagError::LoadError { ref extension, .. } if extension == "txt"));
    assert!(err.to_string().starts_with("Error loading txt file: "));

    let not_a_zip = dir.path().join("broken.docx");
    std::fs::write(&not_a_zip, "plain text").unwrap();
    assert!(matches!(
        load_document(&not_a_zip, "docx"),
        Err(RagError::LoadError { ref extension, .. }) if extension == "docx"
    ));

    let not_a_pdf = dir.path().join("broken.pdf");
    std::fs::write(&not_a_pdf, "plain text").unwrap();
    assert!(matches!(
        load_document(&not_a_pdf, "pdf"),
        Err(RagError::LoadError { ref extension, .. }) if extension == "pdf"
    ));
}

#[test]
fn docx_without_document_part_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_zip(dir.path(), "empty.docx", &[("other.xml", "<x/>")]);
    let err = load_document(&path, "docx").unwrap_err();
    assert!(err.to_string().contains("word/document.xml"));
}
