//! Terminal rendering of API responses.

use std::fmt::Write as _;

use serde_json::{Map, Value};

const PREVIEW_CHARS: usize = 200;

pub const BANNER: &str = r"
    ╭─────────────────────────────────────────╮
    │        docsearch: semantic search       │
    │             interactive client          │
    ╰─────────────────────────────────────────╯
";

pub const COMMANDS: &str = "\
Available commands:
1. upload - Upload a document
2. list - List all documents
3. search - Search documents
4. similar - Find similar documents
5. delete - Delete a document
6. stats - Show statistics
7. help - Show help
q. quit - Exit";

pub const HELP: &str = "
Available Commands:
  upload    - Upload and process a document
  list      - List all processed documents
  search    - Search documents using semantic search
  similar   - Find documents similar to a given document
  delete    - Delete a document and all its chunks
  stats     - Show vector store statistics
  help      - Show this help message
  quit      - Exit the application

File Types Supported:
  • PDF (.pdf)
  • Text files (.txt)
  • Word documents (.docx)
  • Excel files (.xlsx)
";

/// Render any API response for display.
///
/// Errors take precedence; successful responses are recognised by the keys
/// they carry. Anything unrecognised is pretty-printed JSON.
pub fn format_response(response: &Value) -> String {
    if let Some(error) = response.get("error") {
        return format!("❌ Error: {}", display(error));
    }

    let success = response.get("success").and_then(Value::as_bool).unwrap_or(false);
    if let (true, Some(body)) = (success, response.as_object()) {
        if let Some(documents) = body.get("documents") {
            return format_documents(documents, body);
        }
        if let Some(results) = body.get("results") {
            let query = str_field(body, "query", "");
            return format_hits(
                results,
                format!("🔍 No results found for query: '{query}'"),
                format!("🔍 Search results for '{query}':"),
            );
        }
        if let Some(similar) = body.get("similar_documents") {
            let reference = str_field(body, "reference_doc_id", "");
            return format_hits(
                similar,
                format!("🔍 No similar documents found for ID: {reference}"),
                format!("🔍 Similar to document {reference}:"),
            );
        }
        if let Some(stats) = body.get("stats") {
            return format_stats(stats);
        }
        if body.contains_key("doc_id") {
            return format!(
                "✅ Document uploaded successfully!\n  • File: {}\n  • Document ID: {}\n  • Chunks created: {}",
                str_field(body, "filename", "Unknown"),
                str_field(body, "doc_id", "N/A"),
                body.get("chunks_created").and_then(Value::as_u64).unwrap_or(0),
            );
        }
        if let Some(message) = body.get("message") {
            return format!("✅ {}", display(message));
        }
    }

    serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string())
}

fn format_documents(documents: &Value, body: &Map<String, Value>) -> String {
    let documents = documents.as_array().map(Vec::as_slice).unwrap_or_default();
    if documents.is_empty() {
        return "📁 No documents found".to_string();
    }

    let mut out = String::from("📁 Documents:\n");
    for doc in documents {
        let doc = doc.as_object().cloned().unwrap_or_default();
        let _ = writeln!(
            out,
            "  • {} (ID: {})",
            str_field(&doc, "filename", "Unknown"),
            str_field(&doc, "doc_id", "N/A")
        );
        let _ = writeln!(
            out,
            "    Chunks: {}, Uploaded: {}",
            doc.get("chunk_count").and_then(Value::as_u64).unwrap_or(0),
            str_field(&doc, "upload_time", "Unknown")
        );
    }
    if body.get("truncated").and_then(Value::as_bool).unwrap_or(false) {
        let limit = body.get("sample_limit").and_then(Value::as_u64).unwrap_or(0);
        let _ = writeln!(out, "  (listing sampled from the first {limit} chunks; some documents may be missing)");
    }
    out
}

fn format_hits(hits: &Value, empty: String, heading: String) -> String {
    let hits = hits.as_array().map(Vec::as_slice).unwrap_or_default();
    if hits.is_empty() {
        return empty;
    }

    let mut out = heading;
    out.push('\n');
    for (i, hit) in hits.iter().enumerate() {
        let score = hit.get("similarity_score").and_then(Value::as_f64).unwrap_or(0.0);
        let content = hit.get("content").and_then(Value::as_str).unwrap_or_default();
        let preview: String = content.chars().take(PREVIEW_CHARS).collect();
        let _ = write!(out, "\n{}. Score: {score:.3}\n   Content: {preview}...\n", i + 1);
        if let Some(metadata) = hit.get("metadata").and_then(Value::as_object).filter(|m| !m.is_empty()) {
            let _ = writeln!(out, "   File: {}", str_field(metadata, "filename", "Unknown"));
        }
    }
    out
}

fn format_stats(stats: &Value) -> String {
    let total = stats.get("total_vectors").and_then(Value::as_u64).unwrap_or(0);
    let dimension = stats.get("dimension").and_then(Value::as_u64).unwrap_or(0);
    let fullness = stats.get("index_fullness").and_then(Value::as_f64).unwrap_or(0.0);
    format!(
        "📊 Vector Store Statistics:\n  • Total vectors: {total}\n  • Dimension: {dimension}\n  • Index fullness: {:.2}%\n",
        fullness * 100.0
    )
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Strings without quotes, everything else as JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
