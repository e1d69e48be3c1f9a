//! # docsearch-cli
//!
//! Interactive client for the docsearch HTTP API.
//!
//! - [`client::DocsearchClient`] wraps each endpoint and always yields JSON,
//!   with failures as `{"error": ...}`.
//! - [`format::format_response`] renders any response for the terminal.
//! - [`repl::run`] is the `rustyline` command loop behind the `docsearch` binary.

pub mod client;
pub mod format;
pub mod repl;

pub use client::{DEFAULT_SERVER_URL, DocsearchClient, SUPPORTED_EXTENSIONS, is_supported_file};
pub use format::format_response;
