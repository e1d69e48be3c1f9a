//! # docsearch-server
//!
//! HTTP API over [`docsearch_rag`]: upload documents, list and delete them,
//! and run semantic or similar-document searches.
//!
//! ## Endpoints
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `GET` | `/health` | [`routes::health`] |
//! | `POST` | `/api/documents` | [`routes::documents::upload_document`] |
//! | `GET` | `/api/documents` | [`routes::documents::list_documents`] |
//! | `DELETE` | `/api/documents/{doc_id}` | [`routes::documents::delete_document`] |
//! | `POST` | `/api/search` | [`routes::search::search_documents`] |
//! | `POST` | `/api/search/similar` | [`routes::search::find_similar_documents`] |
//! | `GET` | `/api/search/stats` | [`routes::search::get_search_stats`] |
//!
//! Errors are returned as `{"error": "<message>"}` with a matching status.

pub mod error;
pub mod filename;
pub mod logging;
pub mod routes;
pub mod server;
pub mod settings;
pub mod state;

pub use error::ApiError;
pub use logging::init_tracing;
pub use server::{app_router, build_manager, run_server, shutdown_signal};
pub use settings::{EnvIssue, Profile, Settings, SettingsError, Severity, validate_environment};
pub use state::AppState;
