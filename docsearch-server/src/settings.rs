//! Server configuration loaded from environment variables.
//!
//! Every setting has a default except the two API keys. Numeric values that
//! fail to parse keep their default rather than aborting startup.

use std::fmt::Write as _;
use std::time::Duration;

use docsearch_rag::{RagConfig, Result as RagResult};
use thiserror::Error;

pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

const REQUIRED_VARS: [&str; 2] = [PINECONE_API_KEY, OPENAI_API_KEY];
const OPTIONAL_VARS: [&str; 2] = ["PINECONE_ENVIRONMENT", "PINECONE_INDEX_NAME"];

/// Deployment profile selected by `DOCSEARCH_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Testing,
}

impl Profile {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "default" => Some(Self::Development),
            "production" => Some(Self::Production),
            "testing" => Some(Self::Testing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Testing => "testing",
        }
    }

    /// Whether debug logging is on when `DOCSEARCH_DEBUG` is not set.
    pub fn debug_default(self) -> bool {
        !matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} is not set")]
    MissingVar(&'static str),
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub pinecone_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Serverless region used when the index is created.
    pub pinecone_environment: String,
    pub pinecone_cloud: String,
    pub pinecone_index_name: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Maximum accepted request body, in bytes.
    pub max_file_size: usize,
    /// Lower-case extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub default_search_results: usize,
    pub api_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub profile: Profile,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pinecone_api_key: None,
            openai_api_key: None,
            pinecone_environment: "us-east-1".to_string(),
            pinecone_cloud: "aws".to_string(),
            pinecone_index_name: "docsearch-documents".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: 1536,
            chunk_size: 1000,
            chunk_overlap: 200,
            max_file_size: 16 * 1024 * 1024,
            allowed_extensions: parse_extensions("pdf,txt,docx,xlsx"),
            default_search_results: 5,
            api_timeout: Duration::from_secs(30),
            host: "127.0.0.1".to_string(),
            port: 5000,
            profile: Profile::Development,
            debug: true,
        }
    }
}

impl Settings {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let profile = get("DOCSEARCH_ENV").and_then(|v| Profile::parse(&v)).unwrap_or_default();
        let debug = get("DOCSEARCH_DEBUG")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or_else(|| profile.debug_default());

        Self {
            pinecone_api_key: get(PINECONE_API_KEY),
            openai_api_key: get(OPENAI_API_KEY),
            pinecone_environment: get("PINECONE_ENVIRONMENT").unwrap_or(defaults.pinecone_environment),
            pinecone_cloud: get("PINECONE_CLOUD").unwrap_or(defaults.pinecone_cloud),
            pinecone_index_name: get("PINECONE_INDEX_NAME").unwrap_or(defaults.pinecone_index_name),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimension: parsed(get("EMBEDDING_DIMENSION"), defaults.embedding_dimension),
            chunk_size: parsed(get("CHUNK_SIZE"), defaults.chunk_size),
            chunk_overlap: parsed(get("CHUNK_OVERLAP"), defaults.chunk_overlap),
            max_file_size: parsed(get("MAX_FILE_SIZE"), defaults.max_file_size),
            allowed_extensions: get("ALLOWED_EXTENSIONS")
                .map(|v| parse_extensions(&v))
                .filter(|exts| !exts.is_empty())
                .unwrap_or(defaults.allowed_extensions),
            default_search_results: parsed(
                get("DEFAULT_SEARCH_RESULTS"),
                defaults.default_search_results,
            ),
            api_timeout: Duration::from_secs(parsed(
                get("API_TIMEOUT"),
                defaults.api_timeout.as_secs(),
            )),
            host: get("DOCSEARCH_HOST").unwrap_or(defaults.host),
            port: parsed(get("DOCSEARCH_PORT"), defaults.port),
            profile,
            debug,
        }
    }

    /// Both API keys, or the first one that is missing.
    pub fn secrets(&self) -> Result<(&str, &str), SettingsError> {
        let pinecone =
            self.pinecone_api_key.as_deref().ok_or(SettingsError::MissingVar(PINECONE_API_KEY))?;
        let openai =
            self.openai_api_key.as_deref().ok_or(SettingsError::MissingVar(OPENAI_API_KEY))?;
        Ok((pinecone, openai))
    }

    /// Chunking and search parameters for the vector store manager.
    pub fn rag_config(&self) -> RagResult<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.default_search_results)
            .dimension(self.embedding_dimension)
            .build()
    }

    /// Whether `extension` (any case, dot optional) may be uploaded.
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == extension)
    }

    /// Human-readable configuration dump with secrets masked, followed by
    /// the environment report.
    pub fn report(&self, issues: &[EnvIssue]) -> String {
        let mut out = String::new();
        let rows: [(&str, String); 17] = [
            ("PINECONE_API_KEY", mask(self.pinecone_api_key.as_deref())),
            ("OPENAI_API_KEY", mask(self.openai_api_key.as_deref())),
            ("PINECONE_ENVIRONMENT", self.pinecone_environment.clone()),
            ("PINECONE_CLOUD", self.pinecone_cloud.clone()),
            ("PINECONE_INDEX_NAME", self.pinecone_index_name.clone()),
            ("EMBEDDING_MODEL", self.embedding_model.clone()),
            ("EMBEDDING_DIMENSION", self.embedding_dimension.to_string()),
            ("CHUNK_SIZE", self.chunk_size.to_string()),
            ("CHUNK_OVERLAP", self.chunk_overlap.to_string()),
            ("MAX_FILE_SIZE", self.max_file_size.to_string()),
            ("ALLOWED_EXTENSIONS", self.allowed_extensions.join(",")),
            ("DEFAULT_SEARCH_RESULTS", self.default_search_results.to_string()),
            ("API_TIMEOUT", self.api_timeout.as_secs().to_string()),
            ("DOCSEARCH_HOST", self.host.clone()),
            ("DOCSEARCH_PORT", self.port.to_string()),
            ("DOCSEARCH_ENV", self.profile.as_str().to_string()),
            ("DOCSEARCH_DEBUG", self.debug.to_string()),
        ];

        let _ = writeln!(out, "Configuration Status:");
        let _ = writeln!(out, "{}", "=".repeat(50));
        for (key, value) in rows {
            let _ = writeln!(out, "{key}: {value}");
        }

        let _ = writeln!(out, "\nEnvironment Variables:");
        let _ = writeln!(out, "{}", "=".repeat(50));
        if issues.is_empty() {
            let _ = writeln!(out, "All environment variables set");
        }
        for issue in issues {
            let marker = match issue.severity {
                Severity::Error => "❌",
                Severity::Warning => "⚠️ ",
            };
            let _ = writeln!(out, "{marker} {}: {}", issue.var, issue.message);
        }
        out
    }
}

/// How serious a missing variable is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A missing environment variable found by [`validate_environment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvIssue {
    pub var: &'static str,
    pub severity: Severity,
    pub message: &'static str,
}

/// Report missing required secrets (errors) and missing optional overrides
/// (warnings).
pub fn validate_environment(lookup: impl Fn(&str) -> Option<String>) -> Vec<EnvIssue> {
    let missing = |var: &str| lookup(var).is_none_or(|v| v.trim().is_empty());

    let required = REQUIRED_VARS.into_iter().filter(|var| missing(var)).map(|var| EnvIssue {
        var,
        severity: Severity::Error,
        message: "Required environment variable not set",
    });
    let optional = OPTIONAL_VARS.into_iter().filter(|var| missing(var)).map(|var| EnvIssue {
        var,
        severity: Severity::Warning,
        message: "Optional environment variable not set (using default)",
    });
    required.chain(optional).collect()
}

/// Lookup function over the process environment.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn mask(secret: Option<&str>) -> String {
    match secret {
        None => "Not set".to_string(),
        Some(s) if s.chars().count() <= 8 => "********".to_string(),
        Some(s) => {
            let tail: String = s.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("********{tail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.allowed_extensions, vec!["pdf", "txt", "docx", "xlsx"]);
        assert!(settings.secrets().is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("PINECONE_API_KEY", "pc"),
            ("OPENAI_API_KEY", "sk"),
            ("PINECONE_ENVIRONMENT", "eu-west-1"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("ALLOWED_EXTENSIONS", " .PDF, txt ,,"),
            ("DOCSEARCH_PORT", "8080"),
            ("API_TIMEOUT", "5"),
        ]));
        assert_eq!(settings.pinecone_environment, "eu-west-1");
        assert_eq!((settings.chunk_size, settings.chunk_overlap), (500, 50));
        assert_eq!(settings.allowed_extensions, vec!["pdf", "txt"]);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.api_timeout, Duration::from_secs(5));
        assert_eq!(settings.secrets().unwrap(), ("pc", "sk"));
        assert!(settings.is_allowed_extension(".Pdf"));
        assert!(!settings.is_allowed_extension("docx"));
    }

    #[test]
    fn unparseable_numbers_keep_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("CHUNK_SIZE", "big"),
            ("DOCSEARCH_PORT", "99999"),
            ("MAX_FILE_SIZE", "-1"),
        ]));
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.port, 5000);
        assert_eq!(settings.max_file_size, 16 * 1024 * 1024);
    }

    #[test]
    fn profile_drives_debug_default() {
        let production = Settings::from_lookup(lookup(&[("DOCSEARCH_ENV", "production")]));
        assert_eq!(production.profile, Profile::Production);
        assert!(!production.debug);

        let forced = Settings::from_lookup(lookup(&[
            ("DOCSEARCH_ENV", "production"),
            ("DOCSEARCH_DEBUG", "true"),
        ]));
        assert!(forced.debug);
    }

    #[test]
    fn invalid_chunking_is_rejected_by_rag_config() {
        let settings =
            Settings::from_lookup(lookup(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]));
        assert!(settings.rag_config().is_err());
    }

    #[test]
    fn validation_separates_errors_from_warnings() {
        let issues = validate_environment(lookup(&[("OPENAI_API_KEY", "sk"), ("PINECONE_INDEX_NAME", "x")]));
        assert_eq!(
            issues,
            vec![
                EnvIssue {
                    var: "PINECONE_API_KEY",
                    severity: Severity::Error,
                    message: "Required environment variable not set",
                },
                EnvIssue {
                    var: "PINECONE_ENVIRONMENT",
                    severity: Severity::Warning,
                    message: "Optional environment variable not set (using default)",
                },
            ]
        );
    }

    #[test]
    fn report_masks_secrets() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-abcdefghijkl1234")]));
        let report = settings.report(&validate_environment(lookup(&[])));
        assert!(report.contains("OPENAI_API_KEY: ********1234"));
        assert!(!report.contains("abcdefgh"));
        assert!(report.contains("PINECONE_API_KEY: Not set"));
        assert!(report.contains("❌ PINECONE_API_KEY"));
    }
}
