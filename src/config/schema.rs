//! KDL schema definitions for config.kdl and state.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation functions
//! - Legacy token detection (a token written to config.kdl by hand)

use chrono::{DateTime, Utc};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted by `tplsync config set`.
pub const CONFIG_KEYS: &[&str] = &["api-url", "template-name", "output-format"];

/// User preferences stored in config.kdl.
///
/// File permissions: 0644 (rw-r--r--)
///
/// # KDL Schema
///
/// ```kdl
/// api-url "https://api.todoist.com/sync/v9"
/// template-name "Task Templates"
/// output-format "human"  // or "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the sync API
    pub api_url: Option<String>,

    /// Project name marking template projects
    pub template_name: Option<String>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("api-url must be an http(s) URL, got {}", url));
            }
        }
        if let Some(ref name) = self.template_name {
            if name.is_empty() {
                return Err("template-name must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Set one key from its string form (as given to `config set`).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "api-url" => self.api_url = Some(value.to_string()),
            "template-name" => self.template_name = Some(value.to_string()),
            "output-format" => {
                self.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                    format!("output-format must be json or human, got {}", value)
                })?)
            }
            other => {
                return Err(format!(
                    "unknown config key {} (expected one of: {})",
                    other,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        self.validate()
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            api_url: first_string(doc, "api-url"),
            template_name: first_string(doc, "template-name"),
            output_format: first_string(doc, "output-format")
                .and_then(|s| OutputFormat::parse(&s)),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref url) = self.api_url {
            push_string(&mut doc, "api-url", url);
        }
        if let Some(ref name) = self.template_name {
            push_string(&mut doc, "template-name", name);
        }
        if let Some(ref format) = self.output_format {
            push_string(&mut doc, "output-format", format.as_str());
        }

        doc
    }
}

/// Runtime state stored in state.kdl.
///
/// Contains the API token.
/// **MUST be created with 0600 permissions (owner read/write only)**.
///
/// # KDL Schema
///
/// ```kdl
/// api-token "0123456789abcdef0123456789abcdef01234567"
/// token-saved-at "2026-01-31T09:00:00Z"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// API token (sensitive!)
    pub api_token: Option<String>,

    /// When the token was stored
    pub token_saved_at: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Parse state from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            api_token: first_string(doc, "api-token"),
            token_saved_at: first_string(doc, "token-saved-at")
                .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        }
    }

    /// Convert state to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref token) = self.api_token {
            push_string(&mut doc, "api-token", token);
        }
        if let Some(ref saved_at) = self.token_saved_at {
            push_string(&mut doc, "token-saved-at", &saved_at.to_rfc3339());
        }

        doc
    }

    /// Merge another state into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &SyncState) {
        if other.api_token.is_some() {
            self.api_token = other.api_token.clone();
        }
        if other.token_saved_at.is_some() {
            self.token_saved_at = other.token_saved_at;
        }
    }
}

/// Show only the first and last 4 characters of a token.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        // Too short to mask meaningfully, hide everything after the prefix
        let prefix: String = chars.iter().take(4).collect();
        format!("{}...", prefix)
    } else {
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }
}

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;

/// Required permissions for config.kdl (Unix: 0644, readable by all).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o644;

/// Extract an api-token from config.kdl, where it does not belong.
pub fn get_legacy_token_from_config(doc: &KdlDocument) -> Option<String> {
    first_string(doc, "api-token")
}

/// Remove an api-token entry from a KDL document.
///
/// Returns true if a token was removed, false if none was found.
pub fn remove_token_from_kdl_doc(doc: &mut KdlDocument) -> bool {
    let nodes = doc.nodes_mut();
    let original_len = nodes.len();
    nodes.retain(|node| node.name().value() != "api-token");
    nodes.len() < original_len
}

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(str::to_string)
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}
