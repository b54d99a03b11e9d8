//! Command implementations for the tplsync CLI.
//!
//! Each command returns a result type implementing [`Output`], which the
//! binary prints as JSON (default) or human-readable text (`-H`).
//! - `apply` - Propagate template subtasks (or preview with `--dry-run`)
//! - `tree` - Print the project/task hierarchy
//! - `config` - Show and edit config.kdl / state.kdl

use std::fmt::Write as _;
use std::io::BufRead;

use chrono::Utc;
use serde::Serialize;

use crate::config::schema::{get_legacy_token_from_config, remove_token_from_kdl_doc};
use crate::config::{ConfigStore, ResolvedSettings, SyncState, mask_token};
use crate::engine::{self, Outcome, RunOptions, RunReport, StateTree};
use crate::remote::{RemoteStateSource, SyncClient};
use crate::render::render_tree;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// === Apply ===

/// Result of `tplsync apply`.
#[derive(Serialize)]
pub struct ApplyResult {
    pub template_name: String,
    #[serde(flatten)]
    pub report: RunReport,
}

impl Output for ApplyResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let report = &self.report;
        let mut out = String::new();

        if report.dry_run {
            let _ = writeln!(out, "DRY RUN: no changes were committed.");
        }
        let _ = writeln!(
            out,
            "{} template pair(s) under \"{}\" projects",
            report.pairs.len(),
            self.template_name
        );
        for pair in &report.pairs {
            let _ = writeln!(out, "  {} -> {}", pair.content, pair.target_project);
        }

        for replication in &report.replications {
            let marker = match replication.outcome {
                Outcome::Added => "+",
                Outcome::AlreadyPresent => "=",
            };
            let _ = writeln!(
                out,
                "{}{} {} (under {})",
                "  ".repeat(replication.depth),
                marker,
                replication.content,
                replication.target
            );
        }

        let verb = if report.dry_run { "Would create" } else { "Created" };
        let _ = write!(out, "{} {} task(s)", verb, report.created());
        if report.committed {
            let _ = write!(out, ", committed");
        }

        for warning in &report.warnings {
            let _ = write!(out, "\nWarning: {}", warning);
        }
        for bad in &report.bad_records {
            let id = bad
                .record
                .id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = write!(
                out,
                "\nMalformed {} {} ({}): {}",
                bad.kind, id, bad.issue, bad.record.content
            );
        }
        out
    }
}

/// Fetch, locate templates, replicate, and (unless dry run) commit.
pub fn apply(settings: &ResolvedSettings, dry_run: bool) -> Result<ApplyResult> {
    let token = settings.require_token()?;
    let mut client = SyncClient::new(settings.config.api_url(), token);
    let options = RunOptions {
        template_name: settings.config.template_name().to_string(),
        dry_run,
    };
    let report = engine::run(&mut client, &options)?;
    Ok(ApplyResult {
        template_name: options.template_name,
        report,
    })
}

// === Tree ===

/// Result of `tplsync tree`.
#[derive(Serialize)]
pub struct TreeResult {
    pub projects: usize,
    pub tasks: usize,
    pub tree: String,
    pub malformed: usize,
}

impl Output for TreeResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = self.tree.trim_end().to_string();
        if self.malformed > 0 {
            let _ = write!(out, "\n\n{} malformed record(s) omitted", self.malformed);
        }
        out
    }
}

/// Fetch the snapshot and render it, without mutating anything.
pub fn tree(settings: &ResolvedSettings) -> Result<TreeResult> {
    let token = settings.require_token()?;
    let mut client = SyncClient::new(settings.config.api_url(), token);
    let state = client.fetch()?;
    let tree = StateTree::build(state);
    Ok(TreeResult {
        projects: tree.projects.len(),
        tasks: tree.tasks.len(),
        tree: render_tree(&tree),
        malformed: tree.bad_records().len(),
    })
}

// === Config ===

#[derive(Serialize)]
pub struct SourcedValue {
    pub value: String,
    pub source: String,
}

/// Result of `tplsync config show`.
#[derive(Serialize)]
pub struct ConfigShowResult {
    pub config_dir: String,
    pub api_url: SourcedValue,
    pub template_name: SourcedValue,
    pub output_format: SourcedValue,
    /// Masked token, never the raw value
    pub api_token: Option<SourcedValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Config directory: {}", self.config_dir);
        for (key, entry) in [
            ("api-url", &self.api_url),
            ("template-name", &self.template_name),
            ("output-format", &self.output_format),
        ] {
            let _ = writeln!(out, "  {} = {} ({})", key, entry.value, entry.source);
        }
        match &self.api_token {
            Some(token) => {
                let _ = write!(out, "  api-token = {} ({})", token.value, token.source);
            }
            None => {
                let _ = write!(out, "  api-token = (not set)");
            }
        }
        for warning in &self.warnings {
            let _ = write!(out, "\nWarning: {}", warning);
        }
        out
    }
}

pub fn config_show(store: &ConfigStore, settings: &ResolvedSettings) -> ConfigShowResult {
    let config = &settings.config;
    let sourced = |value: String, source: &crate::config::ValueSource| SourcedValue {
        value,
        source: source.to_string(),
    };
    ConfigShowResult {
        config_dir: store.root().display().to_string(),
        api_url: sourced(config.api_url.value.clone(), &config.api_url.source),
        template_name: sourced(
            config.template_name.value.clone(),
            &config.template_name.source,
        ),
        output_format: sourced(
            config.output_format.value.to_string(),
            &config.output_format.source,
        ),
        api_token: settings
            .state
            .masked_token()
            .zip(settings.state.token_source())
            .map(|(masked, source)| sourced(masked, source)),
        warnings: settings.state.deprecation_warnings.clone(),
    }
}

/// Result of `tplsync config set`.
#[derive(Serialize)]
pub struct ConfigSetResult {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSetResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

pub fn config_set(store: &ConfigStore, key: &str, value: &str) -> Result<ConfigSetResult> {
    let mut config = store.read_config()?;
    config.set(key, value).map_err(Error::InvalidInput)?;
    store.write_config(&config)?;
    Ok(ConfigSetResult {
        key: key.to_string(),
        value: value.to_string(),
        path: store.config_path().display().to_string(),
    })
}

/// Result of `tplsync config set-token`.
#[derive(Serialize)]
pub struct SetTokenResult {
    pub token: String,
    pub path: String,
    /// A token previously misplaced in config.kdl was removed
    pub removed_from_config: bool,
}

impl Output for SetTokenResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Saved token {} to {}", self.token, self.path);
        if self.removed_from_config {
            out.push_str("\nRemoved the old token from config.kdl");
        }
        out
    }
}

/// Store the token in state.kdl. Reads one line from stdin when `token` is None.
pub fn config_set_token(store: &ConfigStore, token: Option<String>) -> Result<SetTokenResult> {
    let token = match token {
        Some(token) => token,
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line
        }
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(Error::InvalidInput("token must not be empty".to_string()));
    }

    let mut state = store.read_state()?;
    state.merge(&SyncState {
        api_token: Some(token.clone()),
        token_saved_at: Some(Utc::now()),
    });
    store.write_state(&state)?;

    let mut config_doc = store.read_config_kdl()?;
    let removed_from_config = get_legacy_token_from_config(&config_doc).is_some()
        && remove_token_from_kdl_doc(&mut config_doc);
    if removed_from_config {
        store.write_config_kdl(&config_doc)?;
        tracing::info!(path = %store.config_path().display(), "removed token from config.kdl");
    }

    Ok(SetTokenResult {
        token: mask_token(&token),
        path: store.state_path().display().to_string(),
        removed_from_config,
    })
}
