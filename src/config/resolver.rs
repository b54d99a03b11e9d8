//! Precedence resolution for configuration and state.
//!
//! ## Token Precedence (highest to lowest)
//!
//! 1. `--token` CLI flag
//! 2. `TODOIST_API_TOKEN` environment variable
//! 3. state.kdl
//! 4. config.kdl (misplaced, accepted with a deprecation warning)
//!
//! ## Config Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. config.kdl
//! 3. Built-in defaults

use crate::Result;
use crate::config::OutputFormat;
use crate::config::store::ConfigStore;
use crate::engine::TEMPLATE_PROJECT_NAME;
use crate::remote::todoist::DEFAULT_API_URL;

/// Environment variable name for the API token.
pub const TODOIST_API_TOKEN_ENV: &str = "TODOIST_API_TOKEN";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl or state.kdl
    File,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
    /// Token found in config.kdl instead of state.kdl
    LegacyConfig(String),
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File => write!(f, "file"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
            ValueSource::LegacyConfig(path) => write!(f, "legacy-config:{}", path),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: Resolved<String>,
    pub template_name: Resolved<String>,
    pub output_format: Resolved<OutputFormat>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            api_url: Resolved::new(DEFAULT_API_URL.to_string(), ValueSource::Default),
            template_name: Resolved::new(
                TEMPLATE_PROJECT_NAME.to_string(),
                ValueSource::Default,
            ),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn api_url(&self) -> &str {
        &self.api_url.value
    }

    pub fn template_name(&self) -> &str {
        &self.template_name.value
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }
}

/// Fully resolved state with source tracking.
#[derive(Debug, Clone, Default)]
pub struct ResolvedState {
    pub api_token: Option<Resolved<String>>,
    /// Deprecation warnings (e.g., token found in config.kdl)
    pub deprecation_warnings: Vec<String>,
}

impl ResolvedState {
    pub fn token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|r| r.value.as_str())
    }

    /// Get the masked token for display purposes.
    pub fn masked_token(&self) -> Option<String> {
        self.token().map(crate::config::schema::mask_token)
    }

    pub fn token_source(&self) -> Option<&ValueSource> {
        self.api_token.as_ref().map(|r| &r.source)
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub template_name: Option<String>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_template_name(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

fn pick<T: Clone>(cli: &Option<T>, file: &Option<T>, default: Resolved<T>) -> Resolved<T> {
    if let Some(value) = cli {
        Resolved::new(value.clone(), ValueSource::CliFlag)
    } else if let Some(value) = file {
        Resolved::new(value.clone(), ValueSource::File)
    } else {
        default
    }
}

/// Resolve configuration: CLI flags > config.kdl > defaults.
pub fn resolve_config(store: &ConfigStore, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let file = store.read_config()?;
    let defaults = ResolvedConfig::default();

    Ok(ResolvedConfig {
        api_url: pick(&overrides.api_url, &file.api_url, defaults.api_url),
        template_name: pick(
            &overrides.template_name,
            &file.template_name,
            defaults.template_name,
        ),
        output_format: pick(
            &overrides.output_format,
            &file.output_format,
            defaults.output_format,
        ),
    })
}

/// Resolve the API token: env var > state.kdl > config.kdl (deprecated).
pub fn resolve_state(store: &ConfigStore) -> Result<ResolvedState> {
    use crate::config::schema::get_legacy_token_from_config;

    let mut result = ResolvedState::default();

    if let Ok(token) = std::env::var(TODOIST_API_TOKEN_ENV) {
        if !token.is_empty() {
            result.api_token = Some(Resolved::new(
                token,
                ValueSource::EnvVar(TODOIST_API_TOKEN_ENV.to_string()),
            ));
            return Ok(result);
        }
    }

    let state = store.read_state()?;
    if let Some(token) = state.api_token {
        result.api_token = Some(Resolved::new(token, ValueSource::File));
        return Ok(result);
    }

    let config_doc = store.read_config_kdl()?;
    if let Some(token) = get_legacy_token_from_config(&config_doc) {
        let config_path = store.config_path().display().to_string();
        result.deprecation_warnings.push(format!(
            "Token found in {}. Run 'tplsync config set-token' to move it to state.kdl.",
            config_path
        ));
        result.api_token = Some(Resolved::new(
            token,
            ValueSource::LegacyConfig(config_path),
        ));
    }

    Ok(result)
}

/// Resolve state with a CLI-provided token taking highest precedence.
pub fn resolve_state_with_override(
    store: &ConfigStore,
    token_override: Option<&str>,
) -> Result<ResolvedState> {
    match token_override {
        Some(token) if !token.is_empty() => Ok(ResolvedState {
            api_token: Some(Resolved::new(token.to_string(), ValueSource::CliFlag)),
            deprecation_warnings: Vec::new(),
        }),
        _ => resolve_state(store),
    }
}

/// Combined resolver for both config and state.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub config: ResolvedConfig,
    pub state: ResolvedState,
}

impl ResolvedSettings {
    pub fn resolve(
        store: &ConfigStore,
        overrides: &ConfigOverrides,
        token_override: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            config: resolve_config(store, overrides)?,
            state: resolve_state_with_override(store, token_override)?,
        })
    }

    /// The API token, or [`crate::Error::MissingToken`].
    pub fn require_token(&self) -> Result<&str> {
        self.state.token().ok_or(crate::Error::MissingToken)
    }
}
