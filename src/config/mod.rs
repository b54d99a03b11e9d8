//! Configuration and state management for tplsync.
//!
//! Two KDL files live in the config directory (`$TPLSYNC_CONFIG_DIR`, or
//! `~/.config/tplsync`):
//!
//! ## config.kdl - User preferences
//!
//! - `api-url` - Sync API base URL
//! - `template-name` - Name of template projects ("Task Templates")
//! - `output-format` - "json" or "human"
//!
//! ## state.kdl - Secrets
//!
//! - `api-token` - Todoist API token
//! - `token-saved-at` - RFC 3339 timestamp of when the token was stored
//!
//! **state.kdl is written with 0600 permissions** since it holds the token.
//!
//! ## Precedence
//!
//! For the token: `--token` > `TODOIST_API_TOKEN` > state.kdl
//! For preferences: CLI flag > config.kdl > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;
pub mod store;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ResolvedSettings, ResolvedState,
    TODOIST_API_TOKEN_ENV, ValueSource, resolve_config, resolve_state,
    resolve_state_with_override,
};
pub use schema::{CONFIG_KEYS, OutputFormat, SyncConfig, SyncState, mask_token};
#[cfg(unix)]
pub use schema::{CONFIG_FILE_MODE, STATE_FILE_MODE};
pub use store::{CONFIG_DIR_ENV, ConfigStore};
