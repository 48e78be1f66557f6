// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration.
//!
//! Configuration is resolved from layers, lowest precedence first:
//! built-in defaults, a TOML file, `FAULTLINE_*` environment variables and
//! finally whatever the [`ClientBuilder`](crate::ClientBuilder) sets.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use faultline_core::EventConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;

/// Default number of breadcrumbs kept.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 25;
/// Hard upper bound on kept breadcrumbs.
pub const MAX_BREADCRUMBS_LIMIT: usize = 100;

const ENV_API_KEY: &str = "FAULTLINE_API_KEY";
const ENV_RELEASE_STAGE: &str = "FAULTLINE_RELEASE_STAGE";
const ENV_ENABLED_RELEASE_STAGES: &str = "FAULTLINE_ENABLED_RELEASE_STAGES";
const ENV_IGNORE_CLASSES: &str = "FAULTLINE_IGNORE_CLASSES";
const ENV_PROJECT_PACKAGES: &str = "FAULTLINE_PROJECT_PACKAGES";
const ENV_SEND_THREADS: &str = "FAULTLINE_SEND_THREADS";
const ENV_MAX_BREADCRUMBS: &str = "FAULTLINE_MAX_BREADCRUMBS";
const ENV_AUTO_TRACK_SESSIONS: &str = "FAULTLINE_AUTO_TRACK_SESSIONS";

/// When thread state is attached to events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadSendPolicy {
	#[default]
	Always,
	UnhandledOnly,
	Never,
}

impl ThreadSendPolicy {
	pub fn should_send(&self, unhandled: bool) -> bool {
		match self {
			Self::Always => true,
			Self::UnhandledOnly => unhandled,
			Self::Never => false,
		}
	}
}

impl fmt::Display for ThreadSendPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Always => write!(f, "always"),
			Self::UnhandledOnly => write!(f, "unhandled_only"),
			Self::Never => write!(f, "never"),
		}
	}
}

impl FromStr for ThreadSendPolicy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"always" => Ok(Self::Always),
			"unhandled_only" => Ok(Self::UnhandledOnly),
			"never" => Ok(Self::Never),
			_ => Err(ConfigError::invalid_value("send_threads", format!("unknown policy '{s}'"))),
		}
	}
}

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	pub api_key: String,
	pub release_stage: String,
	/// Stages that report. `None` reports from every stage.
	pub enabled_release_stages: Option<BTreeSet<String>>,
	pub ignore_classes: BTreeSet<String>,
	pub project_packages: Vec<String>,
	pub send_threads: ThreadSendPolicy,
	pub max_breadcrumbs: usize,
	pub auto_track_sessions: bool,
	pub app_id: Option<String>,
	pub app_version: Option<String>,
	pub app_type: Option<String>,
	pub context: Option<String>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_key: String::new(),
			release_stage: "production".to_string(),
			enabled_release_stages: None,
			ignore_classes: BTreeSet::new(),
			project_packages: Vec::new(),
			send_threads: ThreadSendPolicy::default(),
			max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
			auto_track_sessions: true,
			app_id: None,
			app_version: None,
			app_type: None,
			context: None,
		}
	}
}

impl ClientConfig {
	pub fn should_notify_for_release_stage(&self) -> bool {
		self.enabled_release_stages
			.as_ref()
			.map_or(true, |stages| stages.contains(&self.release_stage))
	}

	/// The part of the configuration events are built from.
	pub fn event_config(&self) -> EventConfig {
		EventConfig {
			api_key: self.api_key.clone(),
			ignore_classes: Arc::new(self.ignore_classes.clone()),
		}
	}
}

/// One partial configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	pub api_key: Option<String>,
	pub release_stage: Option<String>,
	pub enabled_release_stages: Option<BTreeSet<String>>,
	pub ignore_classes: Option<BTreeSet<String>>,
	pub project_packages: Option<Vec<String>>,
	pub send_threads: Option<ThreadSendPolicy>,
	pub max_breadcrumbs: Option<usize>,
	pub auto_track_sessions: Option<bool>,
	pub app_id: Option<String>,
	pub app_version: Option<String>,
	pub app_type: Option<String>,
	pub context: Option<String>,
}

impl ConfigLayer {
	/// Reads a TOML layer. A missing file is an empty layer.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			debug!(path = %path.display(), "config file not found, skipping");
			return Ok(Self::default());
		}

		debug!(path = %path.display(), "loading config file");
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;

		let layer = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}

	/// Reads the `FAULTLINE_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_with(|key| std::env::var(key).ok())
	}

	/// Reads environment-style variables through `lookup`.
	pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		Ok(Self {
			api_key: get(ENV_API_KEY),
			release_stage: get(ENV_RELEASE_STAGE),
			enabled_release_stages: get(ENV_ENABLED_RELEASE_STAGES).map(|v| split_list(&v).collect()),
			ignore_classes: get(ENV_IGNORE_CLASSES).map(|v| split_list(&v).collect()),
			project_packages: get(ENV_PROJECT_PACKAGES).map(|v| split_list(&v).collect()),
			send_threads: get(ENV_SEND_THREADS).map(|v| v.trim().parse()).transpose()?,
			max_breadcrumbs: get(ENV_MAX_BREADCRUMBS)
				.map(|v| {
					v.trim()
						.parse::<usize>()
						.map_err(|e| ConfigError::invalid_value(ENV_MAX_BREADCRUMBS, e.to_string()))
				})
				.transpose()?,
			auto_track_sessions: get(ENV_AUTO_TRACK_SESSIONS)
				.map(|v| parse_bool(ENV_AUTO_TRACK_SESSIONS, &v))
				.transpose()?,
			app_id: None,
			app_version: None,
			app_type: None,
			context: None,
		})
	}

	/// Overlays `higher` on top of `self`; set fields in `higher` win.
	pub fn merge(self, higher: ConfigLayer) -> ConfigLayer {
		ConfigLayer {
			api_key: higher.api_key.or(self.api_key),
			release_stage: higher.release_stage.or(self.release_stage),
			enabled_release_stages: higher.enabled_release_stages.or(self.enabled_release_stages),
			ignore_classes: higher.ignore_classes.or(self.ignore_classes),
			project_packages: higher.project_packages.or(self.project_packages),
			send_threads: higher.send_threads.or(self.send_threads),
			max_breadcrumbs: higher.max_breadcrumbs.or(self.max_breadcrumbs),
			auto_track_sessions: higher.auto_track_sessions.or(self.auto_track_sessions),
			app_id: higher.app_id.or(self.app_id),
			app_version: higher.app_version.or(self.app_version),
			app_type: higher.app_type.or(self.app_type),
			context: higher.context.or(self.context),
		}
	}

	/// Applies the layer onto the defaults.
	pub fn resolve(self) -> ClientConfig {
		let defaults = ClientConfig::default();
		ClientConfig {
			api_key: self.api_key.unwrap_or(defaults.api_key),
			release_stage: self.release_stage.unwrap_or(defaults.release_stage),
			enabled_release_stages: self.enabled_release_stages.or(defaults.enabled_release_stages),
			ignore_classes: self.ignore_classes.unwrap_or(defaults.ignore_classes),
			project_packages: self.project_packages.unwrap_or(defaults.project_packages),
			send_threads: self.send_threads.unwrap_or(defaults.send_threads),
			max_breadcrumbs: self
				.max_breadcrumbs
				.unwrap_or(defaults.max_breadcrumbs)
				.min(MAX_BREADCRUMBS_LIMIT),
			auto_track_sessions: self.auto_track_sessions.unwrap_or(defaults.auto_track_sessions),
			app_id: self.app_id.or(defaults.app_id),
			app_version: self.app_version.or(defaults.app_version),
			app_type: self.app_type.or(defaults.app_type),
			context: self.context.or(defaults.context),
		}
	}
}

/// Default config file, `$XDG_CONFIG_HOME/faultline/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("faultline").join("config.toml"))
}

/// Loads the default file (if any) and the environment.
pub fn load_config() -> Result<ConfigLayer, ConfigError> {
	match default_config_path() {
		Some(path) => load_config_from(&path),
		None => ConfigLayer::from_env(),
	}
}

/// Loads `path` and the environment on top of it.
pub fn load_config_from(path: &Path) -> Result<ConfigLayer, ConfigError> {
	let file = ConfigLayer::from_file(path)?;
	let env = ConfigLayer::from_env()?;
	Ok(file.merge(env))
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
	value
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Ok(true),
		"false" | "0" | "no" => Ok(false),
		other => Err(ConfigError::invalid_value(field, format!("expected a boolean, got '{other}'"))),
	}
}
