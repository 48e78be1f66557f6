// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! App and device state collected at report time.

use std::env;
use std::time::Instant;

use chrono::Utc;
use faultline_core::time::to_iso8601;
use faultline_core::{App, Device};

use crate::config::ClientConfig;

/// Captures app and device state for events from one client.
#[derive(Debug, Clone)]
pub struct DiagnosticsCollector {
	started: Instant,
	app_id: Option<String>,
	app_version: Option<String>,
	app_type: Option<String>,
	release_stage: String,
}

impl DiagnosticsCollector {
	pub fn new(config: &ClientConfig) -> Self {
		Self {
			started: Instant::now(),
			app_id: config.app_id.clone(),
			app_version: config.app_version.clone(),
			app_type: config.app_type.clone(),
			release_stage: config.release_stage.clone(),
		}
	}

	pub fn app(&self) -> App {
		App {
			id: self.app_id.clone(),
			version: self.app_version.clone(),
			release_stage: Some(self.release_stage.clone()),
			app_type: self.app_type.clone(),
			duration: Some(u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)),
			in_foreground: None,
			extra: Default::default(),
		}
	}

	pub fn device(&self) -> Device {
		Device {
			os_name: Some(env::consts::OS.to_string()),
			os_version: None,
			cpu_abi: Some(env::consts::ARCH.to_string()),
			locale: locale(),
			time: Some(to_iso8601(&Utc::now())),
			extra: Default::default(),
		}
	}
}

/// POSIX locale from the usual environment variables, e.g. `en_US`.
fn locale() -> Option<String> {
	["LC_ALL", "LC_MESSAGES", "LANG"]
		.iter()
		.filter_map(|name| env::var(name).ok())
		.find(|value| !value.is_empty())
		.map(|value| strip_encoding(&value))
}

fn strip_encoding(value: &str) -> String {
	value.split(['.', '@']).next().unwrap_or(value).to_string()
}
