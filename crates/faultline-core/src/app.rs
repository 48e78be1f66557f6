// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! App and device state captured at report time.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::metadata::MetadataValue;

const APP_FIELDS: &[&str] = &["id", "version", "releaseStage", "type", "duration", "inForeground"];
const DEVICE_FIELDS: &[&str] = &["osName", "osVersion", "cpuAbi", "locale", "time"];

/// Application state at report time.
///
/// Entries in `extra` whose key matches a named field are not serialized, so
/// the named field always wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
	pub id: Option<String>,
	pub version: Option<String>,
	pub release_stage: Option<String>,
	#[serde(rename = "type")]
	pub app_type: Option<String>,
	/// Milliseconds since the client started.
	pub duration: Option<u64>,
	pub in_foreground: Option<bool>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, MetadataValue>,
}

impl Serialize for App {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(None)?;
		entry(&mut map, "id", &self.id)?;
		entry(&mut map, "version", &self.version)?;
		entry(&mut map, "releaseStage", &self.release_stage)?;
		entry(&mut map, "type", &self.app_type)?;
		entry(&mut map, "duration", &self.duration)?;
		entry(&mut map, "inForeground", &self.in_foreground)?;
		extra_entries(&mut map, &self.extra, APP_FIELDS)?;
		map.end()
	}
}

/// Device state at report time.
///
/// Like [`App`], named fields take precedence over same-named `extra` keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
	pub os_name: Option<String>,
	pub os_version: Option<String>,
	pub cpu_abi: Option<String>,
	pub locale: Option<String>,
	/// ISO-8601 time the state was captured.
	pub time: Option<String>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, MetadataValue>,
}

impl Serialize for Device {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(None)?;
		entry(&mut map, "osName", &self.os_name)?;
		entry(&mut map, "osVersion", &self.os_version)?;
		entry(&mut map, "cpuAbi", &self.cpu_abi)?;
		entry(&mut map, "locale", &self.locale)?;
		entry(&mut map, "time", &self.time)?;
		extra_entries(&mut map, &self.extra, DEVICE_FIELDS)?;
		map.end()
	}
}

fn entry<M: SerializeMap, T: Serialize>(map: &mut M, key: &str, value: &Option<T>) -> Result<(), M::Error> {
	match value {
		Some(value) => map.serialize_entry(key, value),
		None => Ok(()),
	}
}

fn extra_entries<M: SerializeMap>(
	map: &mut M,
	extra: &BTreeMap<String, MetadataValue>,
	reserved: &[&str],
) -> Result<(), M::Error> {
	for (key, value) in extra {
		if !reserved.contains(&key.as_str()) {
			map.serialize_entry(key, value)?;
		}
	}
	Ok(())
}
