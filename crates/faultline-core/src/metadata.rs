// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Namespaced metadata attached to events.
//!
//! Metadata is organised as sections ("tabs" on the dashboard), each holding
//! arbitrary key/value pairs. Sections and keys live in ordered maps, so
//! serialized output is alphabetical regardless of insertion order.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A single section of metadata.
pub type Section = BTreeMap<String, MetadataValue>;

/// A JSON-compatible metadata value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Array(Vec<MetadataValue>),
	Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Int(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&BTreeMap<String, MetadataValue>> {
		match self {
			Self::Map(m) => Some(m),
			_ => None,
		}
	}
}

impl From<bool> for MetadataValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i32> for MetadataValue {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}

impl From<i64> for MetadataValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<u32> for MetadataValue {
	fn from(value: u32) -> Self {
		Self::Int(value.into())
	}
}

impl From<u64> for MetadataValue {
	fn from(value: u64) -> Self {
		match i64::try_from(value) {
			Ok(n) => Self::Int(n),
			Err(_) => Self::Float(value as f64),
		}
	}
}

impl From<usize> for MetadataValue {
	fn from(value: usize) -> Self {
		Self::from(value as u64)
	}
}

impl From<f64> for MetadataValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for MetadataValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for MetadataValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl<T: Into<MetadataValue>> From<Option<T>> for MetadataValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

impl<T: Into<MetadataValue>> From<Vec<T>> for MetadataValue {
	fn from(values: Vec<T>) -> Self {
		Self::Array(values.into_iter().map(Into::into).collect())
	}
}

impl<K: Into<String>, V: Into<MetadataValue>> From<BTreeMap<K, V>> for MetadataValue {
	fn from(map: BTreeMap<K, V>) -> Self {
		Self::Map(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

impl<K: Into<String>, V: Into<MetadataValue>> From<HashMap<K, V>> for MetadataValue {
	fn from(map: HashMap<K, V>) -> Self {
		Self::Map(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

impl From<serde_json::Value> for MetadataValue {
	fn from(value: serde_json::Value) -> Self {
		match value {
			serde_json::Value::Null => Self::Null,
			serde_json::Value::Bool(b) => Self::Bool(b),
			serde_json::Value::Number(n) => match n.as_i64() {
				Some(i) => Self::Int(i),
				None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			serde_json::Value::String(s) => Self::String(s),
			serde_json::Value::Array(items) => Self::Array(items.into_iter().map(Into::into).collect()),
			serde_json::Value::Object(map) => {
				Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
			}
		}
	}
}

/// Sectioned metadata store.
///
/// `Clone` is a deep copy: every value is owned, so mutating a clone never
/// touches the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
	store: BTreeMap<String, Section>,
}

impl Metadata {
	pub fn new() -> Self {
		Self::default()
	}

	/// Merges `values` into `section`, creating the section if needed.
	///
	/// Colliding keys are replaced. A `Null` value removes its key.
	pub fn add_metadata_map<I, K, V>(&mut self, section: impl Into<String>, values: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<MetadataValue>,
	{
		let tab = self.store.entry(section.into()).or_default();
		for (key, value) in values {
			let key = key.into();
			match value.into() {
				MetadataValue::Null => {
					tab.remove(&key);
				}
				value => {
					tab.insert(key, value);
				}
			}
		}
	}

	/// Sets a single key. A `Null` value removes the key if present.
	pub fn add_metadata(
		&mut self,
		section: impl Into<String>,
		key: impl Into<String>,
		value: impl Into<MetadataValue>,
	) {
		let section = section.into();
		let key = key.into();
		match value.into() {
			MetadataValue::Null => self.clear_metadata_key(&section, &key),
			value => {
				self.store.entry(section).or_default().insert(key, value);
			}
		}
	}

	/// Removes an entire section. No-op if absent.
	pub fn clear_metadata(&mut self, section: &str) {
		self.store.remove(section);
	}

	/// Removes a single key. No-op if the section or key is absent.
	pub fn clear_metadata_key(&mut self, section: &str, key: &str) {
		if let Some(tab) = self.store.get_mut(section) {
			tab.remove(key);
		}
	}

	pub fn get_metadata(&self, section: &str) -> Option<&Section> {
		self.store.get(section)
	}

	pub fn get_metadata_value(&self, section: &str, key: &str) -> Option<&MetadataValue> {
		self.store.get(section).and_then(|tab| tab.get(key))
	}

	/// Iterates sections in alphabetical order.
	pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
		self.store.iter().map(|(name, tab)| (name.as_str(), tab))
	}

	pub fn is_empty(&self) -> bool {
		self.store.is_empty()
	}

	/// Deep-merges stores left to right into a new store.
	///
	/// When both sides hold a map under the same key the maps are merged
	/// recursively; any other collision takes the right-hand value.
	pub fn merge(stores: &[&Metadata]) -> Metadata {
		let mut merged = Metadata::new();
		for store in stores {
			for (section, tab) in &store.store {
				let target = merged.store.entry(section.clone()).or_default();
				merge_section(target, tab);
			}
		}
		merged
	}
}

fn merge_section(target: &mut BTreeMap<String, MetadataValue>, source: &BTreeMap<String, MetadataValue>) {
	for (key, value) in source {
		match (target.get_mut(key), value) {
			(Some(MetadataValue::Map(existing)), MetadataValue::Map(incoming)) => {
				merge_section(existing, incoming);
			}
			_ => {
				target.insert(key.clone(), value.clone());
			}
		}
	}
}
