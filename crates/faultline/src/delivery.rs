// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery seam.
//!
//! The client serializes a [`Notification`] and hands it to a [`Delivery`].
//! Transport, retries and persistence belong to the implementation.

use std::io::Write;
use std::sync::Arc;

use faultline_core::{Notification, Streamable};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;

/// Outcome reported by a [`Delivery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
	/// Accepted by the receiver.
	Delivered,
	/// Not sent, but may be retried later.
	Undelivered,
	/// Rejected; retrying will not help.
	Failure,
}

pub trait Delivery: Send + Sync {
	fn deliver(&self, notification: &Notification) -> Result<DeliveryStatus>;
}

/// Streams each payload as one JSON line to a writer.
pub struct WriterDelivery<W: Write + Send> {
	writer: Mutex<W>,
}

impl<W: Write + Send> WriterDelivery<W> {
	pub fn new(writer: W) -> Self {
		Self {
			writer: Mutex::new(writer),
		}
	}

	pub fn into_inner(self) -> W {
		self.writer.into_inner()
	}
}

impl<W: Write + Send> Delivery for WriterDelivery<W> {
	fn deliver(&self, notification: &Notification) -> Result<DeliveryStatus> {
		let mut writer = self.writer.lock();
		notification.to_stream(&mut *writer)?;
		writer
			.write_all(b"\n")
			.and_then(|()| writer.flush())
			.map_err(faultline_core::EventError::from)?;
		debug!(events = notification.events.len(), "Payload written");
		Ok(DeliveryStatus::Delivered)
	}
}

/// Keeps serialized payloads in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDelivery {
	payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemoryDelivery {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn payloads(&self) -> Vec<Vec<u8>> {
		self.payloads.lock().clone()
	}

	/// Payloads parsed back into JSON values.
	pub fn payloads_json(&self) -> Vec<serde_json::Value> {
		self.payloads
			.lock()
			.iter()
			.filter_map(|bytes| serde_json::from_slice(bytes).ok())
			.collect()
	}

	pub fn len(&self) -> usize {
		self.payloads.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		self.payloads.lock().clear();
	}
}

impl Delivery for MemoryDelivery {
	fn deliver(&self, notification: &Notification) -> Result<DeliveryStatus> {
		let bytes = notification.to_bytes()?;
		self.payloads.lock().push(bytes);
		Ok(DeliveryStatus::Delivered)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use faultline_core::{Event, EventConfig, Exception, HandledState, Metadata};
	use std::io;

	fn notification() -> Notification {
		let config = EventConfig {
			api_key: "key".into(),
			..EventConfig::default()
		};
		Notification::new(Event::new(
			vec![Exception::new("Boom", "x")],
			HandledState::handled(),
			&Metadata::new(),
			&config,
		))
	}

	#[test]
	fn writer_delivery_writes_json_lines() {
		let delivery = WriterDelivery::new(Vec::new());
		delivery.deliver(&notification()).unwrap();
		delivery.deliver(&notification()).unwrap();

		let out = String::from_utf8(delivery.into_inner()).unwrap();
		let lines: Vec<_> = out.lines().collect();
		assert_eq!(lines.len(), 2);
		let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
		assert_eq!(value["apiKey"], "key");
	}

	struct Broken;

	impl Write for Broken {
		fn write(&mut self, _: &[u8]) -> io::Result<usize> {
			Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn writer_errors_propagate() {
		let delivery = WriterDelivery::new(Broken);
		assert!(delivery.deliver(&notification()).is_err());
	}

	#[test]
	fn memory_delivery_clones_share_store() {
		let delivery = MemoryDelivery::new();
		let handle = delivery.clone();
		delivery.deliver(&notification()).unwrap();

		assert_eq!(handle.len(), 1);
		assert_eq!(handle.payloads_json()[0]["events"][0]["exceptions"][0]["errorClass"], "Boom");
	}
}
