// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Canonical serializer.
//!
//! Every payload type (event, breadcrumb, exception, thread, session
//! snapshot, notification) knows how to write itself through `Serialize`;
//! [`Streamable`] adds the sink-facing operations on top.

use std::io::Write;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Rendering of a payload to JSON.
///
/// Output is compact and deterministic. Sink failures surface as
/// [`EventError::Io`](crate::EventError::Io); a failed write may leave a
/// truncated payload in the sink and it is up to the caller to discard it.
pub trait Streamable: Serialize {
	fn to_stream<W: Write>(&self, writer: W) -> Result<()> {
		serde_json::to_writer(writer, self)?;
		Ok(())
	}

	fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec(self)?)
	}

	fn to_value(&self) -> Result<serde_json::Value> {
		Ok(serde_json::to_value(self)?)
	}

	/// Hex SHA-256 of the rendered bytes.
	fn digest(&self) -> Result<String> {
		let bytes = self.to_bytes()?;
		Ok(hex::encode(Sha256::digest(&bytes)))
	}
}

impl<T: Serialize + ?Sized> Streamable for T {}
