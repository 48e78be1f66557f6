// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Timestamp formatting shared by every payload field that carries a date.

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp as ISO-8601 with millisecond precision and a `Z` suffix,
/// e.g. `2025-01-31T09:15:02.117Z`.
pub fn to_iso8601(timestamp: &DateTime<Utc>) -> String {
	timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
