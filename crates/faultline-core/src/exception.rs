// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exception records making up an event's error chain.

use serde::{Deserialize, Serialize};

/// Value of the `type` field for errors raised by Rust code.
pub const RUST_ERROR_TYPE: &str = "rust";

/// One error in the chain, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
	error_class: String,
	message: String,
	#[serde(rename = "type")]
	error_type: String,
	stacktrace: Vec<Stackframe>,
}

impl Exception {
	pub fn new(error_class: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error_class: error_class.into(),
			message: message.into(),
			error_type: RUST_ERROR_TYPE.to_string(),
			stacktrace: Vec::new(),
		}
	}

	pub fn with_stacktrace(mut self, stacktrace: Vec<Stackframe>) -> Self {
		self.stacktrace = stacktrace;
		self
	}

	/// Builds the chain for `error` by walking `source()`.
	///
	/// The outermost class is the static type name when it is known. Sources
	/// are only reachable as trait objects, so their class is read from the
	/// leading identifier of their `Debug` output.
	pub fn chain<E>(error: &E) -> Vec<Exception>
	where
		E: std::error::Error + ?Sized,
	{
		let outer_class = class_from_type_name(std::any::type_name::<E>())
			.or_else(|| class_from_debug(&format!("{error:?}")))
			.unwrap_or_else(|| "Error".to_string());

		let mut chain = vec![Exception::new(outer_class, error.to_string())];

		let mut source = error.source();
		while let Some(cause) = source {
			let class = class_from_debug(&format!("{cause:?}")).unwrap_or_else(|| "Error".to_string());
			chain.push(Exception::new(class, cause.to_string()));
			source = cause.source();
		}

		chain
	}

	pub fn error_class(&self) -> &str {
		&self.error_class
	}

	pub fn set_error_class(&mut self, error_class: impl Into<String>) {
		self.error_class = error_class.into();
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn set_message(&mut self, message: impl Into<String>) {
		self.message = message.into();
	}

	pub fn error_type(&self) -> &str {
		&self.error_type
	}

	pub fn stacktrace(&self) -> &[Stackframe] {
		&self.stacktrace
	}
}

fn class_from_type_name(name: &str) -> Option<String> {
	if name.starts_with("dyn ") || name.starts_with('&') {
		return None;
	}
	Some(name.to_string())
}

fn class_from_debug(debug: &str) -> Option<String> {
	let ident: String = debug
		.chars()
		.take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
		.collect();
	let ident = ident.trim_end_matches(':');
	if ident.is_empty() {
		None
	} else {
		Some(ident.to_string())
	}
}

/// A single frame of a stacktrace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stackframe {
	pub method: String,
	pub file: Option<String>,
	pub line_number: Option<u32>,
	pub in_project: bool,
}

impl Stackframe {
	/// Creates a frame, marking it in-project when `method` lives under one of
	/// `project_packages` (e.g. `my_app` or `my_app::handlers`).
	pub fn new(
		method: impl Into<String>,
		file: Option<String>,
		line_number: Option<u32>,
		project_packages: &[String],
	) -> Self {
		let method = method.into();
		let in_project = is_in_project(&method, project_packages);
		Self {
			method,
			file,
			line_number,
			in_project,
		}
	}
}

fn is_in_project(method: &str, project_packages: &[String]) -> bool {
	let method = method.trim_start_matches('<');
	project_packages.iter().any(|package| {
		method
			.strip_prefix(package.as_str())
			.is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
	})
}
