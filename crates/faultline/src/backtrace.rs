// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and parsing into stackframes.

use faultline_core::Stackframe;
use rustc_demangle::demangle;
use std::backtrace::Backtrace;

/// Frames from these prefixes at the top of a trace belong to the capture
/// machinery itself and are dropped.
const CAPTURE_PREFIXES: &[&str] = &[
	"std::backtrace",
	"<std::backtrace",
	"faultline::",
	"<faultline::",
	"std::panicking",
	"core::panicking",
	"std::panic::",
];

/// Capture a fresh backtrace of the calling thread and parse it.
pub fn capture_stacktrace(project_packages: &[String]) -> Vec<Stackframe> {
	let backtrace = Backtrace::force_capture();
	parse_backtrace_string(&backtrace.to_string(), project_packages)
}

/// Parse rendered backtrace output into frames, innermost first.
///
/// Each frame is a `N: symbol` line optionally followed by an
/// `at file:line:col` line.
pub fn parse_backtrace_string(bt_string: &str, project_packages: &[String]) -> Vec<Stackframe> {
	let mut frames: Vec<Stackframe> = Vec::new();

	for line in bt_string.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(frame) = frames.last_mut() {
				let (file, line_number) = parse_location(location);
				frame.file = Some(file);
				frame.line_number = line_number;
			}
			continue;
		}

		if let Some(frame) = parse_frame_line(line, project_packages) {
			frames.push(frame);
		}
	}

	let skip = frames
		.iter()
		.take_while(|f| CAPTURE_PREFIXES.iter().any(|p| f.method.starts_with(p)))
		.count();
	frames.split_off(skip)
}

fn parse_frame_line(line: &str, project_packages: &[String]) -> Option<Stackframe> {
	// "N: function_name" or just "function_name"
	let function_part = match line.split_once(':') {
		Some((prefix, rest)) if prefix.trim().parse::<u32>().is_ok() => rest.trim(),
		_ => line,
	};

	if function_part.is_empty() {
		return None;
	}

	let method = format!("{:#}", demangle(function_part));
	let mut frame = Stackframe::new(method, None, None, project_packages);
	if project_packages.is_empty() {
		frame.in_project = is_in_app_frame(&frame.method);
	}
	Some(frame)
}

/// Splits `path:line:col` (or `path:line`) into the path and line.
fn parse_location(location: &str) -> (String, Option<u32>) {
	let mut parts = location.rsplitn(3, ':');
	let last = parts.next();
	let middle = parts.next();
	let rest = parts.next();

	match (rest, middle, last) {
		(Some(path), Some(line), Some(_col)) if line.parse::<u32>().is_ok() => {
			(path.to_string(), line.parse().ok())
		}
		(_, Some(path), Some(line)) if line.parse::<u32>().is_ok() => {
			let path = match rest {
				Some(prefix) => format!("{prefix}:{path}"),
				None => path.to_string(),
			};
			(path, line.parse().ok())
		}
		_ => (location.to_string(), None),
	}
}

/// Fallback in-project heuristic when no project packages are configured:
/// anything outside the standard library and common runtime crates.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"futures::",
		"<futures::",
		"tracing::",
		"<tracing::",
		"panic_unwind::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
		"__libc_start",
		"_start",
	];

	const SYSTEM_CONTAINS: &[&str] = &["::panicking::", "::rt::", "::sys_common::"];

	if SYSTEM_PREFIXES.iter().any(|p| function.starts_with(p)) {
		return false;
	}
	!SYSTEM_CONTAINS.iter().any(|c| function.contains(c))
}
