// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Identifier normalization (relative-segment collapsing).

use crate::error::{LoaderError, Result};
use tracing::trace;

/// Whether an identifier is relative (`./` or `../`).
pub fn is_relative(id: &str) -> bool {
    id.starts_with("./") || id.starts_with("../")
}

/// Split a loader-qualified identifier (`name!rest`) at the first `!`.
pub fn split_loader(id: &str) -> Option<(&str, &str)> {
    id.split_once('!')
}

/// Collapse the relative segments of `raw` against `base`.
///
/// Relative identifiers resolve against the directory of the base
/// identifier: the base's final segment (the module's own name) is
/// stripped, `raw` is appended, then `.` segments are dropped and each
/// `..` removes the previously accumulated segment. Identifiers without
/// a relative prefix pass through unchanged.
///
/// Fails with [`LoaderError::InvalidIdentifier`] when `raw` is empty,
/// contains an empty segment, or ascends past the root of `base` (a
/// `..` may never reduce the accumulated path below one segment).
pub fn normalize_relative(raw: &str, base: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(LoaderError::invalid_id(raw, "empty identifier"));
    }
    if !is_relative(raw) {
        return Ok(raw.to_string());
    }

    // Directory of the base: everything but its final segment.
    let mut segments: Vec<&str> = base
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    segments.pop();

    for segment in raw.split('/') {
        match segment {
            "" => {
                return Err(LoaderError::invalid_id(raw, "empty segment"));
            }
            "." => {}
            ".." => {
                if segments.len() <= 1 {
                    return Err(LoaderError::invalid_id(
                        raw,
                        format!("ascends past the root of '{}'", base),
                    ));
                }
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    let normalized = segments.join("/");
    if normalized.is_empty() {
        return Err(LoaderError::invalid_id(raw, "collapses to nothing"));
    }
    trace!("normalized '{}' against '{}' -> '{}'", raw, base, normalized);
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_unchanged() {
        assert_eq!(normalize_relative("a/b", "x/y/z").unwrap(), "a/b");
        assert_eq!(normalize_relative("a", "").unwrap(), "a");
    }

    #[test]
    fn test_sibling() {
        assert_eq!(normalize_relative("./b", "a/c/d").unwrap(), "a/c/b");
    }

    #[test]
    fn test_parent() {
        assert_eq!(normalize_relative("../b", "a/c/d").unwrap(), "a/b");
    }

    #[test]
    fn test_nested_descent() {
        assert_eq!(normalize_relative("./x/y", "a/b").unwrap(), "a/x/y");
    }

    #[test]
    fn test_internal_dots_collapse() {
        assert_eq!(normalize_relative("./x/../y", "a/b/c").unwrap(), "a/b/y");
    }

    #[test]
    fn test_ascend_past_root_fails() {
        let err = normalize_relative("../../x", "a/b/c").unwrap_err();
        assert!(matches!(err, LoaderError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_ascend_from_top_level_fails() {
        assert!(normalize_relative("../x", "a").is_err());
        assert!(normalize_relative("../x", "a/b").is_err());
    }

    #[test]
    fn test_relative_against_empty_base() {
        assert_eq!(normalize_relative("./x", "").unwrap(), "x");
        assert!(normalize_relative("../x", "").is_err());
    }

    #[test]
    fn test_empty_identifier_fails() {
        assert!(normalize_relative("", "a/b").is_err());
    }

    #[test]
    fn test_empty_segment_fails() {
        assert!(normalize_relative(".//x", "a/b").is_err());
        assert!(normalize_relative("./x/", "a/b").is_err());
    }

    #[test]
    fn test_split_loader() {
        assert_eq!(split_loader("text!a/b"), Some(("text", "a/b")));
        assert_eq!(split_loader("text!a!b"), Some(("text", "a!b")));
        assert_eq!(split_loader("a/b"), None);
    }
}
