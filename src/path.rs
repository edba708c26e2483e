//! Client path validation and chroot prefixing.

use crate::error::{Error, Result};

/// Validates a client-supplied path.
///
/// Requires: non-empty; begins with `/`; does not end with `/` unless it is exactly
/// `/`; no `//`; no `.` or `..` segments; no control characters or noncharacters.
/// If `sequential` is set the path may legally end with `/` (the server appends the
/// sequence suffix).
pub fn validate_path(path: &str, sequential: bool) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidPath("path must not be empty".into()));
    }
    if !path.starts_with('/') {
        return Err(Error::InvalidPath(format!("path must start with '/': {path}")));
    }
    if path.len() > 1 && path.ends_with('/') && !sequential {
        return Err(Error::InvalidPath(format!("path must not end with '/': {path}")));
    }
    if path == "/" {
        return Ok(());
    }

    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let last = segments.len().saturating_sub(1);
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            if sequential && path.ends_with('/') && i == last {
                continue;
            }
            return Err(Error::InvalidPath(format!("empty path segment (double slash): {path}")));
        }
        if *segment == "." || *segment == ".." {
            return Err(Error::InvalidPath(format!("relative path segment not allowed: {path}")));
        }
    }

    for c in path.chars() {
        if is_forbidden_codepoint(c) {
            return Err(Error::InvalidPath(format!(
                "path contains forbidden code point U+{:04X}: {path}",
                c as u32
            )));
        }
    }

    Ok(())
}

fn is_forbidden_codepoint(c: char) -> bool {
    let cp = c as u32;
    matches!(cp, 0x0000 | 0x0001..=0x001F | 0x007F..=0x009F)
        || matches!(cp, 0xFDD0..=0xFDEF)
        || (cp & 0xFFFE) == 0xFFFE
}

/// Prepends `chroot` (if set) to a client path, canonicalizing away a trailing
/// slash unless the result is the root.
pub fn prepend_chroot(chroot: Option<&str>, client_path: &str) -> String {
    let Some(chroot) = chroot.filter(|c| !c.is_empty()) else {
        return client_path.to_string();
    };
    let mut combined = format!("{chroot}{client_path}");
    if combined.len() > 1 && combined.ends_with('/') {
        combined.pop();
    }
    if combined.is_empty() {
        combined.push('/');
    }
    combined
}

/// Inverse of [`prepend_chroot`]; idempotent if the prefix is absent.
pub fn remove_chroot(chroot: Option<&str>, server_path: &str) -> String {
    let Some(chroot) = chroot.filter(|c| !c.is_empty()) else {
        return server_path.to_string();
    };
    match server_path.strip_prefix(chroot) {
        Some("") => "/".to_string(),
        Some(rest) => rest.to_string(),
        None => server_path.to_string(),
    }
}
