//! Prefix/suffix classification of synthetic forward names.
//!
//! A synthetic name is `prefix + interior + suffix`, fully qualified. The
//! interior is an encoded address (rdns mode) or a canonical inventory name
//! (docker mode). Matching is ASCII case-insensitive and ignores whether the
//! query or the configured suffix carries a trailing dot.

use crate::error::SynthError;

/// Lowercase `name` and make sure it ends in exactly one `.`.
///
/// An empty name becomes the root (`.`).
pub fn fqdn(name: &str) -> String {
    let mut out = name.trim_end_matches('.').to_ascii_lowercase();
    out.push('.');
    out
}

/// Whether `name` is `prefix + <non-empty interior> + suffix`.
pub fn matches(name: &str, prefix: &str, suffix: &str) -> bool {
    interior(name, prefix, suffix).is_some()
}

/// The interior of a synthetic name, without prefix, suffix or trailing dot.
pub fn strip(name: &str, prefix: &str, suffix: &str) -> Result<String, SynthError> {
    interior(name, prefix, suffix).ok_or_else(|| SynthError::NameNotSynthetic(name.to_string()))
}

/// Build the FQDN `prefix + interior + suffix`.
///
/// A `.` is inserted before a non-empty suffix that does not start with one,
/// so `decorate("10-0-0-5", "", "docker")` is `10-0-0-5.docker.`.
pub fn decorate(interior: &str, prefix: &str, suffix: &str) -> String {
    let suffix = suffix.trim_end_matches('.');
    let mut out = String::with_capacity(prefix.len() + interior.len() + suffix.len() + 2);
    out.push_str(prefix);
    out.push_str(interior);
    if !suffix.is_empty() && !suffix.starts_with('.') {
        out.push('.');
    }
    out.push_str(suffix);
    out.push('.');
    out
}

fn interior(name: &str, prefix: &str, suffix: &str) -> Option<String> {
    let name = fqdn(name);
    let prefix = prefix.to_ascii_lowercase();
    let suffix = fqdn(suffix);

    if name.len() < prefix.len() + suffix.len() {
        return None;
    }
    let rest = name.strip_prefix(prefix.as_str())?;
    let rest = rest.strip_suffix(suffix.as_str())?;
    // A suffix without a leading dot starts at a label boundary.
    let rest = if suffix.starts_with('.') {
        rest
    } else {
        rest.strip_suffix('.')?
    };

    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Prefix/suffix decoration for one address family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyNaming {
    /// Text before the encoded address (e.g. `ip-`).
    pub prefix: String,
    /// Zone the synthetic names live under (e.g. `.docker.`).
    pub suffix: String,
}

impl FamilyNaming {
    /// Create a naming rule.
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// See [`matches`].
    pub fn matches(&self, name: &str) -> bool {
        matches(name, &self.prefix, &self.suffix)
    }

    /// See [`strip`].
    pub fn strip(&self, name: &str) -> Result<String, SynthError> {
        strip(name, &self.prefix, &self.suffix)
    }

    /// See [`decorate`].
    pub fn decorate(&self, interior: &str) -> String {
        decorate(interior, &self.prefix, &self.suffix)
    }

    /// Zone apex the synthetic names live under, as an FQDN.
    ///
    /// `.docker.` → `docker.`; an empty suffix is the root.
    pub fn zone(&self) -> String {
        fqdn(self.suffix.trim_start_matches('.'))
    }
}
