//! Forwarding and block lists — loaded fresh on every leg.
//!
//! Both loaders absorb their own failures: a missing or unreadable forwarding
//! list behaves as an empty list (which routes every call to the unavailable
//! response), and a missing block list means no blacklist is enforced.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// E.164: leading `+`, then 2 to 15 digits with no leading zero.
static E164: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").unwrap());

/// True when `number` is a canonically formatted E.164 address.
pub fn is_valid_e164(number: &str) -> bool {
    E164.is_match(number)
}

/// One callee in the dial sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForwardingEntry {
    /// E.164 callee address.
    pub number: String,
    /// Display name for the ring announcement; empty or absent is legal.
    #[serde(default)]
    pub name: Option<String>,
}

impl ForwardingEntry {
    /// Name to announce while dialing this entry. Falls back to the 1-based
    /// position when no name is configured.
    pub fn announce_name(&self, position: usize) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => name.trim().to_string(),
            None => format!("recipient {position}"),
        }
    }
}

/// Load the forwarding list from a JSON file.
///
/// Entries failing E.164 validation are dropped with a warning rather than
/// failing the leg; the result may legitimately be empty.
pub fn load_forwarding_list(path: &Path) -> Vec<ForwardingEntry> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Forwarding list unreadable, treating as empty");
            return Vec::new();
        }
    };

    let entries: Vec<ForwardingEntry> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Forwarding list unparseable, treating as empty");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter(|entry| {
            let ok = is_valid_e164(&entry.number);
            if !ok {
                tracing::warn!(number = %entry.number, "Dropping forwarding entry with invalid E.164 address");
            }
            ok
        })
        .collect()
}

/// Load the block list: one E.164 address per line, `#` comments and blank
/// lines ignored. `None` path or unreadable file means no blacklist.
pub fn load_block_list(path: Option<&Path>) -> Vec<String> {
    let Some(path) = path else {
        return Vec::new();
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Block list unreadable, no blacklist enforced");
            return Vec::new();
        }
    };

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            let ok = is_valid_e164(line);
            if !ok {
                tracing::warn!(entry = line, "Dropping block list entry with invalid E.164 address");
            }
            ok
        })
        .map(str::to_string)
        .collect()
}

/// Exact-match membership test against the block list.
pub fn is_blocked(block_list: &[String], caller: &str) -> bool {
    block_list.iter().any(|blocked| blocked == caller)
}
