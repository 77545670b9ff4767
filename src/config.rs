//! Configuration types.
//!
//! All knobs are read from the environment once at startup and passed into
//! the router state explicitly, so the same pipeline can be driven with
//! varied configurations in tests.

use std::path::PathBuf;

/// Routing configuration for the call-forwarding pipeline.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Path to the forwarding list JSON file (reloaded every leg).
    pub forward_list_path: PathBuf,
    /// Path to the block list file; `None` means no blacklist enforced.
    pub block_list_path: Option<PathBuf>,
    /// Seconds to ring a callee before the carrier reports no-answer.
    pub dial_timeout_secs: u32,
    /// Caller-id to present on outbound dial legs, if configured.
    pub caller_id: Option<String>,
    /// Spam score at or above which an initial leg is rejected (0-100 scale).
    pub spam_threshold: f64,
    /// Maximum voicemail recording length.
    pub voicemail_max_secs: u32,
    /// Webhook path the carrier re-invokes for every call leg.
    pub voice_path: String,
    /// Webhook path the carrier posts voicemail transcriptions to.
    pub transcript_path: String,
    /// Well-known name of the session cursor document.
    pub session_name: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            forward_list_path: PathBuf::from("./config/forward_list.json"),
            block_list_path: None,
            dial_timeout_secs: 15,
            caller_id: None,
            spam_threshold: 75.0,
            voicemail_max_secs: 120,
            voice_path: "/voice".to_string(),
            transcript_path: "/voicemail".to_string(),
            session_name: "dial-cursor".to_string(),
        }
    }
}

impl RoutingConfig {
    /// Build config from `RINGLINE_*` environment variables, falling back to
    /// the defaults above for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            forward_list_path: std::env::var("RINGLINE_FORWARD_LIST")
                .map(PathBuf::from)
                .unwrap_or(defaults.forward_list_path),
            block_list_path: std::env::var("RINGLINE_BLOCK_LIST").ok().map(PathBuf::from),
            dial_timeout_secs: env_parse("RINGLINE_DIAL_TIMEOUT_SECS", defaults.dial_timeout_secs),
            caller_id: std::env::var("RINGLINE_CALLER_ID").ok().filter(|s| !s.is_empty()),
            spam_threshold: env_parse("RINGLINE_SPAM_THRESHOLD", defaults.spam_threshold),
            voicemail_max_secs: env_parse("RINGLINE_VOICEMAIL_MAX_SECS", defaults.voicemail_max_secs),
            voice_path: std::env::var("RINGLINE_VOICE_PATH").unwrap_or(defaults.voice_path),
            transcript_path: std::env::var("RINGLINE_TRANSCRIPT_PATH")
                .unwrap_or(defaults.transcript_path),
            session_name: std::env::var("RINGLINE_SESSION_NAME").unwrap_or(defaults.session_name),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
