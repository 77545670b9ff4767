//! Inbound call signal — the form-encoded body the carrier posts on every leg.

use serde::Deserialize;

/// One webhook activation's worth of carrier data.
///
/// The carrier posts many more fields than these; everything not listed is
/// ignored. `DialCallStatus` is absent on the very first leg of a call and
/// present on every callback after a dial attempt concludes, which is how
/// the pipeline tells an initial leg from a retry leg.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallSignal {
    /// Carrier-assigned call correlation id.
    #[serde(rename = "CallSid", default)]
    pub call_sid: Option<String>,

    /// Caller identity (E.164). Some carriers send `Caller` instead of `From`.
    #[serde(rename = "From", alias = "Caller", default)]
    pub from: Option<String>,

    /// Outcome of the previous dial attempt; absent on the initial leg.
    #[serde(rename = "DialCallStatus", default)]
    pub dial_call_status: Option<String>,

    /// Raw JSON envelope from the carrier's spam-scoring add-on.
    #[serde(rename = "AddOns", default)]
    pub add_ons: Option<String>,
}

impl CallSignal {
    /// True when this is the first leg of a call (no prior dial attempt).
    pub fn is_initial_leg(&self) -> bool {
        self.dial_call_status.is_none()
    }

    /// Parsed status of the previous dial attempt, if any.
    pub fn leg_status(&self) -> Option<LegStatus> {
        let raw = self.dial_call_status.as_deref()?;
        let status = LegStatus::parse(raw);
        if status.is_none() {
            tracing::debug!(status = raw, "Unrecognized leg status, treating as unanswered");
        }
        status
    }

    /// Spam annotation extracted from the add-on envelope, if one was
    /// delivered and parses cleanly. Malformed JSON fails open to `None`.
    pub fn spam_annotation(&self) -> Option<SpamAnnotation> {
        let raw = self.add_ons.as_deref()?;
        match SpamAnnotation::from_json(raw) {
            Some(annotation) => Some(annotation),
            None => {
                tracing::debug!(
                    call_sid = self.call_sid.as_deref().unwrap_or("-"),
                    "Spam add-on envelope absent or malformed, admitting"
                );
                None
            }
        }
    }
}

/// Status of a concluded dial attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegStatus {
    InProgress,
    NoAnswer,
    Busy,
    Failed,
    Completed,
    Answered,
}

impl LegStatus {
    /// Lenient parse of the carrier's status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in-progress" => Some(Self::InProgress),
            "no-answer" => Some(Self::NoAnswer),
            "busy" => Some(Self::Busy),
            "failed" => Some(Self::Failed),
            "completed" => Some(Self::Completed),
            "answered" => Some(Self::Answered),
            _ => None,
        }
    }

    /// True when the previous leg ended with the parties connected.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Completed | Self::Answered)
    }
}

/// Result of the carrier's spam-scoring add-on for the inbound caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpamAnnotation {
    /// Whether the caller matched the add-on's spam database.
    pub match_found: bool,
    /// Confidence score on a 0-100 scale.
    pub score: f64,
}

impl SpamAnnotation {
    /// Extract the annotation from the add-on envelope.
    ///
    /// The envelope wraps per-add-on results:
    /// `{"status":"successful","results":{"<vendor>":{"status":"successful",
    /// "result":{"result":{"match":true,"score":90}}}}}`. Any shape that does
    /// not carry an overall success status and a nested `match` flag yields
    /// `None` — spam evaluation is advisory and never fails closed.
    pub fn from_json(raw: &str) -> Option<Self> {
        let envelope: serde_json::Value = serde_json::from_str(raw).ok()?;
        if envelope.get("status")?.as_str()? != "successful" {
            return None;
        }

        let results = envelope.get("results")?.as_object()?;
        for vendor in results.values() {
            if vendor.get("status").and_then(|s| s.as_str()) != Some("successful") {
                continue;
            }
            if let Some(found) = find_match_result(vendor.get("result")?) {
                return Some(found);
            }
        }
        None
    }
}

/// Walk a vendor result looking for an object carrying a boolean `match`.
/// Vendors nest their payload one or two levels deep under `result`.
fn find_match_result(value: &serde_json::Value) -> Option<SpamAnnotation> {
    let obj = value.as_object()?;
    if let Some(match_found) = obj.get("match").and_then(|m| m.as_bool()) {
        let score = obj.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
        return Some(SpamAnnotation { match_found, score });
    }
    obj.get("result").and_then(find_match_result)
}
