//! Admission gate — blacklist and spam checks.
//!
//! The blacklist is enforced on every leg: a blocked caller must never reach
//! cursor logic regardless of leg status. The spam check is advisory and runs
//! on the initial leg only — once a dial attempt is in flight, re-scoring an
//! already-admitted call is meaningless. The gate never touches the session
//! store.

use crate::signal::SpamAnnotation;

/// Gate verdict for an inbound leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject(RejectReason),
}

/// Why an initial leg was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Blacklisted,
    Spam,
}

/// Evaluate the gate for one leg.
///
/// The blacklist applies to every leg; the spam check only to the initial
/// leg. Spam evaluation is advisory: a missing caller identity or a missing
/// annotation admits. Only a successful annotation with a positive database
/// match at or over the threshold rejects.
pub fn evaluate(
    caller: Option<&str>,
    spam: Option<&SpamAnnotation>,
    is_initial_leg: bool,
    block_list: &[String],
    spam_threshold: f64,
) -> Admission {
    if let Some(caller) = caller {
        if crate::numbers::is_blocked(block_list, caller) {
            tracing::info!(caller, "Rejecting call: caller is blacklisted");
            return Admission::Reject(RejectReason::Blacklisted);
        }
    }

    if !is_initial_leg {
        return Admission::Admit;
    }

    if let Some(annotation) = spam {
        if annotation.match_found && annotation.score >= spam_threshold {
            tracing::info!(
                caller = caller.unwrap_or("-"),
                score = annotation.score,
                threshold = spam_threshold,
                "Rejecting call: spam score over threshold"
            );
            return Admission::Reject(RejectReason::Spam);
        }
    }

    Admission::Admit
}
