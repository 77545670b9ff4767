//! Routing engine — the per-leg state machine.
//!
//! States are never stored; each leg derives its decision from the signal,
//! the durable cursor, and the forwarding list length. The engine is a pure
//! function: it performs no I/O and describes the required cursor write as
//! data, leaving the store and the response to the webhook layer.

use crate::config::RoutingConfig;
use crate::markup::Intent;
use crate::numbers::ForwardingEntry;
use crate::signal::LegStatus;

/// What this leg should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The previous dial attempt connected; acknowledge and end.
    Connected,
    /// No usable forwarding entries; apologize and hang up.
    Unavailable,
    /// Every callee was tried; record a message.
    Voicemail,
    /// Ring the entry at `index` (0-based into the forwarding list).
    Dial { index: usize },
}

/// A decision together with the cursor write it requires, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub decision: Decision,
    /// New cursor value to persist via conditional write; `None` means the
    /// cursor must not be touched.
    pub cursor_write: Option<u32>,
}

/// Evaluate the transition table for one leg. First match wins.
pub fn route_leg(
    is_initial_leg: bool,
    status: Option<LegStatus>,
    cursor: u32,
    list_len: usize,
) -> Routing {
    if status.is_some_and(LegStatus::is_connected) {
        return Routing {
            decision: Decision::Connected,
            cursor_write: None,
        };
    }

    if list_len == 0 {
        return Routing {
            decision: Decision::Unavailable,
            cursor_write: None,
        };
    }

    let exhausted = cursor as usize >= list_len;
    if exhausted && !is_initial_leg {
        return Routing {
            decision: Decision::Voicemail,
            cursor_write: None,
        };
    }

    // A fresh call that finds the cursor at or past the end is looking at a
    // leftover from a fully exhausted prior sequence; restart from the top.
    // This is the only permitted wraparound.
    let cursor = if exhausted {
        tracing::info!(cursor, list_len, "Stale cursor on initial leg, resetting to 0");
        0
    } else {
        cursor
    };

    let index = cursor as usize % list_len;
    Routing {
        decision: Decision::Dial { index },
        cursor_write: Some(index as u32 + 1),
    }
}

/// Render a decision into the ordered intents the markup emitter serializes.
/// All announcement text lives here; the emitter does no decision work.
pub fn intents_for(
    decision: &Decision,
    list: &[ForwardingEntry],
    config: &RoutingConfig,
) -> Vec<Intent> {
    match decision {
        Decision::Connected => vec![Intent::Hangup],

        Decision::Unavailable => unavailable_intents(),

        Decision::Voicemail => vec![
            Intent::Say(
                "No one was able to answer your call. Please leave a message after the tone."
                    .to_string(),
            ),
            Intent::Record {
                max_length_secs: config.voicemail_max_secs,
                transcribe: true,
                transcribe_callback: config.transcript_path.clone(),
            },
        ],

        Decision::Dial { index } => {
            // The decision and the list come from the same leg, so the index
            // is in range by construction; a mismatched list degrades to the
            // unavailable response instead of panicking.
            let Some(entry) = list.get(*index) else {
                tracing::warn!(index, list_len = list.len(), "Dial index out of range for list");
                return unavailable_intents();
            };
            vec![
                Intent::Say(format!(
                    "Please wait while we try to connect you to {}.",
                    entry.announce_name(index + 1)
                )),
                Intent::Dial {
                    number: entry.number.clone(),
                    timeout_secs: config.dial_timeout_secs,
                    caller_id: config.caller_id.clone(),
                    action: config.voice_path.clone(),
                },
            ]
        }
    }
}

fn unavailable_intents() -> Vec<Intent> {
    vec![
        Intent::Say(
            "We are sorry, no one is available to take your call. Please try again later."
                .to_string(),
        ),
        Intent::Hangup,
    ]
}
