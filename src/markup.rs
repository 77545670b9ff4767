//! Markup emitter — serializes routing intents into the carrier's XML
//! call-control document. No decision logic lives here.

use std::fmt::Write;

/// One call-control instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Speak text to the caller.
    Say(String),
    /// Ring a callee, then re-invoke `action` with the attempt's outcome.
    Dial {
        number: String,
        timeout_secs: u32,
        caller_id: Option<String>,
        action: String,
    },
    /// Record a message, optionally transcribing it.
    Record {
        max_length_secs: u32,
        transcribe: bool,
        transcribe_callback: String,
    },
    /// Refuse the call.
    Reject { reason: String },
    /// End the control session.
    Hangup,
}

/// Serialize intents into a complete carrier response document.
pub fn render(intents: &[Intent]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>");

    for intent in intents {
        match intent {
            Intent::Say(text) => {
                let _ = write!(xml, "<Say>{}</Say>", escape_text(text));
            }
            Intent::Dial { number, timeout_secs, caller_id, action } => {
                let _ = write!(xml, "<Dial timeout=\"{timeout_secs}\"");
                if let Some(caller_id) = caller_id {
                    let _ = write!(xml, " callerId=\"{}\"", escape_attr(caller_id));
                }
                let _ = write!(
                    xml,
                    " action=\"{}\">{}</Dial>",
                    escape_attr(action),
                    escape_text(number)
                );
            }
            Intent::Record { max_length_secs, transcribe, transcribe_callback } => {
                let _ = write!(
                    xml,
                    "<Record maxLength=\"{max_length_secs}\" transcribe=\"{transcribe}\" transcribeCallback=\"{}\"/>",
                    escape_attr(transcribe_callback)
                );
            }
            Intent::Reject { reason } => {
                let _ = write!(xml, "<Reject reason=\"{}\"/>", escape_attr(reason));
            }
            Intent::Hangup => xml.push_str("<Hangup/>"),
        }
    }

    xml.push_str("</Response>");
    xml
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
