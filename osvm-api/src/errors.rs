//! Formatting for backend error bodies.
//!
//! The control plane wraps errors in a zoo of service-specific envelopes
//! (`badRequest`, `NeutronError`, ...) and sometimes embeds HTML. Unwrap the
//! message, strip the markup, and highlight it so a human can read it.

use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;

const ERROR_KEYS: &[&str] = &[
    "badRequest",
    "NeutronError",
    "itemNotFound",
    "computeFault",
    "unauthorizedError",
    "notFound",
    "forbidden",
    "conflictingRequest",
    "overLimit",
    "serverCapacityUnavailable",
    "serviceUnavailable",
    "volumeBackendAPIException",
    "HTTPBadRequest",
    "internalServerError",
    "invalidInput",
    "resourceNotFound",
    "quotaExceeded",
    "imageUnacceptable",
    "connectionRefused",
    "volumeFault",
    "resourceInUse",
];

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new("<[^>]*>").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Pull the human-readable message out of a raw error response body.
pub fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ERROR_KEYS {
            if let Some(msg) = value
                .get(key)
                .and_then(|obj| obj.get("message").or_else(|| obj.get("Message")))
                .and_then(|m| m.as_str())
            {
                return clean_error_message(msg);
            }
        }
        for key in ["message", "Message", "error", "error_message"] {
            if let Some(msg) = value.get(key).and_then(|m| m.as_str()) {
                return clean_error_message(msg);
            }
        }
    }
    clean_error_message(body)
}

/// Extract and colorize; used on every non-success response body.
pub fn format_error_body(body: &str) -> String {
    extract_error_message(body).red().to_string()
}

/// Remove HTML tags, decode common entities, and collapse whitespace.
fn clean_error_message(msg: &str) -> String {
    let msg = HTML_TAG.replace_all(msg, "");
    let msg = msg
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(&msg, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_nova_envelope() {
        let body = r#"{"badRequest": {"message": "Invalid flavor", "code": 400}}"#;
        assert_eq!(extract_error_message(body), "Invalid flavor");
    }

    #[test]
    fn unwraps_neutron_envelope() {
        let body = r#"{"NeutronError": {"Message": "IP address already allocated"}}"#;
        assert_eq!(extract_error_message(body), "IP address already allocated");
    }

    #[test]
    fn falls_back_to_top_level_message() {
        let body = r#"{"message": "nope"}"#;
        assert_eq!(extract_error_message(body), "nope");
    }

    #[test]
    fn strips_html_and_entities() {
        let cleaned = clean_error_message("<html><body>404 &quot;Not   Found&quot;</body></html>");
        assert_eq!(cleaned, "404 \"Not Found\"");
    }

    #[test]
    fn non_json_body_passes_through_cleaned() {
        assert_eq!(extract_error_message("plain  text\nerror"), "plain text error");
    }
}
