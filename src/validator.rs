//! External validator boundary.
//!
//! The core only ever sees a typed verdict: the remote parser either
//! accepted the wire message or rejected it with a reason. Transport
//! failures and timeouts are errors, never verdicts — an unreachable
//! validator must not read as "validation passed". How HTTP statuses
//! map onto verdicts is this module's concern alone.

use std::time::Duration;

/// Outcome of submitting a wire message to the validating parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected { reason: String },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error("Validator transport failure: {0}")]
    Transport(String),
    #[error("Validator unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous request/response call to the validating parser.
pub trait MessageValidator {
    fn validate(&self, wire: &str) -> Result<Verdict, ValidatorError>;
}

/// HTTP implementation: POSTs the wire message as `text/plain`.
///
/// 4xx responses are rejections carrying the response body as the
/// reason; 5xx and timeouts surface as [`ValidatorError::Unavailable`].
pub struct HttpValidator {
    agent: ureq::Agent,
    url: String,
}

impl HttpValidator {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(10))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        HttpValidator {
            agent,
            url: url.into(),
        }
    }
}

impl MessageValidator for HttpValidator {
    fn validate(&self, wire: &str) -> Result<Verdict, ValidatorError> {
        match self
            .agent
            .post(&self.url)
            .set("Content-Type", "text/plain")
            .send_string(wire)
        {
            Ok(response) => {
                let body = response
                    .into_string()
                    .map_err(|e| ValidatorError::Transport(e.to_string()))?;
                Ok(classify_body(&body))
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                if (400..500).contains(&code) {
                    Ok(Verdict::Rejected {
                        reason: extract_reason(&body),
                    })
                } else {
                    Err(ValidatorError::Unavailable(format!("HTTP {code}")))
                }
            }
            Err(ureq::Error::Transport(t)) => {
                let msg = t.to_string();
                if msg.contains("timed out") {
                    Err(ValidatorError::Unavailable(msg))
                } else {
                    Err(ValidatorError::Transport(msg))
                }
            }
        }
    }
}

/// A 2xx body can still carry a structured parse error.
fn classify_body(body: &str) -> Verdict {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "Error"] {
            if json.get(key).is_some() {
                return Verdict::Rejected {
                    reason: extract_reason(body),
                };
            }
        }
        return Verdict::Accepted;
    }
    if body.contains("Error") {
        return Verdict::Rejected {
            reason: body.trim().to_string(),
        };
    }
    Verdict::Accepted
}

/// Pull a human-readable reason out of a rejection body: a structured
/// `error`/`Error`/`message` string when present, the raw body otherwise.
fn extract_reason(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "Error", "message"] {
            if let Some(reason) = json.get(key).and_then(|v| v.as_str()) {
                return reason.to_string();
            }
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_error_body_is_a_rejection() {
        let verdict = classify_body(r#"{"error": "Field 2 failed length check"}"#);
        assert_eq!(
            verdict,
            Verdict::Rejected {
                reason: "Field 2 failed length check".to_string()
            }
        );
    }

    #[test]
    fn plain_error_text_is_a_rejection() {
        let verdict = classify_body("Error: malformed bitmap");
        assert!(!verdict.is_accepted());
    }

    #[test]
    fn clean_parse_body_is_accepted() {
        assert!(classify_body(r#"{"mti": "0100", "fields": {}}"#).is_accepted());
        assert!(classify_body("parsed 7 data elements").is_accepted());
    }

    #[test]
    fn reason_extraction_prefers_structured_fields() {
        assert_eq!(
            extract_reason(r#"{"message": "bad MTI"}"#),
            "bad MTI".to_string()
        );
        assert_eq!(extract_reason("  raw text  "), "raw text".to_string());
    }
}
