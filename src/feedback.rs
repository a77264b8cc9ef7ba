//! Validation feedback: the one classified outcome shown after a submission
//!
//! Classification runs in two steps. [`ErrorDetail::parse`] turns the raw
//! server message into a tagged value, then [`classify`] maps error and
//! detail onto a [`ValidationFeedback`], first match wins:
//!
//! 1. missing identity or an authentication failure -> `AuthRequired`
//! 2. structured payload with `feedback` -> `ValidationFailed`, feedback verbatim
//! 3. any other message -> `ValidationFailed`, message verbatim
//! 4. no message at all -> `NetworkError` with [`FALLBACK_DETAIL`]
//!
//! A write the server accepted but answered unreadably is reported apart
//! from all of these, under [`SAVED_HEADLINE`], so it is not mistaken for a
//! rejection and resubmitted.

use crate::error::ClientError;
use serde_json::Value;
use std::fmt;

/// Shown whenever the server gave us nothing displayable
pub const FALLBACK_DETAIL: &str = "Your entry didn't pass the vibe check.";

pub const AUTH_HEADLINE: &str = "Authentication Required";
pub const VALIDATION_HEADLINE: &str = "AI Validation Failed";
pub const NETWORK_HEADLINE: &str = "Submission Failed";
pub const SAVED_HEADLINE: &str = "Entry Saved";

/// Detail when the entry was stored but the server's reply was unreadable
pub const SAVED_UNREADABLE_DETAIL: &str =
    "Your entry was saved, but the server's reply could not be read. Check your entries before submitting again.";

/// Detail when the client has no backend identity to write with
pub const SIGN_IN_AGAIN_DETAIL: &str = "Please sign in again to create entries.";
/// Detail when the server rejected the credentials
pub const REAUTHENTICATE_DETAIL: &str = "Please sign out and sign in again to continue.";

/// Substring identifying a server-side authentication failure
const AUTH_SIGNATURE: &str = "not authenticated";

/// Status the server uses for content rejections
const UNPROCESSABLE: u16 = 422;
const UNAUTHORIZED: u16 = 401;

/// Feedback category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackKind {
    AuthRequired,
    ValidationFailed,
    NetworkError,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::AuthRequired => "auth-required",
            FeedbackKind::ValidationFailed => "validation-failed",
            FeedbackKind::NetworkError => "network-error",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified outcome of one failed submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFeedback {
    pub kind: FeedbackKind,
    pub headline: String,
    pub detail: String,
}

impl ValidationFeedback {
    pub fn auth_required(detail: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::AuthRequired,
            headline: AUTH_HEADLINE.to_string(),
            detail: detail.into(),
        }
    }

    pub fn validation_failed(detail: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::ValidationFailed,
            headline: VALIDATION_HEADLINE.to_string(),
            detail: detail.into(),
        }
    }

    /// Entry persisted; only the confirmation was lost
    pub fn saved_unreadable() -> Self {
        Self {
            kind: FeedbackKind::NetworkError,
            headline: SAVED_HEADLINE.to_string(),
            detail: SAVED_UNREADABLE_DETAIL.to_string(),
        }
    }

    pub fn network_error() -> Self {
        Self {
            kind: FeedbackKind::NetworkError,
            headline: NETWORK_HEADLINE.to_string(),
            detail: FALLBACK_DETAIL.to_string(),
        }
    }
}

impl fmt::Display for ValidationFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.headline, self.detail)
    }
}

/// Tagged form of a server error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    /// JSON object carrying the validator's `feedback`
    Structured { feedback: String },
    /// Any other non-empty message, kept verbatim
    Plain(String),
    /// Nothing usable
    Unparseable,
}

impl ErrorDetail {
    pub fn parse(message: Option<&str>) -> Self {
        let Some(raw) = message.filter(|m| !m.trim().is_empty()) else {
            return ErrorDetail::Unparseable;
        };

        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
            if let Some(Value::String(feedback)) = map.get("feedback") {
                if !feedback.trim().is_empty() {
                    return ErrorDetail::Structured {
                        feedback: feedback.clone(),
                    };
                }
            }
        }

        ErrorDetail::Plain(raw.to_string())
    }
}

/// Whether `error` means the server did not accept our credentials.
///
/// 401 always counts. The text signature only counts on plain messages
/// outside the 422 validation channel, so validator feedback that happens to
/// mention authentication is still shown as feedback.
fn is_auth_failure(error: &ClientError, detail: &ErrorDetail) -> bool {
    match error.status() {
        Some(UNAUTHORIZED) => true,
        Some(UNPROCESSABLE) => false,
        _ => match detail {
            ErrorDetail::Plain(text) => text.to_lowercase().contains(AUTH_SIGNATURE),
            _ => false,
        },
    }
}

/// Map a failed submission onto user-facing feedback
pub fn classify(error: &ClientError) -> ValidationFeedback {
    match error {
        ClientError::IdentityUnavailable => {
            return ValidationFeedback::auth_required(SIGN_IN_AGAIN_DETAIL)
        }
        ClientError::SavedUnreadable(_) => return ValidationFeedback::saved_unreadable(),
        _ => {}
    }

    let detail = ErrorDetail::parse(error.detail());
    if is_auth_failure(error, &detail) {
        return ValidationFeedback::auth_required(REAUTHENTICATE_DETAIL);
    }

    match detail {
        ErrorDetail::Structured { feedback } => ValidationFeedback::validation_failed(feedback),
        ErrorDetail::Plain(text) => ValidationFeedback::validation_failed(text),
        ErrorDetail::Unparseable => ValidationFeedback::network_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn api(status: u16, detail: Option<&str>) -> ClientError {
        ClientError::Api {
            status,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_detail_variants() {
        assert_eq!(ErrorDetail::parse(None), ErrorDetail::Unparseable);
        assert_eq!(ErrorDetail::parse(Some("  ")), ErrorDetail::Unparseable);
        assert_eq!(
            ErrorDetail::parse(Some(r#"{"reason":"generic","feedback":"Add specifics."}"#)),
            ErrorDetail::Structured {
                feedback: "Add specifics.".into()
            }
        );
        assert_eq!(
            ErrorDetail::parse(Some("User not found")),
            ErrorDetail::Plain("User not found".into())
        );
        // valid JSON but no feedback field is kept verbatim
        assert_eq!(
            ErrorDetail::parse(Some(r#"{"reason":"duplicate"}"#)),
            ErrorDetail::Plain(r#"{"reason":"duplicate"}"#.into())
        );
    }

    #[test]
    fn test_structured_feedback_shown_verbatim() {
        let feedback = classify(&api(
            422,
            Some(r#"{"reason":"generic","feedback":"Too generic, add specifics."}"#),
        ));
        assert_eq!(feedback.kind, FeedbackKind::ValidationFailed);
        assert_eq!(feedback.headline, VALIDATION_HEADLINE);
        assert_eq!(feedback.detail, "Too generic, add specifics.");
    }

    #[test]
    fn test_plain_string_shown_verbatim() {
        let feedback = classify(&api(400, Some("Entry already exists for today")));
        assert_eq!(feedback.kind, FeedbackKind::ValidationFailed);
        assert_eq!(feedback.detail, "Entry already exists for today");
    }

    #[test]
    fn test_no_detail_uses_fallback() {
        for error in [
            api(500, None),
            ClientError::Network("error sending request".into()),
            ClientError::Decode("expected value at line 1".into()),
            ClientError::Timeout(Duration::from_secs(30)),
        ] {
            let feedback = classify(&error);
            assert_eq!(feedback.kind, FeedbackKind::NetworkError);
            assert_eq!(feedback.detail, FALLBACK_DETAIL);
        }
    }

    #[test]
    fn test_saved_but_unreadable_is_not_a_rejection() {
        let feedback = classify(&ClientError::SavedUnreadable("invalid timestamp".into()));
        assert_eq!(feedback.headline, SAVED_HEADLINE);
        assert_eq!(feedback.detail, SAVED_UNREADABLE_DETAIL);
        assert_ne!(feedback.kind, FeedbackKind::ValidationFailed);
        assert_ne!(feedback.detail, FALLBACK_DETAIL);
    }

    #[test]
    fn test_missing_identity_is_auth_required() {
        let feedback = classify(&ClientError::IdentityUnavailable);
        assert_eq!(feedback.kind, FeedbackKind::AuthRequired);
        assert_eq!(feedback.headline, AUTH_HEADLINE);
        assert_eq!(feedback.detail, SIGN_IN_AGAIN_DETAIL);
    }

    #[test]
    fn test_auth_signature() {
        let feedback = classify(&api(403, Some("User not authenticated")));
        assert_eq!(feedback.kind, FeedbackKind::AuthRequired);
        assert_eq!(feedback.detail, REAUTHENTICATE_DETAIL);

        let feedback = classify(&api(401, None));
        assert_eq!(feedback.kind, FeedbackKind::AuthRequired);
    }

    #[test]
    fn test_validation_text_mentioning_auth_is_not_auth_failure() {
        let structured = classify(&api(
            422,
            Some(r#"{"feedback":"Your voice here is not authenticated by detail; add specifics."}"#),
        ));
        assert_eq!(structured.kind, FeedbackKind::ValidationFailed);

        let plain = classify(&api(422, Some("Reads as not authenticated experience")));
        assert_eq!(plain.kind, FeedbackKind::ValidationFailed);
        assert_eq!(plain.detail, "Reads as not authenticated experience");
    }
}
