//! Mapping dispatch results to HTTP status codes.
//!
//! Webhook providers resubmit on non-2xx responses and may disable a
//! subscription after repeated hard failures, so the default mapping is
//! deliberately forgiving: recoverable handler failures still answer 200
//! (they are logged, not surfaced to the wire), and only a fatal abort
//! answers 500. Deployments that prefer redelivery on partial failure flip
//! [`ResponsePolicy::treat_partial_as_500`].

use http::StatusCode;

use crate::dispatch::Outcome;
use crate::error::DecodeError;

/// The configurable [`Outcome`] → status-code mapping used by the HTTP
/// layer (and available to bring-your-own-server integrations).
#[derive(Clone, Copy, Debug, Default)]
#[must_use]
pub struct ResponsePolicy {
    treat_partial_as_500: bool,
}

impl ResponsePolicy {
    /// The default policy: 200 unless dispatch aborted fatally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer 500 for [`Outcome::PartialFailure`] as well, prompting the
    /// provider to redeliver the notification.
    ///
    /// Redelivery replays the *whole* notification, so handlers should be
    /// idempotent before enabling this.
    pub fn treat_partial_as_500(mut self, enabled: bool) -> Self {
        self.treat_partial_as_500 = enabled;
        self
    }

    /// The status code to answer a dispatched notification with.
    pub fn status(&self, outcome: &Outcome) -> StatusCode {
        match outcome {
            Outcome::Success => StatusCode::OK,
            Outcome::PartialFailure(_) if self.treat_partial_as_500 => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Outcome::PartialFailure(_) => StatusCode::OK,
            Outcome::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The status code for a body that never reached dispatch.
    pub fn decode_status(&self, err: &DecodeError) -> StatusCode {
        match err {
            DecodeError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DecodeError::Json(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecoveredErrors;

    #[test]
    fn default_policy_answers_200_for_partial_failure() {
        let policy = ResponsePolicy::new();
        let partial = Outcome::PartialFailure(RecoveredErrors { errors: Vec::new() });

        assert_eq!(policy.status(&Outcome::Success), StatusCode::OK);
        assert_eq!(policy.status(&partial), StatusCode::OK);
    }

    #[test]
    fn strict_policy_answers_500_for_partial_failure() {
        let policy = ResponsePolicy::new().treat_partial_as_500(true);
        let partial = Outcome::PartialFailure(RecoveredErrors { errors: Vec::new() });

        assert_eq!(policy.status(&partial), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(policy.status(&Outcome::Success), StatusCode::OK);
    }

    #[test]
    fn decode_errors_map_to_4xx() {
        let policy = ResponsePolicy::new();

        let oversized = DecodeError::PayloadTooLarge { size: 1, limit: 0 };
        assert_eq!(policy.decode_status(&oversized), StatusCode::PAYLOAD_TOO_LARGE);

        let bad_json = crate::notification::decode(b"nope").unwrap_err();
        assert_eq!(policy.decode_status(&bad_json), StatusCode::BAD_REQUEST);
    }
}
