//! Etherscan-compatible verification client.

use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use url::Url;

use super::{VerificationAttempt, VerificationClient, VerificationFailure, VerificationOutcome};
use crate::rpc;

/// Messages explorers use when they simply need more time or fewer requests.
const TRANSIENT_MARKERS: [&str; 7] = [
    "rate limit",
    "max rate",
    "too many requests",
    "try again",
    "timeout",
    "unable to locate contractcode",
    "pending in queue",
];

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: String,
}

/// How long to wait for a submitted verification to be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolling {
    pub interval: Duration,
    pub max_attempts: usize,
}

impl Default for StatusPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 12,
        }
    }
}

/// Outcome of one `checkverifystatus` request.
#[derive(Debug)]
enum StatusCheck {
    Pending,
    Done(VerificationOutcome),
}

/// Verifies sources through the Etherscan `contract` API module.
///
/// The standard JSON compiler input is taken from the artifact's build-info.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
    polling: StatusPolling,
}

impl EtherscanVerifier {
    pub fn new(api_url: Url, api_key: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: rpc::create_client(rpc::DEFAULT_TIMEOUT)?,
            api_url,
            api_key: api_key.into(),
            polling: StatusPolling::default(),
        })
    }

    pub fn with_status_polling(mut self, polling: StatusPolling) -> Self {
        self.polling = polling;
        self
    }

    async fn request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<EtherscanResponse, VerificationFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| VerificationFailure::transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(VerificationFailure::transient(format!(
                "explorer returned HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(VerificationFailure::permanent(format!(
                "explorer returned HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| VerificationFailure::transient(format!("unreadable explorer response: {e}")))
    }

    /// Submit the source and return the GUID of the queued verification.
    async fn submit_source(
        &self,
        attempt: &VerificationAttempt<'_>,
    ) -> Result<String, VerificationOutcome> {
        let build_info = attempt.artifact.build_info().map_err(|e| {
            VerificationOutcome::Failed(VerificationFailure::permanent(format!(
                "missing compiler input: {e:#}"
            )))
        })?;

        let source = serde_json::to_string(&build_info.input).map_err(|e| {
            VerificationOutcome::Failed(VerificationFailure::permanent(e.to_string()))
        })?;

        let form = [
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", attempt.address.to_checksum(None)),
            ("sourceCode", source),
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("contractname", attempt.artifact.fully_qualified_name()),
            (
                "compilerversion",
                format!("v{}", build_info.solc_long_version),
            ),
            // The misspelling is part of the Etherscan API.
            (
                "constructorArguements",
                hex::encode(&attempt.constructor_args),
            ),
        ];

        let request = self
            .client
            .post(self.api_url.clone())
            .query(&[("chainid", attempt.network_id.to_string())])
            .form(&form);

        let response = self.request(request).await.map_err(VerificationOutcome::Failed)?;

        if response.status == "1" {
            Ok(response.result)
        } else {
            tracing::debug!(message = %response.message, result = %response.result, "Submission rejected");
            Err(classify_message(&response.result))
        }
    }

    async fn check_status(&self, guid: &str, network_id: u64) -> StatusCheck {
        let request = self.client.get(self.api_url.clone()).query(&[
            ("chainid", network_id.to_string()),
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "checkverifystatus".to_string()),
            ("guid", guid.to_string()),
        ]);

        let response = match self.request(request).await {
            Ok(response) => response,
            Err(failure) => return StatusCheck::Done(VerificationOutcome::Failed(failure)),
        };

        let result = response.result.to_lowercase();
        if result.contains("pending") {
            StatusCheck::Pending
        } else if response.status == "1" || result.starts_with("pass") {
            StatusCheck::Done(VerificationOutcome::Verified)
        } else {
            StatusCheck::Done(classify_message(&response.result))
        }
    }
}

impl VerificationClient for EtherscanVerifier {
    async fn submit(&self, attempt: &VerificationAttempt<'_>) -> VerificationOutcome {
        tracing::info!(
            address = %attempt.address,
            contract = %attempt.artifact.fully_qualified_name(),
            network_id = attempt.network_id,
            "Submitting source for verification..."
        );

        let guid = match self.submit_source(attempt).await {
            Ok(guid) => guid,
            Err(outcome) => return outcome,
        };

        tracing::debug!(guid = %guid, "Verification queued");

        let poll = || async {
            match self.check_status(&guid, attempt.network_id).await {
                StatusCheck::Pending => Err(StatusCheck::Pending),
                StatusCheck::Done(outcome) => Ok(outcome),
            }
        };

        poll.retry(
            ConstantBuilder::default()
                .with_delay(self.polling.interval)
                .with_max_times(self.polling.max_attempts),
        )
        .notify(|_, _| tracing::trace!(guid = %guid, "Verification pending, checking again..."))
        .await
        .unwrap_or_else(|_| {
            VerificationOutcome::Failed(VerificationFailure::transient(format!(
                "verification {guid} still pending after {} checks",
                self.polling.max_attempts
            )))
        })
    }
}

/// Classify an explorer message into an outcome.
pub fn classify_message(message: &str) -> VerificationOutcome {
    let lower = message.to_lowercase();

    if lower.contains("already verified") {
        VerificationOutcome::AlreadyVerified
    } else if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        VerificationOutcome::Failed(VerificationFailure::transient(message))
    } else {
        VerificationOutcome::Failed(VerificationFailure::permanent(message))
    }
}
