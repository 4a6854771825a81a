use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{AccessAttempt, AccessOutcome, ChallengeResponse, Credential, ResourcePayload};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An interface to request the protected resource.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Request the resource, presenting `credential` when one is given.
    ///
    /// This never fails: every result, including transport errors, is classified into the
    /// returned attempt's outcome.
    async fn attempt(&self, credential: Option<&Credential>) -> AccessAttempt;
}

/// The default resource client that hits the actual server.
pub struct DefaultResourceClient {
    client: reqwest::Client,
    url: String,
    scheme: String,
}

impl DefaultResourceClient {
    /// Construct a client for the resource at `url`, authorizing with `scheme`.
    pub fn new(url: impl Into<String>, scheme: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, url, scheme))
    }

    /// Construct a client that reuses an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self { client, url: url.into(), scheme: scheme.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn classify(response: Response) -> AccessOutcome {
        let status = response.status();
        if status.is_success() {
            match response.text().await {
                Ok(body) => AccessOutcome::Granted(ResourcePayload::from_body(body)),
                Err(e) => AccessOutcome::TransportError(format!("reading response body: {e}")),
            }
        } else if status == StatusCode::PAYMENT_REQUIRED {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            AccessOutcome::ChallengeIssued(ChallengeResponse { status, headers, body })
        } else {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            AccessOutcome::Failed { status: status.as_u16(), status_text }
        }
    }
}

#[async_trait]
impl ResourceClient for DefaultResourceClient {
    async fn attempt(&self, credential: Option<&Credential>) -> AccessAttempt {
        let mut request = self.client.get(&self.url);
        if let Some(credential) = credential {
            request = request.header(AUTHORIZATION, format!("{} {credential}", self.scheme));
        }

        let outcome = match request.send().await {
            Ok(response) => Self::classify(response).await,
            Err(e) => {
                warn!("Request to {} failed: {e}", self.url);
                AccessOutcome::TransportError(e.to_string())
            }
        };
        debug!(
            "Access attempt to {}: credential_attached={}, outcome={:?}",
            self.url,
            credential.is_some(),
            outcome.kind()
        );
        AccessAttempt::new(credential.is_some(), outcome)
    }
}
