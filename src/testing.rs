//! A scripted [`ResourceClient`] for unit tests.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, WWW_AUTHENTICATE},
    StatusCode,
};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::{
    client::ResourceClient,
    models::{AccessAttempt, AccessOutcome, ChallengeResponse, Credential, ResourcePayload},
};

type Script = dyn Fn(usize, Option<&Credential>) -> AccessOutcome + Send + Sync;

/// A recorded call.
#[derive(Clone, Debug)]
pub(crate) struct Call {
    pub credential: Option<Credential>,
    pub at: Instant,
}

/// Answers each call with the outcome the script produces for `(call index, credential)`.
pub(crate) struct ScriptedClient {
    script: Box<Script>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub(crate) fn new(script: impl Fn(usize, Option<&Credential>) -> AccessOutcome + Send + Sync + 'static) -> Self {
        Self { script: Box::new(script), calls: Mutex::new(Vec::new()) }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait]
impl ResourceClient for ScriptedClient {
    async fn attempt(&self, credential: Option<&Credential>) -> AccessAttempt {
        let index = {
            let mut calls = self.calls.lock().expect("lock");
            calls.push(Call { credential: credential.cloned(), at: Instant::now() });
            calls.len() - 1
        };
        AccessAttempt::new(credential.is_some(), (self.script)(index, credential))
    }
}

pub(crate) fn granted(body: &str) -> AccessOutcome {
    AccessOutcome::Granted(ResourcePayload::from_body(body))
}

pub(crate) fn challenge(header: &str) -> AccessOutcome {
    let mut headers = HeaderMap::new();
    headers.insert(WWW_AUTHENTICATE, HeaderValue::from_str(header).expect("header value"));
    AccessOutcome::ChallengeIssued(ChallengeResponse {
        status: StatusCode::PAYMENT_REQUIRED,
        headers,
        body: String::new(),
    })
}

pub(crate) fn l402_challenge(credential: &str, payment: &str) -> AccessOutcome {
    challenge(&format!(r#"L402 credential="{credential}", payment="{payment}""#))
}

pub(crate) fn failed(status: u16, status_text: &str) -> AccessOutcome {
    AccessOutcome::Failed { status, status_text: status_text.to_string() }
}
