//! A client for resources gated behind a payment challenge (L402/LSAT style).
//!
//! A request without a valid credential is answered with `402 Payment Required` and a
//! `WWW-Authenticate` challenge carrying a credential and a payment instruction. The client
//! stores the credential, surfaces the instruction so a human can pay it, polls the resource
//! until the payment is recognized, and finally returns the resource.
//!
//! # Getting Started
//!
//! The primary entry point is [`AuthOrchestrator`], which drives a [`ResourceClient`] (usually
//! [`DefaultResourceClient`]) and persists credentials into a [`CredentialStore`].
//!
//! ## Example: Requesting a Paid Resource
//!
//! ```no_run
//! use std::sync::Arc;
//! use l402_client::{
//!     AuthConfig, AuthEvent, AuthOrchestrator, AuthOutcome, DefaultResourceClient, MemoryCredentialStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::default();
//!     let client = DefaultResourceClient::new("http://127.0.0.1:8000/protected-resource", &config.challenge.scheme)?;
//!     let store = MemoryCredentialStore::new();
//!     let (orchestrator, mut events) = AuthOrchestrator::new(Arc::new(client), Arc::new(store), config);
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             if let AuthEvent::PaymentRequired(instruction) = event {
//!                 println!("Please pay: {instruction}");
//!             }
//!         }
//!     });
//!
//!     match orchestrator.request_access().await {
//!         AuthOutcome::Granted(payload) => println!("{}", payload.display_text()),
//!         AuthOutcome::GaveUp(e) => println!("{e}"),
//!         AuthOutcome::Cancelled => {}
//!     }
//!     Ok(())
//! }
//! ```

pub mod challenge;
pub mod client;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod poller;
pub mod store;

#[cfg(test)]
mod testing;

pub use challenge::{parse_challenge, parse_challenge_value};
pub use client::{DefaultResourceClient, ResourceClient};
pub use error::{AccessError, ChallengeError, ErrorKind, StoreError};
pub use models::{
    AccessAttempt, AccessOutcome, AuthConfig, Challenge, ChallengeFormat, ChallengeResponse, Credential, OutcomeKind,
    PaymentInstruction, PollConfig, ResourcePayload,
};
pub use orchestrator::{AuthEvent, AuthOrchestrator, AuthOutcome, AuthState};
pub use poller::{PaymentPoller, PollAbort, PollHandle, PollOutcome, PollState, PollStatus};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
