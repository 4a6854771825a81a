use l402_client::{
    AuthConfig, AuthEvent, AuthOrchestrator, AuthOutcome, ChallengeFormat, DefaultResourceClient, FileCredentialStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // The resource server must be started separately; it speaks the LSAT challenge format.
    let url = std::env::args().nth(1).unwrap_or_else(|| "http://127.0.0.1:8000/protected-resource".to_string());
    let config = AuthConfig { challenge: ChallengeFormat::lsat(), ..Default::default() };
    let client = DefaultResourceClient::new(url, &config.challenge.scheme)?;
    let store = FileCredentialStore::new(std::env::temp_dir().join("l402-credentials.json"));
    let (orchestrator, mut events) = AuthOrchestrator::new(Arc::new(client), Arc::new(store), config);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                AuthEvent::PaymentRequired(instruction) => println!("Pay this invoice to continue:\n{instruction}"),
                AuthEvent::PollProgress { attempt, max_attempts } => {
                    println!("Waiting for payment: attempt={attempt}/{max_attempts}")
                }
                _ => {}
            }
        }
    });

    let outcome = match orchestrator.start().await {
        Some(outcome) => outcome,
        None => orchestrator.request_access().await,
    };
    match outcome {
        AuthOutcome::Granted(payload) => println!("Access granted: {}", payload.display_text()),
        AuthOutcome::GaveUp(e) => println!("Access failed: {e}"),
        AuthOutcome::Cancelled => {}
    }
    Ok(())
}
