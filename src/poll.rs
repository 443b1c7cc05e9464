use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

use crate::client::VraClient;
use crate::error::{Error, Result};
use crate::vra::BearerToken;

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` keeps polling until the platform reports a terminal state.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: POLL_INTERVAL,
            max_wait: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Successful,
    Failed,
    Pending(String),
}

impl From<String> for RequestState {
    fn from(state_name: String) -> Self {
        match state_name.as_str() {
            "Successful" => RequestState::Successful,
            "Failed" => RequestState::Failed,
            _ => RequestState::Pending(state_name),
        }
    }
}

/// Polls the request status URL until the platform reaches a terminal state.
///
/// Sleeps before every poll, the first one included. Returns the number of polls made.
#[instrument(skip(client, token))]
pub async fn wait_for_completion(
    client: &VraClient,
    token: &BearerToken,
    status_url: &str,
    policy: PollPolicy,
) -> Result<u32> {
    if policy.max_wait.is_none() {
        debug!("No maximum wait configured, polling until the request finishes");
    }

    let started = Instant::now();
    let mut attempts = 0;

    loop {
        sleep(policy.interval).await;
        attempts += 1;

        let state_name = client.request_state(token, status_url).await?;
        info!("Step 6 - Snapshot request status: {}", state_name);

        match RequestState::from(state_name) {
            RequestState::Successful => return Ok(attempts),
            RequestState::Failed => return Err(Error::RequestFailed),
            RequestState::Pending(state) => {
                let waited = started.elapsed();
                if policy.max_wait.is_some_and(|max_wait| waited >= max_wait) {
                    return Err(Error::PollTimeout { state, waited });
                }
            }
        }
    }
}
