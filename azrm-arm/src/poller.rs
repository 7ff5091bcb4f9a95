//! Long-running operation polling.
//!
//! ARM reports asynchronous work in one of two ways: an `Azure-AsyncOperation`
//! header pointing at an operation-status resource, or a `Location` header that
//! answers `202 Accepted` until the work is done. Responses carrying neither
//! are already complete.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::client::{ArmClient, ArmResponse};
use crate::error::{ArmError, ErrorDetail, Result};

const ASYNC_OPERATION: &str = "azure-asyncoperation";
const LOCATION: &str = "location";
const RETRY_AFTER: &str = "retry-after";

#[derive(Debug, Clone, PartialEq, Eq)]
enum PollTarget {
    Done,
    AsyncOperation(String),
    Location(String),
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    error: Option<ErrorDetail>,
}

/// Handle on an in-flight long-running operation.
pub struct Poller {
    arm: ArmClient,
    target: PollTarget,
    delay: Duration,
}

impl Poller {
    pub(crate) fn from_response(arm: ArmClient, initial: &ArmResponse) -> Self {
        let target = if let Some(url) = initial.header(ASYNC_OPERATION) {
            PollTarget::AsyncOperation(url.to_string())
        } else if let (202, Some(url)) = (initial.status, initial.header(LOCATION)) {
            PollTarget::Location(url.to_string())
        } else {
            PollTarget::Done
        };
        let delay = retry_after(initial).unwrap_or(arm.poll_interval());
        Self { arm, target, delay }
    }

    /// Whether the initial response already completed the operation.
    pub fn is_done(&self) -> bool {
        self.target == PollTarget::Done
    }

    /// Poll until the operation reaches a terminal state.
    ///
    /// Returns an error if the operation failed or was cancelled. There is no
    /// deadline here; callers bound the wait with `tokio::time::timeout`.
    pub async fn wait(self) -> Result<()> {
        let Poller {
            arm,
            target,
            mut delay,
        } = self;

        match target {
            PollTarget::Done => Ok(()),
            PollTarget::AsyncOperation(url) => loop {
                tokio::time::sleep(delay).await;
                let response = arm.get_link(&url).await?;
                let op: OperationStatus = response.json()?;
                match op.status.to_ascii_lowercase().as_str() {
                    "succeeded" => return Ok(()),
                    "failed" | "canceled" | "cancelled" => {
                        let (code, message) = op
                            .error
                            .map(|e| (e.code, e.message.unwrap_or_default()))
                            .unwrap_or((None, String::new()));
                        return Err(ArmError::OperationFailed {
                            status: op.status,
                            code,
                            message,
                        });
                    }
                    other => debug!("Operation {} still {}", url, other),
                }
                delay = retry_after(&response).unwrap_or(arm.poll_interval());
            },
            PollTarget::Location(url) => loop {
                tokio::time::sleep(delay).await;
                let response = arm.get_link(&url).await?;
                if response.status != 202 {
                    return Ok(());
                }
                debug!("Operation {} still accepted", url);
                delay = retry_after(&response).unwrap_or(arm.poll_interval());
            },
        }
    }
}

/// `Retry-After` in delta-seconds form.
fn retry_after(response: &ArmResponse) -> Option<Duration> {
    response
        .header(RETRY_AFTER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
