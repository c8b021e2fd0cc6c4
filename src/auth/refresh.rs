use std::sync::{Mutex, MutexGuard};

use reqwest::Url;
use tokio::sync::oneshot;

use super::error::AuthError;
use super::token::{AccessToken, TokenResponse, TokenStore};

/// Outcome of one refresh attempt, shared with every queued caller.
pub type Settlement = Result<AccessToken, AuthError>;

/// Single-flight coordinator for `POST /auth/refresh`.
///
/// At most one refresh call is in flight at any time. The first caller to
/// observe an expired session becomes the leader and performs the network
/// call; callers arriving while it runs suspend on a oneshot channel and are
/// settled, in arrival order, when the leader finishes. The refresh request
/// carries no bearer header — the browser-style cookie jar supplies the
/// refresh cookie.
pub struct RefreshCoordinator {
    http: reqwest::Client,
    refresh_url: Url,
    tokens: TokenStore,
    state: Mutex<RefreshState>,
}

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<Settlement>>,
    },
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<Settlement>),
}

impl RefreshCoordinator {
    pub(crate) fn new(http: reqwest::Client, refresh_url: Url, tokens: TokenStore) -> Self {
        Self {
            http,
            refresh_url,
            tokens,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Obtain a fresh access token, joining an in-flight refresh if one
    /// exists.
    ///
    /// On success the store already holds the returned token. On failure the
    /// store is cleared and every concurrent caller receives the same error;
    /// redirecting to a login surface is left to the caller.
    pub async fn refresh(&self) -> Settlement {
        match self.enroll() {
            Role::Leader => self.lead().await,
            Role::Waiter(rx) => rx.await.unwrap_or(Err(AuthError::Interrupted)),
        }
    }

    /// Atomically claim leadership or join the waiter queue.
    ///
    /// Runs entirely inside one critical section with no await, so two
    /// callers can never both observe `Idle` and both start a refresh.
    fn enroll(&self) -> Role {
        let mut state = lock(&self.state);
        match &mut *state {
            RefreshState::Idle => {
                *state = RefreshState::Refreshing {
                    waiters: Vec::new(),
                };
                Role::Leader
            }
            RefreshState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Role::Waiter(rx)
            }
        }
    }

    async fn lead(&self) -> Settlement {
        // If this future is dropped mid-call, the guard settles the queue
        // with `Interrupted` instead of leaving waiters suspended forever.
        let guard = SettleGuard {
            coordinator: self,
            armed: true,
        };
        let outcome = self.call_refresh().await;
        match &outcome {
            Ok(token) => self.tokens.set(Some(token.clone())),
            Err(error) => {
                tracing::warn!(%error, "token refresh failed; clearing session");
                self.tokens.clear();
            }
        }
        guard.settle(outcome)
    }

    async fn call_refresh(&self) -> Settlement {
        tracing::debug!(url = %self.refresh_url, "refreshing access token");
        let response = self.http.post(self.refresh_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Refresh {
                status: status.as_u16(),
                message,
            });
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(err.to_string()))?;
        Ok(AccessToken::new(body.access_token))
    }

    /// Return to `Idle` and hand `outcome` to every queued waiter, oldest
    /// first. Each queue is drained exactly once per refresh attempt.
    fn settle_queue(&self, outcome: Settlement) -> Settlement {
        let waiters = {
            let mut state = lock(&self.state);
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };
        if !waiters.is_empty() {
            tracing::debug!(
                waiters = waiters.len(),
                ok = outcome.is_ok(),
                "settling requests queued behind refresh"
            );
        }
        for waiter in waiters {
            // A waiter that gave up (dropped its receiver) is skipped.
            let _ = waiter.send(outcome.clone());
        }
        outcome
    }
}

struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl SettleGuard<'_> {
    fn settle(mut self, outcome: Settlement) -> Settlement {
        self.armed = false;
        self.coordinator.settle_queue(outcome)
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.coordinator.settle_queue(Err(AuthError::Interrupted));
        }
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
