use std::convert::Infallible;
use std::time::Duration;

use feed_api::{CredentialSource, FeedError, FeedTransport, StreamFilter};

use crate::config::RunnerConfig;
use crate::error::{FailureCause, IngestError, ListenError};
use crate::listener::StreamListener;

// ═══════════════════════════════════════════════════════════════
//  RetryState
// ═══════════════════════════════════════════════════════════════

/// Счётчик подряд идущих сбоев фида.
///
/// Сбрасывается только полностью обработанным событием, не успешным
/// переподключением.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetryState {
    consecutive_failures: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Count one failure and return the new total.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }
}

// ═══════════════════════════════════════════════════════════════
//  ResilientFeedRunner
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Authenticating,
    Listening,
    Failed,
    Retrying,
    Terminated,
}

impl std::fmt::Display for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerState::Authenticating => f.write_str("authenticating"),
            RunnerState::Listening => f.write_str("listening"),
            RunnerState::Failed => f.write_str("failed"),
            RunnerState::Retrying => f.write_str("retrying"),
            RunnerState::Terminated => f.write_str("terminated"),
        }
    }
}

/// Владеет жизненным циклом подключения к фиду:
/// authenticate → subscribe → dispatch, с ограниченным числом повторов.
pub struct ResilientFeedRunner {
    transport: Box<dyn FeedTransport>,
    credentials: Box<dyn CredentialSource>,
    filter: StreamFilter,
    listener: StreamListener,
    retry: RetryState,
    max_failures: u32,
    retry_delay: Duration,
    state: RunnerState,
}

impl ResilientFeedRunner {
    pub fn new(
        transport: Box<dyn FeedTransport>,
        credentials: Box<dyn CredentialSource>,
        filter: StreamFilter,
        listener: StreamListener,
        config: &RunnerConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            filter,
            listener,
            retry: RetryState::new(),
            max_failures: config.max_failures,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            state: RunnerState::Authenticating,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub fn listener(&self) -> &StreamListener {
        &self.listener
    }

    /// Run until the retry budget is exhausted.
    ///
    /// Never returns `Ok`: the feed is expected to run until the process is
    /// killed or failures exceed `max_failures` in a row.
    pub fn run(&mut self) -> Result<Infallible, IngestError> {
        loop {
            self.transition(RunnerState::Authenticating);
            let cause = match self.session() {
                Ok(()) => FailureCause::Feed(FeedError::closed("feed stream ended")),
                Err(cause) => cause,
            };

            self.transition(RunnerState::Failed);
            let failures = self.retry.record_failure();
            let stats = self.listener.stats();

            if failures > self.max_failures {
                tracing::error!(
                    failures,
                    max = self.max_failures,
                    error = %cause,
                    persisted_even = stats.persisted_even,
                    persisted_odd = stats.persisted_odd,
                    rejected = stats.rejected,
                    "retry budget exhausted, terminating"
                );
                self.transition(RunnerState::Terminated);
                return Err(IngestError::RetriesExhausted { failures, source: cause });
            }

            tracing::warn!(
                failures,
                max = self.max_failures,
                error = %cause,
                persisted_even = stats.persisted_even,
                persisted_odd = stats.persisted_odd,
                rejected = stats.rejected,
                "feed failure, reconnecting"
            );
            self.transition(RunnerState::Retrying);
            if !self.retry_delay.is_zero() {
                std::thread::sleep(self.retry_delay);
            }
        }
    }

    /// One AUTHENTICATING → LISTENING pass. `Ok(())` means the provider
    /// closed the stream cleanly.
    fn session(&mut self) -> Result<(), FailureCause> {
        let credentials = self.credentials.load().map_err(FailureCause::Credentials)?;
        self.transport
            .authenticate(&credentials)
            .map_err(|e| FailureCause::Feed(e.with_context("authenticate")))?;
        tracing::info!("feed authenticated");

        let mut connection = self
            .transport
            .subscribe(&self.filter)
            .map_err(|e| FailureCause::Feed(e.with_context("subscribe")))?;
        self.transition(RunnerState::Listening);
        tracing::info!(
            project = %self.listener.project(),
            track = ?self.filter.track,
            languages = ?self.filter.languages,
            "listening"
        );

        while let Some(event) = connection.next_event().map_err(FailureCause::Feed)? {
            match self.listener.on_event(&event, &mut self.retry) {
                Ok(_) => {}
                Err(ListenError::Malformed(e)) => {
                    tracing::warn!(error = %e, "malformed event, skipping");
                }
                Err(ListenError::Serialize(e)) => return Err(FailureCause::Serialize(e)),
                Err(ListenError::Store(e)) => return Err(FailureCause::Store(e)),
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: RunnerState) {
        tracing::debug!(from = %self.state, to = %next, "runner state");
        self.state = next;
    }
}
