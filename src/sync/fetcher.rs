//! Background task that walks the vendor cursor and hands pages over in
//! sequence.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ExhaustionReason;
use crate::vendor::{
    AuthError, ComponentPage, Cursor, FailureType, PageFetchError, RetryDecision, RetryPolicy,
    TokenManager, VendorClient, classify_fetch_error,
};

/// Message from the fetch task to the applying side.
#[derive(Debug)]
pub(crate) enum FetchEvent {
    Page { seq: u64, page: ComponentPage },
    Exhausted { seq: u64, reason: ExhaustionReason },
    Fatal(AuthError),
}

enum FetchStop {
    Exhausted(ExhaustionReason),
    Fatal(AuthError),
}

/// Owns the client and token manager for the duration of a run.
pub(crate) struct PageFetcher {
    client: VendorClient,
    tokens: TokenManager,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub(crate) fn new(client: VendorClient, tokens: TokenManager, policy: RetryPolicy) -> Self {
        Self {
            client,
            tokens,
            policy,
        }
    }

    /// Fetches pages until the vendor runs dry or the receiver goes away.
    ///
    /// Each request needs the previous page's cursor, so requests are
    /// sequential; the channel's capacity bounds how far fetching may run
    /// ahead of application.
    pub(crate) async fn run(mut self, events: mpsc::Sender<FetchEvent>) {
        let mut cursor: Option<Cursor> = None;
        let mut seq: u64 = 0;

        let stop = loop {
            let page = match self.fetch_with_retry(cursor.as_ref()).await {
                Ok(page) => page,
                Err(stop) => break stop,
            };
            if page.records.is_empty() {
                break FetchStop::Exhausted(ExhaustionReason::EmptyPage);
            }

            let next = page.last_key.clone();
            if events.send(FetchEvent::Page { seq, page }).await.is_err() {
                debug!(seq, "sync consumer finished, fetcher stopping");
                return;
            }
            seq += 1;

            match next {
                None => break FetchStop::Exhausted(ExhaustionReason::CursorMissing),
                Some(next) if cursor.as_ref() == Some(&next) => {
                    break FetchStop::Exhausted(ExhaustionReason::CursorRepeated);
                }
                Some(next) => cursor = Some(next),
            }
        };

        let event = match stop {
            FetchStop::Exhausted(reason) => FetchEvent::Exhausted { seq, reason },
            FetchStop::Fatal(error) => FetchEvent::Fatal(error),
        };
        if events.send(event).await.is_err() {
            debug!("sync consumer finished before final fetch event");
        }
    }

    async fn fetch_with_retry(
        &mut self,
        cursor: Option<&Cursor>,
    ) -> Result<ComponentPage, FetchStop> {
        let mut attempt = 1;
        let mut reissued = false;
        loop {
            let token = self
                .tokens
                .ensure_valid_token()
                .await
                .map_err(FetchStop::Fatal)?;

            let error = match self.client.fetch_page(token.as_str(), cursor).await {
                Ok(page) => return Ok(page),
                Err(error) => error,
            };

            let failure = classify_fetch_error(&error);
            if failure == FailureType::NeedsAuth {
                self.tokens.invalidate();
                // The first refusal per page only costs a new token, not an attempt.
                if !reissued {
                    reissued = true;
                    debug!(%error, "token refused, reissuing");
                    continue;
                }
            }

            match self.policy.should_retry(failure, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    let delay = match &error {
                        PageFetchError::HttpStatus {
                            retry_after: Some(requested),
                            ..
                        } => *requested,
                        _ => delay,
                    };
                    warn!(
                        attempt,
                        next_attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "page fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    if matches!(error, PageFetchError::ApiCode { .. }) {
                        info!(%error, "vendor reported end of listing");
                    } else {
                        warn!(attempt, %error, reason, "page fetch failed, ending pagination");
                    }
                    return Err(FetchStop::Exhausted(ExhaustionReason::from_fetch_error(
                        &error,
                    )));
                }
            }
        }
    }
}
