//! Incremental Load Driver.
//!
//! Two independent behaviors over a live [`PageContext`]:
//!
//! - [`LoadDriver::wait_for_first_content`] resolves as soon as any post
//!   container is present, woken by DOM mutations rather than a fixed poll.
//! - [`LoadDriver::scroll_to_end`] scrolls to the bottom, waits a settle
//!   delay and re-measures until the page stops growing or the step cap is hit.
//!
//! Every suspension point is bounded by a timeout or step ceiling and observes
//! the caller's cancellation token.

use std::time::Duration;

use futures_util::{stream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::normalize::layout::{POST_CONTAINERS, SCROLL_CONTAINER};
use crate::page::{MutationStream, PageContext};

/// Poll interval used only when the page cannot report mutations.
const FALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// What the scroll loop measures to decide whether more content arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthSignal {
    /// Scrollable height of the results container.
    #[default]
    ScrollHeight,
    /// Number of matched post containers.
    PostCount,
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub first_content_timeout: Duration,
    /// Must cover one network round trip plus render.
    pub settle_delay: Duration,
    pub max_steps: usize,
    pub growth_signal: GrowthSignal,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            first_content_timeout: Duration::from_secs(20),
            settle_delay: Duration::from_millis(2500),
            max_steps: 50,
            growth_signal: GrowthSignal::ScrollHeight,
        }
    }
}

/// Scroll loop states. `Idle` is initial, `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    Scrolling,
    Measuring,
    Done(ScrollStop),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStop {
    /// A step produced no growth.
    NoGrowth,
    /// The step ceiling was reached while the page was still growing.
    StepCap,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    pub steps: usize,
    pub stop: ScrollStop,
    /// Last value of the growth signal.
    pub measure: u64,
}

#[derive(Debug, Clone, Default)]
pub struct LoadDriver {
    config: LoadConfig,
}

impl LoadDriver {
    #[must_use]
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Wait until any of `selectors` matches.
    ///
    /// Resolves immediately when content is already present. Otherwise it
    /// re-checks after each mutation batch until the timeout elapses or
    /// `cancel` fires; either way the result is
    /// [`ExtractError::NoContentAppeared`]. The observer is disconnected on
    /// every exit once installed.
    ///
    /// # Errors
    ///
    /// Returns `NoContentAppeared` on timeout or cancellation, or `Page` if the
    /// initial presence check fails.
    pub async fn wait_for_first_content(
        &self,
        page: &dyn PageContext,
        selectors: &[&str],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let started = Instant::now();
        if content_present(page, selectors).await? {
            debug!("Content already present");
            return Ok(());
        }

        let (wakeups, observing) = match page.mutations().await {
            Ok(mutations) => (mutations, true),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Mutation observer unavailable, polling instead");
                (polling_stream(), false)
            }
        };

        let outcome = self
            .await_content(page, selectors, cancel, wakeups, started)
            .await;

        if observing {
            if let Err(e) = page.stop_mutations().await {
                debug!(error = %format!("{e:#}"), "Failed to disconnect mutation observer");
            }
        }
        outcome
    }

    async fn await_content(
        &self,
        page: &dyn PageContext,
        selectors: &[&str],
        cancel: &CancellationToken,
        mut wakeups: MutationStream,
        started: Instant,
    ) -> Result<()> {
        // Content may have landed between the first check and the observer install.
        if content_present(page, selectors).await? {
            return Ok(());
        }

        let deadline = started + self.config.first_content_timeout;
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("First-content wait cancelled");
                    return Err(ExtractError::NoContentAppeared { waited: started.elapsed() });
                }
                () = tokio::time::sleep_until(deadline) => {
                    warn!(
                        timeout_secs = self.config.first_content_timeout.as_secs(),
                        "No saved posts appeared before timeout"
                    );
                    return Err(ExtractError::NoContentAppeared {
                        waited: self.config.first_content_timeout,
                    });
                }
                next = wakeups.next() => {
                    if next.is_none() {
                        debug!("Mutation stream ended, polling instead");
                        wakeups = polling_stream();
                        continue;
                    }
                    match content_present(page, selectors).await {
                        Ok(true) => {
                            info!(waited_ms = started.elapsed().as_millis(), "First content appeared");
                            return Ok(());
                        }
                        Ok(false) => {}
                        Err(e) => debug!(error = %e, "Presence check failed, waiting for next mutation"),
                    }
                }
            }
        }
    }

    /// Scroll until the growth signal stops increasing or the step cap is hit.
    ///
    /// # Errors
    ///
    /// Returns `Page` if measuring or scrolling fails.
    pub async fn scroll_to_end(
        &self,
        page: &dyn PageContext,
        cancel: &CancellationToken,
    ) -> Result<ScrollReport> {
        let mut state = ScrollState::Idle;
        let mut steps = 0;
        let mut last = 0;

        loop {
            state = match state {
                ScrollState::Idle => {
                    last = self.measure(page).await?;
                    ScrollState::Scrolling
                }
                ScrollState::Scrolling => {
                    if steps >= self.config.max_steps {
                        ScrollState::Done(ScrollStop::StepCap)
                    } else {
                        page.scroll_to_bottom()
                            .await
                            .map_err(|e| ExtractError::page(&e))?;
                        steps += 1;
                        tokio::select! {
                            () = cancel.cancelled() => ScrollState::Done(ScrollStop::Cancelled),
                            () = tokio::time::sleep(self.config.settle_delay) => ScrollState::Measuring,
                        }
                    }
                }
                ScrollState::Measuring => {
                    let now = self.measure(page).await?;
                    debug!(step = steps, before = last, after = now, "Scroll step measured");
                    if now > last {
                        last = now;
                        ScrollState::Scrolling
                    } else {
                        ScrollState::Done(ScrollStop::NoGrowth)
                    }
                }
                ScrollState::Done(stop) => {
                    info!(steps, ?stop, measure = last, "Scroll loading finished");
                    return Ok(ScrollReport {
                        steps,
                        stop,
                        measure: last,
                    });
                }
            };
        }
    }

    async fn measure(&self, page: &dyn PageContext) -> Result<u64> {
        let value = match self.config.growth_signal {
            GrowthSignal::ScrollHeight => page.scroll_height(SCROLL_CONTAINER).await,
            GrowthSignal::PostCount => post_count(page).await.map(|n| n as u64),
        };
        value.map_err(|e| ExtractError::page(&e))
    }
}

/// Count of the first container selector that matches anything.
async fn post_count(page: &dyn PageContext) -> anyhow::Result<usize> {
    for selector in POST_CONTAINERS {
        let n = page.count(selector).await?;
        if n > 0 {
            return Ok(n);
        }
    }
    Ok(0)
}

async fn content_present(page: &dyn PageContext, selectors: &[&str]) -> Result<bool> {
    for selector in selectors {
        if page
            .count(selector)
            .await
            .map_err(|e| ExtractError::page(&e))?
            > 0
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn polling_stream() -> MutationStream {
    stream::repeat(())
        .then(|()| tokio::time::sleep(FALLBACK_POLL_INTERVAL))
        .boxed()
}
