//! Extraction Orchestrator.
//!
//! One entry point, [`Extractor::run`]: try the API strategy, fall back to
//! load-then-scrape on the live page, dedupe, return. At most one extraction
//! runs per page context; callers arriving while one is in flight wait for
//! it and receive the same outcome.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::dedup::dedup_posts;
use crate::error::{ExtractError, Result};
use crate::loader::LoadDriver;
use crate::models::{ExtractionMethod, ExtractionResult, SavedPost};
use crate::normalize::layout::POST_CONTAINERS;
use crate::normalize::IdMinter;
use crate::page::PageContext;
use crate::strategy::{extract_from_dom, ApiContext, ApiStrategy};

/// What every caller of one extraction run receives.
pub type Outcome = Result<ExtractionResult>;

type InFlight = Option<watch::Receiver<Option<Outcome>>>;

pub struct Extractor {
    page: Arc<dyn PageContext>,
    api: Option<ApiStrategy>,
    loader: LoadDriver,
    profile_override: Option<String>,
    cancel: CancellationToken,
    in_flight: Mutex<InFlight>,
}

impl Extractor {
    /// DOM-only extractor; add the API strategy with [`Extractor::with_api`].
    #[must_use]
    pub fn new(page: Arc<dyn PageContext>, loader: LoadDriver) -> Self {
        Self {
            page,
            api: None,
            loader,
            profile_override: None,
            cancel: CancellationToken::new(),
            in_flight: Mutex::new(None),
        }
    }

    /// Build from application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn from_config(page: Arc<dyn PageContext>, config: &Config) -> Result<Self> {
        let mut extractor = Self::new(page, LoadDriver::new(config.load.clone()));
        if config.api_enabled {
            extractor = extractor.with_api(ApiStrategy::new(config.api.clone())?);
        }
        if let Some(ref id) = config.profile_id {
            extractor = extractor.with_profile_override(id.clone());
        }
        Ok(extractor)
    }

    #[must_use]
    pub fn with_api(mut self, api: ApiStrategy) -> Self {
        self.api = Some(api);
        self
    }

    /// Profile id to use before consulting page state.
    #[must_use]
    pub fn with_profile_override(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_override = Some(profile_id.into());
        self
    }

    /// Token that, when cancelled, ends the current wait as if it had timed out.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one extraction, or join the one already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::NoContentAppeared`] when the DOM fallback finds
    /// no posts before its timeout, or `Page` when the page cannot be read.
    /// API failures never surface here; they trigger the fallback. When the
    /// API answered with no posts and the page shows none either, the result
    /// is empty rather than `NoContentAppeared`.
    pub async fn run(&self) -> Outcome {
        let sender = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(receiver) => Err(receiver.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx);
                    Ok(tx)
                }
            }
        };

        match sender {
            Ok(tx) => {
                let _clear = ClearOnDrop(&self.in_flight);
                let outcome = self.extract_once().await;
                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
            Err(mut rx) => {
                info!("Extraction already in progress, waiting for its result");
                let finished = rx.wait_for(Option::is_some).await;
                finished.map_or_else(
                    |_| {
                        Err(ExtractError::Page(
                            "in-flight extraction was abandoned".to_string(),
                        ))
                    },
                    |outcome| (*outcome).clone().unwrap_or_else(|| Ok(ExtractionResult::default())),
                )
            }
        }
    }

    async fn extract_once(&self) -> Outcome {
        let mut ids = IdMinter::new();
        let mut api_found_none = false;

        if let Some(ref api) = self.api {
            match self.extract_via_api(api, &mut ids).await {
                Ok(posts) if !posts.is_empty() => {
                    return Ok(finish(posts, ExtractionMethod::Api));
                }
                Ok(_) => {
                    info!("API returned no saved posts, checking the page");
                    api_found_none = true;
                }
                Err(e) => warn!(error = %e, "API extraction failed, falling back to DOM extraction"),
            }
        }

        let page = self.page.as_ref();
        match self
            .loader
            .wait_for_first_content(page, POST_CONTAINERS, &self.cancel)
            .await
        {
            Ok(()) => {}
            // The API answered and the page agrees: nothing is saved.
            Err(ExtractError::NoContentAppeared { .. }) if api_found_none => {
                info!("No saved posts on the page either");
                return Ok(ExtractionResult::default());
            }
            Err(e) => return Err(e),
        }
        self.loader.scroll_to_end(page, &self.cancel).await?;
        let html = page.html().await.map_err(|e| ExtractError::page(&e))?;
        let posts = extract_from_dom(&html, &mut ids);
        Ok(finish(posts, ExtractionMethod::Dom))
    }

    async fn extract_via_api(&self, api: &ApiStrategy, ids: &mut IdMinter) -> Result<Vec<SavedPost>> {
        let session = self
            .page
            .session_state()
            .await
            .map_err(|e| ExtractError::page(&e))?;
        let ctx = ApiContext::from_session(&session, self.profile_override.as_deref())?;
        api.extract(&ctx, ids, &self.cancel).await
    }
}

fn finish(posts: Vec<SavedPost>, method: ExtractionMethod) -> ExtractionResult {
    let extracted = posts.len();
    let result = ExtractionResult::new(dedup_posts(posts));
    info!(
        method = %method,
        extracted,
        duplicates = extracted - result.count,
        count = result.count,
        "Extraction finished"
    );
    result
}

/// Releases the in-flight slot however the leading run ends.
struct ClearOnDrop<'a>(&'a Mutex<InFlight>);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
