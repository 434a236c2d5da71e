//! Scripted page context shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;

use saved_post_extractor::page::{MutationStream, PageContext, SessionState};

pub const RESULT_CONTAINER: &str = "li.reusable-search__result-container";

/// A page whose answers are set up front by the test.
pub struct FakePage {
    html: Mutex<String>,
    counts: Mutex<HashMap<String, usize>>,
    /// Heights returned by successive measurements; the last one repeats.
    heights: Mutex<VecDeque<u64>>,
    session: Mutex<SessionState>,
    mutation_tx: mpsc::UnboundedSender<()>,
    mutation_rx: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    observer_supported: bool,
    pub html_calls: AtomicUsize,
    pub scroll_calls: AtomicUsize,
    pub session_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
}

impl FakePage {
    pub fn new() -> Self {
        let (mutation_tx, mutation_rx) = mpsc::unbounded_channel();
        Self {
            html: Mutex::new(String::new()),
            counts: Mutex::new(HashMap::new()),
            heights: Mutex::new(VecDeque::from([0])),
            session: Mutex::new(SessionState::default()),
            mutation_tx,
            mutation_rx: Mutex::new(Some(mutation_rx)),
            observer_supported: true,
            html_calls: AtomicUsize::new(0),
            scroll_calls: AtomicUsize::new(0),
            session_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// A page already showing `posts` result containers.
    pub fn with_posts(posts: &[String]) -> Self {
        let page = Self::new();
        page.show_posts(posts);
        page
    }

    /// A page that cannot report mutations.
    pub fn without_observer() -> Self {
        Self {
            observer_supported: false,
            ..Self::new()
        }
    }

    pub fn show_posts(&self, posts: &[String]) {
        *self.html.lock().unwrap() = format!("<html><body><ul>{}</ul></body></html>", posts.concat());
        self.set_count(RESULT_CONTAINER, posts.len());
    }

    pub fn set_count(&self, selector: &str, n: usize) {
        self.counts.lock().unwrap().insert(selector.to_string(), n);
    }

    pub fn set_heights(&self, heights: &[u64]) {
        *self.heights.lock().unwrap() = heights.iter().copied().collect();
    }

    pub fn set_session(&self, session: SessionState) {
        *self.session.lock().unwrap() = session;
    }

    /// Report one mutation batch to whoever is observing.
    pub fn mutate(&self) {
        let _ = self.mutation_tx.send(());
    }
}

#[async_trait]
impl PageContext for FakePage {
    async fn html(&self) -> Result<String> {
        self.html_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.lock().unwrap().clone())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.counts.lock().unwrap().get(selector).copied().unwrap_or(0))
    }

    async fn scroll_height(&self, _container: &str) -> Result<u64> {
        let mut heights = self.heights.lock().unwrap();
        if heights.len() > 1 {
            Ok(heights.pop_front().unwrap_or_default())
        } else {
            Ok(heights.front().copied().unwrap_or_default())
        }
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.scroll_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mutations(&self) -> Result<MutationStream> {
        if !self.observer_supported {
            anyhow::bail!("mutation observer unavailable");
        }
        let rx = self
            .mutation_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("already observing"))?;
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|()| ((), rx)) }).boxed())
    }

    async fn stop_mutations(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn session_state(&self) -> Result<SessionState> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.lock().unwrap().clone())
    }
}

/// One search-layout result container.
pub fn search_result(activity: u64, author: &str, content: &str) -> String {
    format!(
        r#"<li class="reusable-search__result-container">
             <div data-chameleon-result-urn="urn:li:activity:{activity}">
               <div class="entity-result__content-actor"><a href="/in/someone">{author}</a></div>
               <p class="t-12 t-black--light">2w • Edited</p>
               <p class="entity-result__content-summary">{content}</p>
             </div>
           </li>"#
    )
}

/// A result container with nothing a post would carry.
pub fn empty_result() -> String {
    r#"<li class="reusable-search__result-container"><span class="ad-slot"></span></li>"#.to_string()
}
