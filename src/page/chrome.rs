//! [`PageContext`] backed by a headless Chrome/Chromium page.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::{AddBindingParams, EventBindingCalled};
use chromiumoxide::Page;
use futures_util::{future, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{MutationStream, PageContext, SessionState};
use crate::constants::BROWSER_USER_AGENT;

/// Name of the runtime binding the in-page observer reports through.
const MUTATION_BINDING: &str = "__savedPostsMutation";

const INSTALL_OBSERVER_JS: &str = r"
(() => {
  if (window.__savedPostsObserver) return true;
  window.__savedPostsObserver = new MutationObserver(() => {
    try { window.__savedPostsMutation('m'); } catch (e) {}
  });
  window.__savedPostsObserver.observe(document.body, { childList: true, subtree: true });
  return true;
})()
";

const DISCONNECT_OBSERVER_JS: &str = r"
(() => {
  if (window.__savedPostsObserver) {
    window.__savedPostsObserver.disconnect();
    window.__savedPostsObserver = null;
  }
  return true;
})()
";

const SESSION_STATE_JS: &str = r#"
(() => {
  const read = (f) => { try { const v = f(); return v === undefined ? null : v; } catch (e) { return null; } };
  return {
    miniProfileUrn: read(() => window.lio.me.miniProfile.entityUrn),
    storedProfile: read(() => localStorage.getItem('voyager:current-profile')),
    profileLinks: read(() => Array.from(document.querySelectorAll('a[href*="/in/"]'), (a) => a.href)) || [],
    csrfMeta: read(() => document.querySelector('meta[name="csrf-token"]').getAttribute('content')),
    csrfGlobal: read(() => window.lio.csrfToken),
    csrfStorage: read(() => localStorage.getItem('csrf-token')),
  };
})()
"#;

/// Browser launch settings.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub chrome_path: Option<String>,
    /// Logged-in user-data-dir (already cloned, see `chromium_profile`).
    pub user_data_dir: Option<PathBuf>,
    pub profile_directory: Option<String>,
    pub headless: bool,
    pub request_timeout: Duration,
}

/// A launched browser plus the task pumping its CDP handler.
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeBrowser {
    /// Launch the browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser config is invalid or the process fails to start.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        info!(headless = settings.headless, "Launching browser");

        let mut builder = BrowserConfig::builder()
            .window_size(1280, 1600)
            .request_timeout(settings.request_timeout)
            .no_sandbox()
            .disable_default_args()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--lang=en-US,en")
            .arg(format!("--user-agent={BROWSER_USER_AGENT}"));

        if settings.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        if let Some(ref chrome_path) = settings.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }
        if let Some(ref dir) = settings.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(ref profile) = settings.profile_directory {
            builder = builder.arg(format!("--profile-directory={profile}"));
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Open `url` in a new tab and wait for the initial navigation plus `settle`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tab cannot be created or navigation fails.
    pub async fn open(&self, url: &str, settle: Duration) -> Result<ChromePage> {
        let page = self
            .browser
            .new_page(url)
            .await
            .context("Failed to create new page")?;
        page.wait_for_navigation()
            .await
            .context("Navigation timeout")?;
        tokio::time::sleep(settle).await;
        ChromePage::attach(page).await
    }

    /// Close the browser gracefully.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {e}");
        }
        self.handler.abort();
    }
}

/// One browser tab.
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    /// Wrap a page and register the mutation binding on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the binding cannot be registered.
    pub async fn attach(page: Page) -> Result<Self> {
        page.execute(AddBindingParams::new(MUTATION_BINDING))
            .await
            .context("Failed to register mutation binding")?;
        Ok(Self { page })
    }

    /// Navigate to `url` unless the tab is already on it, then wait `settle`.
    ///
    /// # Errors
    ///
    /// Returns an error if navigation fails.
    pub async fn navigate_if_needed(&self, url: &str, settle: Duration) -> Result<()> {
        let current = self.page.url().await.context("Failed to read page URL")?;
        if current.as_deref().is_some_and(|u| u.starts_with(url)) {
            return Ok(());
        }
        info!(url = %url, "Navigating to saved posts");
        self.page.goto(url).await.context("Navigation failed")?;
        self.page
            .wait_for_navigation()
            .await
            .context("Navigation timeout")?;
        tokio::time::sleep(settle).await;
        Ok(())
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, js: String) -> Result<T> {
        self.page
            .evaluate(js)
            .await
            .context("Script evaluation failed")?
            .into_value()
            .context("Unexpected script result")
    }
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[async_trait]
impl PageContext for ChromePage {
    async fn html(&self) -> Result<String> {
        self.page.content().await.context("Failed to read page HTML")
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.eval(format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        ))
        .await
    }

    async fn scroll_height(&self, container: &str) -> Result<u64> {
        self.eval(format!(
            "(document.querySelector({}) || document.documentElement).scrollHeight",
            js_string(container)
        ))
        .await
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.eval::<serde_json::Value>(
            "window.scrollTo(0, document.body.scrollHeight); true".to_string(),
        )
        .await
        .map(|_| ())
    }

    async fn mutations(&self) -> Result<MutationStream> {
        let events = self
            .page
            .event_listener::<EventBindingCalled>()
            .await
            .context("Failed to subscribe to binding events")?;
        self.eval::<bool>(INSTALL_OBSERVER_JS.to_string()).await?;
        Ok(events
            .filter(|event| future::ready(event.name == MUTATION_BINDING))
            .map(|_| ())
            .boxed())
    }

    async fn stop_mutations(&self) -> Result<()> {
        self.eval::<bool>(DISCONNECT_OBSERVER_JS.to_string())
            .await
            .map(|_| ())
    }

    async fn session_state(&self) -> Result<SessionState> {
        let mut state: SessionState = self.eval(SESSION_STATE_JS.to_string()).await?;
        state.cookies = self
            .page
            .get_cookies()
            .await
            .context("Failed to read cookies")?
            .into_iter()
            .map(|c| (c.name, c.value))
            .collect();
        Ok(state)
    }
}
