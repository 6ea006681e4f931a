//!  Slotscout Facility Client
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Session Cookie Acquisition
//!
//! The backend only hands out session cookies after its landing page has run
//! in a real browser, so a headless Chrome is driven over WebDriver to mint them.
//!
//! [`Session`] owns the jar. Refreshes go through a single gate, so two
//! callers never launch two browsers that race to overwrite each other.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use thirtyfour::prelude::*;
use thirtyfour::{DesiredCapabilities, WebDriver};
use tokio::sync::{Mutex, RwLock};

use crate::config::ClientConfig;
use crate::cookie_jar::CookieJar;
use crate::error::{ClientError, Result};

pub type HarvestFuture<'a> = Pin<Box<dyn Future<Output = Result<CookieJar>> + Send + 'a>>;

/// Anything able to produce a fresh cookie jar for the backend.
pub trait CookieSource: Send + Sync {
    fn harvest(&self) -> HarvestFuture<'_>;
}

// Readiness and number of resource-timing entries seen so far.
const PAGE_STATE_SCRIPT: &str = "return { ready: document.readyState, resources: performance.getEntriesByType('resource').length };";

/// Headless Chrome behind a chromedriver endpoint.
#[derive(Debug, Clone)]
pub struct BrowserCookieSource {
    webdriver_url: String,
    landing_url: String,
    user_agent: String,
    navigation_timeout: Duration,
    settle_window: Duration,
    poll_interval: Duration,
}

impl BrowserCookieSource {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            landing_url: config.landing_url(),
            user_agent: config.user_agent.clone(),
            navigation_timeout: config.navigation_timeout(),
            settle_window: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }

    async fn launch(webdriver_url: String, user_agent: String) -> WebDriverResult<WebDriver> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        caps.add_arg("--incognito")?;
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_arg(&format!("--user-agent={}", user_agent))?;

        WebDriver::new(webdriver_url.as_str(), caps).await
    }

    /// Start a browser session within the navigation timeout.
    ///
    /// The handshake runs as its own task. If it outlives the timeout it is
    /// left to finish, and a session it still creates is quit right away.
    async fn launch_within_timeout(&self) -> Result<WebDriver> {
        let mut handshake = tokio::spawn(Self::launch(
            self.webdriver_url.clone(),
            self.user_agent.clone(),
        ));

        match tokio::time::timeout(self.navigation_timeout, &mut handshake).await {
            Ok(Ok(Ok(driver))) => Ok(driver),
            Ok(Ok(Err(e))) => Err(ClientError::SessionAcquisition(format!(
                "browser launch failed: {e}"
            ))),
            Ok(Err(e)) => Err(ClientError::SessionAcquisition(format!(
                "browser launch task failed: {e}"
            ))),
            Err(_) => {
                tokio::spawn(async move {
                    if let Ok(Ok(driver)) = handshake.await {
                        tracing::debug!("Closing browser session created after launch timeout");
                        if let Err(e) = driver.quit().await {
                            tracing::warn!("Failed to close late browser session: {}", e);
                        }
                    }
                });
                Err(ClientError::SessionAcquisition(format!(
                    "browser launch timed out after {:?}",
                    self.navigation_timeout
                )))
            }
        }
    }

    async fn visit_and_collect(&self, driver: &WebDriver) -> WebDriverResult<CookieJar> {
        tracing::info!("Visiting landing page: {}", self.landing_url);
        driver.goto(self.landing_url.as_str()).await?;
        self.wait_for_network_idle(driver).await?;

        let cookies = driver.get_all_cookies().await?;
        Ok(cookies.into_iter().map(|c| (c.name, c.value)).collect())
    }

    /// Returns once the document is complete and no new resource loads have
    /// appeared for a full settle window.
    async fn wait_for_network_idle(&self, driver: &WebDriver) -> WebDriverResult<()> {
        let mut last_count: Option<u64> = None;
        let mut stable_since = Instant::now();

        loop {
            let ret = driver.execute(PAGE_STATE_SCRIPT, Vec::new()).await?;
            let state = ret.json();
            let complete = state.get("ready").and_then(Value::as_str) == Some("complete");
            let count = state.get("resources").and_then(Value::as_u64).unwrap_or(0);

            if complete && last_count == Some(count) {
                if stable_since.elapsed() >= self.settle_window {
                    tracing::debug!("Network idle after {} resource loads", count);
                    return Ok(());
                }
            } else {
                last_count = Some(count);
                stable_since = Instant::now();
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn harvest_once(&self) -> Result<CookieJar> {
        let start = Instant::now();

        let driver = self.launch_within_timeout().await?;

        let outcome = tokio::time::timeout(self.navigation_timeout, self.visit_and_collect(&driver)).await;

        // The browser goes away whatever happened above.
        if let Err(e) = driver.quit().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        let jar = match outcome {
            Ok(Ok(jar)) => jar,
            Ok(Err(e)) => {
                return Err(ClientError::SessionAcquisition(format!("navigation failed: {e}")));
            }
            Err(_) => {
                return Err(ClientError::SessionAcquisition(format!(
                    "landing page did not settle within {:?}",
                    self.navigation_timeout
                )));
            }
        };

        tracing::debug!("Harvested {} cookies in {:?}", jar.len(), start.elapsed());
        Ok(jar)
    }
}

impl CookieSource for BrowserCookieSource {
    fn harvest(&self) -> HarvestFuture<'_> {
        Box::pin(self.harvest_once())
    }
}

/// The process-wide backend session.
pub struct Session {
    source: Arc<dyn CookieSource>,
    jar: RwLock<CookieJar>,
    refresh_gate: Mutex<()>,
    generation: AtomicU64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(source: Arc<dyn CookieSource>) -> Self {
        Self {
            source,
            jar: RwLock::new(CookieJar::new()),
            refresh_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_browser(config: &ClientConfig) -> Self {
        Self::new(Arc::new(BrowserCookieSource::from_config(config)))
    }

    /// Snapshot of the current jar.
    pub async fn jar(&self) -> CookieJar {
        self.jar.read().await.clone()
    }

    pub async fn cookie_header(&self) -> Option<String> {
        self.jar.read().await.to_header()
    }

    /// Number of successful refreshes so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replace the jar with a freshly harvested one and return its cookie count.
    ///
    /// On failure the previous jar stays in place.
    pub async fn refresh(&self) -> Result<usize> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh only if the jar is empty. `Ok(true)` when a refresh ran.
    pub async fn ensure_cookies(&self) -> Result<bool> {
        if !self.jar.read().await.is_empty() {
            return Ok(false);
        }
        let _gate = self.refresh_gate.lock().await;
        // Another caller may have filled the jar while we waited for the gate.
        if !self.jar.read().await.is_empty() {
            return Ok(false);
        }
        self.refresh_locked().await.map(|_| true)
    }

    /// Refresh after the backend rejected cookies from generation `seen`,
    /// unless someone already refreshed since.
    pub async fn refresh_after_rejection(&self, seen: u64) -> Result<bool> {
        let _gate = self.refresh_gate.lock().await;
        if self.generation() != seen {
            return Ok(false);
        }
        self.refresh_locked().await.map(|_| true)
    }

    async fn refresh_locked(&self) -> Result<usize> {
        tracing::info!("Acquiring fresh session cookies...");
        let jar = self.source.harvest().await?;
        let count = jar.len();
        tracing::info!(
            "Got {} cookies: {:?}",
            count,
            jar.names().collect::<Vec<_>>()
        );
        *self.jar.write().await = jar;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CookieSource for CountingSource {
        fn harvest(&self) -> HarvestFuture<'_> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
                if self.fail {
                    return Err(ClientError::SessionAcquisition("browser launch failed".into()));
                }
                Ok([("JSESSIONID", format!("s{n}"))].into_iter().collect())
            })
        }
    }

    fn session(fail: bool) -> (Session, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail,
        });
        (Session::new(source.clone()), source)
    }

    #[tokio::test]
    async fn refresh_replaces_jar_wholesale() {
        let (session, _) = session(false);
        assert_eq!(session.refresh().await.expect("refresh"), 1);
        assert_eq!(session.jar().await.get("JSESSIONID"), Some("s1"));
        session.refresh().await.expect("refresh");
        assert_eq!(session.cookie_header().await.as_deref(), Some("JSESSIONID=s2"));
        assert_eq!(session.generation(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_jar() {
        let (session, source) = session(true);
        let err = session.refresh().await.expect_err("must fail");
        assert!(matches!(err, ClientError::SessionAcquisition(_)));
        assert!(session.jar().await.is_empty());
        assert_eq!(session.generation(), 0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_lazy_refreshes_launch_once() {
        let (session, source) = session(false);
        let session = Arc::new(session);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = Arc::clone(&session);
            handles.push(tokio::spawn(async move { s.ensure_cookies().await }));
        }
        let mut ran = 0;
        for h in handles {
            if h.await.expect("join").expect("ensure") {
                ran += 1;
            }
        }
        assert_eq!(ran, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejection_refresh_skips_when_already_renewed() {
        let (session, source) = session(false);
        session.refresh().await.expect("refresh");
        let seen = session.generation();
        assert!(session.refresh_after_rejection(seen).await.expect("refresh"));
        assert!(!session.refresh_after_rejection(seen).await.expect("no-op"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    #[ignore]
    async fn browser_harvest_live() {
        // Needs chromedriver on localhost:9515 and network access.
        let session = Session::with_browser(&ClientConfig::default());
        let count = session.refresh().await.expect("live refresh");
        assert!(count > 0, "expected at least one cookie");
    }
}
