//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature this module provides [`ChromiumDriver`], a
//! [`UiDriver`] backed by chromiumoxide. XPath evaluation, scoped queries,
//! `closest` and focus lookups run as page scripts that tag matching nodes
//! with a one-off marker attribute; the tagged nodes are then fetched as CDP
//! element references and the marker is removed again.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Remote debugging port (0 = auto-assign)
    pub debug_port: u16,
    /// Dedicated profile directory so the login survives between runs
    pub user_data_dir: Option<PathBuf>,
    /// Profile directory name inside `user_data_dir`
    pub profile_name: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Extra command-line switches
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1200,
            window_height: 900,
            chromium_path: None,
            debug_port: 9223,
            user_data_dir: Some(PathBuf::from("bot_chrome_data")),
            profile_name: None,
            sandbox: true,
            extra_args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-infobars".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    /// Set window dimensions
    #[must_use]
    pub const fn with_window(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the profile directory
    #[must_use]
    pub fn with_user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{ElementHandle, Key, UiDriver};
    use crate::locator::Selector;
    use crate::result::{AlumnusError, AlumnusResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::element::Element;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::Mutex;

    const MARK_ATTR: &str = "data-alumnus-mark";
    const SHIFT_MODIFIER: i64 = 8;

    const IS_DISPLAYED_JS: &str = "function() { \
        if (!this.isConnected) return false; \
        const s = window.getComputedStyle(this); \
        if (s.display === 'none' || s.visibility === 'hidden' || Number(s.opacity) === 0) return false; \
        const r = this.getBoundingClientRect(); \
        return r.width > 0 && r.height > 0; }";

    const IS_ENABLED_JS: &str = "function() { \
        return !this.disabled && this.getAttribute('aria-disabled') !== 'true'; }";

    const IS_EDITABLE_JS: &str = "function() { \
        return this.isContentEditable || this.tagName === 'TEXTAREA' \
            || (this.tagName === 'INPUT' && !this.readOnly); }";

    const HIT_TEST_JS: &str = "function() { \
        const r = this.getBoundingClientRect(); \
        const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
        return !!hit && (hit === this || this.contains(hit)); }";

    const SCROLL_JS: &str = "function() { \
        this.scrollIntoView({ block: 'center', inline: 'center' }); }";

    const JS_CLICK_JS: &str = "function() { this.click(); }";

    const CLEAR_JS: &str = "function() { \
        if (this.tagName === 'INPUT' || this.tagName === 'TEXTAREA') { this.value = ''; } \
        else { this.textContent = ''; } \
        this.dispatchEvent(new Event('input', { bubbles: true })); }";

    /// [`UiDriver`] backed by a real Chromium over CDP
    pub struct ChromiumDriver {
        config: BrowserConfig,
        browser: Mutex<CdpBrowser>,
        page: CdpPage,
        elements: Mutex<HashMap<String, Element>>,
        next_id: AtomicU64,
        handle: tokio::task::JoinHandle<()>,
    }

    impl std::fmt::Debug for ChromiumDriver {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ChromiumDriver")
                .field("config", &self.config)
                .field("next_id", &self.next_id)
                .finish_non_exhaustive()
        }
    }

    impl ChromiumDriver {
        /// Launch a new browser instance and open its working tab
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> AlumnusResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.window_width, config.window_height)
                .viewport(None);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if config.debug_port != 0 {
                builder = builder.port(config.debug_port);
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            if let Some(ref dir) = config.user_data_dir {
                builder = builder.user_data_dir(dir);
            }

            if let Some(ref name) = config.profile_name {
                builder = builder.arg(format!("--profile-directory={name}"));
            }

            for arg in &config.extra_args {
                builder = builder.arg(arg.clone());
            }

            let cdp_config = builder
                .build()
                .map_err(|e| AlumnusError::BrowserLaunchError { message: e })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                AlumnusError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(|e| {
                AlumnusError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            tracing::info!(
                headless = config.headless,
                width = config.window_width,
                height = config.window_height,
                "browser launched"
            );

            Ok(Self {
                config,
                browser: Mutex::new(browser),
                page,
                elements: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                handle,
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        fn next_token(&self) -> String {
            format!("m{}", self.next_id.fetch_add(1, Ordering::Relaxed))
        }

        async fn register(&self, found: Vec<Element>, matched_by: &str) -> Vec<ElementHandle> {
            let mut elements = self.elements.lock().await;
            found
                .into_iter()
                .map(|element| {
                    let id = format!("el-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
                    let _ = elements.insert(id.clone(), element);
                    ElementHandle::new(id, matched_by)
                })
                .collect()
        }

        /// Fetch the nodes tagged with `token`, then remove the tag
        async fn collect_marked(
            &self,
            token: &str,
            matched_by: &str,
        ) -> AlumnusResult<Vec<ElementHandle>> {
            let css = format!("[{MARK_ATTR}=\"{token}\"]");
            let found = self
                .page
                .find_elements(css.as_str())
                .await
                .map_err(|e| AlumnusError::driver(e.to_string()))?;
            let unmark = format!(
                "document.querySelectorAll({css}).forEach(n => n.removeAttribute({attr}))",
                css = serde_json::to_string(&css)?,
                attr = serde_json::to_string(MARK_ATTR)?,
            );
            if let Err(e) = self.page.evaluate(unmark).await {
                tracing::debug!(error = %e, "failed to remove element markers");
            }
            Ok(self.register(found, matched_by).await)
        }

        fn xpath_mark_script(xpath: &str, context: &str, token: &str) -> AlumnusResult<String> {
            Ok(format!(
                "const r = document.evaluate({xp}, {context}, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 for (let i = 0; i < r.snapshotLength; i++) {{ \
                   const n = r.snapshotItem(i); \
                   if (n.nodeType === 1) n.setAttribute({attr}, {token}); }} \
                 return r.snapshotLength;",
                xp = serde_json::to_string(xpath)?,
                attr = serde_json::to_string(MARK_ATTR)?,
                token = serde_json::to_string(token)?,
            ))
        }

        async fn call_on(
            &self,
            element: &ElementHandle,
            function: &str,
        ) -> AlumnusResult<serde_json::Value> {
            let elements = self.elements.lock().await;
            let target = elements
                .get(&element.id)
                .ok_or_else(|| AlumnusError::StaleElement {
                    id: element.id.clone(),
                })?;
            let returns = target
                .call_js_fn(function, false)
                .await
                .map_err(|e| classify(&element.id, &e.to_string()))?;
            if let Some(details) = returns.exception_details {
                return Err(AlumnusError::driver(details.text));
            }
            Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
        }

        async fn call_bool(&self, element: &ElementHandle, function: &str) -> AlumnusResult<bool> {
            Ok(self
                .call_on(element, function)
                .await?
                .as_bool()
                .unwrap_or(false))
        }

        async fn dispatch_line_break(&self) -> AlumnusResult<()> {
            let down = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .key(Key::LineBreak.name())
                .code("Enter")
                .text("\r")
                .windows_virtual_key_code(13)
                .modifiers(SHIFT_MODIFIER)
                .build()
                .map_err(AlumnusError::driver)?;
            let up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .key(Key::LineBreak.name())
                .code("Enter")
                .windows_virtual_key_code(13)
                .modifiers(SHIFT_MODIFIER)
                .build()
                .map_err(AlumnusError::driver)?;
            self.page
                .execute(down)
                .await
                .map_err(|e| AlumnusError::driver(e.to_string()))?;
            self.page
                .execute(up)
                .await
                .map_err(|e| AlumnusError::driver(e.to_string()))?;
            Ok(())
        }
    }

    /// Map a CDP failure on an element to stale-vs-other
    fn classify(id: &str, message: &str) -> AlumnusError {
        let lowered = message.to_lowercase();
        if lowered.contains("could not find node")
            || lowered.contains("no node with given id")
            || lowered.contains("cannot find context")
            || lowered.contains("object reference chain is too long")
            || lowered.contains("detached")
        {
            AlumnusError::StaleElement { id: id.to_string() }
        } else {
            AlumnusError::driver(message)
        }
    }

    #[async_trait]
    impl UiDriver for ChromiumDriver {
        async fn navigate(&self, url: &str) -> AlumnusResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| AlumnusError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> AlumnusResult<String> {
            let url = self
                .page
                .url()
                .await
                .map_err(|e| AlumnusError::driver(e.to_string()))?;
            Ok(url.unwrap_or_default())
        }

        async fn find_all(&self, selector: &Selector) -> AlumnusResult<Vec<ElementHandle>> {
            match selector {
                Selector::Css(css) => {
                    let found = self.page.find_elements(css.as_str()).await.map_err(|e| {
                        AlumnusError::InvalidSelector {
                            selector: css.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    Ok(self.register(found, css).await)
                }
                Selector::XPath(xpath) => {
                    let token = self.next_token();
                    let body = Self::xpath_mark_script(xpath, "document", &token)?;
                    self.page
                        .evaluate(format!("(() => {{ {body} }})()"))
                        .await
                        .map_err(|e| AlumnusError::InvalidSelector {
                            selector: xpath.clone(),
                            message: e.to_string(),
                        })?;
                    self.collect_marked(&token, xpath).await
                }
            }
        }

        async fn find_within(
            &self,
            scope: &ElementHandle,
            selector: &Selector,
        ) -> AlumnusResult<Vec<ElementHandle>> {
            match selector {
                Selector::Css(css) => {
                    let found = {
                        let elements = self.elements.lock().await;
                        let parent =
                            elements
                                .get(&scope.id)
                                .ok_or_else(|| AlumnusError::StaleElement {
                                    id: scope.id.clone(),
                                })?;
                        parent
                            .find_elements(css.as_str())
                            .await
                            .map_err(|e| classify(&scope.id, &e.to_string()))?
                    };
                    Ok(self.register(found, css).await)
                }
                Selector::XPath(xpath) => {
                    let token = self.next_token();
                    let body = Self::xpath_mark_script(xpath, "this", &token)?;
                    let _ = self.call_on(scope, &format!("function() {{ {body} }}")).await?;
                    self.collect_marked(&token, xpath).await
                }
            }
        }

        async fn closest(
            &self,
            element: &ElementHandle,
            selector: &Selector,
        ) -> AlumnusResult<Option<ElementHandle>> {
            let Selector::Css(css) = selector else {
                return Err(AlumnusError::InvalidSelector {
                    selector: selector.to_string(),
                    message: "closest() takes a CSS selector".to_string(),
                });
            };
            let token = self.next_token();
            let function = format!(
                "function() {{ const c = this.closest({css}); \
                 if (c) c.setAttribute({attr}, {token}); return !!c; }}",
                css = serde_json::to_string(css)?,
                attr = serde_json::to_string(MARK_ATTR)?,
                token = serde_json::to_string(&token)?,
            );
            if !self.call_bool(element, &function).await? {
                return Ok(None);
            }
            Ok(self.collect_marked(&token, css).await?.into_iter().next())
        }

        async fn focused_element(&self) -> AlumnusResult<Option<ElementHandle>> {
            let token = self.next_token();
            let script = format!(
                "(() => {{ const a = document.activeElement; \
                 if (!a || a === document.body || a === document.documentElement) return false; \
                 a.setAttribute({attr}, {token}); return true; }})()",
                attr = serde_json::to_string(MARK_ATTR)?,
                token = serde_json::to_string(&token)?,
            );
            let marked = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| AlumnusError::driver(e.to_string()))?
                .into_value::<bool>()
                .unwrap_or(false);
            if !marked {
                return Ok(None);
            }
            Ok(self
                .collect_marked(&token, "document.activeElement")
                .await?
                .into_iter()
                .next())
        }

        async fn is_displayed(&self, element: &ElementHandle) -> AlumnusResult<bool> {
            self.call_bool(element, IS_DISPLAYED_JS).await
        }

        async fn is_enabled(&self, element: &ElementHandle) -> AlumnusResult<bool> {
            self.call_bool(element, IS_ENABLED_JS).await
        }

        async fn is_editable(&self, element: &ElementHandle) -> AlumnusResult<bool> {
            self.call_bool(element, IS_EDITABLE_JS).await
        }

        async fn text(&self, element: &ElementHandle) -> AlumnusResult<String> {
            let elements = self.elements.lock().await;
            let target = elements
                .get(&element.id)
                .ok_or_else(|| AlumnusError::StaleElement {
                    id: element.id.clone(),
                })?;
            let text = target
                .inner_text()
                .await
                .map_err(|e| classify(&element.id, &e.to_string()))?;
            Ok(text.unwrap_or_default())
        }

        async fn scroll_into_view(&self, element: &ElementHandle) -> AlumnusResult<()> {
            let _ = self.call_on(element, SCROLL_JS).await?;
            Ok(())
        }

        async fn click(&self, element: &ElementHandle) -> AlumnusResult<()> {
            if !self.call_bool(element, HIT_TEST_JS).await? {
                return Err(AlumnusError::ClickIntercepted {
                    id: element.id.clone(),
                    message: "another element covers the click point".to_string(),
                });
            }
            let elements = self.elements.lock().await;
            let target = elements
                .get(&element.id)
                .ok_or_else(|| AlumnusError::StaleElement {
                    id: element.id.clone(),
                })?;
            let _ = target
                .click()
                .await
                .map_err(|e| classify(&element.id, &e.to_string()))?;
            Ok(())
        }

        async fn js_click(&self, element: &ElementHandle) -> AlumnusResult<()> {
            let _ = self.call_on(element, JS_CLICK_JS).await?;
            Ok(())
        }

        async fn clear(&self, element: &ElementHandle) -> AlumnusResult<()> {
            let _ = self.call_on(element, CLEAR_JS).await?;
            Ok(())
        }

        async fn type_text(&self, element: &ElementHandle, text: &str) -> AlumnusResult<()> {
            let elements = self.elements.lock().await;
            let target = elements
                .get(&element.id)
                .ok_or_else(|| AlumnusError::StaleElement {
                    id: element.id.clone(),
                })?;
            let _ = target
                .focus()
                .await
                .map_err(|e| classify(&element.id, &e.to_string()))?;
            let _ = target
                .type_str(text)
                .await
                .map_err(|e| classify(&element.id, &e.to_string()))?;
            Ok(())
        }

        async fn press_key(&self, element: &ElementHandle, key: Key) -> AlumnusResult<()> {
            match key {
                Key::LineBreak => self.dispatch_line_break().await,
                Key::Backspace => {
                    let elements = self.elements.lock().await;
                    let target =
                        elements
                            .get(&element.id)
                            .ok_or_else(|| AlumnusError::StaleElement {
                                id: element.id.clone(),
                            })?;
                    let _ = target
                        .press_key(key.name())
                        .await
                        .map_err(|e| classify(&element.id, &e.to_string()))?;
                    Ok(())
                }
            }
        }

        async fn screenshot(&self) -> AlumnusResult<Vec<u8>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot =
                self.page
                    .execute(params)
                    .await
                    .map_err(|e| AlumnusError::ScreenshotError {
                        message: e.to_string(),
                    })?;

            use base64::Engine;
            let data: &str = screenshot.data.as_ref();
            base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| AlumnusError::ScreenshotError {
                    message: e.to_string(),
                })
        }

        async fn is_alive(&self) -> bool {
            self.browser.lock().await.version().await.is_ok()
        }

        async fn release_elements(&self) {
            self.elements.lock().await.clear();
        }

        async fn close(&self) -> AlumnusResult<()> {
            self.elements.lock().await.clear();
            let mut browser = self.browser.lock().await;
            browser
                .close()
                .await
                .map_err(|e| AlumnusError::SessionUnavailable {
                    message: e.to_string(),
                })?;
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "browser process did not exit cleanly");
            }
            self.handle.abort();
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;
