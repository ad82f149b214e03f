//! [`PageDriver`] backed by a headless Chromium over CDP.
//!
//! Locators are XPath expressions resolved in-page with `document.evaluate`;
//! pointer and keyboard input go through `Input.dispatch*Event` so the page
//! sees trusted events.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetGeolocationOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::handler::Handler;
use chromiumoxide::page::Page;
use futures::StreamExt;
use mapscout_core::{AppConfig, GeoPoint};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::driver::{BrowserSession, Locator, PageDriver, SessionLauncher};
use crate::error::{DriverError, ScraperError};

const WINDOW_WIDTH: u32 = 1366;
const WINDOW_HEIGHT: u32 = 900;
const GEOLOCATION_ACCURACY_M: f64 = 100.0;

/// Browser-level settings applied to every launched session.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// BCP 47 tag, e.g. `es-AR`. Drives UI language and `Accept-Language`.
    pub locale: String,
    pub timezone: String,
    pub geolocation: Option<GeoPoint>,
}

impl LaunchOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            headless: config.headless,
            locale: config.locale.clone(),
            timezone: config.timezone.clone(),
            geolocation: config.geolocation,
        }
    }

    /// `Accept-Language` value for the configured locale: the full tag first,
    /// then its bare language at lower weight.
    fn accept_language(&self) -> String {
        match self.locale.split_once('-') {
            Some((language, _)) => format!("{},{language};q=0.9", self.locale),
            None => self.locale.clone(),
        }
    }
}

/// Launches a fresh Chromium per search.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .no_sandbox()
            .arg(format!("--lang={}", self.options.locale))
            .arg(format!("--accept-lang={}", self.options.accept_language()))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if let Some(path) = &self.options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !self.options.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(ScraperError::Launch)
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        let config = self.browser_config()?;
        let (mut browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::Launch(e.to_string()))?;
        let handler_task = spawn_handler_task(handler);

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    tracing::warn!(error = %close_err, "failed to close browser after launch error");
                }
                handler_task.abort();
                return Err(ScraperError::Launch(err.to_string()));
            }
        };

        apply_context(&browser, &page, &self.options).await;
        tracing::debug!(
            headless = self.options.headless,
            locale = %self.options.locale,
            "chromium session launched"
        );

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            driver: ChromiumDriver::new(page),
        }))
    }
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!(error = %e, "chromium handler event error");
            }
        }
    })
}

/// Timezone, geolocation and permission overrides. Each is best-effort: a
/// page that ignores them still renders results.
async fn apply_context(browser: &Browser, page: &Page, options: &LaunchOptions) {
    if let Err(e) = page
        .execute(SetTimezoneOverrideParams::new(options.timezone.clone()))
        .await
    {
        tracing::warn!(timezone = %options.timezone, error = %e, "timezone override rejected");
    }

    let Some(point) = options.geolocation else {
        return;
    };
    if let Err(e) = browser
        .execute(GrantPermissionsParams::new(vec![PermissionType::Geolocation]))
        .await
    {
        tracing::warn!(error = %e, "geolocation permission grant rejected");
    }
    let params = SetGeolocationOverrideParams::builder()
        .latitude(point.latitude)
        .longitude(point.longitude)
        .accuracy(GEOLOCATION_ACCURACY_M)
        .build();
    if let Err(e) = page.execute(params).await {
        tracing::warn!(error = %e, "geolocation override rejected");
    }
}

/// One running browser and its single page.
pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    driver: ChromiumDriver,
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    fn driver(&self) -> &dyn PageDriver {
        &self.driver
    }

    async fn close(self: Box<Self>) {
        let mut session = *self;
        if let Err(e) = session.browser.close().await {
            tracing::warn!(error = %e, "failed to close browser");
            return;
        }
        if let Err(e) = session.browser.wait().await {
            tracing::warn!(error = %e, "failed to reap browser process");
        }
    }
}

/// Element geometry returned by the in-page locate script.
#[derive(Debug, Deserialize)]
struct Target {
    found: bool,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize)]
struct TextProbe {
    found: bool,
    #[serde(default)]
    text: String,
}

pub struct ChromiumDriver {
    page: Page,
    /// Last pointer position; wheel events are dispatched here so they scroll
    /// whichever pane the pointer is over.
    pointer: Mutex<(f64, f64)>,
}

impl ChromiumDriver {
    fn new(page: Page) -> Self {
        let center = (f64::from(WINDOW_WIDTH) / 2.0, f64::from(WINDOW_HEIGHT) / 2.0);
        Self {
            page,
            pointer: Mutex::new(center),
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, DriverError> {
        let result = self.page.evaluate(script).await?;
        result
            .into_value::<T>()
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    /// Scrolls the first match into view and returns its center in viewport
    /// coordinates.
    async fn locate(&self, locator: &Locator) -> Result<(f64, f64), DriverError> {
        let script = format!(
            "(() => {{ {FIRST_NODE_FN} const el = firstNode({xp}); \
             if (!el || !el.getBoundingClientRect) return {{ found: false }}; \
             el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
             const r = el.getBoundingClientRect(); \
             return {{ found: true, x: r.left + r.width / 2, y: r.top + r.height / 2 }}; }})()",
            xp = js_string(locator.as_str()),
        );
        let target: Target = self.eval(script).await?;
        if !target.found {
            return Err(not_found(locator));
        }
        Ok((target.x, target.y))
    }

    fn set_pointer(&self, x: f64, y: f64) {
        if let Ok(mut pointer) = self.pointer.lock() {
            *pointer = (x, y);
        }
    }

    fn pointer(&self) -> (f64, f64) {
        self.pointer.lock().map(|p| *p).unwrap_or((0.0, 0.0))
    }

    async fn mouse(
        &self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
        button: MouseButton,
    ) -> Result<(), DriverError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(button)
            .click_count(1)
            .build()
            .map_err(DriverError::Script)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn key(&self, params: DispatchKeyEventParams) -> Result<(), DriverError> {
        self.page.execute(params).await?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(DriverError::Timeout {
                operation: format!("navigate to {url}"),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn fill_input(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let script = format!(
            "(() => {{ {FIRST_NODE_FN} const el = firstNode({xp}); \
             if (!el) return false; el.focus(); \
             if ('value' in el) {{ el.value = ''; el.dispatchEvent(new Event('input', {{ bubbles: true }})); }} \
             return true; }})()",
            xp = js_string(locator.as_str()),
        );
        let focused: bool = self.eval(script).await?;
        if !focused {
            return Err(not_found(locator));
        }
        for ch in text.chars() {
            let params = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::Char)
                .text(ch.to_string())
                .build()
                .map_err(DriverError::Script)?;
            self.key(params).await?;
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let (code, virtual_key, text) =
            key_definition(key).ok_or_else(|| DriverError::UnsupportedKey(key.to_string()))?;

        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key.to_string())
            .code(code.to_string())
            .windows_virtual_key_code(virtual_key)
            .native_virtual_key_code(virtual_key);
        if let Some(text) = text {
            down = down.text(text.to_string());
        }
        self.key(down.build().map_err(DriverError::Script)?).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key.to_string())
            .code(code.to_string())
            .windows_virtual_key_code(virtual_key)
            .native_virtual_key_code(virtual_key)
            .build()
            .map_err(DriverError::Script)?;
        self.key(up).await
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        let script = format!(
            "document.evaluate({xp}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
            xp = js_string(locator.as_str()),
        );
        self.eval(script).await
    }

    async fn scroll_by(&self, delta_x: f64, delta_y: f64) -> Result<(), DriverError> {
        let (x, y) = self.pointer();
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(x)
            .y(y)
            .delta_x(delta_x)
            .delta_y(delta_y)
            .build()
            .map_err(DriverError::Script)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let (x, y) = self.locate(locator).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, x, y, MouseButton::None)
            .await?;
        self.mouse(DispatchMouseEventType::MousePressed, x, y, MouseButton::Left)
            .await?;
        self.mouse(DispatchMouseEventType::MouseReleased, x, y, MouseButton::Left)
            .await?;
        self.set_pointer(x, y);
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> Result<(), DriverError> {
        let (x, y) = self.locate(locator).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, x, y, MouseButton::None)
            .await?;
        self.set_pointer(x, y);
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        let script = format!(
            "(() => {{ {FIRST_NODE_FN} const el = firstNode({xp}); \
             if (!el) return {{ found: false }}; \
             return {{ found: true, text: el.innerText ?? el.textContent ?? '' }}; }})()",
            xp = js_string(locator.as_str()),
        );
        let probe: TextProbe = self.eval(script).await?;
        if !probe.found {
            return Err(not_found(locator));
        }
        Ok(probe.text)
    }

    async fn read_all_texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError> {
        let script = format!(
            "(() => {{ const snap = document.evaluate({xp}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             const out = []; \
             for (let i = 0; i < snap.snapshotLength; i++) {{ const n = snap.snapshotItem(i); out.push(n.innerText ?? n.textContent ?? ''); }} \
             return out; }})()",
            xp = js_string(locator.as_str()),
        );
        self.eval(script).await
    }
}

const FIRST_NODE_FN: &str = "const firstNode = (xp) => document.evaluate(xp, document, null, \
     XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;";

/// Encodes `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn not_found(locator: &Locator) -> DriverError {
    DriverError::NotFound {
        locator: locator.to_string(),
    }
}

/// `(code, virtual key code, text)` for the keys the scraper presses.
fn key_definition(key: &str) -> Option<(&'static str, i64, Option<&'static str>)> {
    match key {
        "Enter" => Some(("Enter", 13, Some("\r"))),
        "Escape" => Some(("Escape", 27, None)),
        "Tab" => Some(("Tab", 9, None)),
        _ => None,
    }
}
