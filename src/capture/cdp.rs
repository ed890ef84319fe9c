//! Chrome DevTools Protocol capture backend

use crate::capture::CaptureBackend;
use crate::config::BrowserConfig;
use crate::device::DeviceProfile;
use crate::{Error, Quality, Result, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::browser::transport::Transport;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Emulation, Page, Target};
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// Chrome lifecycle event fired once no more than 2 connections have been
// active for 500ms.
const NETWORK_SETTLED_EVENT: &str = "networkAlmostIdle";

const LAUNCH_ARGS: [&str; 5] = [
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// CDP-based capture backend (uses the `headless_chrome` crate)
///
/// One Chrome process is launched up front and shared. Each capture opens a
/// fresh browser context and tab, emulates the device, waits for the network
/// to settle and screenshots the viewport, then closes the tab and disposes
/// the context.
pub struct CdpCaptureBackend {
    session: Mutex<Option<ChromeSession>>,
    config: BrowserConfig,
}

/// The shared browser plus a browser-level connection for the Target calls
/// `Browser` does not expose.
#[derive(Clone)]
struct ChromeSession {
    browser: Browser,
    control: Arc<Transport>,
}

impl CdpCaptureBackend {
    /// Launch the shared Chrome process.
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let args: Vec<&OsStr> = LAUNCH_ARGS.iter().map(|arg| OsStr::new(*arg)).collect();
        let idle_timeout = Duration::from_secs(config.idle_timeout_secs);

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .path(config.chrome_path.clone())
            .idle_browser_timeout(idle_timeout)
            .args(args)
            .build()
            .map_err(|e| Error::Initialization(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Initialization(format!("Failed to launch browser: {}", e)))?;

        let ws_url = url::Url::parse(&browser.get_ws_url())
            .map_err(|e| Error::Initialization(format!("Invalid browser websocket URL: {}", e)))?;
        let control = Transport::new(ws_url, browser.get_process_id(), idle_timeout, None)
            .map_err(|e| Error::Initialization(format!("Failed to open control connection: {}", e)))?;

        debug!("Launched capture browser (headless={})", config.headless);

        Ok(Self {
            session: Mutex::new(Some(ChromeSession {
                browser,
                control: Arc::new(control),
            })),
            config: config.clone(),
        })
    }

    fn session(&self) -> Result<ChromeSession> {
        let guard = self
            .session
            .lock()
            .map_err(|_| Error::Initialization("browser handle poisoned".into()))?;
        guard
            .clone()
            .ok_or_else(|| Error::Initialization("capture browser has been shut down".into()))
    }

    fn timeout_ms(&self) -> u64 {
        self.config.navigation_timeout_ms
    }

    /// Number of browser contexts Chrome currently holds besides the default one.
    pub fn open_contexts(&self) -> Result<usize> {
        let session = self.session()?;
        let contexts = session
            .control
            .call_method_on_browser(Target::GetBrowserContexts(None))
            .map_err(|e| Error::Navigation(format!("Failed to list browser contexts: {}", e)))?;
        Ok(contexts.browser_context_ids.len())
    }

    fn capture_in_tab(&self, tab: &Arc<Tab>, url: &str, profile: &DeviceProfile, viewport: Viewport) -> Result<Vec<u8>> {
        let timeout = Duration::from_millis(self.timeout_ms());
        tab.set_default_timeout(timeout);

        let metrics: Emulation::SetDeviceMetricsOverride = serde_json::from_value(serde_json::json!({
            "width": viewport.width,
            "height": viewport.height,
            "deviceScaleFactor": viewport.scale_factor,
            "mobile": profile.mobile,
        }))
        .map_err(|e| Error::Navigation(format!("Failed to build device metrics: {}", e)))?;
        tab.call_method(metrics)
            .map_err(|e| Error::Navigation(format!("Failed to emulate device: {}", e)))?;

        if let Some(user_agent) = &profile.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| Error::Navigation(format!("Failed to set user agent: {}", e)))?;
        }

        tab.call_method(Page::SetLifecycleEventsEnabled { enabled: true })
            .map_err(|e| Error::Navigation(format!("Failed to enable lifecycle events: {}", e)))?;

        let settle = Arc::new(SettleState::default());
        let listener_state = Arc::clone(&settle);
        tab.add_event_listener(Arc::new(move |event: &Event| {
            if let Event::PageLifecycleEvent(lifecycle) = event {
                listener_state.observe(&lifecycle.params.name);
            }
        }))
        .map_err(|e| Error::Navigation(format!("Failed to watch lifecycle events: {}", e)))?;

        let deadline = Instant::now() + timeout;
        self.navigate_before(tab, url, deadline)?;

        let poll = Duration::from_millis(self.config.settle_poll_ms.max(1));
        while !settle.is_settled() {
            if Instant::now() >= deadline {
                return Err(Error::NavigationTimeout(self.timeout_ms()));
            }
            thread::sleep(poll);
        }

        // Viewport only, never the full scrollable page
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: viewport.width as f64,
            height: viewport.height as f64,
            scale: 1.0,
        };

        tab.capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| classify_navigation_error(&format!("Screenshot failed: {:#}", e), self.timeout_ms()))
    }

    /// Issue `Page.navigate` and wait for Chrome's answer until `deadline`.
    ///
    /// Chrome only answers once the response commits or fails, so a server
    /// that never sends headers would otherwise hold the call for the whole
    /// idle timeout. The helper thread is left behind on timeout; closing the
    /// tab cancels the load.
    fn navigate_before(&self, tab: &Arc<Tab>, url: &str, deadline: Instant) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let nav_tab = Arc::clone(tab);
        let target = url.to_string();
        thread::Builder::new()
            .name("shotframe-navigate".into())
            .spawn(move || {
                let outcome = nav_tab.navigate_to(&target).map(|_| ()).map_err(|e| format!("{:#}", e));
                // The receiver is gone once the deadline passed
                let _ = tx.send(outcome);
            })
            .map_err(|e| Error::Navigation(format!("Failed to start navigation: {}", e)))?;

        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(classify_navigation_error(&message, self.timeout_ms())),
            Err(RecvTimeoutError::Timeout) => {
                debug!("Navigation to {} exceeded {}ms", url, self.timeout_ms());
                Err(Error::NavigationTimeout(self.timeout_ms()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Navigation("navigation thread exited without a result".into()))
            }
        }
    }
}

impl CaptureBackend for CdpCaptureBackend {
    fn capture(&self, url: &str, profile: &DeviceProfile, quality: Quality) -> Result<Vec<u8>> {
        let session = self.session()?;
        let viewport = profile.viewport(quality);
        debug!(
            "Capturing {} at {}x{} @{}x ({})",
            url, viewport.width, viewport.height, viewport.scale_factor, profile.kind
        );

        let context = session
            .browser
            .new_context()
            .map_err(|e| Error::Initialization(format!("Failed to create browser context: {}", e)))?;
        let context_id = context.get_id().to_string();
        let tab = match context.new_tab() {
            Ok(tab) => tab,
            Err(e) => {
                dispose_context(&session.control, &context_id);
                return Err(Error::Initialization(format!("Failed to create tab: {}", e)));
            }
        };
        let target = CaptureTarget {
            control: Arc::clone(&session.control),
            context_id,
            tab,
        };

        self.capture_in_tab(&target.tab, url, profile, viewport)
    }

    fn shutdown(&self) -> Result<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| Error::Initialization("browser handle poisoned".into()))?;
        // Dropping the last browser handle terminates the child process
        if let Some(session) = guard.take() {
            session.control.shutdown();
            debug!("Capture browser shut down");
        }
        Ok(())
    }
}

/// Tab and browser context of one capture. Both are released on drop,
/// successfully or not.
struct CaptureTarget {
    control: Arc<Transport>,
    context_id: String,
    tab: Arc<Tab>,
}

impl Drop for CaptureTarget {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            warn!("Failed to close capture tab: {}", e);
        }
        dispose_context(&self.control, &self.context_id);
    }
}

fn dispose_context(control: &Transport, context_id: &str) {
    let dispose = Target::DisposeBrowserContext {
        browser_context_id: context_id.to_string(),
    };
    if let Err(e) = control.call_method_on_browser(dispose) {
        warn!("Failed to dispose browser context {}: {}", context_id, e);
    }
}

/// Network-settled flag driven by page lifecycle events.
#[derive(Default)]
struct SettleState {
    navigating: AtomicBool,
    settled: AtomicBool,
}

impl SettleState {
    fn observe(&self, lifecycle_name: &str) {
        match lifecycle_name {
            // A new document started loading; anything before it was about:blank
            "init" => {
                self.settled.store(false, Ordering::SeqCst);
                self.navigating.store(true, Ordering::SeqCst);
            }
            NETWORK_SETTLED_EVENT if self.navigating.load(Ordering::SeqCst) => {
                self.settled.store(true, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::SeqCst)
    }
}

/// Map a Chrome navigation failure message onto the error taxonomy.
pub(crate) fn classify_navigation_error(message: &str, timeout_ms: u64) -> Error {
    if message.contains("ERR_NAME_NOT_RESOLVED") || message.contains("ERR_NAME_RESOLUTION_FAILED") {
        return Error::DnsResolution(message.to_string());
    }

    let lower = message.to_ascii_lowercase();
    if message.contains("ERR_TIMED_OUT")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("never came")
    {
        return Error::NavigationTimeout(timeout_ms);
    }

    Error::Navigation(message.to_string())
}
