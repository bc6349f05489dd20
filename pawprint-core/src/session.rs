//! Tracking-session initialization
//!
//! Creates and memoizes exactly one analytics session per process, keyed to
//! a device identifier that persists across runs.
//!
//! The public entry point never fails: when the store or the client cannot
//! be set up, the error is logged and callers simply get no session.
//! Tracking degrades to a no-op while the host application carries on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::client::{AnalyticsClient, SessionIdentity};
use crate::config::{ClientConfig, Config};
use crate::error::{Error, Result};
use crate::events::{TrackingEvent, UserProperties};
use crate::store::{load_or_create_device_id, DeviceStore, FileStore, DEVICE_ID_KEY};

/// A live analytics session: the one shared handle through which events
/// are emitted.
pub struct TrackingSession {
    device_id: String,
    client: AnalyticsClient,
    runtime: tokio::runtime::Runtime,
    close_armed: AtomicBool,
}

impl TrackingSession {
    fn new(device_id: String, client: AnalyticsClient) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Client(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            device_id,
            client,
            runtime,
            close_armed: AtomicBool::new(false),
        })
    }

    /// The persisted device identifier this session reports under
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The identity the session was constructed with
    pub fn identity(&self) -> &SessionIdentity {
        self.client.identity()
    }

    /// Static metadata attached at construction time
    pub fn user_properties(&self) -> &UserProperties {
        &self.client.identity().user_properties
    }

    /// Emit one event, blocking until delivery is resolved
    ///
    /// Returns the number of events the server accepted. Delivery failures
    /// are logged and reported as 0; they never surface to the caller.
    pub fn track(&self, event: TrackingEvent) -> usize {
        let events = [event];

        match self
            .runtime
            .block_on(self.client.send_events_with_retry(&events))
        {
            Ok(response) => {
                tracing::debug!(
                    accepted = response.accepted,
                    rejected = response.rejected,
                    "Event delivered"
                );
                response.accepted
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to deliver event");
                0
            }
        }
    }

    /// Arm the end-of-session signal
    ///
    /// Armed sessions emit `session_close` exactly once when [`close`] runs.
    ///
    /// [`close`]: TrackingSession::close
    pub fn arm_close_event(&self) {
        self.close_armed.store(true, Ordering::SeqCst);
    }

    /// Whether the end-of-session signal is still pending
    pub fn close_armed(&self) -> bool {
        self.close_armed.load(Ordering::SeqCst)
    }

    /// Emit the end-of-session signal if armed
    ///
    /// Idempotent and best-effort: a second call is a no-op, and delivery
    /// failures are logged and swallowed.
    pub fn close(&self) {
        if !self.close_armed.swap(false, Ordering::SeqCst) {
            return;
        }

        self.track(TrackingEvent::session_close());

        match self.runtime.block_on(self.client.close_session("closed")) {
            Ok(true) => tracing::debug!("Session closed on server"),
            Ok(false) => tracing::debug!("Session already gone on server"),
            Err(e) => tracing::warn!(error = %e, "Failed to close session on server"),
        }
    }
}

/// Process-wide init-once state for the shared session
///
/// The slot transitions from empty to occupied at most once per runtime.
/// The mutex guards the whole check-then-create sequence so concurrent
/// callers cannot race two clients into existence.
pub struct TrackingRuntime {
    slot: Mutex<Option<Arc<TrackingSession>>>,
}

impl TrackingRuntime {
    /// Create an empty runtime
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the shared session, creating it on first success
    ///
    /// Every call re-checks the device store first, so a missing identifier
    /// is re-created even when session setup later fails. Failures are
    /// logged and reported as the absent session; they are not memoized,
    /// so a later call may still succeed.
    pub fn ensure(
        &self,
        store: &dyn DeviceStore,
        config: &ClientConfig,
    ) -> Option<Arc<TrackingSession>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        match init_session(&mut slot, store, config) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::error!(error = %e, "Tracking session initialization failed");
                slot.clone()
            }
        }
    }

    /// The current session, if one has been created
    pub fn get(&self) -> Option<Arc<TrackingSession>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Emit the end-of-session signal through the current session, if any
    pub fn shutdown(&self) {
        if let Some(session) = self.get() {
            session.close();
        }
    }
}

impl Default for TrackingRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Persist the device identifier, then construct the client at most once.
fn init_session(
    slot: &mut Option<Arc<TrackingSession>>,
    store: &dyn DeviceStore,
    config: &ClientConfig,
) -> Result<Arc<TrackingSession>> {
    // The identifier is ensured on every call, before the handle check, so
    // it exists in storage even when client construction fails below.
    let device_id = load_or_create_device_id(store)?;

    if let Some(existing) = slot.as_ref() {
        return Ok(Arc::clone(existing));
    }

    if !config.is_ready() {
        return Err(Error::Config(
            "tracking is disabled or not configured".to_string(),
        ));
    }

    let mut user_properties = UserProperties::new();
    user_properties.insert(
        DEVICE_ID_KEY.to_string(),
        serde_json::Value::String(device_id.clone()),
    );

    let identity = SessionIdentity {
        client_id: config.client_id.clone(),
        session_id: config.session_id.clone(),
        referrer: config.referrer.clone(),
        user_properties,
    };

    let mut client = AnalyticsClient::new(config.clone(), identity)?;
    client.set_log_enabled(false);

    let session = Arc::new(TrackingSession::new(device_id, client)?);
    session.arm_close_event();

    tracing::info!(
        device_id = %session.device_id(),
        session_id = %session.identity().session_id,
        "Tracking session created"
    );

    *slot = Some(Arc::clone(&session));
    Ok(session)
}

/// The process-wide runtime behind [`ensure_tracking_session`]
static TRACKING: TrackingRuntime = TrackingRuntime::new();

/// Ensure the process-wide tracking session exists and return it
///
/// Loads configuration and opens the device store at their default XDG
/// locations. This never fails: on any error the session is simply absent
/// and the application continues untracked.
pub fn ensure_tracking_session() -> Option<Arc<TrackingSession>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration for tracking");
            return TRACKING.get();
        }
    };

    let store = FileStore::new(Config::device_store_path());
    TRACKING.ensure(&store, &config.client)
}

/// Best-effort end-of-session signal for the process-wide session
///
/// Hosts call this when the process is about to terminate (normal exit or
/// interrupt). Safe to call when no session was ever created.
pub fn shutdown_tracking() {
    TRACKING.shutdown();
}
