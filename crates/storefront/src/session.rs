//! Ordering-session bootstrap.
//!
//! Binds a visitor at a location to a remote cart. On first use for a
//! location the bootstrap asks the commerce backend for a session, passing
//! along any cart id still held in storage so the backend can resume it.
//!
//! ```text
//! Idle --begin--> Resolving --complete(Ok)--> Resolved
//!                     |      --complete(Err)-> Failed
//!                     +--cancel--> Idle
//! ```
//!
//! A request is identified by its epoch. [`OrderingSession::cancel`] and any
//! newer request bump the epoch, so a reply that arrives late is dropped
//! instead of overwriting fresher state.

use std::collections::BTreeMap;

use crave_core::{CartId, LocationId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commerce::{CommerceApi, CommerceError, StartSessionRequest, StartSessionResponse};
use crate::error::{add_breadcrumb, set_location_tag};
use crate::storage::PersistenceGateway;

/// Bootstrap progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Resolving,
    Resolved,
    Failed,
}

/// An in-flight ordering-session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    epoch: u64,
    /// What to send to the backend.
    pub request: StartSessionRequest,
}

impl SessionTicket {
    /// Request generation this ticket belongs to.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Ordering-session state for one visitor.
#[derive(Debug)]
pub struct OrderingSession {
    gateway: PersistenceGateway,
    location: Option<LocationId>,
    cart_id: Option<CartId>,
    status: SessionStatus,
    notice: Option<String>,
    error: Option<String>,
    epoch: u64,
}

impl OrderingSession {
    /// Create an idle session.
    #[must_use]
    pub const fn new(gateway: PersistenceGateway) -> Self {
        Self {
            gateway,
            location: None,
            cart_id: None,
            status: SessionStatus::Idle,
            notice: None,
            error: None,
            epoch: 0,
        }
    }

    /// Start resolving a cart for `location`.
    ///
    /// Returns `None` without touching the network if a cart is already
    /// held for this location.
    pub fn begin(
        &mut self,
        location: &LocationId,
        search_params: BTreeMap<String, String>,
    ) -> Option<SessionTicket> {
        self.enter(location);

        if self.cart_id.is_some() {
            self.status = SessionStatus::Resolved;
            return None;
        }

        Some(self.issue(location, search_params))
    }

    /// Ask the backend again even if a cart is already held.
    pub fn restart(
        &mut self,
        location: &LocationId,
        search_params: BTreeMap<String, String>,
    ) -> SessionTicket {
        self.enter(location);
        self.issue(location, search_params)
    }

    /// Apply the backend's reply.
    ///
    /// Returns `false` if the ticket was cancelled or superseded.
    pub fn complete(
        &mut self,
        ticket: SessionTicket,
        result: Result<StartSessionResponse, CommerceError>,
    ) -> bool {
        if ticket.epoch != self.epoch || self.status != SessionStatus::Resolving {
            debug!(
                ticket_epoch = ticket.epoch,
                current_epoch = self.epoch,
                "Discarding stale ordering-session reply"
            );
            return false;
        }

        let StartSessionRequest {
            location,
            existing_cart_id,
            ..
        } = ticket.request;
        match result {
            Ok(response) => {
                if let Some(cart_id) = response.cart_id {
                    self.gateway.save_session(&location, &cart_id);
                    info!(location = %location, cart_id = %cart_id, "Ordering session resolved");
                    self.cart_id = Some(cart_id);
                } else {
                    // Keep the binding the request carried; its stored window is left as is.
                    self.cart_id = self.cart_id.take().or(existing_cart_id);
                }
                if let Some(message) = &response.error_message {
                    info!(location = %location, message = %message, "Ordering session notice");
                }
                self.notice = response.error_message;
                self.status = SessionStatus::Resolved;
                add_breadcrumb("session", "resolved", Some(&[("location", location.as_str())]));
            }
            Err(e) => {
                warn!(location = %location, error = %e, "Ordering session failed");
                self.error = Some(e.to_string());
                self.status = SessionStatus::Failed;
                add_breadcrumb("session", "failed", Some(&[("location", location.as_str())]));
            }
        }

        true
    }

    /// Abandon any in-flight request.
    pub const fn cancel(&mut self) {
        self.epoch += 1;
        if matches!(self.status, SessionStatus::Resolving) {
            self.status = SessionStatus::Idle;
        }
    }

    /// Run `begin`, the backend call and `complete` in one go.
    pub async fn bootstrap<A: CommerceApi>(
        &mut self,
        api: &A,
        location: &LocationId,
        search_params: BTreeMap<String, String>,
    ) -> SessionStatus {
        if let Some(ticket) = self.begin(location, search_params) {
            let result = api.start_ordering_session(&ticket.request).await;
            self.complete(ticket, result);
        }
        self.status
    }

    fn enter(&mut self, location: &LocationId) {
        if self.location.as_ref() != Some(location) {
            set_location_tag(location.as_str());
            self.location = Some(location.clone());
            self.cart_id = None;
            self.notice = None;
            self.error = None;
        }
    }

    fn issue(
        &mut self,
        location: &LocationId,
        search_params: BTreeMap<String, String>,
    ) -> SessionTicket {
        self.epoch += 1;
        self.status = SessionStatus::Resolving;
        self.error = None;

        let existing_cart_id = self
            .gateway
            .load_session(location)
            .map(|stored| stored.cart_id);

        SessionTicket {
            epoch: self.epoch,
            request: StartSessionRequest {
                location: location.clone(),
                search_params,
                existing_cart_id,
            },
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Location of the most recent request.
    #[must_use]
    pub const fn location(&self) -> Option<&LocationId> {
        self.location.as_ref()
    }

    /// Cart bound to the current location.
    #[must_use]
    pub const fn cart_id(&self) -> Option<&CartId> {
        self.cart_id.as_ref()
    }

    /// Soft message from the backend.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Why the last request failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::commerce::RemoteCart;
    use crate::storage::{ManualClock, MemoryStore};

    const T0: i64 = 1_700_000_000_000;

    /// Replies with a fixed response and records requests.
    struct ScriptedApi {
        reply: fn() -> Result<StartSessionResponse, CommerceError>,
        requests: Mutex<Vec<StartSessionRequest>>,
    }

    impl ScriptedApi {
        fn new(reply: fn() -> Result<StartSessionResponse, CommerceError>) -> Self {
            Self {
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl CommerceApi for ScriptedApi {
        async fn start_ordering_session(
            &self,
            request: &StartSessionRequest,
        ) -> Result<StartSessionResponse, CommerceError> {
            self.requests.lock().unwrap().push(request.clone());
            (self.reply)()
        }

        async fn get_cart(
            &self,
            _location: &LocationId,
            _cart_id: &CartId,
        ) -> Result<RemoteCart, CommerceError> {
            Err(CommerceError::Api {
                status: 404,
                message: "not found".to_string(),
            })
        }
    }

    fn ok(cart_id: &str) -> Result<StartSessionResponse, CommerceError> {
        Ok(StartSessionResponse {
            cart_id: Some(CartId::new(cart_id)),
            error_message: None,
        })
    }

    fn soft(message: &str) -> Result<StartSessionResponse, CommerceError> {
        Ok(StartSessionResponse {
            cart_id: None,
            error_message: Some(message.to_string()),
        })
    }

    fn failure() -> Result<StartSessionResponse, CommerceError> {
        Err(CommerceError::Api {
            status: 500,
            message: "boom".to_string(),
        })
    }

    fn setup() -> (OrderingSession, PersistenceGateway, ManualClock) {
        let clock = ManualClock::new(T0);
        let gateway = PersistenceGateway::with_clock(MemoryStore::new(), clock.clone());
        (OrderingSession::new(gateway.clone()), gateway, clock)
    }

    fn downtown() -> LocationId {
        LocationId::new("downtown")
    }

    #[test]
    fn test_begin_sends_stored_cart_id() {
        let (mut session, gateway, _) = setup();
        gateway.save_session(&downtown(), &CartId::new("cart-stored"));

        let params = BTreeMap::from([("table".to_string(), "4".to_string())]);
        let ticket = session.begin(&downtown(), params.clone()).unwrap();

        assert_eq!(session.status(), SessionStatus::Resolving);
        assert_eq!(ticket.request.search_params, params);
        assert_eq!(ticket.request.existing_cart_id, Some(CartId::new("cart-stored")));
    }

    #[test]
    fn test_success_persists_and_resolves() {
        let (mut session, gateway, clock) = setup();
        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
        assert_eq!(ticket.request.existing_cart_id, None);

        clock.advance(Duration::from_secs(5));
        assert!(session.complete(ticket, ok("cart-1")));
        assert_eq!(session.status(), SessionStatus::Resolved);
        assert_eq!(session.cart_id(), Some(&CartId::new("cart-1")));

        let stored = gateway.load_session(&downtown()).unwrap();
        assert_eq!(stored.cart_id, CartId::new("cart-1"));
        assert_eq!(stored.timestamp_ms, T0 + 5_000);
    }

    #[test]
    fn test_held_cart_skips_network() {
        let (mut session, _, _) = setup();
        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
        session.complete(ticket, ok("cart-1"));

        assert!(session.begin(&downtown(), BTreeMap::new()).is_none());
        assert_eq!(session.status(), SessionStatus::Resolved);
    }

    #[test]
    fn test_soft_error_without_prior_cart() {
        let (mut session, gateway, _) = setup();
        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();

        assert!(session.complete(ticket, soft("Ordering is paused")));
        assert_eq!(session.status(), SessionStatus::Resolved);
        assert_eq!(session.cart_id(), None);
        assert_eq!(session.notice(), Some("Ordering is paused"));
        assert!(gateway.load_session(&downtown()).is_none());
    }

    #[test]
    fn test_soft_error_keeps_prior_cart() {
        let (mut session, _, _) = setup();
        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
        session.complete(ticket, ok("cart-1"));

        let ticket = session.restart(&downtown(), BTreeMap::new());
        assert_eq!(ticket.request.existing_cart_id, Some(CartId::new("cart-1")));
        session.complete(ticket, soft("Kitchen closing soon"));

        assert_eq!(session.cart_id(), Some(&CartId::new("cart-1")));
        assert_eq!(session.notice(), Some("Kitchen closing soon"));
    }

    #[test]
    fn test_soft_error_keeps_stored_binding() {
        let (mut session, gateway, clock) = setup();
        gateway.save_session(&downtown(), &CartId::new("cart-prior"));
        clock.advance(Duration::from_secs(3600));

        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
        assert!(session.complete(ticket, soft("Location closed")));

        assert_eq!(session.status(), SessionStatus::Resolved);
        assert_eq!(session.cart_id(), Some(&CartId::new("cart-prior")));
        assert_eq!(session.notice(), Some("Location closed"));

        let stored = gateway.load_session(&downtown()).unwrap();
        assert_eq!(stored.cart_id, CartId::new("cart-prior"));
        assert_eq!(stored.timestamp_ms, T0);
    }

    #[test]
    fn test_failure_keeps_resolved_cart() {
        let (mut session, _, _) = setup();
        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
        session.complete(ticket, ok("cart-1"));

        let ticket = session.restart(&downtown(), BTreeMap::new());
        session.complete(ticket, failure());

        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.error(), Some("API error: 500 - boom"));
        assert_eq!(session.cart_id(), Some(&CartId::new("cart-1")));
    }

    #[test]
    fn test_cancelled_reply_is_discarded() {
        let (mut session, gateway, _) = setup();
        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();

        session.cancel();
        assert_eq!(session.status(), SessionStatus::Idle);

        assert!(!session.complete(ticket, ok("cart-late")));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.cart_id(), None);
        assert!(gateway.load_session(&downtown()).is_none());
    }

    #[test]
    fn test_superseded_reply_is_discarded() {
        let (mut session, _, _) = setup();
        let first = session.begin(&downtown(), BTreeMap::new()).unwrap();
        let second = session.restart(&downtown(), BTreeMap::new());

        assert!(!session.complete(first, ok("cart-old")));
        assert!(session.complete(second, ok("cart-new")));
        assert_eq!(session.cart_id(), Some(&CartId::new("cart-new")));
    }

    #[test]
    fn test_changing_location_resets_cart() {
        let (mut session, _, _) = setup();
        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
        session.complete(ticket, ok("cart-1"));

        let uptown = LocationId::new("uptown");
        let ticket = session.begin(&uptown, BTreeMap::new()).unwrap();
        assert_eq!(session.cart_id(), None);
        assert_eq!(ticket.request.existing_cart_id, None);
        assert_eq!(session.location(), Some(&uptown));
    }

    #[test]
    fn test_expired_stored_session_is_not_sent() {
        let (mut session, gateway, clock) = setup();
        gateway.save_session(&downtown(), &CartId::new("cart-stale"));
        clock.advance(Duration::from_secs(24 * 3600 + 60));

        let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
        assert_eq!(ticket.request.existing_cart_id, None);
    }

    #[tokio::test]
    async fn test_bootstrap_resolves_once() {
        let (mut session, _, _) = setup();
        let api = ScriptedApi::new(|| ok("cart-1"));

        let status = session.bootstrap(&api, &downtown(), BTreeMap::new()).await;
        assert_eq!(status, SessionStatus::Resolved);

        let status = session.bootstrap(&api, &downtown(), BTreeMap::new()).await;
        assert_eq!(status, SessionStatus::Resolved);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_failure_is_not_retried() {
        let (mut session, _, _) = setup();
        let api = ScriptedApi::new(failure);

        let status = session.bootstrap(&api, &downtown(), BTreeMap::new()).await;
        assert_eq!(status, SessionStatus::Failed);
        assert_eq!(api.calls(), 1);
        assert!(session.error().is_some());
    }
}
