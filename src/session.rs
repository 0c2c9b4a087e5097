//! Session gate: the single owner of authentication state for the view layer.
//!
//! Three phases — `Loading` until the auth collaborator's first callback,
//! then `Authenticated` or `Unauthenticated`. The gate never times out on its
//! own; it waits for the collaborator. Consumers subscribe for changes and
//! ask the gate for route decisions instead of reading a global.

use parking_lot::{Mutex, RwLock};

use crate::auth::{AuthClient, Capabilities, Session};
use crate::types::Profile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Point-in-time view of the gate's state. Always re-read through
/// [`SessionGate::snapshot`] inside asynchronous callbacks — never compare
/// against a copy captured before an await.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
}

/// What kind of view is asking for a navigation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Requires an authenticated session (the plan and user tables).
    Protected,
    /// Only makes sense without one (the login view).
    PublicOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Still loading: render a placeholder, decide nothing yet.
    Wait,
    Allow,
    RedirectToLogin,
    RedirectAway,
}

type Subscriber = Box<dyn Fn(&SessionSnapshot) + Send + Sync>;

#[derive(Default)]
pub struct SessionGate {
    state: RwLock<SessionSnapshot>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.read().phase
    }

    /// Register a subscriber. It is invoked immediately with the current
    /// state, then again on every change.
    pub fn subscribe(&self, subscriber: Subscriber) {
        subscriber(&self.snapshot());
        self.subscribers.lock().push(subscriber);
    }

    /// Drive a transition from the auth collaborator's session callback.
    pub fn handle_session_change(&self, session: Option<Session>) {
        {
            let mut state = self.state.write();
            match session {
                Some(session) => {
                    state.phase = SessionPhase::Authenticated;
                    state.session = Some(session);
                }
                None => {
                    state.phase = SessionPhase::Unauthenticated;
                    state.session = None;
                    state.profile = None;
                }
            }
        }
        self.notify();
    }

    /// Attach the profile fetched after sign-in.
    pub fn set_profile(&self, profile: Option<Profile>) {
        self.state.write().profile = profile;
        self.notify();
    }

    /// Resolve the capability object for the current session. Loading and
    /// unauthenticated states have no capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.state
            .read()
            .session
            .as_ref()
            .map(Capabilities::for_session)
            .unwrap_or_default()
    }

    /// Navigation decision for a route, given the current phase.
    pub fn decide(&self, route: Route) -> RouteDecision {
        match (self.phase(), route) {
            (SessionPhase::Loading, _) => RouteDecision::Wait,
            (SessionPhase::Authenticated, Route::PublicOnly) => RouteDecision::RedirectAway,
            (SessionPhase::Authenticated, Route::Protected) => RouteDecision::Allow,
            (SessionPhase::Unauthenticated, Route::Protected) => RouteDecision::RedirectToLogin,
            (SessionPhase::Unauthenticated, Route::PublicOnly) => RouteDecision::Allow,
        }
    }

    fn notify(&self) {
        // Snapshot first so subscribers run without the state lock held.
        let snapshot = self.snapshot();
        for subscriber in self.subscribers.lock().iter() {
            subscriber(&snapshot);
        }
    }
}

/// Wire a gate to an auth client: seed it with the current session and keep
/// it in sync with every change. The gate stays in `Loading` until the
/// client's state is known.
pub fn bind_gate(gate: std::sync::Arc<SessionGate>, auth: &AuthClient) {
    let gate_for_listener = gate.clone();
    auth.on_session_change(Box::new(move |session| {
        gate_for_listener.handle_session_change(session.cloned());
    }));
    gate.handle_session_change(auth.current_session());
}
