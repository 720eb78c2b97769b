//! Session State Store.
//!
//! A [`Session`] exists per unordered endpoint pair and per setup event. It
//! owns one [`DirectionState`] for each direction. Sessions are created on
//! first use, mutated in place, and live as long as the owning
//! [`SessionStore`]; there is no deletion API.
//!
//! A pair may be renegotiated during a capture. Each setup registration
//! opens a new session, and units are routed to the most recent session
//! created at or before their capture index, so a second pass over earlier
//! units still reaches the session they originally belonged to.

mod direction;
mod history;

use std::{collections::HashMap, fmt, net::SocketAddr};

pub use direction::{Direction, DirectionState, TransferState};
pub use history::{Snapshot, StateHistory};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::unit::{EndpointPair, UnitId};

/// Direction-independent identity of an endpoint pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    low: SocketAddr,
    high: SocketAddr,
}

impl SessionKey {
    /// Normalise `endpoints` so both directions map to the same key.
    #[must_use]
    pub fn new(endpoints: EndpointPair) -> Self {
        let (low, high) = if endpoints.src <= endpoints.dst {
            (endpoints.src, endpoints.dst)
        } else {
            (endpoints.dst, endpoints.src)
        };
        Self { low, high }
    }
}

impl From<EndpointPair> for SessionKey {
    fn from(value: EndpointPair) -> Self { Self::new(value) }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.low, self.high)
    }
}

/// How and where a session was negotiated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupInfo {
    /// Signalling method, for example `"SDP"` or `"H.245"`.
    pub method: String,
    /// Unit that carried the negotiation.
    pub unit: UnitId,
}

/// Both directions of one endpoint pair for one setup event.
#[derive(Clone, Debug)]
pub struct Session {
    key: SessionKey,
    created_at: UnitId,
    initiator: SocketAddr,
    setup: Option<SetupInfo>,
    forward: DirectionState,
    reverse: DirectionState,
}

impl Session {
    fn new(endpoints: EndpointPair, created_at: UnitId) -> Self {
        Self {
            key: SessionKey::new(endpoints),
            created_at,
            initiator: endpoints.src,
            setup: None,
            forward: DirectionState::default(),
            reverse: DirectionState::default(),
        }
    }

    /// Endpoint-pair identity.
    #[must_use]
    pub const fn key(&self) -> SessionKey { self.key }

    /// Unit at which the session was created.
    #[must_use]
    pub const fn created_at(&self) -> UnitId { self.created_at }

    /// Endpoint whose units travel [`Direction::Forward`].
    #[must_use]
    pub const fn initiator(&self) -> SocketAddr { self.initiator }

    /// Negotiation details, when a setup was registered.
    #[must_use]
    pub fn setup(&self) -> Option<&SetupInfo> { self.setup.as_ref() }

    /// Direction of a unit travelling between `endpoints`.
    #[must_use]
    pub fn direction_of(&self, endpoints: EndpointPair) -> Direction {
        if endpoints.src == self.initiator {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Borrow the state for `direction`.
    #[must_use]
    pub const fn state(&self, direction: Direction) -> &DirectionState {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Reverse => &self.reverse,
        }
    }

    /// Mutably borrow the state for `direction`.
    pub fn state_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::Forward => &mut self.forward,
            Direction::Reverse => &mut self.reverse,
        }
    }
}

/// Store of sessions keyed by endpoint pair.
///
/// # Examples
///
/// ```
/// use faxframe::{
///     session::{Direction, SessionStore},
///     unit::{EndpointPair, UnitId},
/// };
///
/// let pair = EndpointPair::new(
///     "10.0.0.1:4000".parse().expect("addr"),
///     "10.0.0.2:5000".parse().expect("addr"),
/// );
/// let mut store = SessionStore::new();
/// let created = store.lookup_or_create(pair, UnitId::new(1)).created_at();
/// let session = store.lookup_or_create(pair.reversed(), UnitId::new(2));
/// assert_eq!(session.created_at(), created);
/// assert_eq!(session.direction_of(pair.reversed()), Direction::Reverse);
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionKey, Vec<Session>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Return the session `unit` belongs to, creating it on first use.
    ///
    /// The session chosen is the most recent one created at or before
    /// `unit`. A new session starts with both directions idle.
    pub fn lookup_or_create(&mut self, endpoints: EndpointPair, unit: UnitId) -> &mut Session {
        let key = SessionKey::new(endpoints);
        let generations = self.sessions.entry(key).or_default();
        let position = generations.partition_point(|session| session.created_at <= unit);
        if position == 0 {
            debug!("session created: key={key}, unit={unit}");
            generations.insert(0, Session::new(endpoints, unit));
            return &mut generations[0];
        }
        &mut generations[position - 1]
    }

    /// Record a setup event for `endpoints`, opening a new session at
    /// `setup.unit`.
    ///
    /// Registering twice for the same unit updates the existing session.
    pub fn register_setup(&mut self, endpoints: EndpointPair, setup: SetupInfo) -> &mut Session {
        let key = SessionKey::new(endpoints);
        let unit = setup.unit;
        let generations = self.sessions.entry(key).or_default();
        let position = generations.partition_point(|session| session.created_at < unit);
        let exists = generations
            .get(position)
            .is_some_and(|session| session.created_at == unit);
        if !exists {
            debug!("session created by setup: key={key}, unit={unit}, method={}", setup.method);
            generations.insert(position, Session::new(endpoints, unit));
        }
        let session = &mut generations[position];
        session.setup = Some(setup);
        session
    }

    /// Return the session `unit` would be routed to, without creating one.
    #[must_use]
    pub fn get(&self, endpoints: EndpointPair, unit: UnitId) -> Option<&Session> {
        let generations = self.sessions.get(&SessionKey::new(endpoints))?;
        let position = generations.partition_point(|session| session.created_at <= unit);
        position.checked_sub(1).and_then(|index| generations.get(index))
    }

    /// Total number of sessions across all endpoint pairs.
    #[must_use]
    pub fn len(&self) -> usize { self.sessions.values().map(Vec::len).sum() }

    /// Whether no session has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.sessions.is_empty() }
}
