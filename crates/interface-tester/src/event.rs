//! Event normalization.
//!
//! Contract test cases describe the event to fire either as a name shorthand
//! (`"db-relation-joined"`) or as a structured [`Event`]. Both are parsed once
//! into [`RawEvent`] at the contract boundary and normalized here into a
//! canonical [`Event`] bound to the scenario's relation under test.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TesterError, TesterResult};
use crate::types::Relation;

/// Marker separating endpoint and kind in relation event shorthand.
pub const RELATION_EVENT_MARKER: &str = "-relation-";

// ── Event kinds ────────────────────────────────────────────────────────

/// Lifecycle stage of a relation event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationEventKind {
    Created,
    Joined,
    Changed,
    Departed,
    Broken,
    /// Any other suffix following the relation marker.
    Other(String),
}

impl RelationEventKind {
    /// Parse the suffix after the relation marker.
    pub fn parse(suffix: &str) -> Self {
        match suffix {
            "created" => Self::Created,
            "joined" => Self::Joined,
            "changed" => Self::Changed,
            "departed" => Self::Departed,
            "broken" => Self::Broken,
            other => Self::Other(other.to_string()),
        }
    }

    /// The suffix as it appears in event names.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Joined => "joined",
            Self::Changed => "changed",
            Self::Departed => "departed",
            Self::Broken => "broken",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for RelationEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relation-{}", self.as_str())
    }
}

/// Whether an event concerns a relation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A relation lifecycle event fired on `endpoint`.
    Relation {
        endpoint: String,
        kind: RelationEventKind,
    },
    /// Anything else (`start`, `update-status`, ...).
    Other,
}

/// Underscored spelling of [`RELATION_EVENT_MARKER`], accepted when
/// classifying structured events.
const UNDERSCORE_RELATION_MARKER: &str = "_relation_";

/// Split shorthand `<endpoint>-relation-<kind>` into its parts.
///
/// Returns `None` unless both parts are non-empty. Only the dashed marker
/// counts; `db_relation_changed` is not a shorthand relation event.
pub fn split_relation_event(name: &str) -> Option<(String, RelationEventKind)> {
    split_on(name, RELATION_EVENT_MARKER)
}

fn split_on(name: &str, marker: &str) -> Option<(String, RelationEventKind)> {
    let (endpoint, kind) = name.rsplit_once(marker)?;
    if endpoint.is_empty() || kind.is_empty() {
        return None;
    }
    Some((endpoint.to_string(), RelationEventKind::parse(kind)))
}

// ── Canonical event ────────────────────────────────────────────────────

/// Canonical event fired at the implementation under test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    /// Event name.
    pub name: String,
    /// Relation the event is bound to (relation events only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
}

impl Event {
    /// A non-relation event.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation: None,
        }
    }

    /// An event bound to a relation.
    pub fn with_relation(name: impl Into<String>, relation: Relation) -> Self {
        Self {
            name: name.into(),
            relation: Some(relation),
        }
    }

    /// Classify this event by name.
    pub fn kind(&self) -> EventKind {
        let parts = split_relation_event(&self.name)
            .or_else(|| split_on(&self.name, UNDERSCORE_RELATION_MARKER));
        match parts {
            Some((endpoint, kind)) => EventKind::Relation { endpoint, kind },
            None => EventKind::Other,
        }
    }

    /// Whether the name denotes a relation event.
    pub fn is_relation_event(&self) -> bool {
        matches!(self.kind(), EventKind::Relation { .. })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relation {
            Some(relation) => write!(f, "{} [{}]", self.name, relation),
            None => f.write_str(&self.name),
        }
    }
}

// ── Raw event ──────────────────────────────────────────────────────────

/// Event description as written in a contract test case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEvent {
    /// Name shorthand, possibly implying an endpoint.
    Name(String),
    /// Already-structured event.
    Structured(Event),
    /// Anything else; always rejected by [`normalize`].
    Unrecognized(serde_json::Value),
}

impl From<&str> for RawEvent {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for RawEvent {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        Self::Structured(event)
    }
}

/// Normalize a raw event against the scenario's relation under test.
///
/// Shorthand relation events get a copy of `relation` rebound to the endpoint
/// named in the shorthand. Structured relation events must already carry
/// their relation.
pub fn normalize(raw: &RawEvent, relation: &Relation) -> TesterResult<Event> {
    match raw {
        RawEvent::Name(name) => match split_relation_event(name) {
            Some((endpoint, _)) => Ok(Event::with_relation(
                name.clone(),
                relation.rebound_to(endpoint),
            )),
            None => Ok(Event::new(name.clone())),
        },
        RawEvent::Structured(event) => {
            if event.is_relation_event() && event.relation.is_none() {
                return Err(TesterError::InvalidTestCase(format!(
                    "event '{}' is a relation event but carries no relation; \
                     attach one explicitly, e.g. {{\"name\": \"{}\", \"relation\": {{...}}}}",
                    event.name, event.name
                )));
            }
            Ok(event.clone())
        }
        RawEvent::Unrecognized(value) => Err(TesterError::InvalidTestCase(format!(
            "expected an event name or a structured event, not: {}",
            value
        ))),
    }
}
