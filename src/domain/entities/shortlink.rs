//! ShortLink declarative object: desired spec and reconciler-owned status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Desired state declared by an external actor.
///
/// Immutable per generation: any change to the spec bumps the owning
/// object's generation and resets reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLinkSpec {
    /// Short path segment served under `GET /{code}`. Also the object name.
    pub code: String,
    /// Absolute URL the code redirects to.
    pub target: String,
}

/// Condition of a ShortLink as observed by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkCondition {
    /// Not yet reconciled at the current generation.
    #[default]
    Pending,
    /// Target validated and published to the routing table.
    Ready,
    /// Spec failed validation; no route is served for this code.
    Invalid,
}

impl LinkCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Ready => "Ready",
            Self::Invalid => "Invalid",
        }
    }
}

/// Observed state, written back by the reconciler only.
///
/// Invariant: `condition == Ready` implies `resolved_target` is non-empty and
/// was validated against the spec at `last_reconciled_generation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLinkStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_target: Option<String>,
    pub last_reconciled_generation: i64,
    pub condition: LinkCondition,
    /// Human-readable explanation when `condition == Invalid`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ShortLinkStatus {
    /// Status after a successful validation at `generation`.
    pub fn ready(target: String, generation: i64) -> Self {
        Self {
            resolved_target: Some(target),
            last_reconciled_generation: generation,
            condition: LinkCondition::Ready,
            reason: None,
        }
    }

    /// Status after a terminal validation failure at `generation`.
    pub fn invalid(reason: String, generation: i64) -> Self {
        Self {
            resolved_target: None,
            last_reconciled_generation: generation,
            condition: LinkCondition::Invalid,
            reason: Some(reason),
        }
    }
}

/// A declared short link: identity, spec, and observed status.
///
/// The object name equals `spec.code`. The generation starts at 1 and is
/// bumped by the store on every spec change; the reconciler never mutates
/// anything but `status`. `resource_version` is a store-wide monotonic
/// revision stamped on every write -- unlike the generation it never resets,
/// so it orders state across a delete and re-create of the same code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub name: String,
    pub generation: i64,
    #[serde(default)]
    pub resource_version: i64,
    pub created_at: DateTime<Utc>,
    pub spec: ShortLinkSpec,
    #[serde(default)]
    pub status: ShortLinkStatus,
}

impl ShortLink {
    /// Creates a fresh object at generation 1 with a `Pending` status.
    /// The store stamps `resource_version` on insert.
    pub fn new(spec: ShortLinkSpec) -> Self {
        Self {
            name: spec.code.clone(),
            generation: 1,
            resource_version: 0,
            created_at: Utc::now(),
            spec,
            status: ShortLinkStatus::default(),
        }
    }

    /// Returns true when the status reflects the current generation.
    pub fn is_reconciled(&self) -> bool {
        self.status.last_reconciled_generation == self.generation
            && self.status.condition != LinkCondition::Pending
    }
}
