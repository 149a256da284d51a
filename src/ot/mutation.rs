//! Wire messages: mutations and the envelope they travel in
//!
//! Every message on a document channel is a JSON object tagged by `type`
//! and carrying the document id (`perma`) and a server-assigned sequence
//! number. Mutations are the only kind this core interprets; the other
//! kinds are passed through as opaque records so the session layer can
//! still order and deliver them.

use crate::ot::op::Operation;
use crate::{DocumentId, EntityId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One edit to one field of one entity in a document.
///
/// `seq` is 0 until the server assigns a slot; the session layer stamps
/// outgoing mutations on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub perma: DocumentId,
    pub entity: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub seq: u64,
    pub op: Operation,
}

impl Mutation {
    /// True when both mutations address the same field of the same entity
    pub fn same_target(&self, other: &Mutation) -> bool {
        self.entity == other.entity && self.field == other.field
    }
}

/// A non-mutation message: ordered and delivered but never interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub perma: DocumentId,
    #[serde(default)]
    pub seq: u64,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Any message on a document channel, tagged by its `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Mutation(Mutation),
    Entity(Record),
    Keep(Record),
    Permission(Record),
}

impl Envelope {
    pub fn perma(&self) -> &str {
        match self {
            Envelope::Mutation(m) => &m.perma,
            Envelope::Entity(r) | Envelope::Keep(r) | Envelope::Permission(r) => &r.perma,
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            Envelope::Mutation(m) => m.seq,
            Envelope::Entity(r) | Envelope::Keep(r) | Envelope::Permission(r) => r.seq,
        }
    }
}
