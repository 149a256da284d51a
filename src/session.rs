//! Client-side session: sequence gating and local-edit reconciliation
//!
//! A [`Session`] tracks one state machine per open document. Incoming
//! messages are gated by sequence number: stale ones are dropped, gapped
//! ones buffered until the gap fills, and in-order mutations are
//! transformed against whatever local edits have not been acknowledged
//! yet. Outgoing edits follow a one-in-flight discipline: while a mutation
//! waits for its acknowledgement, later edits queue up and coalesce, so a
//! fast typist sends one composed mutation per round trip instead of one
//! per keystroke.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::ot::{compose, transform, Envelope, Mutation, Operation};
use crate::DocumentId;

/// Per-document state: the next expected sequence number, out-of-order
/// buffer, and the unacknowledged local edits.
#[derive(Debug, Default)]
pub struct PermaState {
    doc: DocumentId,
    next_seq: u64,
    pending: HashMap<u64, Envelope>,
    outgoing: VecDeque<Mutation>,
    in_flight: Option<Mutation>,
}

impl PermaState {
    pub fn new(doc: DocumentId) -> Self {
        Self {
            doc,
            ..Self::default()
        }
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// The submitted mutation still waiting for its acknowledgement
    pub fn in_flight(&self) -> Option<&Mutation> {
        self.in_flight.as_ref()
    }

    /// Accept one message, returning every message that is now deliverable
    /// in sequence order. Mutations come out already transformed against
    /// the unacknowledged local edits.
    pub fn receive(&mut self, envelope: Envelope) -> Vec<Envelope> {
        let seq = envelope.seq();
        if seq < self.next_seq {
            debug!(
                doc = %self.doc,
                seq,
                next = self.next_seq,
                "dropping stale or duplicate message"
            );
            return Vec::new();
        }
        self.pending.insert(seq, envelope);

        let mut ready = Vec::new();
        while let Some(mut envelope) = self.pending.remove(&self.next_seq) {
            self.next_seq += 1;
            if let Envelope::Mutation(mutation) = &mut envelope {
                self.reconcile(mutation);
            }
            ready.push(envelope);
        }
        ready
    }

    /// Transform a remote mutation against every unacknowledged local edit
    /// on the same target, adjusting the local edits in the same pass. The
    /// remote op is stream 1: the server's ordering wins position ties.
    fn reconcile(&mut self, remote: &mut Mutation) {
        let locals = self.in_flight.iter_mut().chain(self.outgoing.iter_mut());
        for local in locals {
            if !local.same_target(remote) {
                continue;
            }
            match transform(&remote.op, &local.op) {
                Ok((remote_op, local_op)) => {
                    remote.op = remote_op;
                    local.op = local_op;
                }
                Err(err) => {
                    warn!(
                        doc = %self.doc,
                        entity = %remote.entity,
                        %err,
                        "remote mutation does not align with local edits, dropping its effect"
                    );
                    remote.op = Operation::empty();
                    return;
                }
            }
        }
    }

    /// Submit a local edit. Returns the mutation to send now, stamped with
    /// its proposed sequence number, or `None` when one is already in
    /// flight and the edit was queued.
    pub fn submit(&mut self, mut mutation: Mutation) -> Option<Mutation> {
        if self.in_flight.is_some() {
            self.enqueue(mutation);
            return None;
        }
        mutation.seq = self.next_seq;
        self.in_flight = Some(mutation.clone());
        Some(mutation)
    }

    fn enqueue(&mut self, mutation: Mutation) {
        if let Some(back) = self.outgoing.back_mut() {
            if back.same_target(&mutation) {
                match compose(&back.op, &mutation.op) {
                    Ok(op) => {
                        back.op = op;
                        return;
                    }
                    Err(err) => {
                        warn!(
                            doc = %self.doc,
                            entity = %mutation.entity,
                            %err,
                            "queued edits do not compose, sending separately"
                        );
                    }
                }
            }
        }
        self.outgoing.push_back(mutation);
    }

    /// Record the server's acknowledgement of the in-flight mutation at
    /// `seq`. Returns the next queued mutation to send, if any.
    pub fn acknowledge(&mut self, seq: u64) -> Option<Mutation> {
        self.next_seq = self.next_seq.max(seq + 1);
        self.in_flight = None;
        let mut next = self.outgoing.pop_front()?;
        next.seq = self.next_seq;
        self.in_flight = Some(next.clone());
        Some(next)
    }
}

/// All open documents of one client connection
#[derive(Debug, Default)]
pub struct Session {
    permas: HashMap<DocumentId, PermaState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state for one document, created on first use
    pub fn perma(&mut self, doc: &str) -> &mut PermaState {
        self.permas
            .entry(doc.to_string())
            .or_insert_with(|| PermaState::new(doc.to_string()))
    }

    /// Route one incoming message to its document's state machine
    pub fn receive(&mut self, envelope: Envelope) -> Vec<Envelope> {
        let doc = envelope.perma().to_string();
        self.perma(&doc).receive(envelope)
    }

    /// Submit a local edit to its document's state machine
    pub fn submit(&mut self, mutation: Mutation) -> Option<Mutation> {
        let doc = mutation.perma.clone();
        self.perma(&doc).submit(mutation)
    }

    /// Acknowledge the in-flight mutation for `doc` at `seq`
    pub fn acknowledge(&mut self, doc: &str, seq: u64) -> Option<Mutation> {
        self.permas.get_mut(doc)?.acknowledge(seq)
    }
}
