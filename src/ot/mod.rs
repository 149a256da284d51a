//! Operational transformation over tombstone-aware character sequences
//!
//! # Pieces
//!
//! - **TombSequence / TombCursor**: run-length buffer of live and buried
//!   characters, with a stateful cursor for insert/bury/skip walks
//! - **Executor**: applies an op list to a text buffer, reporting
//!   paragraph-level change events
//! - **Op-stream readers**: lock-step alignment of two op lists by content
//!   position, shared by compose and transform
//! - **Composer**: collapses two sequentially-applied ops into one
//! - **Transformer**: adjusts two concurrent ops so either application order
//!   converges
//!
//! Ops address *raw* positions: every live and every buried character counts
//! one unit. That is what keeps offsets stable across concurrent deletes,
//! since a delete buries characters instead of removing their positions.

mod compose;
mod execute;
mod mutation;
mod op;
mod stream;
mod tombs;
mod transform;

pub use compose::compose;
pub use execute::{
    execute, MutationPass, ParagraphEvent, ParagraphText, Position, SimpleText,
};
pub use mutation::{Envelope, Mutation, Record};
pub use op::{Operation, TextOp};
pub use stream::{ComposeReader, OpPair, OpStream, TransformReader};
pub use tombs::{TombCursor, TombSequence, TombWalker};
pub use transform::transform;
