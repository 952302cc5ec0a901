//! Memory optimization passes.
//!
//! Memories are represented the way Yosys represents them before `memory_collect`: a memory is
//! a set of `$memrd` and `$memwr` cells sharing a `MEMID` parameter.
//!
//! [`opt_mem_feedback`] finds asynchronous read ports whose data only ever flows, through trees
//! of `$mux` and `$pmux` cells, back into a write port at the same address.  Along such a path
//! the write stores the value the memory already holds, so it can be suppressed instead:
//!
//! - for each memory:
//!   - the bits that are observable outside of the memory's own write data are computed, by
//!     closing the set of directly used bits backwards through multiplexer operands
//!   - asynchronous read ports none of whose data bits are observable are indexed by address
//!   - for each write port whose address matches one of those read ports (looking through
//!     `$mux` cells that have one fully undefined operand):
//!     - each data bit is traced backwards through the multiplexer tree, collecting every select
//!       line assignment under which the bit is a copy of the read data at the same position
//!     - the enable bit is replaced with logic that is low under any of those assignments
//!   - the multiplexer operands that carried the read data are replaced with `x`, unless some
//!     write data bit of the memory also reaches them without matching

mod mux;
mod reachability;
mod classify;
mod trace;
mod synth;
mod feedback;

pub use trace::{Condition, State};
pub use synth::{ConditionSynthesizer, Synthesized};
pub use feedback::{opt_mem_feedback, opt_mem_feedback_module, FeedbackStats};
