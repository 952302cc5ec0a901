use std::collections::{BTreeMap, BTreeSet};

use rtlopt_netlist::{CellId, Module, NetlistError, SigBit, SigMap};

use crate::mux::{MuxIndex, MuxPorts};

/// A partial assignment of select lines to values.
pub type State = BTreeMap<SigBit, bool>;

/// The select line assignment under which a traced bit was found to equal a feedback bit.
pub type Condition = State;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Matched,
    NotMatched,
}

/// A single bit of a multiplexer operand port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OperandBit {
    pub cell: CellId,
    pub port: &'static str,
    pub lane: usize,
}

/// Everything a [`FeedbackTracer`] found below one write data bit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traced {
    pub conditions: BTreeSet<Condition>,
    /// Operand bits that carried a feedback bit.
    pub feedback: BTreeSet<OperandBit>,
    /// Operand bits on any consistent path, whether or not they matched.
    pub visited: BTreeSet<OperandBit>,
}

/// Extends `state` with `select = value`, or returns `None` if `state` already fixes `select`
/// to the opposite value.
fn assume(state: &State, select: SigBit, value: bool) -> Option<State> {
    match state.get(&select) {
        Some(&fixed) if fixed != value => None,
        Some(_) => Some(state.clone()),
        None => {
            let mut state = state.clone();
            state.insert(select, value);
            Some(state)
        }
    }
}

/// Walks a multiplexer tree backwards from one write data bit, looking for the paths along which
/// the bit is just a copy of an accepted read data bit.
///
/// Multiplexers are interpreted with priority semantics: operand `B[i]` is selected when `S[i]`
/// is high and every `S[j]` with `j < i` is low, and `A` is selected when all select lines are
/// low.  Every path that reaches a target records its full select line assignment as a
/// [`Condition`], and the operand bit that reached the target is recorded as feedback.  The
/// module is not changed; the caller decides which operand bits become `x` once every write
/// port sharing the tree has been traced.
pub struct FeedbackTracer<'a> {
    module: &'a Module,
    sigmap: &'a SigMap,
    muxes: &'a MuxIndex,
    targets: &'a BTreeSet<SigBit>,
    traced: Traced,
}

impl<'a> FeedbackTracer<'a> {
    pub(crate) fn new(
        module: &'a Module,
        sigmap: &'a SigMap,
        muxes: &'a MuxIndex,
        targets: &'a BTreeSet<SigBit>,
    ) -> FeedbackTracer<'a> {
        FeedbackTracer { module, sigmap, muxes, targets, traced: Traced::default() }
    }

    /// Traces the canonical bit `bit` under `state`.  Only a bit that is itself a target matches;
    /// matches deeper in the tree are recorded as conditions but are not reported upwards.
    pub fn trace(&mut self, bit: SigBit, state: &State) -> Result<MatchResult, NetlistError> {
        if self.targets.contains(&bit) {
            log::trace!("Feedback found under {state:?}.");
            self.traced.conditions.insert(state.clone());
            return Ok(MatchResult::Matched);
        }

        let Some((cell_id, lane)) = self.muxes.driver(bit) else {
            return Ok(MatchResult::NotMatched);
        };
        let ports = MuxPorts::read(self.module.cell(cell_id), self.sigmap)?;
        assert_eq!(ports.y[lane], bit, "multiplexer index is out of date");
        log::trace!("Tracing through {} lane {lane}.", self.module.cell(cell_id).name);

        let mut prefix = state.clone();
        for (select_index, select) in ports.s.iter().enumerate() {
            if let Some(branch) = assume(&prefix, select, true) {
                let b_index = ports.b_index(lane, select_index);
                self.operand(OperandBit { cell: cell_id, port: "B", lane: b_index }, ports.b[b_index], &branch)?;
            }
            match assume(&prefix, select, false) {
                Some(next) => prefix = next,
                None => return Ok(MatchResult::NotMatched),
            }
        }

        self.operand(OperandBit { cell: cell_id, port: "A", lane }, ports.a[lane], &prefix)?;
        Ok(MatchResult::NotMatched)
    }

    fn operand(&mut self, operand: OperandBit, bit: SigBit, state: &State) -> Result<(), NetlistError> {
        self.traced.visited.insert(operand);
        if self.trace(bit, state)? == MatchResult::Matched {
            self.traced.feedback.insert(operand);
        }
        Ok(())
    }

    pub fn traced(&self) -> &Traced {
        &self.traced
    }

    pub fn finish(self) -> Traced {
        self.traced
    }
}
