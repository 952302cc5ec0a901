use std::collections::{BTreeMap, BTreeSet};

use rtlopt_netlist::{Module, SigBit, SigSpec};

use crate::trace::Condition;

/// Builds write enable logic that is low whenever the select lines match one of a set of
/// feedback conditions, and follows the original enable otherwise.
///
/// Results are cached per module by condition set and original enable, so write data bits that
/// share both also share the generated logic.
#[derive(Debug, Default)]
pub struct ConditionSynthesizer {
    cache: BTreeMap<(BTreeSet<Condition>, SigBit), SigBit>,
}

/// The output of [`ConditionSynthesizer::synthesize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synthesized {
    pub enable: SigBit,
    /// Number of `$ne` comparators built; zero when the result came from the cache.
    pub created_conditions: usize,
}

impl ConditionSynthesizer {
    pub fn new() -> ConditionSynthesizer {
        ConditionSynthesizer::default()
    }

    pub fn synthesize(&mut self, module: &mut Module, conditions: &BTreeSet<Condition>, enable: SigBit) -> Synthesized {
        let key = (conditions.clone(), enable);
        if let Some(&enable) = self.cache.get(&key) {
            return Synthesized { enable, created_conditions: 0 };
        }

        let mut terms = SigSpec::new();
        for condition in conditions {
            let selects = SigSpec::from_iter(condition.keys().copied());
            let values = SigSpec::from_iter(condition.values().map(|&value| SigBit::from(value)));
            terms.push(module.add_ne(selects, values));
        }
        if enable != SigBit::ONE {
            terms.push(enable);
        }

        let result = match terms.as_bit() {
            Some(term) => term,
            None if terms.is_empty() => SigBit::ONE,
            None => module.add_reduce_and(terms),
        };
        self.cache.insert(key, result);
        Synthesized { enable: result, created_conditions: conditions.len() }
    }
}
