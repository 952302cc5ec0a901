use std::collections::BTreeMap;

use crate::{Module, SigBit, SigSpec};

/// Maps signal bits to a canonical representative of their connectivity class.
///
/// Every class has exactly one representative.  When two classes are merged with
/// [`SigMap::add`], the representative of the second argument wins, except that a constant
/// always stays the representative of its class.  Two distinct constants are never merged.
#[derive(Debug, Clone, Default)]
pub struct SigMap {
    parent: BTreeMap<SigBit, SigBit>,
    members: BTreeMap<SigBit, Vec<SigBit>>,
}

impl SigMap {
    pub fn new() -> SigMap {
        SigMap::default()
    }

    /// Builds a map from the connections of `module`.
    pub fn from_module(module: &Module) -> SigMap {
        let mut sigmap = SigMap::new();
        for (lhs, rhs) in module.connections() {
            sigmap.add(lhs, rhs);
        }
        sigmap
    }

    pub fn add(&mut self, from: &SigSpec, to: &SigSpec) {
        assert_eq!(from.len(), to.len());
        for (from_bit, to_bit) in from.iter().zip(to.iter()) {
            self.add_bit(from_bit, to_bit);
        }
    }

    pub fn add_bit(&mut self, from: SigBit, to: SigBit) {
        let from_rep = self.apply_bit(from);
        let to_rep = self.apply_bit(to);
        if from_rep == to_rep || (from_rep.is_const() && to_rep.is_const()) {
            return;
        }
        let (keep, merge) = if from_rep.is_const() { (from_rep, to_rep) } else { (to_rep, from_rep) };
        let moved = self.members.remove(&merge).unwrap_or_else(|| vec![merge]);
        for &bit in &moved {
            self.parent.insert(bit, keep);
        }
        self.members.entry(keep).or_insert_with(|| vec![keep]).extend(moved);
    }

    pub fn apply_bit(&self, bit: SigBit) -> SigBit {
        self.parent.get(&bit).copied().unwrap_or(bit)
    }

    pub fn apply(&self, sig: &SigSpec) -> SigSpec {
        SigSpec::from_iter(sig.iter().map(|bit| self.apply_bit(bit)))
    }
}

#[cfg(test)]
mod test {
    use crate::{Module, SigBit, SigMap};

    #[test]
    fn test_second_argument_wins() {
        let mut module = Module::new("top");
        let a = module.add_wire("a", 1);
        let b = module.add_wire("b", 1);
        let c = module.add_wire("c", 1);
        let mut sigmap = SigMap::new();
        sigmap.add(&a, &b);
        assert_eq!(sigmap.apply(&a), b);
        sigmap.add(&c, &a);
        assert_eq!(sigmap.apply(&c), b);
        assert_eq!(sigmap.apply(&b), b);
    }

    #[test]
    fn test_constants_win() {
        let mut module = Module::new("top");
        let a = module.add_wire("a", 2);
        let b = module.add_wire("b", 2);
        let mut sigmap = SigMap::new();
        sigmap.add_bit(SigBit::ONE, a[0]);
        sigmap.add(&a, &b);
        assert_eq!(sigmap.apply_bit(b[0]), SigBit::ONE);
        assert_eq!(sigmap.apply_bit(b[1]), b[1]);
        assert_eq!(sigmap.apply_bit(a[1]), b[1]);
        sigmap.add_bit(SigBit::ZERO, SigBit::ONE);
        assert_eq!(sigmap.apply_bit(SigBit::ZERO), SigBit::ZERO);
    }

    #[test]
    fn test_from_module() {
        let mut module = Module::new("top");
        let a = module.add_wire("a", 1);
        let b = module.add_wire("b", 1);
        module.connect(a.clone(), b.clone());
        let sigmap = SigMap::from_module(&module);
        assert_eq!(sigmap.apply(&a), b);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut module = Module::new("top");
        let a = module.add_wire("a", 1);
        let b = module.add_wire("b", 1);
        let base = SigMap::new();
        let mut extended = base.clone();
        extended.add(&a, &b);
        assert_eq!(base.apply(&a), a);
        assert_eq!(extended.apply(&a), b);
    }
}
