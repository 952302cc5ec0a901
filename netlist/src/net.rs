use std::fmt::Debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trit {
    Undef,
    Zero,
    One,
}

impl Trit {
    pub fn from_char(char: char) -> Option<Trit> {
        match char {
            '0' => Some(Trit::Zero),
            '1' => Some(Trit::One),
            'x' | 'X' | 'z' | 'Z' | '-' => Some(Trit::Undef),
            _ => None,
        }
    }
}

impl std::fmt::Display for Trit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Trit::Undef => write!(f, "x"),
            Trit::Zero => write!(f, "0"),
            Trit::One => write!(f, "1"),
        }
    }
}

impl From<bool> for Trit {
    fn from(value: bool) -> Self {
        match value {
            false => Trit::Zero,
            true => Trit::One,
        }
    }
}

impl std::ops::Not for Trit {
    type Output = Trit;

    fn not(self) -> Self::Output {
        match self {
            Trit::One => Trit::Zero,
            Trit::Zero => Trit::One,
            Trit::Undef => Trit::Undef,
        }
    }
}

/// Index of a wire within its module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(pub(crate) u32);

impl WireId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single bit of a netlist signal: either a constant, or one bit of a wire.
///
/// Bits are totally ordered, constants first, so that sets and maps keyed by them iterate
/// deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigBit {
    Const(Trit),
    Wire(WireId, u32),
}

impl SigBit {
    pub const UNDEF: SigBit = SigBit::Const(Trit::Undef);
    pub const ZERO: SigBit = SigBit::Const(Trit::Zero);
    pub const ONE: SigBit = SigBit::Const(Trit::One);

    pub fn as_const(self) -> Option<Trit> {
        match self {
            SigBit::Const(trit) => Some(trit),
            SigBit::Wire(..) => None,
        }
    }

    pub fn wire(self) -> Option<WireId> {
        match self {
            SigBit::Const(_) => None,
            SigBit::Wire(wire, _) => Some(wire),
        }
    }

    pub fn is_const(self) -> bool {
        self.as_const().is_some()
    }
}

impl From<bool> for SigBit {
    fn from(value: bool) -> Self {
        SigBit::Const(value.into())
    }
}

impl From<Trit> for SigBit {
    fn from(value: Trit) -> Self {
        SigBit::Const(value)
    }
}

impl Debug for SigBit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SigBit::Const(Trit::Zero) => write!(f, "SigBit::ZERO"),
            SigBit::Const(Trit::One) => write!(f, "SigBit::ONE"),
            SigBit::Const(Trit::Undef) => write!(f, "SigBit::UNDEF"),
            SigBit::Wire(wire, offset) => write!(f, "SigBit::Wire({}, {})", wire.0, offset),
        }
    }
}
