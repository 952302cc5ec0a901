use std::{
    fmt::{Debug, Display},
    ops::{Index, IndexMut},
    slice::SliceIndex,
    str::FromStr,
};

use crate::{SigBit, Trit};

/// A constant bit vector, least significant bit first.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Const {
    trits: Vec<Trit>,
}

impl Const {
    pub fn new() -> Self {
        Const { trits: vec![] }
    }

    pub fn zero(width: usize) -> Self {
        Self::from_iter(std::iter::repeat_n(Trit::Zero, width))
    }

    pub fn ones(width: usize) -> Self {
        Self::from_iter(std::iter::repeat_n(Trit::One, width))
    }

    pub fn undef(width: usize) -> Self {
        Self::from_iter(std::iter::repeat_n(Trit::Undef, width))
    }

    pub fn len(&self) -> usize {
        self.trits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trits.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Trit> + ExactSizeIterator + '_ {
        self.trits.iter().copied()
    }

    pub fn is_undef(&self) -> bool {
        self.trits.iter().all(|&trit| trit == Trit::Undef)
    }

    pub fn from_uint(val: u64, bits: usize) -> Self {
        let mut trits = vec![];
        for i in 0..bits {
            let trit = if i < u64::BITS as usize && ((val >> i) & 1) != 0 { Trit::One } else { Trit::Zero };
            trits.push(trit);
        }
        Self { trits }
    }

    pub fn from_int(val: i64, bits: usize) -> Self {
        let mut trits = vec![];
        for i in 0..bits {
            let shift = i.min(i64::BITS as usize - 1);
            trits.push(Trit::from(((val >> shift) & 1) != 0));
        }
        Self { trits }
    }

    /// Encodes a string the way Yosys stores string-valued constants: eight bits per byte,
    /// with the last character in the least significant byte.
    pub fn from_string(text: &str) -> Self {
        let mut trits = vec![];
        for byte in text.bytes().rev() {
            for i in 0..8 {
                trits.push(Trit::from((byte >> i) & 1 != 0));
            }
        }
        Self { trits }
    }

    /// Interprets the constant as an unsigned integer. Bits other than `1` count as `0`, and bits
    /// past the 64th are ignored.
    pub fn as_int(&self) -> i64 {
        let mut value = 0u64;
        for (index, trit) in self.trits.iter().take(u64::BITS as usize).enumerate() {
            if *trit == Trit::One {
                value |= 1 << index;
            }
        }
        value as i64
    }

    /// Returns true if any bit is `1`.
    pub fn as_bool(&self) -> bool {
        self.trits.iter().any(|&trit| trit == Trit::One)
    }

    pub fn decode_string(&self) -> String {
        let mut bytes = vec![];
        for chunk in self.trits.chunks(8) {
            let mut byte = 0u8;
            for (index, trit) in chunk.iter().enumerate() {
                if *trit == Trit::One {
                    byte |= 1 << index;
                }
            }
            if byte != 0 {
                bytes.push(byte);
            }
        }
        bytes.reverse();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl From<Trit> for Const {
    fn from(trit: Trit) -> Self {
        Const { trits: vec![trit] }
    }
}

impl From<Vec<Trit>> for Const {
    fn from(trits: Vec<Trit>) -> Self {
        Const { trits }
    }
}

impl FromIterator<Trit> for Const {
    fn from_iter<T: IntoIterator<Item = Trit>>(iter: T) -> Self {
        Const { trits: iter.into_iter().collect() }
    }
}

impl IntoIterator for &Const {
    type Item = Trit;
    type IntoIter = std::vec::IntoIter<Trit>;

    fn into_iter(self) -> Self::IntoIter {
        self.trits.clone().into_iter()
    }
}

impl FromStr for Const {
    type Err = ();

    // Most significant bit first, as written in RTLIL.
    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut trits = vec![];
        for char in source.chars().rev() {
            trits.push(Trit::from_char(char).ok_or(())?);
        }
        Ok(Const { trits })
    }
}

impl Debug for Const {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Const(")?;
        for (index, trit) in self.trits.iter().enumerate() {
            if index != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", trit)?;
        }
        write!(f, ")")?;
        Ok(())
    }
}

impl Display for Const {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for trit in self.trits.iter().rev() {
            write!(f, "{}", trit)?;
        }
        Ok(())
    }
}

/// A signal vector, least significant bit first.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SigSpec {
    bits: Vec<SigBit>,
}

impl SigSpec {
    pub const EMPTY: SigSpec = SigSpec { bits: vec![] };

    pub fn new() -> Self {
        SigSpec { bits: vec![] }
    }

    pub fn zero(width: usize) -> Self {
        Self::from_iter(std::iter::repeat_n(SigBit::ZERO, width))
    }

    pub fn ones(width: usize) -> Self {
        Self::from_iter(std::iter::repeat_n(SigBit::ONE, width))
    }

    pub fn undef(width: usize) -> Self {
        Self::from_iter(std::iter::repeat_n(SigBit::UNDEF, width))
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = SigBit> + ExactSizeIterator + '_ {
        self.bits.iter().copied()
    }

    pub fn push(&mut self, bit: impl Into<SigBit>) {
        self.bits.push(bit.into())
    }

    pub fn extend(&mut self, other: impl Into<SigSpec>) {
        self.bits.extend(other.into().bits)
    }

    pub fn concat(&self, other: impl Into<SigSpec>) -> Self {
        Self::from_iter(self.iter().chain(other.into().bits))
    }

    pub fn slice(&self, range: impl std::ops::RangeBounds<usize>) -> SigSpec {
        SigSpec::from(&self.bits[(range.start_bound().cloned(), range.end_bound().cloned())])
    }

    pub fn repeat(&self, count: usize) -> Self {
        SigSpec { bits: self.bits.repeat(count) }
    }

    /// Replaces a single bit in place.
    pub fn replace(&mut self, index: usize, bit: impl Into<SigBit>) {
        self.bits[index] = bit.into();
    }

    /// Returns true if every bit is the undefined constant. An empty signal is fully undefined.
    pub fn is_fully_undef(&self) -> bool {
        self.bits.iter().all(|&bit| bit == SigBit::UNDEF)
    }

    pub fn is_fully_const(&self) -> bool {
        self.bits.iter().all(|bit| bit.is_const())
    }

    pub fn as_const(&self) -> Option<Const> {
        self.bits.iter().map(|bit| bit.as_const()).collect::<Option<Vec<_>>>().map(Const::from)
    }

    pub fn as_bit(&self) -> Option<SigBit> {
        if self.len() == 1 {
            Some(self.bits[0])
        } else {
            None
        }
    }
}

impl<I: SliceIndex<[SigBit]>> Index<I> for SigSpec {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.bits[index]
    }
}

impl<I: SliceIndex<[SigBit]>> IndexMut<I> for SigSpec {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.bits[index]
    }
}

impl From<SigBit> for SigSpec {
    fn from(bit: SigBit) -> Self {
        SigSpec { bits: vec![bit] }
    }
}

impl From<&SigSpec> for SigSpec {
    fn from(value: &SigSpec) -> Self {
        value.clone()
    }
}

impl From<&[SigBit]> for SigSpec {
    fn from(bits: &[SigBit]) -> Self {
        SigSpec { bits: bits.to_vec() }
    }
}

impl From<Vec<SigBit>> for SigSpec {
    fn from(bits: Vec<SigBit>) -> Self {
        SigSpec { bits }
    }
}

impl From<&Const> for SigSpec {
    fn from(value: &Const) -> Self {
        SigSpec::from_iter(value.iter().map(SigBit::from))
    }
}

impl From<Const> for SigSpec {
    fn from(value: Const) -> Self {
        SigSpec::from(&value)
    }
}

impl From<SigSpec> for Vec<SigBit> {
    fn from(value: SigSpec) -> Self {
        value.bits
    }
}

impl FromIterator<SigBit> for SigSpec {
    fn from_iter<T: IntoIterator<Item = SigBit>>(iter: T) -> Self {
        SigSpec { bits: iter.into_iter().collect() }
    }
}

impl IntoIterator for &SigSpec {
    type Item = SigBit;
    type IntoIter = std::vec::IntoIter<SigBit>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.clone().into_iter()
    }
}

impl Debug for SigSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SigSpec(")?;
        for (index, bit) in self.bits.iter().enumerate() {
            if index != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", bit)?;
        }
        write!(f, ")")?;
        Ok(())
    }
}
