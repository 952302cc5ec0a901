use crate::{Const, Trit};

/// The value of a cell parameter or an attribute.
///
/// Yosys stores every parameter as a bit vector, optionally flagged as a string.  Strings are kept
/// as such here; integers and booleans are bit vectors and are read through the typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamValue {
    Const(Const),
    String(String),
}

impl ParamValue {
    pub fn as_const(&self) -> Option<&Const> {
        match self {
            ParamValue::Const(value) => Some(value),
            ParamValue::String(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_const().map(Const::as_int)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_const().map(Const::as_bool)
    }

    pub fn decode_string(&self) -> String {
        match self {
            ParamValue::Const(value) => value.decode_string(),
            ParamValue::String(value) => value.clone(),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Const(Trit::from(value).into())
    }
}

impl From<Const> for ParamValue {
    fn from(value: Const) -> Self {
        Self::Const(value)
    }
}

impl From<&Const> for ParamValue {
    fn from(value: &Const) -> Self {
        Self::Const(value.clone())
    }
}

// Integer parameters are 32 bits wide, as Yosys emits them.
impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Const(Const::from_int(value, 32))
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::Const(Const::from_uint(value as u64, 32))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}
