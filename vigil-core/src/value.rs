//! Value Model
//!
//! Every value the engine handles is one of four shapes: a primitive, an
//! object, an array, or a rendered node. Containers are referenced through
//! typed handles into the runtime's arena, so two values are the same
//! container exactly when their handles are equal.
//!
//! Handles are only minted by the runtime. The typed wrappers make it
//! impossible to hand an array handle to an object operation.

use std::fmt;
use std::rc::Rc;

use crate::graph::Handle;

/// A non-container value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
}

/// Handle to an object container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub(crate) Handle);

/// Handle to an array container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayRef(pub(crate) Handle);

/// Handle to a rendered node. Nodes are never observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub(crate) Handle);

/// Any value in the data graph.
///
/// The derived `PartialEq` is strict equality: numbers compare by IEEE
/// rules (`NaN != NaN`, `-0 == +0`), strings by content and containers by
/// handle identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    Object(ObjectRef),
    Array(ArrayRef),
    Node(NodeRef),
}

/// The shape of a value, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Primitive,
    Object,
    Array,
    Node,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Primitive => "primitive",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Node => "node",
        };
        f.write_str(name)
    }
}

impl Value {
    pub const UNDEFINED: Value = Value::Primitive(Primitive::Undefined);
    pub const NULL: Value = Value::Primitive(Primitive::Null);

    pub fn undefined() -> Self {
        Self::UNDEFINED
    }

    pub fn null() -> Self {
        Self::NULL
    }

    pub fn number(n: f64) -> Self {
        Value::Primitive(Primitive::Number(n))
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Primitive(Primitive::Str(s.into()))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Primitive(_) => ValueKind::Primitive,
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            Value::Node(_) => ValueKind::Node,
        }
    }

    /// `===` comparison.
    pub fn strict_eq(&self, other: &Value) -> bool {
        self == other
    }

    /// True only for the number NaN.
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Primitive(Primitive::Number(n)) if n.is_nan())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Primitive(Primitive::Undefined))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Primitive(Primitive::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Primitive(Primitive::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Primitive(Primitive::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<ArrayRef> {
        match self {
            Value::Array(arr) => Some(*arr),
            _ => None,
        }
    }

    /// Arena handle of a container value.
    pub(crate) fn handle(&self) -> Option<Handle> {
        match self {
            Value::Primitive(_) => None,
            Value::Object(obj) => Some(obj.0),
            Value::Array(arr) => Some(arr.0),
            Value::Node(node) => Some(node.0),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Undefined => f.write_str("undefined"),
            Primitive::Null => f.write_str("null"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Number(n) => f.write_str(&number_to_string(*n)),
            Primitive::Str(s) => f.write_str(s),
        }
    }
}

/// Host string conversion of a number.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // positive exponents carry an explicit sign
        let s = format!("{n:e}");
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        }
    } else if n == n.trunc() {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Primitive(Primitive::Bool(b))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<ArrayRef> for Value {
    fn from(arr: ArrayRef) -> Self {
        Value::Array(arr)
    }
}

impl From<NodeRef> for Value {
    fn from(node: NodeRef) -> Self {
        Value::Node(node)
    }
}

/// Largest valid array index, as on the host (`2^32 - 2`).
pub const MAX_ARRAY_INDEX: usize = (u32::MAX - 1) as usize;

/// Key accepted by the structural helpers: a property name or an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Index(usize),
    Name(Rc<str>),
}

impl PropertyKey {
    /// The key as a valid array index, if it is one.
    ///
    /// Names qualify when they are the canonical spelling of an integer.
    /// Indices above [`MAX_ARRAY_INDEX`] never qualify.
    pub fn as_index(&self) -> Option<usize> {
        let index = match self {
            PropertyKey::Index(i) => *i,
            PropertyKey::Name(name) => {
                let i: usize = name.parse().ok()?;
                if i.to_string() != **name {
                    return None;
                }
                i
            }
        };
        (index <= MAX_ARRAY_INDEX).then_some(index)
    }

    /// The key as an object property name.
    pub fn to_name(&self) -> Rc<str> {
        match self {
            PropertyKey::Index(i) => i.to_string().into(),
            PropertyKey::Name(name) => Rc::clone(name),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{i}"),
            PropertyKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for PropertyKey {
    fn from(i: usize) -> Self {
        PropertyKey::Index(i)
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(name.into())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        PropertyKey::Name(name.into())
    }
}
