// SPDX-License-Identifier: GPL-3.0-or-later

//! The tagged value type shared by the chunk constant pool, the VM stack,
//! and every hash table in the runtime.

use core::fmt;

use crate::object::{GcRef, ObjKind};

/// A value is one of four variants: the unit value, a boolean, a
/// double-precision number, or a reference to a heap object.
#[derive(Clone, Copy)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Object(GcRef),
}

impl Value {
    /// `nil` and `false` are falsey; everything else is truthy.
    #[must_use]
    pub const fn is_truthy(self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[must_use]
    pub const fn is_number(self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self, Value::Object(obj) if obj.is_string())
    }

    #[must_use]
    pub fn as_number(self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(self) -> Option<GcRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Same-tag comparison. Numbers compare bitwise-IEEE (`NaN != NaN`).
    /// Strings are interned, so reference equality is content equality;
    /// every other object variant compares by reference identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// The `print` statement's contract: numbers as shortest round-trip
/// (Rust's `f64` `Display` already gives this), strings as raw bytes (no
/// surrounding quotes, unlike [`fmt::Debug`] below), everything else the
/// same as the diagnostic form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Object(obj) if obj.is_string() => write!(f, "{}", obj.as_string().chars),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Object(obj) => match obj.kind() {
                ObjKind::String(s) => write!(f, "{:?}", s.chars.as_ref()),
                ObjKind::Function(func) => match &func.name {
                    Some(name) => write!(f, "<fn {}>", name.as_string().chars),
                    None => write!(f, "<script>"),
                },
                ObjKind::Native(native) => write!(f, "<native fn {}>", native.name),
                ObjKind::Closure(closure) => match &closure.function.as_function().name {
                    Some(name) => write!(f, "<fn {}>", name.as_string().chars),
                    None => write!(f, "<script>"),
                },
                ObjKind::Upvalue(_) => write!(f, "upvalue"),
                ObjKind::Class(class) => write!(f, "{}", class.name.as_string().chars),
                ObjKind::Instance(inst) => {
                    write!(f, "{} instance", inst.class.as_class().name.as_string().chars)
                }
                ObjKind::BoundMethod(bound) => match &bound.method.as_closure().function.as_function().name {
                    Some(name) => write!(f, "<fn {}>", name.as_string().chars),
                    None => write!(f, "<script>"),
                },
            },
        }
    }
}
