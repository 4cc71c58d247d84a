// SPDX-License-Identifier: GPL-3.0-or-later

//! Heap object kinds.
//!
//! Every heap object shares a header (`is_marked`, the intrusive
//! all-objects `next` link) but carries its payload as one arm of the
//! [`ObjKind`] sum type rather than through struct embedding, per the
//! rewrite's object-model design note: runtime type tests are variant
//! checks, never pointer downcasts.

use core::cell::Cell;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ptr::NonNull;

use crate::chunk::Chunk;
use crate::table::Table;
use crate::value::Value;

/// Header shared by every heap object: the mark bit used by the sweep
/// phase, and the intrusive link into the VM's all-objects list.
pub struct GcHeader {
    pub is_marked: Cell<bool>,
    pub next: Cell<Option<GcRef>>,
}

impl GcHeader {
    pub(crate) const fn new() -> Self {
        GcHeader { is_marked: Cell::new(false), next: Cell::new(None) }
    }
}

/// A heap-allocated object: a header plus one of the seven (eight,
/// counting bound methods) payload kinds.
pub struct Obj {
    pub header: GcHeader,
    pub kind: ObjKind,
}

pub enum ObjKind {
    String(ObjString),
    Function(ObjFunction),
    Native(ObjNative),
    Closure(ObjClosure),
    Upvalue(ObjUpvalue),
    Class(ObjClass),
    Instance(ObjInstance),
    BoundMethod(ObjBoundMethod),
}

pub struct ObjString {
    pub hash: u32,
    pub chars: Box<str>,
}

pub struct ObjFunction {
    pub arity: u8,
    pub upvalue_count: usize,
    pub chunk: Chunk,
    pub name: Option<GcRef>,
}

impl ObjFunction {
    #[must_use]
    pub fn new() -> Self {
        ObjFunction { arity: 0, upvalue_count: 0, chunk: Chunk::new(), name: None }
    }
}

impl Default for ObjFunction {
    fn default() -> Self {
        Self::new()
    }
}

/// A native (host-provided) function: `(args) -> Result<Value, message>`.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

pub struct ObjNative {
    pub name: &'static str,
    pub function: NativeFn,
}

pub struct ObjClosure {
    pub function: GcRef,
    pub upvalues: Vec<GcRef>,
}

/// An upvalue is either still open, pointing at a live stack slot by
/// index, or closed, owning its value directly.
#[derive(Clone, Copy)]
pub enum UpvalueLocation {
    Open(usize),
    Closed(Value),
}

pub struct ObjUpvalue {
    pub location: Cell<UpvalueLocation>,
}

pub struct ObjClass {
    pub name: GcRef,
    pub methods: Table,
}

pub struct ObjInstance {
    pub class: GcRef,
    pub fields: Table,
}

pub struct ObjBoundMethod {
    pub receiver: Value,
    pub method: GcRef,
}

/// A handle to a heap-allocated [`Obj`]. Valid only for as long as the
/// object it points to has not been reclaimed by a sweep; callers must
/// keep every live `GcRef` reachable from a GC root (the value stack, a
/// call frame, a global, or the gray worklist) across any allocation.
#[derive(Clone, Copy)]
pub struct GcRef(NonNull<Obj>);

impl GcRef {
    /// Wraps a freshly boxed object. The caller hands ownership of the
    /// allocation to the garbage collector.
    pub(crate) fn from_box(obj: Box<Obj>) -> Self {
        GcRef(NonNull::from(Box::leak(obj)))
    }

    /// Reclaims the allocation. Must only be called once, by the sweep
    /// phase, for an object that is provably unreachable.
    pub(crate) unsafe fn reclaim(self) -> Box<Obj> {
        // SAFETY: caller guarantees this handle is the last reference and
        // that the pointee was originally produced by `from_box`.
        unsafe { Box::from_raw(self.0.as_ptr()) }
    }

    fn obj(&self) -> &Obj {
        // SAFETY: a live `GcRef` always points at an object kept alive by
        // some GC root; the collector never frees a marked object.
        unsafe { self.0.as_ref() }
    }

    #[must_use]
    pub fn header(&self) -> &GcHeader {
        &self.obj().header
    }

    #[must_use]
    pub fn kind(&self) -> &ObjKind {
        &self.obj().kind
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.header().is_marked.get()
    }

    pub fn mark(&self) {
        self.header().is_marked.set(true);
    }

    pub fn unmark(&self) {
        self.header().is_marked.set(false);
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.kind(), ObjKind::String(_))
    }

    #[must_use]
    pub fn is_class(&self) -> bool {
        matches!(self.kind(), ObjKind::Class(_))
    }

    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self.kind(), ObjKind::Instance(_))
    }

    /// # Panics
    /// Panics if this handle is not a string. Callers check `is_string`
    /// (or know the variant from context) before calling.
    #[must_use]
    pub fn as_string(&self) -> &ObjString {
        match self.kind() {
            ObjKind::String(s) => s,
            _ => unreachable!("GcRef::as_string called on a non-string object"),
        }
    }

    #[must_use]
    pub fn as_function(&self) -> &ObjFunction {
        match self.kind() {
            ObjKind::Function(f) => f,
            _ => unreachable!("GcRef::as_function called on a non-function object"),
        }
    }

    #[must_use]
    pub fn as_closure(&self) -> &ObjClosure {
        match self.kind() {
            ObjKind::Closure(c) => c,
            _ => unreachable!("GcRef::as_closure called on a non-closure object"),
        }
    }

    #[must_use]
    pub fn as_class(&self) -> &ObjClass {
        match self.kind() {
            ObjKind::Class(c) => c,
            _ => unreachable!("GcRef::as_class called on a non-class object"),
        }
    }

    #[must_use]
    pub fn as_instance(&self) -> &ObjInstance {
        match self.kind() {
            ObjKind::Instance(i) => i,
            _ => unreachable!("GcRef::as_instance called on a non-instance object"),
        }
    }

    #[must_use]
    pub fn as_upvalue(&self) -> &ObjUpvalue {
        match self.kind() {
            ObjKind::Upvalue(u) => u,
            _ => unreachable!("GcRef::as_upvalue called on a non-upvalue object"),
        }
    }

    #[must_use]
    pub fn as_native(&self) -> &ObjNative {
        match self.kind() {
            ObjKind::Native(n) => n,
            _ => unreachable!("GcRef::as_native called on a non-native object"),
        }
    }

    /// Mutable access to a function under construction by the compiler.
    /// Functions are immutable once `end_compiler` hands them to the VM;
    /// this accessor exists only for the compiler to fill in the chunk,
    /// arity and upvalue count incrementally.
    ///
    /// # Safety
    /// Same contract as [`GcRef::as_instance_mut`].
    #[must_use]
    #[expect(clippy::mut_from_ref, reason = "GC handles provide interior mutability by design")]
    pub fn as_function_mut(&self) -> &mut ObjFunction {
        let obj = self.0.as_ptr();
        // SAFETY: see `as_instance_mut`.
        unsafe {
            match &mut (*obj).kind {
                ObjKind::Function(f) => f,
                _ => unreachable!("GcRef::as_function_mut called on a non-function object"),
            }
        }
    }

    #[must_use]
    pub fn as_bound_method(&self) -> &ObjBoundMethod {
        match self.kind() {
            ObjKind::BoundMethod(b) => b,
            _ => unreachable!("GcRef::as_bound_method called on a non-bound-method object"),
        }
    }

    /// Mutable access to an instance's field table (used by `SET_PROPERTY`).
    ///
    /// # Safety
    /// The caller must not hold any other live borrow of this object and
    /// must not trigger a reentrant mutation of the same object.
    #[must_use]
    #[expect(clippy::mut_from_ref, reason = "GC handles provide interior mutability by design")]
    pub fn as_instance_mut(&self) -> &mut ObjInstance {
        let obj = self.0.as_ptr();
        // SAFETY: see above; single-threaded VM, no concurrent aliasing.
        unsafe {
            match &mut (*obj).kind {
                ObjKind::Instance(i) => i,
                _ => unreachable!("GcRef::as_instance_mut called on a non-instance object"),
            }
        }
    }

    /// Mutable access to a class's method table (used by `METHOD`/`INHERIT`).
    ///
    /// # Safety
    /// Same contract as [`GcRef::as_instance_mut`].
    #[must_use]
    #[expect(clippy::mut_from_ref, reason = "GC handles provide interior mutability by design")]
    pub fn as_class_mut(&self) -> &mut ObjClass {
        let obj = self.0.as_ptr();
        // SAFETY: see `as_instance_mut`.
        unsafe {
            match &mut (*obj).kind {
                ObjKind::Class(c) => c,
                _ => unreachable!("GcRef::as_class_mut called on a non-class object"),
            }
        }
    }

    #[must_use]
    pub fn as_ptr(&self) -> *mut Obj {
        self.0.as_ptr()
    }
}

impl PartialEq for GcRef {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for GcRef {}

impl Hash for GcRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ptr().hash(state);
    }
}

impl fmt::Debug for GcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GcRef({:p})", self.0.as_ptr())
    }
}
