// SPDX-License-Identifier: GPL-3.0-or-later

//! The heap allocator and tracing garbage collector.
//!
//! `Heap` owns every allocation's memory and the mechanics of mark/sweep;
//! it does not know how to find GC roots by itself. The VM drives a
//! collection by marking its own roots (the value stack, call frames,
//! open upvalues, globals) directly through [`Heap::mark_value`] /
//! [`Heap::mark_object`], then calling [`Heap::trace_references`],
//! [`Heap::sweep_strings`], and [`Heap::sweep`] in that order. The
//! compiler registers the function it is currently building through
//! [`Heap::push_compiler_root`] / [`Heap::pop_compiler_root`] so a
//! collection triggered mid-compile does not reclaim it.

#[cfg(test)]
mod gc_test;

use crate::fnv1a;
use crate::object::{
    GcHeader, GcRef, NativeFn, Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction,
    ObjInstance, ObjKind, ObjNative, ObjString, ObjUpvalue, UpvalueLocation,
};
use crate::table::Table;
use crate::value::Value;

/// After a collection, the next one is triggered once allocated bytes
/// exceed `bytes_allocated * HEAP_GROW_FACTOR` of the previous threshold.
const HEAP_GROW_FACTOR: usize = 2;
const INITIAL_NEXT_GC: usize = 1024 * 1024;

pub struct Heap {
    objects: Option<GcRef>,
    pub strings: Table,
    bytes_allocated: usize,
    next_gc: usize,
    gray_stack: Vec<GcRef>,
    /// Forces a collection before every allocation; used by property
    /// tests and the `--stress-gc` CLI flag.
    pub stress_gc: bool,
    init_string: Option<GcRef>,
    /// Functions currently under construction by the compiler, kept
    /// alive independent of VM reachability.
    compiler_roots: Vec<GcRef>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Heap {
            objects: None,
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_NEXT_GC,
            gray_stack: Vec::new(),
            stress_gc: false,
            init_string: None,
            compiler_roots: Vec::new(),
        }
    }

    #[must_use]
    pub const fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    #[must_use]
    pub fn should_collect(&self) -> bool {
        self.stress_gc || self.bytes_allocated > self.next_gc
    }

    pub fn push_compiler_root(&mut self, function: GcRef) {
        self.compiler_roots.push(function);
    }

    pub fn pop_compiler_root(&mut self) {
        self.compiler_roots.pop();
    }

    /// The interned `"init"` string, used to look up a class initializer.
    pub fn init_string(&mut self) -> GcRef {
        if let Some(s) = self.init_string {
            return s;
        }
        let s = self.intern_str("init");
        self.init_string = Some(s);
        s
    }

    fn alloc(&mut self, kind: ObjKind, size: usize) -> GcRef {
        let obj = Box::new(Obj { header: GcHeader::new(), kind });
        let obj_ref = GcRef::from_box(obj);
        obj_ref.header().next.set(self.objects);
        self.objects = Some(obj_ref);
        self.bytes_allocated += size;
        obj_ref
    }

    /// Interns `chars`, returning the existing string object if an
    /// identical one is already interned.
    pub fn intern_str(&mut self, chars: &str) -> GcRef {
        let hash = fnv1a(chars.as_bytes());
        if let Some(existing) = self.strings.find_string(chars, hash) {
            return existing;
        }
        let size = core::mem::size_of::<ObjString>() + chars.len();
        let obj = self.alloc(ObjKind::String(ObjString { hash, chars: chars.into() }), size);
        self.strings.set(obj, Value::Nil);
        obj
    }

    /// Interns the concatenation of `a` and `b` without an intermediate
    /// heap allocation surviving beyond the call.
    pub fn intern_concat(&mut self, a: &str, b: &str) -> GcRef {
        let mut owned = String::with_capacity(a.len() + b.len());
        owned.push_str(a);
        owned.push_str(b);
        self.intern_str(&owned)
    }

    pub fn alloc_function(&mut self, function: ObjFunction) -> GcRef {
        let size = core::mem::size_of::<ObjFunction>();
        self.alloc(ObjKind::Function(function), size)
    }

    pub fn alloc_native(&mut self, name: &'static str, function: NativeFn) -> GcRef {
        let size = core::mem::size_of::<ObjNative>();
        self.alloc(ObjKind::Native(ObjNative { name, function }), size)
    }

    pub fn alloc_closure(&mut self, function: GcRef, upvalues: Vec<GcRef>) -> GcRef {
        let size = core::mem::size_of::<ObjClosure>() + upvalues.capacity() * size_of::<GcRef>();
        self.alloc(ObjKind::Closure(ObjClosure { function, upvalues }), size)
    }

    pub fn alloc_upvalue(&mut self, location: UpvalueLocation) -> GcRef {
        let size = core::mem::size_of::<ObjUpvalue>();
        self.alloc(ObjKind::Upvalue(ObjUpvalue { location: location.into() }), size)
    }

    pub fn alloc_class(&mut self, name: GcRef) -> GcRef {
        let size = core::mem::size_of::<ObjClass>();
        self.alloc(ObjKind::Class(ObjClass { name, methods: Table::new() }), size)
    }

    pub fn alloc_instance(&mut self, class: GcRef) -> GcRef {
        let size = core::mem::size_of::<ObjInstance>();
        self.alloc(ObjKind::Instance(ObjInstance { class, fields: Table::new() }), size)
    }

    pub fn alloc_bound_method(&mut self, receiver: Value, method: GcRef) -> GcRef {
        let size = core::mem::size_of::<ObjBoundMethod>();
        self.alloc(ObjKind::BoundMethod(ObjBoundMethod { receiver, method }), size)
    }

    pub fn mark_value(&mut self, value: Value) {
        if let Value::Object(obj) = value {
            self.mark_object(obj);
        }
    }

    pub fn mark_object(&mut self, obj: GcRef) {
        if obj.is_marked() {
            return;
        }
        obj.mark();
        self.gray_stack.push(obj);
    }

    fn mark_table(&mut self, table: &Table) {
        let entries: Vec<(GcRef, Value)> = table.iter().collect();
        for (key, value) in entries {
            self.mark_object(key);
            self.mark_value(value);
        }
    }

    /// Marks every function currently under construction by the compiler.
    pub fn mark_compiler_roots(&mut self) {
        let roots = self.compiler_roots.clone();
        for root in roots {
            self.mark_object(root);
        }
    }

    pub fn trace_references(&mut self) {
        while let Some(obj) = self.gray_stack.pop() {
            self.blacken_object(obj);
        }
    }

    fn blacken_object(&mut self, obj: GcRef) {
        match obj.kind() {
            ObjKind::String(_) | ObjKind::Native(_) => {}
            ObjKind::Upvalue(up) => {
                if let UpvalueLocation::Closed(value) = up.location.get() {
                    self.mark_value(value);
                }
            }
            ObjKind::Function(func) => {
                if let Some(name) = func.name {
                    self.mark_object(name);
                }
                let constants: Vec<Value> = func.chunk.constants.clone();
                for constant in constants {
                    self.mark_value(constant);
                }
            }
            ObjKind::Closure(closure) => {
                self.mark_object(closure.function);
                let upvalues = closure.upvalues.clone();
                for upvalue in upvalues {
                    self.mark_object(upvalue);
                }
            }
            ObjKind::Class(class) => {
                self.mark_object(class.name);
                self.mark_table(&class.methods);
            }
            ObjKind::Instance(inst) => {
                self.mark_object(inst.class);
                self.mark_table(&inst.fields);
            }
            ObjKind::BoundMethod(bound) => {
                self.mark_value(bound.receiver);
                self.mark_object(bound.method);
            }
        }
    }

    /// Removes entries from the weak string-interning table whose key
    /// did not survive marking, so those strings can actually be freed.
    pub fn sweep_strings(&mut self) {
        self.strings.remove_unmarked();
    }

    /// Walks the all-objects list, freeing every unmarked object and
    /// clearing the mark bit on survivors.
    pub fn sweep(&mut self) {
        let mut previous: Option<GcRef> = None;
        let mut current = self.objects;
        let mut freed_bytes = 0usize;

        while let Some(obj) = current {
            let next = obj.header().next.get();
            if obj.is_marked() {
                obj.unmark();
                previous = Some(obj);
            } else {
                match previous {
                    Some(prev) => prev.header().next.set(next),
                    None => self.objects = next,
                }
                freed_bytes += Self::approx_size(obj);
                // SAFETY: unreachable per the mark phase above, and not
                // referenced by `previous`/`self.objects` any more.
                drop(unsafe { obj.reclaim() });
            }
            current = next;
        }

        self.bytes_allocated = self.bytes_allocated.saturating_sub(freed_bytes);

        if self.stress_gc && freed_bytes == 0 {
            tracing::warn!("stress-gc collection reclaimed zero bytes");
        }
        tracing::debug!(freed_bytes, bytes_allocated = self.bytes_allocated, "gc sweep complete");
    }

    pub fn adjust_next_gc(&mut self) {
        self.next_gc = self.bytes_allocated.saturating_mul(HEAP_GROW_FACTOR).max(INITIAL_NEXT_GC);
    }

    fn approx_size(obj: GcRef) -> usize {
        match obj.kind() {
            ObjKind::String(s) => core::mem::size_of::<ObjString>() + s.chars.len(),
            ObjKind::Function(_) => core::mem::size_of::<ObjFunction>(),
            ObjKind::Native(_) => core::mem::size_of::<ObjNative>(),
            ObjKind::Closure(c) => {
                core::mem::size_of::<ObjClosure>() + c.upvalues.capacity() * size_of::<GcRef>()
            }
            ObjKind::Upvalue(_) => core::mem::size_of::<ObjUpvalue>(),
            ObjKind::Class(_) => core::mem::size_of::<ObjClass>(),
            ObjKind::Instance(_) => core::mem::size_of::<ObjInstance>(),
            ObjKind::BoundMethod(_) => core::mem::size_of::<ObjBoundMethod>(),
        }
    }

    /// Frees every remaining heap object. Called when the VM shuts down.
    pub fn free_all(&mut self) {
        let mut current = self.objects.take();
        while let Some(obj) = current {
            let next = obj.header().next.get();
            // SAFETY: the heap is being torn down; no references survive.
            drop(unsafe { obj.reclaim() });
            current = next;
        }
        self.strings = Table::new();
        self.init_string = None;
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.free_all();
    }
}
