// SPDX-License-Identifier: GPL-3.0-or-later

//! Value representation, heap objects, the shared open-addressed hash
//! table, and the tracing garbage collector for the L scripting language.
//!
//! Objects are modelled as a single sum type ([`ObjKind`]) rather than via
//! struct-embedding of a common header, so that runtime type tests are
//! variant checks instead of pointer downcasts. Every heap object is reached
//! exclusively through a [`GcRef`] handle; the collector owns the only
//! `Box` for each allocation and reclaims it during sweep.

pub mod chunk;
pub mod disassemble;
pub mod gc;
pub mod object;
pub mod table;
pub mod value;

pub use chunk::{Chunk, OpCode};
pub use disassemble::{disassemble_chunk, disassemble_instruction, disassemble_program};
pub use gc::Heap;
pub use object::{
    GcHeader, GcRef, NativeFn, Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction,
    ObjInstance, ObjKind, ObjNative, ObjString, ObjUpvalue, UpvalueLocation,
};
pub use table::Table;
pub use value::Value;

/// FNV-1a 32-bit hash over a byte sequence, matching the offset basis and
/// prime used for string interning.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}
