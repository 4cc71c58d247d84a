// SPDX-License-Identifier: GPL-3.0-or-later

//! Native (host-provided) functions, installed into the globals table
//! before any user script runs.
//!
//! A native is a plain `fn(&[Value]) -> Result<Value, String>` pointer,
//! not a closure: it cannot capture VM state directly. `clock` instead
//! reads a process-wide start instant stashed in a `OnceLock`, set on
//! first call.

use std::sync::OnceLock;
use std::time::Instant;

use vela_object::{Heap, NativeFn, Table, Value};

static START: OnceLock<Instant> = OnceLock::new();

/// Installs every baseline native function into `globals`, allocating
/// each as a `Native` heap object under its interned name.
pub fn install_natives(heap: &mut Heap, globals: &mut Table) {
    define_native(heap, globals, "clock", clock);
}

fn define_native(heap: &mut Heap, globals: &mut Table, name: &'static str, function: NativeFn) {
    let name_ref = heap.intern_str(name);
    let native_ref = heap.alloc_native(name, function);
    globals.set(name_ref, Value::Object(native_ref));
}

/// `clock() -> seconds-since-process-start as number`.
fn clock(args: &[Value]) -> Result<Value, String> {
    if !args.is_empty() {
        return Err(format!("Expected 0 arguments but got {}.", args.len()));
    }
    let start = START.get_or_init(Instant::now);
    Ok(Value::Number(start.elapsed().as_secs_f64()))
}
