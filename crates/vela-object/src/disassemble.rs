// SPDX-License-Identifier: GPL-3.0-or-later

//! Bytecode disassembler, used only by the `--dump-bytecode` developer
//! flag (a debugging aid, not part of the language's own output
//! contract). Grounded in the reference `debug.c`'s
//! `disassemble_chunk`/`disassemble_instruction` pair: same per-offset
//! line suppression when two instructions share a source line, same
//! constant/local/jump rendering per opcode family.

#[cfg(test)]
mod disassemble_test;

use std::fmt::Write as _;

use crate::chunk::{Chunk, OpCode};
use crate::object::{GcRef, ObjKind};

/// Disassembles every instruction in `chunk` into a human-readable
/// listing, one line per instruction, headed by `name`.
#[must_use]
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Disassembles a single instruction starting at `offset`, appending its
/// rendering to `out` and returning the offset of the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line_at(offset));
    }

    let Some(op) = OpCode::from_u8(chunk.code[offset]) else {
        let _ = writeln!(out, "Unknown opcode {}", chunk.code[offset]);
        return offset + 1;
    };

    match op {
        OpCode::Constant
        | OpCode::GetGlobal
        | OpCode::DefineGlobal
        | OpCode::SetGlobal
        | OpCode::GetProperty
        | OpCode::SetProperty
        | OpCode::GetSuper
        | OpCode::Class
        | OpCode::Method => constant_instruction(op, chunk, offset, out),
        OpCode::GetLocal | OpCode::SetLocal | OpCode::GetUpvalue | OpCode::SetUpvalue => {
            byte_instruction(op, chunk, offset, out)
        }
        OpCode::Call => byte_instruction(op, chunk, offset, out),
        OpCode::Invoke | OpCode::SuperInvoke => invoke_instruction(op, chunk, offset, out),
        OpCode::Jump | OpCode::JumpIfFalse => jump_instruction(op, 1, chunk, offset, out),
        OpCode::Loop => jump_instruction(op, -1, chunk, offset, out),
        OpCode::Closure => closure_instruction(chunk, offset, out),
        _ => simple_instruction(op, offset, out),
    }
}

fn simple_instruction(op: OpCode, offset: usize, out: &mut String) -> usize {
    let _ = writeln!(out, "{op:?}");
    offset + 1
}

fn constant_instruction(op: OpCode, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let idx = chunk.code[offset + 1];
    let _ = writeln!(out, "{op:?} {idx:4} '{:?}'", chunk.constants[idx as usize]);
    offset + 2
}

fn byte_instruction(op: OpCode, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let slot = chunk.code[offset + 1];
    let _ = writeln!(out, "{op:?} {slot:4}");
    offset + 2
}

fn invoke_instruction(op: OpCode, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let idx = chunk.code[offset + 1];
    let arg_count = chunk.code[offset + 2];
    let _ = writeln!(
        out,
        "{op:?} (argc {arg_count}) {idx:4} '{:?}'",
        chunk.constants[idx as usize]
    );
    offset + 3
}

fn jump_instruction(
    op: OpCode,
    sign: i32,
    chunk: &Chunk,
    offset: usize,
    out: &mut String,
) -> usize {
    let hi = chunk.code[offset + 1];
    let lo = chunk.code[offset + 2];
    let jump = (u16::from(hi) << 8) | u16::from(lo);
    let target = (offset as i64) + 3 + i64::from(sign) * i64::from(jump);
    let _ = writeln!(out, "{op:?} {offset:4} -> {target}");
    offset + 3
}

/// Disassembles `script` and every function nested anywhere in its
/// constant pools, recursively — used by the CLI's `--dump-bytecode`
/// flag so a program with closures or methods shows every chunk, not
/// just the top-level script's.
#[must_use]
pub fn disassemble_program(script: GcRef) -> String {
    let mut out = String::new();
    disassemble_function_tree(script, &mut out);
    out
}

fn disassemble_function_tree(function: GcRef, out: &mut String) {
    let f = function.as_function();
    let name = f.name.map_or_else(|| "<script>".to_owned(), |n| n.as_string().chars.to_string());
    out.push_str(&disassemble_chunk(&f.chunk, &name));

    let nested: Vec<GcRef> = f
        .chunk
        .constants
        .iter()
        .filter_map(|c| c.as_object())
        .filter(|o| matches!(o.kind(), ObjKind::Function(_)))
        .collect();
    for nested_fn in nested {
        out.push('\n');
        disassemble_function_tree(nested_fn, out);
    }
}

/// `CLOSURE`'s operand is variable length: the function constant index,
/// then one `(is_local, index)` byte pair per upvalue, read off the
/// function's own `upvalue_count` (the instruction stream has no
/// self-describing length prefix).
fn closure_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let idx = chunk.code[offset + 1];
    let constant = &chunk.constants[idx as usize];
    let _ = writeln!(out, "CLOSURE {idx:4} '{constant:?}'");

    let mut cursor = offset + 2;
    if let Some(function) = constant.as_object() {
        let upvalue_count = function.as_function().upvalue_count;
        for _ in 0..upvalue_count {
            let is_local = chunk.code[cursor];
            let index = chunk.code[cursor + 1];
            let kind = if is_local != 0 { "local" } else { "upvalue" };
            let _ = writeln!(out, "{cursor:04}      |                     {kind} {index}");
            cursor += 2;
        }
    }
    cursor
}
