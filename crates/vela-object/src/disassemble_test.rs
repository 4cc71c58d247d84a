use crate::chunk::{Chunk, OpCode};
use crate::disassemble::disassemble_chunk;
use crate::value::Value;

#[test]
fn headed_by_the_given_name() {
    let chunk = Chunk::new();
    let out = disassemble_chunk(&chunk, "test chunk");
    assert!(out.starts_with("== test chunk ==\n"));
}

#[test]
fn constant_instruction_shows_its_value() {
    let mut chunk = Chunk::new();
    let idx = chunk.add_constant(Value::Number(6.9)).expect("room for one constant");
    chunk.write_op(OpCode::Constant, 1);
    chunk.write(idx, 1);
    chunk.write_op(OpCode::Return, 1);

    let out = disassemble_chunk(&chunk, "c");
    assert!(out.contains("Constant"));
    assert!(out.contains("6.9"));
}

#[test]
fn repeated_line_is_suppressed_on_the_second_instruction() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Nil, 3);
    chunk.write_op(OpCode::Pop, 3);

    let out = disassemble_chunk(&chunk, "c");
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[1].contains("   3 "));
    assert!(lines[2].contains("   | "));
}

#[test]
fn jump_instruction_shows_its_target_offset() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::JumpIfFalse, 1);
    chunk.write(0, 1);
    chunk.write(3, 1);
    chunk.write_op(OpCode::Pop, 1);

    let out = disassemble_chunk(&chunk, "c");
    assert!(out.contains("-> 6"));
}

#[test]
fn disassembling_a_stream_of_operand_free_opcodes_reproduces_it_in_order() {
    use proptest::prelude::*;

    // Restricted to opcodes with no operand bytes, so a random sequence of
    // them is always a well-formed chunk: every instruction is exactly one
    // byte and there are no constant-pool or jump-target indices to keep
    // in range.
    let simple_op = prop::sample::select(vec![
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Pop,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Not,
        OpCode::Negate,
        OpCode::Print,
        OpCode::CloseUpvalue,
        OpCode::Return,
        OpCode::Inherit,
    ]);

    proptest!(|(ops in prop::collection::vec(simple_op, 0..40))| {
        let mut chunk = Chunk::new();
        for &op in &ops {
            chunk.write_op(op, 1);
        }

        let out = disassemble_chunk(&chunk, "c");
        let disassembled: Vec<&str> = out
            .lines()
            .skip(1)
            .map(|line| line.split_whitespace().nth(2).expect("each instruction line names its opcode"))
            .collect();
        let expected: Vec<String> = ops.iter().map(|op| format!("{op:?}")).collect();
        prop_assert_eq!(disassembled, expected);
    });
}
