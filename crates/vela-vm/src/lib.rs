// SPDX-License-Identifier: GPL-3.0-or-later

//! The stack-based bytecode virtual machine: a fetch-decode-execute loop
//! over [`vela_object::Chunk`]s produced by [`vela_compiler::compile`].
//!
//! [`Vm::interpret`] is the single entry point used by both the REPL and
//! file-mode CLI drivers: it compiles `source`, runs it, and on a runtime
//! error prints the stack trace and resets VM state so the host (REPL)
//! can keep going.

mod native;

pub use native::install_natives;

use std::fmt;
use std::io::{self, Write};

use vela_object::{Chunk, GcRef, Heap, ObjFunction, OpCode, Table, UpvalueLocation, Value};

/// Call frames beyond this depth are a stack overflow.
const FRAMES_MAX: usize = 64;
const STACK_MAX: usize = FRAMES_MAX * 256;

#[derive(Clone, Copy)]
struct CallFrame {
    closure: GcRef,
    ip: usize,
    /// Index into the VM's flat value stack of this frame's slot 0
    /// (the closure itself for plain functions, the receiver for
    /// methods/initializers).
    slot_base: usize,
}

impl CallFrame {
    fn function(&self) -> &ObjFunction {
        self.closure.as_closure().function.as_function()
    }

    fn chunk(&self) -> &Chunk {
        &self.function().chunk
    }

    fn current_line(&self) -> u32 {
        self.chunk().line_at(self.ip.saturating_sub(1))
    }
}

/// A runtime error raised while executing bytecode. Carries just enough
/// to format the message line; the call-frame trace is assembled
/// separately by [`Vm::interpret`] while the frames that caused it are
/// still on the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    OperandsMustBeNumbers,
    OperandMustBeANumber,
    OperandsMustBeNumbersOrStrings,
    UndefinedVariable(String),
    NotCallable,
    ArityMismatch { expected: u8, got: u8 },
    OnlyInstancesHaveProperties,
    OnlyInstancesHaveFields,
    UndefinedProperty(String),
    SuperclassMustBeAClass,
    StackOverflow,
    NativeError(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::OperandsMustBeNumbers => write!(f, "Operands must be numbers."),
            RuntimeError::OperandMustBeANumber => write!(f, "Operand must be a number."),
            RuntimeError::OperandsMustBeNumbersOrStrings => {
                write!(f, "Operands must be two numbers or two strings.")
            }
            RuntimeError::UndefinedVariable(name) => write!(f, "Undefined variable '{name}'."),
            RuntimeError::NotCallable => write!(f, "Can only call functions and classes."),
            RuntimeError::ArityMismatch { expected, got } => {
                write!(f, "Expected {expected} arguments but got {got}.")
            }
            RuntimeError::OnlyInstancesHaveProperties => write!(f, "Only instances have properties."),
            RuntimeError::OnlyInstancesHaveFields => write!(f, "Only instances have fields."),
            RuntimeError::UndefinedProperty(name) => write!(f, "Undefined property '{name}'."),
            RuntimeError::SuperclassMustBeAClass => write!(f, "Superclass must be a class."),
            RuntimeError::StackOverflow => write!(f, "Stack overflow."),
            RuntimeError::NativeError(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Outcome of [`Vm::interpret`]: a compile failure or a runtime failure,
/// distinguished so the CLI can map each to its own exit code.
#[derive(Debug)]
pub enum InterpretError {
    Compile,
    Runtime(RuntimeError),
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretError::Compile => write!(f, "compile error"),
            InterpretError::Runtime(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for InterpretError {}

pub struct Vm {
    heap: Heap,
    frames: Vec<CallFrame>,
    stack: Vec<Value>,
    globals: Table,
    /// Open upvalues, sorted by descending stack slot so capture and
    /// close are both O(depth) rather than O(open upvalue count).
    open_upvalues: Vec<GcRef>,
    /// Sink for `print` statement output. Defaults to standard output;
    /// tests substitute an in-memory buffer so end-to-end scenarios can
    /// assert on captured stdout without touching the real terminal.
    stdout: Box<dyn Write>,
}

impl Vm {
    #[must_use]
    pub fn new() -> Self {
        Self::with_stdout(Box::new(io::stdout()))
    }

    /// Builds a VM that writes `print` output to `stdout` instead of the
    /// real standard output. Used by end-to-end tests to capture output.
    #[must_use]
    pub fn with_stdout(stdout: Box<dyn Write>) -> Self {
        let mut heap = Heap::new();
        let mut globals = Table::new();
        install_natives(&mut heap, &mut globals);
        Vm {
            heap,
            frames: Vec::new(),
            stack: Vec::new(),
            globals,
            open_upvalues: Vec::new(),
            stdout,
        }
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn set_stress_gc(&mut self, stress: bool) {
        self.heap.stress_gc = stress;
    }

    /// Compiles and runs `source`. On a runtime error, prints the message
    /// and call-frame trace to standard error (per the interpreter's
    /// stderr contract) and resets VM state before returning.
    ///
    /// # Errors
    /// Returns [`InterpretError::Compile`] if `source` fails to compile,
    /// or [`InterpretError::Runtime`] if execution raises a runtime error.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        self.interpret_inner(source, false)
    }

    /// As [`Vm::interpret`], but first writes a disassembly of `source`'s
    /// compiled chunk (and every chunk nested within it) to standard
    /// error — the `--dump-bytecode` developer aid.
    ///
    /// # Errors
    /// Same as [`Vm::interpret`].
    pub fn interpret_dumping(&mut self, source: &str) -> Result<(), InterpretError> {
        self.interpret_inner(source, true)
    }

    fn interpret_inner(&mut self, source: &str, dump_bytecode: bool) -> Result<(), InterpretError> {
        let _span = tracing::debug_span!("interpret").entered();

        let Some(script) = vela_compiler::compile(source, &mut self.heap) else {
            return Err(InterpretError::Compile);
        };

        if dump_bytecode {
            eprint!("{}", vela_object::disassemble_program(script));
        }

        self.push(Value::Object(script));
        self.maybe_collect();
        let closure = self.heap.alloc_closure(script, Vec::new());
        self.pop();
        self.push(Value::Object(closure));
        self.call_closure(closure, 0).expect("the script closure always takes 0 arguments");

        match self.run() {
            Ok(()) => Ok(()),
            Err(err) => {
                eprintln!("{err}");
                for frame in self.frames.iter().rev() {
                    let line = frame.current_line();
                    match frame.function().name {
                        Some(name) => eprintln!("[line {line}] in {}()", name.as_string().chars),
                        None => eprintln!("[line {line}] in script"),
                    }
                }
                self.reset_stack();
                Err(InterpretError::Runtime(err))
            }
        }
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    // --- stack plumbing ------------------------------------------------------

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("compiler-emitted bytecode never pops an empty stack")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // --- frame-relative bytecode reads ---------------------------------------

    fn read_byte(&mut self, frame_idx: usize) -> u8 {
        let frame = &mut self.frames[frame_idx];
        let ip = frame.ip;
        frame.ip += 1;
        frame.closure.as_closure().function.as_function().chunk.code[ip]
    }

    fn read_short(&mut self, frame_idx: usize) -> u16 {
        let hi = self.read_byte(frame_idx);
        let lo = self.read_byte(frame_idx);
        (u16::from(hi) << 8) | u16::from(lo)
    }

    fn read_constant(&mut self, frame_idx: usize) -> Value {
        let idx = self.read_byte(frame_idx);
        self.frames[frame_idx].closure.as_closure().function.as_function().chunk.constants
            [idx as usize]
    }

    fn read_string_constant(&mut self, frame_idx: usize) -> GcRef {
        self.read_constant(frame_idx)
            .as_object()
            .expect("property/global-name constants are always interned strings")
    }

    // --- the dispatch loop ---------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let frame_idx = self.frames.len() - 1;

            let byte = self.read_byte(frame_idx);
            let Some(op) = OpCode::from_u8(byte) else {
                unreachable!("compiler never emits an invalid opcode byte");
            };

            match op {
                OpCode::Constant => {
                    let value = self.read_constant(frame_idx);
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let value = self.stack[self.frames[frame_idx].slot_base + slot];
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let value = self.peek(0);
                    self.stack[self.frames[frame_idx].slot_base + slot] = value;
                }
                OpCode::GetGlobal => {
                    let name = self.read_string_constant(frame_idx);
                    let value = self.globals.get(name).ok_or_else(|| {
                        RuntimeError::UndefinedVariable(name.as_string().chars.to_string())
                    })?;
                    self.push(value);
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string_constant(frame_idx);
                    let value = self.peek(0);
                    self.globals.set(name, value);
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string_constant(frame_idx);
                    let value = self.peek(0);
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        return Err(RuntimeError::UndefinedVariable(
                            name.as_string().chars.to_string(),
                        ));
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let upvalue = self.frames[frame_idx].closure.as_closure().upvalues[slot];
                    let value = match upvalue.as_upvalue().location.get() {
                        UpvalueLocation::Open(stack_slot) => self.stack[stack_slot],
                        UpvalueLocation::Closed(value) => value,
                    };
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte(frame_idx) as usize;
                    let upvalue = self.frames[frame_idx].closure.as_closure().upvalues[slot];
                    let value = self.peek(0);
                    match upvalue.as_upvalue().location.get() {
                        UpvalueLocation::Open(stack_slot) => self.stack[stack_slot] = value,
                        UpvalueLocation::Closed(_) => {
                            upvalue.as_upvalue().location.set(UpvalueLocation::Closed(value));
                        }
                    }
                }
                OpCode::GetProperty => {
                    let name = self.read_string_constant(frame_idx);
                    self.get_property(name)?;
                }
                OpCode::SetProperty => {
                    let name = self.read_string_constant(frame_idx);
                    self.set_property(name)?;
                }
                OpCode::GetSuper => {
                    let name = self.read_string_constant(frame_idx);
                    let superclass =
                        self.pop().as_object().expect("GET_SUPER operand is always a class");
                    self.bind_method(superclass, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.binary_compare(|a, b| a > b)?,
                OpCode::Less => self.binary_compare(|a, b| a < b)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.binary_arithmetic(|a, b| a - b)?,
                OpCode::Multiply => self.binary_arithmetic(|a, b| a * b)?,
                OpCode::Divide => self.binary_arithmetic(|a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(!value.is_truthy()));
                }
                OpCode::Negate => {
                    let Some(n) = self.peek(0).as_number() else {
                        return Err(RuntimeError::OperandMustBeANumber);
                    };
                    self.pop();
                    self.push(Value::Number(-n));
                }
                OpCode::Print => {
                    let value = self.pop();
                    // A write failure here (e.g. a closed pipe) is not a
                    // language-level error; matching the C reference, we
                    // don't surface I/O errors through `RuntimeError`.
                    let _ = writeln!(self.stdout, "{value}");
                }
                OpCode::Jump => {
                    let offset = self.read_short(frame_idx);
                    self.frames[frame_idx].ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_short(frame_idx);
                    if !self.peek(0).is_truthy() {
                        self.frames[frame_idx].ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_short(frame_idx);
                    self.frames[frame_idx].ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte(frame_idx);
                    let callee = self.peek(arg_count as usize);
                    self.call_value(callee, arg_count)?;
                }
                OpCode::Invoke => {
                    let name = self.read_string_constant(frame_idx);
                    let arg_count = self.read_byte(frame_idx);
                    self.invoke(name, arg_count)?;
                }
                OpCode::SuperInvoke => {
                    let name = self.read_string_constant(frame_idx);
                    let arg_count = self.read_byte(frame_idx);
                    let superclass =
                        self.pop().as_object().expect("SUPER_INVOKE operand is always a class");
                    self.invoke_from_class(superclass, name, arg_count)?;
                }
                OpCode::Closure => self.closure(frame_idx),
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let slot_base = self.frames[frame_idx].slot_base;
                    self.close_upvalues(slot_base);
                    self.frames.pop();
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(slot_base);
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string_constant(frame_idx);
                    self.maybe_collect();
                    let class = self.heap.alloc_class(name);
                    self.push(Value::Object(class));
                }
                OpCode::Inherit => self.inherit()?,
                OpCode::Method => {
                    let name = self.read_string_constant(frame_idx);
                    self.method(name);
                }
            }
        }
    }

    fn binary_arithmetic(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(RuntimeError::OperandsMustBeNumbers);
        };
        self.pop();
        self.pop();
        self.push(Value::Number(op(a, b)));
        Ok(())
    }

    fn binary_compare(&mut self, op: impl Fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(RuntimeError::OperandsMustBeNumbers);
        };
        self.pop();
        self.pop();
        self.push(Value::Bool(op(a, b)));
        Ok(())
    }

    /// `ADD` additionally accepts two strings, allocating a fresh interned
    /// concatenation; the operands stay on the stack across that
    /// allocation so the collector can see them as roots.
    fn add(&mut self) -> Result<(), RuntimeError> {
        let b = self.peek(0);
        let a = self.peek(1);
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            self.pop();
            self.pop();
            self.push(Value::Number(x + y));
            return Ok(());
        }
        if a.is_string() && b.is_string() {
            let a_str = a.as_object().expect("checked is_string").as_string().chars.clone();
            let b_str = b.as_object().expect("checked is_string").as_string().chars.clone();
            self.maybe_collect();
            let concatenated = self.heap.intern_concat(&a_str, &b_str);
            self.pop();
            self.pop();
            self.push(Value::Object(concatenated));
            return Ok(());
        }
        Err(RuntimeError::OperandsMustBeNumbersOrStrings)
    }

    fn get_property(&mut self, name: GcRef) -> Result<(), RuntimeError> {
        let receiver = self.peek(0);
        let Some(instance_ref) = receiver.as_object().filter(|o| o.is_instance()) else {
            return Err(RuntimeError::OnlyInstancesHaveProperties);
        };
        let instance = instance_ref.as_instance();
        if let Some(value) = instance.fields.get(name) {
            self.pop();
            self.push(value);
            return Ok(());
        }
        self.bind_method(instance.class, name)
    }

    fn set_property(&mut self, name: GcRef) -> Result<(), RuntimeError> {
        let receiver = self.peek(1);
        let Some(instance_ref) = receiver.as_object().filter(|o| o.is_instance()) else {
            return Err(RuntimeError::OnlyInstancesHaveFields);
        };
        let value = self.peek(0);
        instance_ref.as_instance_mut().fields.set(name, value);
        let value = self.pop();
        self.pop();
        self.push(value);
        Ok(())
    }

    /// Looks up `name` in `class`'s method table and wraps the receiver
    /// (currently atop the stack) together with the found closure into a
    /// bound method, replacing the receiver in place.
    fn bind_method(&mut self, class: GcRef, name: GcRef) -> Result<(), RuntimeError> {
        let method = class.as_class().methods.get(name).ok_or_else(|| {
            RuntimeError::UndefinedProperty(name.as_string().chars.to_string())
        })?;
        let closure = method.as_object().expect("method table stores closure values");
        let receiver = self.peek(0);
        self.maybe_collect();
        let bound = self.heap.alloc_bound_method(receiver, closure);
        self.pop();
        self.push(Value::Object(bound));
        Ok(())
    }

    fn inherit(&mut self) -> Result<(), RuntimeError> {
        let subclass = self.peek(0);
        let superclass = self.peek(1);
        let Some(superclass) = superclass.as_object().filter(|o| o.is_class()) else {
            return Err(RuntimeError::SuperclassMustBeAClass);
        };
        let subclass = subclass.as_object().expect("INHERIT operand is always a class");
        let methods = superclass.as_class().methods.iter().collect::<Vec<_>>();
        for (name, value) in methods {
            subclass.as_class_mut().methods.set(name, value);
        }
        self.pop();
        Ok(())
    }

    fn method(&mut self, name: GcRef) {
        let method = self.peek(0);
        let class = self.peek(1).as_object().expect("METHOD runs inside a class body");
        class.as_class_mut().methods.set(name, method);
        self.pop();
    }

    fn closure(&mut self, frame_idx: usize) {
        let function = self
            .read_constant(frame_idx)
            .as_object()
            .expect("CLOSURE constant is always a function");
        let upvalue_count = function.as_function().upvalue_count;
        let mut upvalues = Vec::with_capacity(upvalue_count);
        for _ in 0..upvalue_count {
            let is_local = self.read_byte(frame_idx) != 0;
            let index = self.read_byte(frame_idx) as usize;
            if is_local {
                let slot = self.frames[frame_idx].slot_base + index;
                upvalues.push(self.capture_upvalue(slot));
            } else {
                upvalues.push(self.frames[frame_idx].closure.as_closure().upvalues[index]);
            }
        }
        self.maybe_collect();
        let closure = self.heap.alloc_closure(function, upvalues);
        self.push(Value::Object(closure));
    }

    /// Returns the existing open upvalue for `slot` if one exists,
    /// otherwise creates and inserts a new one, keeping `open_upvalues`
    /// sorted by descending slot.
    fn capture_upvalue(&mut self, slot: usize) -> GcRef {
        if let Some(existing) = self.open_upvalues.iter().find(|up| {
            matches!(up.as_upvalue().location.get(), UpvalueLocation::Open(s) if s == slot)
        }) {
            return *existing;
        }
        let insert_at = self
            .open_upvalues
            .iter()
            .position(|up| match up.as_upvalue().location.get() {
                UpvalueLocation::Open(s) => s < slot,
                UpvalueLocation::Closed(_) => true,
            })
            .unwrap_or(self.open_upvalues.len());
        self.maybe_collect();
        let upvalue = self.heap.alloc_upvalue(UpvalueLocation::Open(slot));
        self.open_upvalues.insert(insert_at, upvalue);
        upvalue
    }

    /// Closes every open upvalue pointing at or above `last`, copying the
    /// live stack value into the upvalue itself.
    fn close_upvalues(&mut self, last: usize) {
        while let Some(&upvalue) = self.open_upvalues.first() {
            let UpvalueLocation::Open(slot) = upvalue.as_upvalue().location.get() else {
                break;
            };
            if slot < last {
                break;
            }
            upvalue.as_upvalue().location.set(UpvalueLocation::Closed(self.stack[slot]));
            self.open_upvalues.remove(0);
        }
    }

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), RuntimeError> {
        let Some(obj) = callee.as_object() else {
            return Err(RuntimeError::NotCallable);
        };
        match obj.kind() {
            vela_object::ObjKind::Closure(_) => self.call_closure(obj, arg_count),
            vela_object::ObjKind::Native(native) => {
                let args_start = self.stack.len() - arg_count as usize;
                let result = (native.function)(&self.stack[args_start..])
                    .map_err(RuntimeError::NativeError)?;
                self.stack.truncate(args_start - 1);
                self.push(result);
                Ok(())
            }
            vela_object::ObjKind::Class(_) => {
                self.maybe_collect();
                let instance = self.heap.alloc_instance(obj);
                let slot = self.stack.len() - arg_count as usize - 1;
                self.stack[slot] = Value::Object(instance);
                self.maybe_collect();
                let init_name = self.heap.init_string();
                if let Some(initializer) = obj.as_class().methods.get(init_name) {
                    let initializer =
                        initializer.as_object().expect("method table stores closures");
                    return self.call_closure(initializer, arg_count);
                }
                if arg_count != 0 {
                    return Err(RuntimeError::ArityMismatch { expected: 0, got: arg_count });
                }
                Ok(())
            }
            vela_object::ObjKind::BoundMethod(bound) => {
                let receiver = bound.receiver;
                let method = bound.method;
                let slot = self.stack.len() - arg_count as usize - 1;
                self.stack[slot] = receiver;
                self.call_closure(method, arg_count)
            }
            _ => Err(RuntimeError::NotCallable),
        }
    }

    fn call_closure(&mut self, closure: GcRef, arg_count: u8) -> Result<(), RuntimeError> {
        let arity = closure.as_closure().function.as_function().arity;
        if arg_count != arity {
            return Err(RuntimeError::ArityMismatch { expected: arity, got: arg_count });
        }
        if self.frames.len() >= FRAMES_MAX || self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        let slot_base = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame { closure, ip: 0, slot_base });
        Ok(())
    }

    fn invoke(&mut self, name: GcRef, arg_count: u8) -> Result<(), RuntimeError> {
        let receiver = self.peek(arg_count as usize);
        let Some(instance_ref) = receiver.as_object().filter(|o| o.is_instance()) else {
            return Err(RuntimeError::OnlyInstancesHaveProperties);
        };
        let instance = instance_ref.as_instance();
        if let Some(field) = instance.fields.get(name) {
            let slot = self.stack.len() - arg_count as usize - 1;
            self.stack[slot] = field;
            return self.call_value(field, arg_count);
        }
        self.invoke_from_class(instance.class, name, arg_count)
    }

    fn invoke_from_class(
        &mut self,
        class: GcRef,
        name: GcRef,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        let method = class.as_class().methods.get(name).ok_or_else(|| {
            RuntimeError::UndefinedProperty(name.as_string().chars.to_string())
        })?;
        let closure = method.as_object().expect("method table stores closure values");
        self.call_closure(closure, arg_count)
    }

    /// Collects now if the heap says it's time, called immediately before
    /// every heap allocation the VM performs so `--stress-gc`'s "every
    /// allocation triggers a collection" holds at each individual
    /// allocation site rather than once per instruction.
    fn maybe_collect(&mut self) {
        if self.heap.should_collect() {
            self.collect_garbage();
        }
    }

    /// Marks every GC root reachable from live VM state, traces, sweeps
    /// the weak string table, then sweeps the heap.
    fn collect_garbage(&mut self) {
        for &value in &self.stack {
            self.heap.mark_value(value);
        }
        for frame in &self.frames {
            self.heap.mark_object(frame.closure);
        }
        for &upvalue in &self.open_upvalues {
            self.heap.mark_object(upvalue);
        }
        let globals: Vec<(GcRef, Value)> = self.globals.iter().collect();
        for (key, value) in globals {
            self.heap.mark_object(key);
            self.heap.mark_value(value);
        }
        self.heap.mark_compiler_roots();

        self.heap.trace_references();
        self.heap.sweep_strings();
        self.heap.sweep();
        self.heap.adjust_next_gc();
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
