// SPDX-License-Identifier: GPL-3.0-or-later

//! Command-line driver for the L scripting language: a REPL when invoked
//! with no script, or file-mode execution when given one.
//!
//! Grounded in the clap/tracing-subscriber wiring of a typical derive-based
//! CLI: a single flat [`Cli`] struct (no subcommands, since this binary has
//! exactly one job), global flags for the developer aids, and a registry
//! of `tracing_subscriber` layers initialized before anything else runs.

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vela_vm::{InterpretError, Vm};

/// Exit code for a successful run.
const EX_OK: u8 = 0;
/// Exit code for a compile-time error (mirrors `sysexits.h`'s `EX_DATAERR`).
const EX_COMPILE_ERROR: u8 = 65;
/// Exit code for a runtime error (`EX_SOFTWARE`).
const EX_RUNTIME_ERROR: u8 = 70;
/// Exit code for a file that could not be read (`EX_IOERR`).
const EX_IO_ERROR: u8 = 74;

/// Interpreter for the L scripting language: compiles and runs a script
/// file, or starts an interactive REPL when none is given.
#[derive(Parser, Debug)]
#[command(name = "vela")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interpreter for the L scripting language", long_about = None)]
struct Cli {
    /// Script to run. Omit to start an interactive REPL.
    script: Option<PathBuf>,

    /// Disassemble every compiled chunk to stderr before running it.
    #[arg(short = 'd', long)]
    dump_bytecode: bool,

    /// Force a garbage collection before every heap allocation, to shake
    /// out GC bugs that only a lucky allocation timing would otherwise hit.
    #[arg(long)]
    stress_gc: bool,

    /// Overrides `RUST_LOG` for this run (e.g. `debug`, `vela_vm=trace`).
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let mut vm = Vm::new();
    vm.set_stress_gc(cli.stress_gc);

    match cli.script {
        Some(path) => run_file(&mut vm, &path, cli.dump_bytecode),
        None => run_repl(&mut vm, cli.dump_bytecode),
    }
}

fn init_logging(log_level: Option<&str>) {
    let filter = log_level.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        EnvFilter::new,
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false).with_thread_names(false))
        .init();
}

/// Reads `path` whole and interprets it, mapping the outcome to the
/// process's exit code contract.
fn run_file(vm: &mut Vm, path: &PathBuf, dump_bytecode: bool) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file \"{}\": {err}", path.display());
            return ExitCode::from(EX_IO_ERROR);
        }
    };

    let result =
        if dump_bytecode { vm.interpret_dumping(&source) } else { vm.interpret(&source) };

    match result {
        Ok(()) => ExitCode::from(EX_OK),
        Err(InterpretError::Compile) => ExitCode::from(EX_COMPILE_ERROR),
        Err(InterpretError::Runtime(_)) => ExitCode::from(EX_RUNTIME_ERROR),
    }
}

/// Interactive read-eval-print loop: one line of source per prompt. A
/// compile or runtime error is reported (by [`Vm::interpret`] itself, to
/// stderr) and the loop simply continues with a fresh prompt.
fn run_repl(vm: &mut Vm, dump_bytecode: bool) -> ExitCode {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::from(EX_IO_ERROR);
        }

        let Some(line) = lines.next() else {
            println!();
            return ExitCode::from(EX_OK);
        };
        let Ok(line) = line else {
            return ExitCode::from(EX_IO_ERROR);
        };

        let _ = if dump_bytecode { vm.interpret_dumping(&line) } else { vm.interpret(&line) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_repl_mode() {
        let cli = Cli::parse_from(["vela"]);
        assert_eq!(cli.script, None);
        assert!(!cli.dump_bytecode);
        assert!(!cli.stress_gc);
    }

    #[test]
    fn a_bare_path_argument_selects_file_mode() {
        let cli = Cli::parse_from(["vela", "program.l"]);
        assert_eq!(cli.script, Some(PathBuf::from("program.l")));
    }

    #[test]
    fn dump_bytecode_accepts_both_its_long_and_short_form() {
        assert!(Cli::parse_from(["vela", "-d", "a.l"]).dump_bytecode);
        assert!(Cli::parse_from(["vela", "--dump-bytecode", "a.l"]).dump_bytecode);
    }

    #[test]
    fn stress_gc_is_off_by_default() {
        let cli = Cli::parse_from(["vela", "a.l"]);
        assert!(!cli.stress_gc);
        assert!(Cli::parse_from(["vela", "--stress-gc", "a.l"]).stress_gc);
    }
}
