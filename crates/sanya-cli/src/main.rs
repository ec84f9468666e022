//! `sanya`: read a source program, compile it, run it (§6).
//!
//! Modeled on `wasmtime-cli`'s `src/bin/wasmtime.rs` minus everything
//! WASI/component-model specific: one optional positional argument (a
//! source path, falling back to stdin), no subcommands, no flags --
//! the three `SANYA_*` environment variables are the entire
//! configuration surface (§6).

mod config;

use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sanya_runtime::gc::ThreadState;
use sanya_runtime::heap::DEFAULT_SEMISPACE_SIZE;
use sanya_runtime::object::closure_info;
use sanya_runtime::printer::display_line;
use sanya_runtime::trampoline::call_main;

use config::Config;

/// Whole-program native-code compiler and runtime for the Sanya
/// language. Reads a single source file (or standard input, if no
/// path is given), compiles every top-level `define`, and runs `main`.
#[derive(Parser, Debug)]
#[command(name = "sanya", version, about)]
struct Args {
    /// Source file to compile and run. Reads from stdin if omitted.
    path: Option<PathBuf>,
}

fn init_logger(config: &Config) {
    let mut builder = env_logger::Builder::new();
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    } else if config.log_info {
        builder.filter_level(log::LevelFilter::Info);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    builder.init();
}

fn read_source(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display())),
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                log::warn!("reading source from an interactive stdin; end with EOF");
            }
            let mut source = String::new();
            stdin
                .read_to_string(&mut source)
                .context("failed to read source from stdin")?;
            Ok(source)
        }
    }
}

fn main() {
    let args = Args::parse();
    let config = Config::from_env();
    init_logger(&config);

    let source = match read_source(args.path.as_ref()) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("sanya: {err:#}");
            std::process::exit(1);
        }
    };

    let ts = ThreadState::init_global(DEFAULT_SEMISPACE_SIZE);

    let program = match sanya_frontend::parse_program(ts, &source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("sanya: parse error: {err}");
            std::process::exit(1);
        }
    };

    let main_closure = match sanya_jit::compile_program(ts, config.codegen, program) {
        Ok(closure) => closure,
        Err(sanya_jit::CodegenError::MissingMain) => {
            eprintln!("sanya: program does not define `main`");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("sanya: compile error: {err}");
            std::process::exit(1);
        }
    };

    // `compile_program` only returns `Ok` once `main` has a real info
    // block (it is the last function `module::compile_program` wires
    // up), so this is infallible in practice; the expect documents
    // that invariant rather than papering over a real failure mode.
    let info = closure_info(main_closure).expect("main must be compiled by compile_program");
    let code_ptr = info.code_ptr();

    // SAFETY: `code_ptr` was just emitted by `compile_program` for a
    // zero-argument function (enforced by `MainTakesArguments`), and
    // `main_closure` is the matching closure. No other Sanya code runs
    // concurrently (§5).
    let result = unsafe { call_main(ts, main_closure, code_ptr) };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = display_line(&mut out, result);
    let _ = out.flush();
}
