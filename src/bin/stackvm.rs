//! Assembles and runs stack machine programs.
//!
//! # Usage
//! ```text
//! stackvm <input.asm> [OPTIONS]
//! stackvm --hex <bytecode> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.asm`: Assembly source file to run
//!
//! # Options
//! - `-x, --hex <bytecode>`: Run hex-encoded bytecode instead of a source file
//! - `-o, --output <file>`: Also write the assembled bytecode to a file
//! - `-d, --disassemble`: Print the disassembly before running
//! - `--capacity <n>`: Stack capacity (defaults to 1024)
//! - `--max-steps <n>`: Abort after executing `n` instructions
//! - `--log-level <level>`: debug, info, warn or error (defaults to info)
//! - `--no-timestamp`: Omit timestamps from log lines
//!
//! # Examples
//! ```text
//! stackvm program.asm
//! stackvm program.asm -o program.bin --max-steps 1000
//! stackvm --hex 0x600260001501
//! ```

use stackvm::types::bytecode::Bytecode;
use stackvm::utils::log::{self, Level};
use stackvm::virtual_machine::assembler::{assemble_file, disassemble};
use stackvm::virtual_machine::machine::{Machine, MachineConfig};
use stackvm::{error, info};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::atomic::Ordering;

enum Input {
    Source(String),
    Hex(String),
}

struct Options {
    input: Input,
    output: Option<String>,
    disassemble: bool,
    config: MachineConfig,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let options = parse_args(&args);

    let code = match &options.input {
        Input::Source(path) => {
            if !Path::new(path).exists() {
                error!("Input file does not exist: {}", path);
                process::exit(1);
            }
            // assemble_file already logged read and assembly failures.
            assemble_file(path).unwrap_or_else(|_| process::exit(1))
        }
        Input::Hex(text) => Bytecode::from_hex(text).unwrap_or_else(|e| {
            error!("{}", e);
            process::exit(1);
        }),
    };

    if let Some(output) = &options.output {
        if let Err(e) = fs::write(output, code.as_slice()) {
            error!("Failed to write output file: {}", e);
            process::exit(1);
        }
        info!("Wrote {} bytes to {}", code.len(), output);
    }

    if options.disassemble {
        print!("{}", disassemble(&code));
    }

    let mut machine = Machine::with_config(options.config);
    if let Err(e) = machine.execute(code) {
        error!(
            "Execution failed after {} steps at offset {}: {}",
            machine.steps(),
            machine.pc(),
            e
        );
        print_stack(&machine);
        process::exit(1);
    }

    info!("Halted after {} steps", machine.steps());
    print_stack(&machine);
}

/// Parses the command line, exiting on invalid arguments.
fn parse_args(args: &[String]) -> Options {
    let mut input: Option<Input> = None;
    let mut output = None;
    let mut disassemble = false;
    let mut config = MachineConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--hex" | "-x") => input = Some(Input::Hex(value_of(args, &mut i, k))),
            k @ ("--output" | "-o") => output = Some(value_of(args, &mut i, k)),
            "--disassemble" | "-d" => disassemble = true,
            k @ "--capacity" => {
                config = config.with_stack_capacity(parse_number(&value_of(args, &mut i, k), k))
            }
            k @ "--max-steps" => {
                config = config.with_step_limit(parse_number(&value_of(args, &mut i, k), k))
            }
            k @ "--log-level" => {
                let level = value_of(args, &mut i, k)
                    .parse::<Level>()
                    .unwrap_or_else(|e| {
                        error!("{}", e);
                        process::exit(1);
                    });
                log::set_max_level(level);
            }
            "--no-timestamp" => log::SHOW_TIMESTAMP.store(false, Ordering::Relaxed),
            other if !other.starts_with('-') && input.is_none() => {
                input = Some(Input::Source(other.to_string()))
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let Some(input) = input else {
        error!("No input given");
        print_usage(&args[0]);
        process::exit(1);
    };

    Options {
        input,
        output,
        disassemble,
        config,
    }
}

/// Returns the argument following flag `k`, exiting if it is missing.
fn value_of(args: &[String], i: &mut usize, k: &str) -> String {
    *i += 1;
    args.get(*i).cloned().unwrap_or_else(|| {
        error!("{k} requires an argument");
        process::exit(1);
    })
}

fn parse_number<T: std::str::FromStr>(text: &str, k: &str) -> T {
    text.parse::<T>().unwrap_or_else(|_| {
        error!("Invalid value for {k}: '{text}' is not a valid number");
        process::exit(1);
    })
}

/// Prints the stack top-first, one word per line.
fn print_stack(machine: &Machine) {
    let stack = machine.stack();
    println!("stack ({} of {}):", stack.size(), stack.capacity());
    for (depth, word) in stack.iter().enumerate() {
        println!("{:>4}: {}", depth, word);
    }
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {program} <input.asm> [OPTIONS]
       {program} --hex <bytecode> [OPTIONS]

Options:
  -x, --hex <bytecode>    Run hex-encoded bytecode instead of a source file
  -o, --output <file>     Also write the assembled bytecode to a file
  -d, --disassemble       Print the disassembly before running
      --capacity <n>      Stack capacity (default 1024)
      --max-steps <n>     Abort after executing n instructions
      --log-level <level> debug, info, warn or error (default info)
      --no-timestamp      Omit timestamps from log lines"
    );
}
