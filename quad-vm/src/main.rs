use clap::Parser;
use quad_vm::runtime::disasm;
use quad_vm::{Config, VM, VmError, WritePolicy};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "qvm")]
#[command(about = "Quad machine bytecode interpreter")]
struct Args {
    /// Assembled bytecode file
    binary: PathBuf,

    /// Where to write the final memory contents (JSON)
    output: PathBuf,

    /// Number of memory cells to run with
    #[arg(allow_negative_numbers = true)]
    memory_size: i64,

    /// Fail on writes past the end of memory instead of keeping them aside
    #[arg(long)]
    strict_writes: bool,

    /// Print the disassembled program before running it
    #[arg(long)]
    disasm: bool,

    /// Enable trace logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .ok();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let memory_size = usize::try_from(args.memory_size).map_err(|_| VmError::InvalidMemorySize)?;
    let write_policy = if args.strict_writes {
        WritePolicy::Strict
    } else {
        WritePolicy::Extend
    };
    let config = Config::new(memory_size)?.with_write_policy(write_policy);

    let code = fs::read(&args.binary)?;

    if args.disasm {
        for line in disasm::disasm_program(&code) {
            println!("{}", line);
        }
    }

    let result = VM::run_with(config, &code)?;

    fs::write(&args.output, serde_json::to_string_pretty(&result)?)?;

    println!("Execution complete");
    println!("Result written to {}", args.output.display());

    Ok(())
}
