use clap::Parser as CParser;
use quad_asm::assembler::Assembler;
use quad_asm::parser::Parser;
use simplelog::{Config, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(CParser)]
#[command(name = "qas")]
#[command(about = "Quad machine assembler")]
struct Args {
    /// Assembly source file
    input: PathBuf,

    /// Where to write the assembled bytecode
    binary: PathBuf,

    /// Where to write the assembly listing
    log: PathBuf,

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
        Config::default(),
        TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
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
    // Read input file
    let input = fs::read_to_string(&args.input)?;

    // Assemble
    let ast = Parser::new(&input).parse()?;

    let mut assembler = Assembler::new();
    let assembly = assembler.assemble(&ast);

    // Write output files
    fs::write(&args.binary, &assembly.bytecode)?;
    fs::write(&args.log, assembly.listing.to_string())?;

    println!("Assembly complete");
    println!("Bytecode size: {} bytes", assembly.bytecode.len());

    Ok(())
}
