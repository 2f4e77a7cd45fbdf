use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as cParser;
use tracing_subscriber::filter::LevelFilter;

#[derive(cParser, Debug)]
#[command(version, about = "Compile an Oberon subset to 8086 assembly")]
struct Args {
    /// Source file, the outputs are written next to it as .tac and .asm
    input: PathBuf,

    /// More log output, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match oberon_c::compile_file(&args.input) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(1)
        }
    }
}
