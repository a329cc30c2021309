//! Brook - CLI
//!
//! Runs program files and writes the bundled sample programs.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, LevelFilter};

use brook_core::{ProgramLoader, VirtualMachine, VmConfig};
use brook_host::Sample;

#[derive(Parser, Debug)]
#[command(name = "brook")]
#[command(about = "Brook bytecode virtual machine")]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a program file and run it to HALT
    Run {
        file: PathBuf,

        /// Stop after this many instructions
        #[arg(long)]
        max_instructions: Option<u64>,

        /// Stack limit in slots
        #[arg(long)]
        max_stack: Option<usize>,
    },
    /// Write one of the sample programs
    Generate {
        /// factorial-iterative, factorial-recursive, closure, countdown or greeting
        sample: String,

        path: PathBuf,

        /// Parameter passed to the sample
        #[arg(short, long, default_value = "10")]
        n: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = verbosity(cli.verbose) {
        logger.filter_level(level);
    }
    logger.init();

    match cli.command {
        Command::Run {
            file,
            max_instructions,
            max_stack,
        } => run(file, max_instructions, max_stack),
        Command::Generate { sample, path, n } => generate(&sample, path, n),
    }
}

/// Level forced by `-v`; without it `RUST_LOG` decides, defaulting to warn
fn verbosity(count: u8) -> Option<LevelFilter> {
    match count {
        0 => None,
        1 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

fn run(file: PathBuf, max_instructions: Option<u64>, max_stack: Option<usize>) -> Result<()> {
    let bytes = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let program = ProgramLoader::load(&bytes, &brook_host::registry())
        .with_context(|| format!("invalid program {}", file.display()))?;

    let mut config = VmConfig::new();
    if let Some(slots) = max_stack {
        config = config.with_max_stack_size(slots);
    }
    if let Some(budget) = max_instructions {
        config = config.with_max_instructions(budget);
    }

    let mut vm = VirtualMachine::new(config, program);
    let result = vm.run().context("runtime error")?;
    info!("halted after {} instructions", vm.executed());
    println!("{result}");
    Ok(())
}

fn generate(name: &str, path: PathBuf, n: u16) -> Result<()> {
    let sample = Sample::from_name(name).ok_or_else(|| {
        let known: Vec<_> = Sample::ALL.iter().map(|s| s.name()).collect();
        anyhow!("unknown sample `{name}`, expected one of: {}", known.join(", "))
    })?;
    let program = sample.build(n)?;
    let bytes = ProgramLoader::encode(&program)?;
    fs::write(&path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {sample} ({} bytes) to {}", bytes.len(), path.display());
    Ok(())
}
