use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use vantage_core::arch::ArchName;
use vantage_core::error::DebuggerError;
use vantage_core::registers::fix_expression;
use vantage_core::regset::{register_set, BitFlags, RegisterSet};
use vantage_utils::{debug, init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel};

/// Inspect the architecture and register catalogs of the vantage debugger core.
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(version)]
#[command(about = "Inspect the architecture and register catalogs of the vantage debugger core", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Write logs to a dated file instead of the terminal
    #[arg(long, global = true, default_value_t = false)]
    log_file: bool,
    /// Directory for --log-file (default: ~/.vantage)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the supported architectures
    Archs,
    /// Show the register groups of an architecture
    Regs
    {
        /// Architecture name (see `vantage archs`)
        #[arg(short, long)]
        arch: ArchName,
    },
    /// Prefix register names in an expression with `$`
    Fix
    {
        /// Architecture name (see `vantage archs`)
        #[arg(short, long)]
        arch: ArchName,
        /// Expression to rewrite, e.g. `*(esp+4)`
        expression: String,
    },
    /// Decode a flag register value
    Flags
    {
        /// Architecture name (see `vantage archs`)
        #[arg(short, long)]
        arch: ArchName,
        /// Flag register (default: the first flag register of the architecture)
        #[arg(short, long)]
        reg: Option<String>,
        /// Register value (hex format: 0x246 or decimal)
        value: String,
    },
}

fn main()
{
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>>
{
    if cli.log_file {
        let path = init_logging_to_file(cli.log_dir.as_deref(), cli.log_level)?;
        debug!(log = %path.display(), "Logging to file");
        return Ok(());
    }
    match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty)?,
        None => init_logging()?,
    }
    Ok(())
}

fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    match cli.command {
        Commands::Archs => {
            println!("NAME         PTRSIZE");
            for arch in ArchName::ALL {
                let ptrsize = arch
                    .fixed_ptrsize()
                    .map_or_else(|| "-".to_string(), |size| size.to_string());
                println!("{:<12} {}", arch.as_str(), ptrsize);
            }
            Ok(())
        }
        Commands::Regs { arch } => {
            debug!(arch = %arch, "Describing register set");
            print!("{}", describe_register_set(arch, register_set(arch)));
            Ok(())
        }
        Commands::Fix { arch, expression } => {
            println!("{}", fix_expression(&expression, &register_set(arch).all()));
            Ok(())
        }
        Commands::Flags { arch, reg, value } => {
            let set = register_set(arch);
            let register = match reg {
                Some(register) => register,
                None => set
                    .flags
                    .first()
                    .map(|(name, _)| (*name).to_string())
                    .ok_or_else(|| DebuggerError::InvalidArgument(format!("{arch} has no flag register")))?,
            };
            let layout = set
                .flag_layout(&register)
                .ok_or_else(|| DebuggerError::InvalidArgument(format!("{register} is not a flag register of {arch}")))?;
            let value = parse_value(&value)?;
            println!("{register} = {value:#x} [ {} ]", render_flags(layout, value));
            Ok(())
        }
    }
}

/// Parse a register value given as `0x`-prefixed hex or decimal.
fn parse_value(text: &str) -> Result<u64, DebuggerError>
{
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| DebuggerError::InvalidArgument(format!("invalid value: {text}")))
}

/// Set single-bit flags in upper case, clear ones in lower case, wider
/// fields as `NAME=value`.
fn render_flags(layout: BitFlags, value: u64) -> String
{
    layout
        .iter()
        .map(|flag| {
            let field = flag.extract(value);
            if flag.width > 1 {
                format!("{}={field}", flag.name)
            } else if field == 1 {
                flag.name.to_uppercase()
            } else {
                flag.name.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn join(names: &[&str]) -> String
{
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(" ")
    }
}

fn describe_register_set(arch: ArchName, set: &RegisterSet) -> String
{
    let flags: Vec<&str> = set.flags.iter().map(|(name, _)| *name).collect();
    let extra_flags: Vec<&str> = set.extra_flags.iter().map(|(name, _)| *name).collect();

    let mut out = format!("=== Registers ({arch}) ===\n");
    out.push_str(&format!("{:<12} {}\n", "pc", set.pc));
    out.push_str(&format!("{:<12} {}\n", "stack", set.stack));
    out.push_str(&format!("{:<12} {}\n", "frame", set.frame.unwrap_or("-")));
    out.push_str(&format!("{:<12} {}\n", "retaddr", join(set.retaddr)));
    out.push_str(&format!("{:<12} {}\n", "flags", join(&flags)));
    out.push_str(&format!("{:<12} {}\n", "extra_flags", join(&extra_flags)));
    out.push_str(&format!("{:<12} {}\n", "gpr", join(set.gpr)));
    out.push_str(&format!("{:<12} {}\n", "misc", join(set.misc)));
    out.push_str(&format!("{:<12} {}\n", "args", join(set.args)));
    out.push_str(&format!("{:<12} {}\n", "retval", set.retval.unwrap_or("-")));
    out.push_str(&format!("{:<12} {}\n", "common", join(&set.common)));
    out.push_str(&format!("{:<12} {}\n", "all", join(&set.all())));
    out
}
