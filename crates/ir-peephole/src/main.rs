use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use ir_peephole::{count_calls_in_source, simplify_source, PeepholeOptions};
use log::{info, LevelFilter};
use std::fs;
use std::path::PathBuf;

/// ir-peephole — remove `add x, 0` / `mul x, 1` from a text IR module, or
/// report its call sites.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input IR module (.ll)
    input: PathBuf,

    /// Where to write the simplified module. Without it, call-site counts
    /// are printed instead.
    output: Option<PathBuf>,

    /// Check def-use integrity before and after the pass
    #[arg(long)]
    verify: bool,

    /// Widest constant (in bits) treated as an identity element
    #[arg(long, default_value_t = 32)]
    max_identity_bits: u32,

    /// Increase logging verbosity (can be used multiple times)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (can be used multiple times)
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,
}

fn init_logging(verbose: u8, quiet: u8) {
    let levels = [
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    let base_idx = 1i8; // warn
    let adjusted =
        (base_idx + verbose as i8 - quiet as i8).clamp(0, (levels.len() - 1) as i8) as usize;

    env_logger::Builder::from_default_env()
        .format_target(false)
        .filter_level(levels[adjusted])
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    match &cli.output {
        Some(output_path) => {
            info!("simplifying {}", cli.input.display());
            let options = PeepholeOptions {
                max_identity_bits: cli.max_identity_bits,
                verify: cli.verify,
            };
            let (text, stats) = simplify_source(&source, &options)
                .with_context(|| format!("failed to simplify {}", cli.input.display()))?;
            fs::write(output_path, text)
                .with_context(|| format!("failed to write {}", output_path.display()))?;
            info!(
                "eliminated {} instruction(s), wrote {}",
                stats.eliminated,
                output_path.display()
            );
        }
        None => {
            let lines = count_calls_in_source(&source)
                .with_context(|| format!("failed to analyze {}", cli.input.display()))?;
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["ir-peephole", "input.ll"]);
        assert_eq!(cli.input, PathBuf::from("input.ll"));
        assert!(cli.output.is_none());
        assert!(!cli.verify);
        assert_eq!(cli.max_identity_bits, 32);
        assert_eq!((cli.verbose, cli.quiet), (0, 0));
    }

    #[test]
    fn cli_parses_output_and_flags() {
        let cli = Cli::parse_from(["ir-peephole", "-vv", "--verify", "in.ll", "out.ll"]);
        assert_eq!(cli.output, Some(PathBuf::from("out.ll")));
        assert!(cli.verify);
        assert_eq!(cli.verbose, 2);
    }
}
