//! rayo-simd CLI
//!
//! Probes the host, installs the best SIMD backend and verifies it against the
//! reference kernels, printing a timing table.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rayo::random::DEFAULT_SEED;
use rayo::registry;
use rayo::verify::{self, HarnessConfig, TestGroups};
use rayo::{detect, SimdContext};

#[derive(Parser)]
#[command(name = "rayo-simd")]
#[command(author, version, about = "Verify and time the selected SIMD backend")]
struct Cli {
    /// Bitmask of groups to run: 1 arithmetic, 2 linear algebra, 4 geometry, 8 audio
    #[arg(value_name = "GROUPS")]
    groups: Option<String>,

    /// Prefer this backend when the host supports it
    #[arg(short, long, env = "RAYO_FORCE_SIMD", value_name = "NAME")]
    force: Option<String>,

    /// Timed runs per operation
    #[arg(short, long, default_value_t = 2048)]
    iterations: usize,

    /// Element count for the flat-array operations
    #[arg(short, long, default_value_t = 1024)]
    count: usize,

    /// Seed for the generated inputs
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u32,

    /// List the backends and whether this host can run them, then exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    if cli.list {
        let caps = detect::detect();
        println!("Found {caps}");
        for descriptor in registry::registry() {
            let mark = if descriptor.supported_by(&caps) { "yes" } else { "no" };
            println!(
                "{:<8} requires [{}] supported: {mark}",
                descriptor.name(),
                descriptor.requires()
            );
        }
        return Ok(true);
    }

    let mut ctx = SimdContext::new();
    let report = ctx.init_best("rayo-simd", cli.force.as_deref());
    println!("{}", report.found_line());
    println!("{}", report.using_line());

    let config = HarnessConfig::new()
        .with_iterations(cli.iterations)
        .with_count(cli.count)
        .with_seed(cli.seed)
        .with_groups(TestGroups::parse(cli.groups.as_deref()));

    let candidate = ctx.processor()?;
    let stdout = io::stdout();
    let result =
        verify::verify(candidate, config, stdout.lock()).context("writing verification output")?;

    println!("{result}");
    for failure in result.failures() {
        println!("FAILED: {} (c = {})", failure.label, failure.count);
    }

    ctx.shutdown();
    Ok(result.all_passed())
}
