//! Benchmark driver for the cache-line minimal perfect hash.
//!
//! Generates a deterministic key set, builds the monomorphized variant
//! selected on the command line, self-checks perfection and minimality,
//! times a member-key query plan, and emits one machine-readable RESULT
//! line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::time::Instant;

use linehash::Mphf;

mod keygen;

#[derive(Debug, Parser)]
#[command(name = "linehash")]
#[command(about = "Cache-line minimal perfect hashing toolkit", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Construct a hash function over synthetic keys and measure it
    Bench(BenchArgs),
}

#[derive(Debug, Parser)]
struct BenchArgs {
    /// Number of keys to construct with (supports k/m/g suffixes)
    #[arg(short = 'n', long, default_value = "1000000", value_parser = parse_count)]
    num_objects: usize,

    /// Number of queries to measure (supports k/m/g suffixes)
    #[arg(short = 'q', long, default_value = "1000000", value_parser = parse_count)]
    num_queries: usize,

    /// Cache line size in bits (64, 128, 256, 512, or 1024)
    #[arg(short = 'l', long, default_value_t = 256)]
    line_size: usize,

    /// Offset field width in bits (16 or 32)
    #[arg(short = 'o', long, default_value_t = 16)]
    offset_size: usize,

    /// Load factor: level-0 bits per key
    #[arg(short = 'g', long, default_value_t = linehash::DEFAULT_GAMMA)]
    gamma: f64,

    /// Seed for reproducible key generation (entropy-seeded when absent)
    #[arg(short = 's', long)]
    seed: Option<u64>,
}

/// Parse a count like "1000000", "250k", "16M", "1g" (case insensitive,
/// binary multiples).
fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.trim().to_lowercase();

    if let Ok(n) = s.parse::<usize>() {
        return Ok(n);
    }

    let (num_str, unit) = if let Some(n) = s.strip_suffix('g') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('k') {
        (n, 1024)
    } else {
        return Err(format!(
            "invalid count '{}'; use a plain number or a k/m/g suffix",
            s
        ));
    };

    num_str
        .trim()
        .parse::<usize>()
        .map(|n| n * unit)
        .map_err(|_| format!("invalid number in count '{}'", s))
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let result = match cli.command {
        Command::Bench(args) => bench(&args),
    };
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn bench(args: &BenchArgs) -> Result<()> {
    match (args.line_size, args.offset_size) {
        (64, 16) => run::<1, 16>(args),
        (128, 16) => run::<2, 16>(args),
        (256, 16) => run::<4, 16>(args),
        (512, 16) => run::<8, 16>(args),
        (1024, 16) => run::<16, 16>(args),
        (64, 32) => run::<1, 32>(args),
        (128, 32) => run::<2, 32>(args),
        (256, 32) => run::<4, 32>(args),
        (512, 32) => run::<8, 32>(args),
        (1024, 32) => run::<16, 32>(args),
        (l, o) => bail!(
            "unsupported line/offset combination {}x{}; line size must be one of \
             64/128/256/512/1024 and offset size 16 or 32",
            l,
            o
        ),
    }
}

fn run<const W: usize, const O: usize>(args: &BenchArgs) -> Result<()> {
    if !args.gamma.is_finite() || args.gamma <= 1.0 {
        bail!("gamma must be finite and greater than 1.0");
    }

    eprintln!(
        "Generating {} keys{}",
        args.num_objects,
        match args.seed {
            Some(s) => format!(" (seed {s})"),
            None => String::new(),
        }
    );
    let keys = keygen::distinct_digests(args.num_objects, args.seed);

    eprintln!("Constructing");
    let start = Instant::now();
    let mph = Mphf::<W, O>::from_digests(keys.clone(), args.gamma)
        .context("construction failed")?;
    let construction_ms = start.elapsed().as_millis();

    // Self-check: every key must map to a distinct value in [0, N).
    let mut taken = vec![false; keys.len()];
    for (i, &key) in keys.iter().enumerate() {
        let Some(value) = mph.index_u64(key) else {
            bail!("key {i} missed every level");
        };
        if value >= keys.len() {
            bail!("key {i} mapped out of range ({value})");
        }
        if taken[value] {
            bail!("collision: two keys mapped to {value}");
        }
        taken[value] = true;
    }

    let plan = keygen::query_plan(&keys, args.num_queries, args.seed);

    eprintln!("Querying");
    let start = Instant::now();
    let mut sink = 0usize;
    for &key in &plan {
        sink = sink.wrapping_add(mph.index_u64(key).unwrap_or(usize::MAX));
    }
    let query_ms = start.elapsed().as_millis();
    std::hint::black_box(sink);

    println!(
        "RESULT method=linehash gamma={} lineSize={} offsetSize={} N={} numQueries={} \
         queryTimeMilliseconds={} constructionTimeMilliseconds={} bitsPerElement={}",
        args.gamma,
        64 * W,
        O,
        args.num_objects,
        args.num_queries,
        query_ms,
        construction_ms,
        mph.bits() as f64 / args.num_objects.max(1) as f64,
    );
    Ok(())
}
