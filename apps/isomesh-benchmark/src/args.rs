//! Command-line options.

use std::path::PathBuf;

use anyhow::{bail, Context};

/// Options of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Mesher configuration file (TOML)
    pub config: Option<PathBuf>,
    /// World generation seed
    pub seed: u32,
    /// Horizontal chunk radius around the origin
    pub radius: i32,
    /// Lowest and highest chunk layer to mesh
    pub layers: (i32, i32),
    /// Worker threads (0 lets rayon decide)
    pub threads: usize,
    /// Times the region is meshed
    pub passes: usize,
    pub help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: None,
            seed: 42,
            radius: 4,
            layers: (0, 4),
            threads: 0,
            passes: 3,
            help: false,
        }
    }
}

impl Options {
    /// Parse the process arguments.
    pub fn from_args() -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        Self::parse_args(&args)
    }

    /// Parse from a slice of arguments; the first one is the program name.
    pub fn parse_args(args: &[String]) -> anyhow::Result<Self> {
        let mut options = Self::default();

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut value = || next_value(args, &mut i, flag);

            match flag {
                "-c" | "--config" => options.config = Some(PathBuf::from(value()?)),
                "-s" | "--seed" => options.seed = parse(flag, value()?)?,
                "-r" | "--radius" => options.radius = parse(flag, value()?)?,
                "-t" | "--threads" => options.threads = parse(flag, value()?)?,
                "-p" | "--passes" => options.passes = parse(flag, value()?)?,
                "--layers" => {
                    let raw = value()?;
                    let (low, high) = raw
                        .split_once(':')
                        .with_context(|| format!("--layers expects LOW:HIGH, got {raw:?}"))?;
                    options.layers = (parse(flag, low)?, parse(flag, high)?);
                }
                "-h" | "--help" => options.help = true,
                other => bail!("unknown argument {other:?} (try --help)"),
            }
            i += 1;
        }

        if options.radius < 0 {
            bail!("--radius must not be negative");
        }
        if options.layers.0 > options.layers.1 {
            bail!("--layers range is empty");
        }
        if options.passes == 0 {
            bail!("--passes must be at least 1");
        }
        Ok(options)
    }
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{flag} needs a value"))
}

fn parse<T>(flag: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("invalid value {raw:?} for {flag}"))
}

pub fn print_help() {
    eprintln!(
        "isomesh benchmark: mesh a generated terrain region

USAGE:
    cargo run --release -p isomesh-benchmark -- [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Mesher configuration (TOML); defaults are used otherwise
    -s, --seed <N>          World generation seed (default: 42)
    -r, --radius <N>        Horizontal chunk radius around the origin (default: 4)
    --layers <LOW:HIGH>     Vertical chunk layers to mesh, inclusive (default: 0:4)
    -t, --threads <N>       Worker threads, 0 for one per core (default: 0)
    -p, --passes <N>        Times the region is meshed (default: 3)
    -h, --help              Print this help message

EXAMPLES:
    # Larger region on four threads
    cargo run --release -p isomesh-benchmark -- --radius 8 --threads 4

    # Jittered vertices and better textures
    cargo run --release -p isomesh-benchmark -- --config mesh.toml

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
