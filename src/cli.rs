//! Command-line front-end: thin drivers over the `engine` whole-file helpers.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use engine::{delta_file, load_signature_file, patch_file, signature_file, JobError};
use protocol::Magic;
use signature::SignatureLayout;

#[derive(Parser)]
#[command(
    name = "rolldiff",
    version,
    about = "Compute and apply network deltas between two files",
    long_about = "Generate a compact signature of an old file, compute a delta \
                  from that signature to a new file, and patch the old file \
                  with the delta to reproduce the new one. Use '-' for stdin \
                  or stdout."
)]
struct Cli {
    /// Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Print operation statistics to stderr when done.
    #[arg(short, long, global = true)]
    stats: bool,

    /// Overwrite existing output files.
    #[arg(short, long, global = true)]
    force: bool,

    #[command(subcommand)]
    command: Operation,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum RollsumArg {
    /// Classic two-half rolling sum.
    Classic,
    /// RabinKarp rolling hash (recommended).
    Rabinkarp,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum HashArg {
    /// MD4; only for compatibility with old signatures.
    Md4,
    /// Keyed BLAKE2b (recommended).
    Blake2,
}

fn magic_for(rollsum: RollsumArg, hash: HashArg) -> Magic {
    match (rollsum, hash) {
        (RollsumArg::Classic, HashArg::Md4) => Magic::Md4Sig,
        (RollsumArg::Classic, HashArg::Blake2) => Magic::Blake2Sig,
        (RollsumArg::Rabinkarp, HashArg::Md4) => Magic::RkMd4Sig,
        (RollsumArg::Rabinkarp, HashArg::Blake2) => Magic::RkBlake2Sig,
    }
}

#[derive(Subcommand)]
enum Operation {
    /// Generate the signature of a basis file.
    Signature {
        /// Block size in bytes; scaled from the basis size when omitted.
        #[arg(short, long)]
        block_size: Option<u32>,

        /// Strong-sum bytes kept per block; sized from the basis when omitted.
        #[arg(short = 'S', long)]
        sum_size: Option<u32>,

        /// Rolling checksum variant.
        #[arg(short = 'R', long, value_enum, default_value = "rabinkarp")]
        rollsum: RollsumArg,

        /// Strong hash variant.
        #[arg(short = 'H', long, value_enum, default_value = "blake2")]
        hash: HashArg,

        /// Basis file ('-' for stdin).
        basis: String,

        /// Signature output ('-' or omitted for stdout).
        signature: Option<String>,
    },
    /// Compute a delta from a signature to a new file.
    Delta {
        /// Signature file ('-' for stdin).
        signature: String,

        /// New file ('-' or omitted for stdin).
        newfile: Option<String>,

        /// Delta output ('-' or omitted for stdout).
        delta: Option<String>,
    },
    /// Apply a delta to a basis file, reconstructing the new file.
    Patch {
        /// Basis file; must be a regular, seekable file.
        basis: String,

        /// Delta file ('-' or omitted for stdin).
        delta: Option<String>,

        /// Reconstructed output ('-' or omitted for stdout).
        newfile: Option<String>,
    },
}

/// Runs the CLI; split from `main` so tests can drive it with custom args.
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // clap renders its own help/version/usage output.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rolldiff: {err}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn exit_code_for(err: &JobError) -> u8 {
    match err {
        JobError::Param { .. } => 1,
        JobError::Io(_) => 3,
        _ => 2,
    }
}

fn is_stdio(name: Option<&str>) -> bool {
    matches!(name, None | Some("-"))
}

fn open_input(name: Option<&str>) -> io::Result<Box<dyn Read>> {
    if is_stdio(name) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        let file = File::open(name.expect("checked by is_stdio"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn open_output(name: Option<&str>, force: bool) -> io::Result<Box<dyn Write>> {
    if is_stdio(name) {
        Ok(Box::new(io::stdout().lock()))
    } else {
        let path = name.expect("checked by is_stdio");
        let file = if force {
            File::create(path)?
        } else {
            File::create_new(path)?
        };
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn dispatch(cli: &Cli) -> Result<(), JobError> {
    match &cli.command {
        Operation::Signature {
            block_size,
            sum_size,
            rollsum,
            hash,
            basis,
            signature,
        } => {
            let magic = magic_for(*rollsum, *hash);

            // Size the layout from the basis when it is a regular file.
            let basis_len = if is_stdio(Some(basis.as_str())) {
                None
            } else {
                std::fs::metadata(basis).ok().map(|meta| meta.len())
            };
            let recommended = SignatureLayout::recommended(magic, basis_len)?;
            let layout = SignatureLayout::new(
                magic,
                block_size.unwrap_or_else(|| recommended.block_len()),
                sum_size.unwrap_or_else(|| recommended.strong_len()),
            )?;

            let mut input = open_input(Some(basis.as_str()))?;
            let mut output = open_output(signature.as_deref(), cli.force)?;
            let stats = signature_file(&mut input, &mut output, layout)?;
            output.flush()?;
            if cli.stats {
                eprintln!("{stats}");
            }
            Ok(())
        }
        Operation::Delta {
            signature,
            newfile,
            delta,
        } => {
            let mut sig_in = open_input(Some(signature.as_str()))?;
            let (mut sig, load_stats) = load_signature_file(&mut sig_in)?;
            sig.build_index();
            if cli.stats {
                eprintln!("{load_stats}");
            }

            let mut input = open_input(newfile.as_deref())?;
            let mut output = open_output(delta.as_deref(), cli.force)?;
            let stats = delta_file(&sig, &mut input, &mut output)?;
            output.flush()?;
            if cli.stats {
                eprintln!("{stats}");
            }
            Ok(())
        }
        Operation::Patch {
            basis,
            delta,
            newfile,
        } => {
            let basis = File::open(basis).map_err(JobError::from)?;
            let mut delta_in = open_input(delta.as_deref())?;
            let mut output = open_output(newfile.as_deref(), cli.force)?;
            let stats = patch_file(basis, &mut delta_in, &mut output)?;
            output.flush()?;
            if cli.stats {
                eprintln!("{stats}");
            }
            Ok(())
        }
    }
}
