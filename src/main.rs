use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use icarus::config::DEFAULT_LINES_PER_CHUNK;
use icarus::dump::{ChunkOptions, Compression, WikidataJsonDump};
use icarus::entity::{Entity, Terms};
use icarus::scan::{self, ScanOptions, TruthyFilter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "icarus")]
#[command(about = "Stream, filter and chunk Wikidata JSON dumps")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count entities by type, optionally keeping those matching a truthy claim
    Scan(ScanArgs),
    /// Split a dump into independently readable chunk files
    Chunk(ChunkArgs),
    /// Print a one-line summary of each entity
    Show(ShowArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Path to the dump file (.json, .json.gz or .json.bz2)
    #[arg(short, long)]
    input: PathBuf,

    /// Limit number of entities to scan
    #[arg(long)]
    limit: Option<u64>,

    /// Property id of the truthy filter (e.g. P31)
    #[arg(long, requires = "value")]
    property: Option<String>,

    /// Entity id the property must point at (e.g. Q5)
    #[arg(long, requires = "property")]
    value: Option<String>,

    /// Write matching entities to this dump file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChunkCompression {
    None,
    Gz,
    Bz2,
}

impl From<ChunkCompression> for Compression {
    fn from(c: ChunkCompression) -> Self {
        match c {
            ChunkCompression::None => Compression::None,
            ChunkCompression::Gz => Compression::Gzip,
            ChunkCompression::Bz2 => Compression::Bzip2,
        }
    }
}

#[derive(Args)]
struct ChunkArgs {
    /// Path to the dump file (.json, .json.gz or .json.bz2)
    #[arg(short, long)]
    input: PathBuf,

    /// Entities per chunk
    #[arg(long, default_value_t = DEFAULT_LINES_PER_CHUNK)]
    lines_per_chunk: usize,

    /// Stop after this many chunks
    #[arg(long)]
    max_chunks: Option<usize>,

    /// Chunk name prefix (defaults to the input path without its extension)
    #[arg(long)]
    out_base: Option<PathBuf>,

    /// Chunk compression (defaults to the input's)
    #[arg(long, value_enum)]
    compression: Option<ChunkCompression>,
}

#[derive(Args)]
struct ShowArgs {
    /// Path to the dump file (.json, .json.gz or .json.bz2)
    #[arg(short, long)]
    input: PathBuf,

    /// Limit number of entities to print
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Also print label and description in this language
    #[arg(long)]
    lang: Option<String>,
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let filter = match (args.property, args.value) {
        (Some(property), Some(value)) => Some(TruthyFilter::new(property, value)),
        _ => None,
    };
    let options = ScanOptions {
        limit: args.limit,
        filter,
        output: args.output,
    };

    let start = Instant::now();
    let stats = scan::scan_dump(&args.input, &options)?;
    let duration = start.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Scan time:          {:.2}s", duration.as_secs_f64());
    println!();
    println!("Lines read:         {}", stats.lines());
    println!("Items:              {}", stats.items());
    println!("Properties:         {}", stats.properties());
    println!("Lexemes:            {}", stats.lexemes());
    println!("Malformed:          {}", stats.malformed());
    println!("Matched:            {}", stats.matched());

    Ok(())
}

fn run_chunk(args: ChunkArgs) -> Result<()> {
    let dump = WikidataJsonDump::new(&args.input)
        .with_context(|| format!("Unsupported dump file: {}", args.input.display()))?;

    let options = ChunkOptions {
        lines_per_chunk: args.lines_per_chunk,
        max_chunks: args.max_chunks,
        out_base: args.out_base,
        compression: args.compression.map(Compression::from),
    };

    let start = Instant::now();
    let chunks = dump
        .create_chunks_with(&options)
        .with_context(|| format!("Failed to chunk dump: {}", args.input.display()))?;
    info!(
        duration_secs = start.elapsed().as_secs_f64(),
        chunks = chunks.len(),
        "Chunks written"
    );

    for path in &chunks {
        println!("{}", path.display());
    }

    Ok(())
}

fn run_show(args: ShowArgs) -> Result<()> {
    let dump = WikidataJsonDump::new(&args.input)
        .with_context(|| format!("Unsupported dump file: {}", args.input.display()))?;
    let reader = dump
        .open()
        .with_context(|| format!("Failed to open dump at: {}", args.input.display()))?;

    for result in reader.take(args.limit) {
        let raw = match result {
            Ok(raw) => raw,
            Err(icarus::Error::MalformedDumpLine { line_number, reason }) => {
                warn!(line_number, reason = %reason, "Skipping malformed line");
                continue;
            }
            Err(e) => return Err(e).context("Failed reading dump"),
        };
        let entity = match Entity::from_value(raw) {
            Ok(entity) => entity,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable entity");
                continue;
            }
        };

        println!("{entity}");
        if let Some(lang) = &args.lang {
            match &entity {
                Entity::Item(item) => {
                    println!("  {lang}: {} / {}", item.get_label(lang), item.get_description(lang))
                }
                Entity::Property(property) => println!(
                    "  {lang}: {} / {}",
                    property.get_label(lang),
                    property.get_description(lang)
                ),
                Entity::Lexeme(lexeme) => println!("  {lang}: {}", lexeme.get_lemma(lang)),
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Chunk(args) => run_chunk(args),
        Commands::Show(args) => run_show(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
