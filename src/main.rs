use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use coursedex::config::{self, EmbedderConfig};
use coursedex::dataset;
use coursedex::RetrievalService;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Build and query a course catalog vector index", long_about = None)]
struct Args {
    #[clap(flatten)]
    embedder: EmbedderConfig,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed every course in a dataset and persist the index
    Build {
        /// JSON array or JSON-lines file of course rows
        #[clap(long)]
        dataset: PathBuf,

        #[clap(long, default_value = "coursedex_index")]
        index_dir: PathBuf,
    },
    /// Print the courses closest to a free-text query
    Query {
        #[clap(long, default_value = "coursedex_index")]
        index_dir: PathBuf,

        #[clap(short, long, default_value = "5")]
        k: usize,

        text: String,
    },
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
    .with_env_filter(config::log_filter(directives.as_deref()))
    .with_target(false)
    .with_level(true)
    .with_writer(std::io::stderr)
    .init();
}

async fn run(args: Args) -> Result<(), String> {
    let provider = args.embedder.build_provider().map_err(|e| e.to_string())?;

    match args.command {
        Command::Build { dataset: path, index_dir } => {
            let records = dataset::load_dataset(&path).map_err(|e| e.to_string())?;
            let service = RetrievalService::new(provider);
            service.build(records).await.map_err(|e| {
                if e.is_rate_limited() {
                    format!("Build aborted, rate limit exceeded: {}", e)
                } else {
                    format!("Build failed: {}", e)
                }
            })?;
            service.persist(&index_dir).map_err(|e| e.to_string())?;
            println!("Indexed {} courses into {}", service.len(), index_dir.display());
            Ok(())
        }
        Command::Query { index_dir, k, text } => {
            let service = RetrievalService::load(provider, &index_dir).map_err(|e| e.to_string())?;
            match service.query_records(&text, k).await {
                Ok(hits) if hits.is_empty() => {
                    println!("No results found.");
                    Ok(())
                }
                Ok(hits) => {
                    for (rank, (record, distance)) in hits.iter().enumerate() {
                        println!("{:>2}. {} (dist: {:.4})", rank + 1, record.title, distance);
                    }
                    Ok(())
                }
                Err(e) if e.is_try_again_later() => Err(format!("[retry later] {}", e)),
                Err(e) => Err(e.to_string()),
            }
        }
    }
}
