use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use coursedex::config::{self, EmbedderConfig};
use coursedex::RetrievalService;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Interactive course search", long_about = None)]
struct Args {
    #[clap(flatten)]
    embedder: EmbedderConfig,

    #[clap(long, default_value = "coursedex_index")]
    index_dir: PathBuf,

    #[clap(short, long, default_value = "5")]
    k: usize,
}

#[derive(Debug, PartialEq)]
enum Input {
    Query(String),
    SetK(usize),
    Help,
    Exit,
    Empty,
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Input::Query(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("k"), Some(n), None) => match n.parse::<usize>() {
            Ok(k) if k > 0 => Input::SetK(k),
            _ => Input::Invalid(format!("k must be a positive integer, got '{}'", n)),
        },
        (Some("help"), None, None) => Input::Help,
        (Some("quit" | "exit" | "q"), None, None) => Input::Exit,
        _ => Input::Invalid(format!("unknown command ':{}'", command)),
    }
}

fn main() -> ExitCode {
    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
    .with_env_filter(config::log_filter(directives.as_deref()))
    .with_target(false)
    .with_level(true)
    .with_writer(io::stderr)
    .init();

    let args = Args::parse();
    print_banner();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = match args
        .embedder
        .build_provider()
        .and_then(|provider| RetrievalService::load(provider, &args.index_dir))
    {
        Ok(service) => service,
        Err(e) => {
            println!("[\u{2717}] Could not open index at {}: {}", args.index_dir.display(), e);
            println!("    Run 'coursedex build --dataset <file>' first.");
            return ExitCode::FAILURE;
        }
    };
    println!("[\u{2713}] Loaded {} courses. Type ':help' for commands.\n", service.len());

    let stdin = io::stdin();
    let mut buffer = String::new();
    let mut k = args.k.max(1);

    loop {
        print!("courses> ");
        if io::stdout().flush().is_err() { break; }
        buffer.clear();

        match stdin.read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        match parse_input(&buffer) {
            Input::Empty => continue,
            Input::Help => print_help(),
            Input::Exit => break,
            Input::SetK(n) => {
                k = n;
                println!("Showing top {} results.", k);
            }
            Input::Invalid(msg) => println!("[\u{2717}] {}", msg),
            Input::Query(text) => match runtime.block_on(service.query_records(&text, k)) {
                Ok(hits) if hits.is_empty() => println!("No results found.\n"),
                Ok(hits) => {
                    println!("\nResults:");
                    for (record, distance) in hits {
                        println!("  \u{2022} {} (dist: {:.4})", record.title, distance);
                        if !record.description.is_empty() {
                            println!("    {}", truncate(&record.description, 100));
                        }
                    }
                    println!();
                }
                Err(e) if e.is_try_again_later() => println!("[\u{23f3}] {}\n", e),
                Err(e) => println!("[\u{26a0}\u{fe0f} Error] {}\n", e),
            },
        }
    }
    ExitCode::SUCCESS
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn print_banner() {
    println!("\n==================================================");
    println!("   coursedex - search your course catalog");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("<text>     Search for courses matching the text");
    println!(":k <n>     Number of results to show");
    println!(":help      This message");
    println!(":quit      Exit\n");
}
