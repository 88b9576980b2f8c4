use clap::{Parser, Subcommand};
use cohort_core::{
    CohortService, CoreConfig, Failure, HttpPageFetcher, PageFetcher, RecordHandle,
    ReferenceGraphBuilder, RootTree,
};
use fhir::{Bundle, BundlePage};
use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "Cohort page walker and subject tree viewer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the subject tree of one Bundle
    Tree {
        /// Path to a Bundle JSON file, or an address on the configured FHIR server
        source: String,
    },
    /// Run a search and walk its pages
    Pages {
        /// Search, absolute or relative to COHORT_SOURCE_URL
        query: String,
        /// Stop after this many pages
        #[arg(long, default_value_t = 5)]
        max: usize,
    },
}

fn config_from_env() -> Result<CoreConfig, Box<dyn Error>> {
    Ok(CoreConfig::from_env_values(
        std::env::var("COHORT_SOURCE_URL").ok(),
        std::env::var("COHORT_PAGE_SIZE").ok(),
        std::env::var("COHORT_FETCH_TIMEOUT_SECS").ok(),
    )?)
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://") || source.contains('?')
}

/// Load one Bundle from a local file, or fetch it when `source` looks like a search address.
fn load_page(source: &str) -> Result<BundlePage, Box<dyn Error>> {
    if is_remote(source) && !std::path::Path::new(source).exists() {
        let fetcher = HttpPageFetcher::new(&config_from_env()?)?;
        return Ok(fetcher.fetch(source)?);
    }
    let text = std::fs::read_to_string(source)?;
    Ok(Bundle::parse_json(&text)?)
}

fn label(tree: &RootTree, handle: RecordHandle) -> String {
    tree.key(handle)
        .map(|key| key.to_string())
        .unwrap_or_else(|| "?".into())
}

fn render_tree(tree: &RootTree) -> String {
    let mut out = String::new();
    for subject in tree.subjects() {
        let _ = writeln!(out, "{}", label(tree, subject.patient()));
        if let Some(vital) = subject.vital_status() {
            let _ = writeln!(out, "  vital status: {}", label(tree, vital));
        }
        for condition in subject.conditions() {
            let _ = writeln!(out, "  {}", label(tree, condition.condition()));
            for impression in condition.impressions() {
                let _ = writeln!(out, "    {}", label(tree, impression.impression()));
            }
        }
        for &specimen in subject.specimens() {
            let _ = writeln!(out, "  {}", label(tree, specimen));
        }
    }
    out
}

/// Walk up to `max` pages of a fresh result, one line per page.
fn walk_pages(service: &CohortService, query: &str, max: usize) -> Result<Vec<String>, Failure> {
    let id = service.open_query(query)?;
    let stats = service.result_stats(&id)?;
    let mut lines = vec![format!(
        "Result {id}: {} records in {} pages",
        stats.total_size, stats.number_of_pages
    )];

    for n in 0..max {
        match service.page_tree(&id, n) {
            Ok(tree) => lines.push(format!(
                "Page {n}: {} records, {} subjects",
                tree.index().len(),
                tree.subjects().len()
            )),
            Err(e) if e.is_not_found() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(lines)
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Tree { source }) => match load_page(&source) {
            Ok(page) => {
                let tree = ReferenceGraphBuilder::build(page.records);
                if tree.subjects().is_empty() {
                    println!("No subjects found.");
                } else {
                    print!("{}", render_tree(&tree));
                }
            }
            Err(e) => eprintln!("Error loading {}: {}", source, e),
        },
        Some(Commands::Pages { query, max }) => {
            let service = CohortService::with_http(Arc::new(config_from_env()?))?;
            match walk_pages(&service, &query, max) {
                Ok(lines) => {
                    for line in lines {
                        println!("{}", line);
                    }
                }
                Err(e) => eprintln!("Error walking {}: {}", query, e),
            }
        }
        None => {
            println!("Use 'cohort --help' for commands");
        }
    }

    Ok(())
}
