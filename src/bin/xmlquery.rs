//! Command-line front end: run validated `XPath` or CSS queries over XML
//! files.
//!
//! ```text
//! xmlquery --css 'library > book.fiction' books.xml
//! xmlquery --xpath '//book/title' --count books.xml
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, Level};

use xmlguard::parser::{ExternalEntityRequest, ParseOptions};
use xmlguard::query::{self, parse_limit, ConfigError, QueryKind, ValidationCache, ValidationConfig};
use xmlguard::Document;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// xmlquery -- query XML files with validated XPath or CSS selectors.
#[derive(Parser, Debug)]
#[command(name = "xmlquery", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// XML files to query (use `-` for stdin).
    #[arg(required = true)]
    files: Vec<String>,

    /// `XPath` 1.0 expression to evaluate.
    #[arg(long, value_name = "EXPR", conflicts_with = "css", required_unless_present = "css")]
    xpath: Option<String>,

    /// CSS selector to match.
    #[arg(long, value_name = "SELECTOR")]
    css: Option<String>,

    /// Print only the first match.
    #[arg(long)]
    first: bool,

    /// Print the number of matches instead of the nodes.
    #[arg(long, conflicts_with = "first")]
    count: bool,

    /// Re-validate every expression instead of caching verdicts.
    #[arg(long)]
    no_cache: bool,

    /// Maximum expression length in characters (0 = unlimited).
    #[arg(long, value_name = "N")]
    max_length: Option<String>,

    /// Maximum number of cached validation verdicts.
    #[arg(long, value_name = "N")]
    cache_size: Option<String>,

    /// Resolve external entities from files next to the document.
    #[arg(long)]
    allow_external_entities: bool,

    /// Log cache activity and parse diagnostics to stderr.
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn selector(&self) -> (&str, QueryKind) {
        match (&self.xpath, &self.css) {
            (Some(expr), _) => (expr, QueryKind::XPath),
            (None, Some(selector)) => (selector, QueryKind::Css),
            (None, None) => ("", QueryKind::XPath),
        }
    }

    fn validation_config(&self) -> Result<ValidationConfig, ConfigError> {
        let mut config = ValidationConfig::new().caching_enabled(!self.no_cache);
        if let Some(text) = &self.max_length {
            config = config.max_expression_length(parse_limit("--max-length", text)?);
        }
        if let Some(text) = &self.cache_size {
            config = config.cache_max_size(parse_limit("--cache-size", text)?);
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

const EXIT_SUCCESS: u8 = 0;
const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_REJECTED: u8 = 2;
const EXIT_EVALUATION_ERROR: u8 = 3;
const EXIT_USAGE: u8 = 4;

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = match cli.validation_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("xmlquery: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let cache = ValidationCache::with_config(config);

    let mut worst_exit = EXIT_SUCCESS;
    for file in &cli.files {
        worst_exit = worst_exit.max(process_file(&cli, &cache, file));
    }
    debug!(cached = cache.size(), "done");
    ExitCode::from(worst_exit)
}

/// Parses and queries a single input, printing results to stdout.
fn process_file(cli: &Cli, cache: &ValidationCache, filename: &str) -> u8 {
    let input = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_PARSE_ERROR;
        }
    };

    let doc = match Document::parse_bytes_with_options(&input, &parse_options(cli, filename)) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{filename}: {e}");
            return EXIT_PARSE_ERROR;
        }
    };
    if cli.verbose {
        for diag in doc.errors() {
            eprintln!("{filename}: {diag}");
        }
    }

    let (selector, kind) = cli.selector();
    let nodes = match query::query(cache, &doc, doc.root(), selector, kind) {
        Ok(nodes) => nodes,
        Err(e) => {
            eprintln!("{filename}: {e}");
            return if e.is_input_validation() {
                EXIT_REJECTED
            } else {
                EXIT_EVALUATION_ERROR
            };
        }
    };

    let mut out = String::new();
    if cli.count {
        out.push_str(&nodes.len().to_string());
        out.push('\n');
    } else {
        let take = if cli.first { 1 } else { nodes.len() };
        for node in nodes.iter().take(take) {
            out.push_str(&node.to_xml());
            out.push('\n');
        }
    }
    if let Err(e) = io::stdout().lock().write_all(out.as_bytes()) {
        eprintln!("xmlquery: failed to write output: {e}");
    }
    EXIT_SUCCESS
}

// ---------------------------------------------------------------------------
// Input and parsing
// ---------------------------------------------------------------------------

/// Reads input bytes from a file or stdin (when filename is `-`).
fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}

fn parse_options(cli: &Cli, filename: &str) -> ParseOptions {
    let options = ParseOptions::default().allow_external_entities(cli.allow_external_entities);
    if !cli.allow_external_entities {
        return options;
    }
    let base = Path::new(filename)
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);
    options.entity_resolver(move |request: ExternalEntityRequest<'_>| {
        resolve_local(&base, request.system_id)
    })
}

/// Loads a `SYSTEM` entity from a local path relative to the document.
/// Network URLs are never fetched.
fn resolve_local(base: &Path, system_id: &str) -> Option<String> {
    let path = system_id.strip_prefix("file://").unwrap_or(system_id);
    if path.contains("://") {
        debug!(system_id, "refusing to fetch non-file entity");
        return None;
    }
    let path = base.join(path);
    debug!(path = %path.display(), "resolving external entity");
    fs::read_to_string(path).ok()
}
