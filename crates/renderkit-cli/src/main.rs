//! RenderKit CLI - Command-line interface for rendered page extraction

use clap::{Args, Parser, Subcommand, ValueEnum};
use renderkit::{
    format, BatchItemResult, BatchOptions, Extractor, ExtractionOptions, HttpBackend, HttpSink,
    OutputFormat, DEFAULT_MAX_WAIT_MS,
};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, warn};

/// Separator between documents in non-JSON batch output
const DOCUMENT_SEPARATOR: &str = "\n---\n";

/// Renderer backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Plain HTTP fetch without script execution
    #[default]
    Http,
    /// Headless Chromium (requires the `chromium` feature)
    Chromium,
}

/// RenderKit - structured extraction from rendered web pages
#[derive(Parser, Debug)]
#[command(name = "renderkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Renderer backend; `http` does not run scripts, JavaScript-rendered
    /// pages need a build with `--features chromium` and `--backend chromium`
    #[arg(long, global = true, env = "RENDERKIT_BACKEND", default_value = "http")]
    backend: Backend,

    /// Embeddings service that receives every extracted document
    #[arg(long, global = true, env = "EMBEDDINGS_SERVICE_URL")]
    deliver_to: Option<String>,

    /// Custom User-Agent
    #[arg(long, global = true)]
    user_agent: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract a single page
    Extract {
        /// URL to extract
        url: String,

        #[command(flatten)]
        extraction: ExtractionArgs,

        /// Output format: markdown, json, html or text
        #[arg(long, short, default_value = "markdown")]
        output: OutputFormat,
    },
    /// Extract many pages with bounded concurrency
    Batch {
        /// URLs to extract
        #[arg(required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        extraction: ExtractionArgs,

        /// Pages per wave
        #[arg(long, default_value_t = renderkit::DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Pause between waves in milliseconds
        #[arg(long, default_value_t = renderkit::DEFAULT_INTER_BATCH_DELAY_MS)]
        delay_ms: u64,

        /// Output format: markdown, json, html or text
        #[arg(long, short, default_value = "json")]
        output: OutputFormat,
    },
    /// Print JSON Schemas of the options and the extracted document
    Schema,
}

/// Per-page extraction flags
#[derive(Args, Debug, Clone)]
struct ExtractionArgs {
    /// Restrict content to the first element matching this selector
    #[arg(long)]
    selector: Option<String>,

    /// Wait for this selector before extracting
    #[arg(long)]
    wait_for: Option<String>,

    /// Navigation and wait budget in milliseconds
    #[arg(long, default_value_t = DEFAULT_MAX_WAIT_MS)]
    max_wait_ms: u64,

    /// Remove elements matching this selector (repeatable)
    #[arg(long = "remove")]
    remove: Vec<String>,

    /// Include images
    #[arg(long)]
    images: bool,

    /// Include links
    #[arg(long)]
    links: bool,

    /// Include a heading outline
    #[arg(long)]
    outline: bool,
}

impl From<ExtractionArgs> for ExtractionOptions {
    fn from(args: ExtractionArgs) -> Self {
        ExtractionOptions {
            selector: args.selector,
            wait_for_selector: args.wait_for,
            max_wait_ms: args.max_wait_ms,
            remove_selectors: args.remove,
            extract_images: args.images,
            extract_links: args.links,
            extract_outline: args.outline,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "renderkit=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Schema = cli.command {
        writeln_safe(&schemas());
        std::process::exit(0);
    }

    let extractor = match build_extractor(&cli) {
        Ok(extractor) => Arc::new(extractor),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = tokio::select! {
        code = run(cli.command, &extractor) => code,
        _ = shutdown_signal() => {
            warn!("Interrupted, shutting down renderer");
            130
        }
    };

    extractor.shutdown().await;
    std::process::exit(code);
}

fn build_extractor(cli: &Cli) -> Result<Extractor, String> {
    let mut builder = Extractor::builder();

    builder = match cli.backend {
        Backend::Http => builder.backend(HttpBackend::new()),
        #[cfg(feature = "chromium")]
        Backend::Chromium => builder.backend(renderkit::ChromiumBackend::new()),
        #[cfg(not(feature = "chromium"))]
        Backend::Chromium => {
            return Err("renderkit was built without the `chromium` feature".to_string())
        }
    };

    if let Some(ref ua) = cli.user_agent {
        builder = builder.user_agent(ua.clone());
    }

    if let Some(ref base) = cli.deliver_to {
        let sink = HttpSink::new(base).map_err(|e| e.to_string())?;
        info!(endpoint = sink.endpoint(), "Delivering documents");
        builder = builder.sink(sink);
    }

    Ok(builder.build())
}

/// Run one command and return the process exit code
async fn run(command: Commands, extractor: &Extractor) -> i32 {
    match command {
        Commands::Extract {
            url,
            extraction,
            output,
        } => {
            let options = ExtractionOptions::from(extraction);
            match extractor.extract_one(&url, &options).await {
                Ok(doc) => {
                    writeln_safe(&format(&doc, output));
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        Commands::Batch {
            urls,
            extraction,
            concurrency,
            delay_ms,
            output,
        } => {
            let options = BatchOptions::new(extraction.into())
                .concurrency(concurrency)
                .inter_batch_delay(delay_ms);
            let results = extractor.extract_many(&urls, &options).await;
            writeln_safe(&format_batch(&results, output));

            if results.iter().any(BatchItemResult::is_success) {
                0
            } else {
                1
            }
        }
        Commands::Schema => {
            writeln_safe(&schemas());
            0
        }
    }
}

/// JSON array for JSON output, otherwise each document formatted in turn
fn format_batch(results: &[BatchItemResult], output: OutputFormat) -> String {
    if output == OutputFormat::Json {
        return serde_json::to_string_pretty(results).unwrap_or_else(|e| {
            serde_json::json!({ "error": e.to_string() }).to_string()
        });
    }

    results
        .iter()
        .map(|result| match result {
            BatchItemResult::Success(doc) => format(doc, output),
            BatchItemResult::Failure { url, error } => format!("{url}: {error}\n"),
        })
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

fn schemas() -> String {
    let value = serde_json::json!({
        "input": Extractor::input_schema(),
        "output": Extractor::output_schema(),
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderkit::{ExtractedDocument, Metadata};

    fn document(url: &str) -> ExtractedDocument {
        ExtractedDocument {
            url: url.to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            html: None,
            images: None,
            links: None,
            tables: Vec::new(),
            headings: Vec::new(),
            outline: None,
            metadata: Metadata {
                timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
                user_agent: "TestAgent".to_string(),
            },
            documentation: None,
        }
    }

    #[test]
    fn test_backend_help_names_chromium_build() {
        use clap::CommandFactory;

        let command = Cli::command();
        let backend = command
            .get_arguments()
            .find(|arg| arg.get_id() == "backend")
            .unwrap();
        let help = backend.get_help().unwrap().to_string();
        assert!(help.contains("--features chromium"));
        assert!(help.contains("--backend chromium"));
    }

    #[test]
    fn test_parse_extract_flags() {
        let cli = Cli::try_parse_from([
            "renderkit",
            "extract",
            "https://example.com",
            "--selector",
            "#main",
            "--remove",
            "nav",
            "--remove",
            ".ad",
            "--links",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.backend, Backend::Http);
        match cli.command {
            Commands::Extract {
                url,
                extraction,
                output,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(output, OutputFormat::Json);
                let options = ExtractionOptions::from(extraction);
                assert_eq!(options.selector.as_deref(), Some("#main"));
                assert_eq!(options.remove_selectors, vec!["nav", ".ad"]);
                assert!(options.extract_links);
                assert!(!options.extract_images);
                assert_eq!(options.max_wait_ms, DEFAULT_MAX_WAIT_MS);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_batch_defaults() {
        let cli = Cli::try_parse_from(["renderkit", "batch", "https://a.test", "https://b.test"])
            .unwrap();
        match cli.command {
            Commands::Batch {
                urls,
                concurrency,
                delay_ms,
                output,
                ..
            } => {
                assert_eq!(urls.len(), 2);
                assert_eq!(concurrency, 3);
                assert_eq!(delay_ms, 1_000);
                assert_eq!(output, OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_batch_requires_urls() {
        assert!(Cli::try_parse_from(["renderkit", "batch"]).is_err());
    }

    #[test]
    fn test_invalid_output_format_rejected() {
        assert!(Cli::try_parse_from(["renderkit", "extract", "https://a.test", "-o", "pdf"]).is_err());
    }

    #[test]
    fn test_format_batch_json() {
        let results = vec![
            BatchItemResult::Success(Box::new(document("https://a.test/"))),
            BatchItemResult::Failure {
                url: "https://b.test/".to_string(),
                error: "Navigation to https://b.test/ failed: timed out".to_string(),
            },
        ];
        let out = format_batch(&results, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["status"], "success");
        assert_eq!(value[0]["url"], "https://a.test/");
        assert_eq!(value[1]["status"], "failure");
    }

    #[test]
    fn test_format_batch_markdown() {
        let results = vec![
            BatchItemResult::Success(Box::new(document("https://a.test/"))),
            BatchItemResult::Failure {
                url: "https://b.test/".to_string(),
                error: "boom".to_string(),
            },
        ];
        let out = format_batch(&results, OutputFormat::Markdown);
        assert!(out.starts_with("# Title\n"));
        assert!(out.contains(DOCUMENT_SEPARATOR));
        assert!(out.ends_with("https://b.test/: boom\n"));
    }

    #[test]
    fn test_schemas_output() {
        let value: serde_json::Value = serde_json::from_str(&schemas()).unwrap();
        assert!(value["input"]["properties"].is_object());
        assert!(value["output"]["properties"].is_object());
    }

    #[cfg(not(feature = "chromium"))]
    #[test]
    fn test_chromium_backend_requires_feature() {
        let cli =
            Cli::try_parse_from(["renderkit", "--backend", "chromium", "schema"]).unwrap();
        assert!(build_extractor(&cli).is_err());
    }
}
