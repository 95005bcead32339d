use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use search_server::api::create_router;
use search_server::api::models::SearchResponse;
use search_server::config::{ServeArgs, ServerConfig, parse_host};
use search_server::extractor::{ExtractOptions, HtmlExtractor};
use search_server::fetcher::{DEFAULT_FETCH_TIMEOUT, HttpFetcher, PageFetcher};
use search_server::retriever::Retriever;

#[derive(Debug, Parser)]
#[command(name = "search-server", version, about = "Web search server for dialog agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the server
    Serve(ServeArgs),
    /// Fetch one url, run the extractor on it and print the result
    TestParser {
        url: String,
        /// Fetch timeout, in seconds
        #[arg(long)]
        timeout: Option<f64>,
        #[arg(long)]
        strip_html_menus: bool,
        #[arg(long)]
        max_text_bytes: Option<usize>,
    },
    /// Send one query to a running server and print the answer
    TestServer {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 5)]
        n: i64,
        #[arg(long, default_value = "0.0.0.0:8080")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // before parsing, so that .env values reach clap's env fallbacks
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::TestParser {
            url,
            timeout,
            strip_html_menus,
            max_text_bytes,
        } => {
            let timeout = timeout
                .map(Duration::try_from_secs_f64)
                .transpose()
                .context("invalid timeout")?
                .unwrap_or(DEFAULT_FETCH_TIMEOUT);
            test_parser(&url, timeout, strip_html_menus, max_text_bytes).await
        }
        Command::TestServer { query, n, host } => test_server(&query, n, &host).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    // a bad configuration stops the process before anything listens
    let config = ServerConfig::from_args(&args)?;
    let retriever = Arc::new(Retriever::from_config(&config)?);
    let backend = retriever.backend_name();
    let app = create_router(retriever);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    info!(
        host = %config.bind_addr(),
        backend,
        description_only = config.use_description_only(),
        "serving forever"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn test_parser(
    url: &str,
    timeout: Duration,
    strip_html_menus: bool,
    max_text_bytes: Option<usize>,
) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new()?;
    let html = fetcher.fetch(url, timeout).await?;

    let extractor = HtmlExtractor::new(ExtractOptions {
        strip_html_menus,
        max_text_bytes: max_text_bytes.and_then(std::num::NonZeroUsize::new),
    });
    let extracted = extractor.extract(&html);

    println!("url: {url}");
    println!("title: {}", extracted.title.as_deref().unwrap_or("<No Title>"));
    println!("content ({} bytes):\n{}", extracted.text.len(), extracted.text);
    Ok(())
}

async fn test_server(query: &str, n: i64, host: &str) -> anyhow::Result<()> {
    let (hostname, port) = parse_host(host)?;
    let endpoint = format!("http://{hostname}:{port}/");
    println!("Query: `{query}`");
    println!("n: {n}");

    let n = n.to_string();
    let res = reqwest::Client::new()
        .post(&endpoint)
        .form(&[("q", query), ("n", n.as_str())])
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;

    let status = res.status();
    let body: SearchResponse = res.json().await.context("unexpected response body")?;
    if let Some(error) = &body.error {
        println!("server answered {status}: {error}");
    }
    for (i, record) in body.response.iter().enumerate() {
        println!("[{i}] {} <{}>", record.title, record.url);
        println!("    {} bytes of content", record.content.len());
    }
    println!("Done.");
    Ok(())
}
