mod config;

use clap::{Parser, Subcommand};
use config::EstimatorConfig;
use estimator_agent::{EstimationChain, LlmClient};
use estimator_core::QueryContext;
use estimator_gateway::GatewayServer;
use estimator_retrieval::{ChromaVectorStore, NomicEmbedding, Retriever};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "estimator", about = "Effort estimation over past projects")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "estimator.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the ranked past projects for a requirement as JSON
    Retrieve {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Ask the LLM for an estimate grounded on the ranked projects
    Estimate {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Requirement text
    requirement: String,
    /// Rough effort guess in hours
    #[arg(long)]
    effort_hours: Option<f64>,
    /// Number of results (defaults to retrieval.default_top_k)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
}

impl QueryArgs {
    fn into_context(self, default_top_k: usize) -> QueryContext {
        QueryContext::new(self.requirement)
            .with_effort_hours(self.effort_hours)
            .with_top_k(self.top_k.unwrap_or(default_top_k))
    }
}

fn build_retriever(config: &EstimatorConfig) -> anyhow::Result<Arc<Retriever>> {
    let embedder = Arc::new(NomicEmbedding::new(config.embedding.clone())?);
    let store = Arc::new(ChromaVectorStore::new(config.store.clone())?);
    info!(
        collection = %config.store.collection,
        chroma = %config.store.url,
        embedding_model = %config.embedding.model,
        "Retriever configured"
    );
    Ok(Arc::new(
        Retriever::new(embedder, store).with_config(config.retrieval.clone()),
    ))
}

fn build_chain(config: &EstimatorConfig) -> anyhow::Result<EstimationChain> {
    let retriever = build_retriever(config)?;
    let llm = LlmClient::new(config.model.clone())?;
    info!(model = %config.model.model_id, "LLM configured");
    Ok(EstimationChain::new(retriever, llm))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = EstimatorConfig::load(&cli.config).await?;
    let default_top_k = config.retrieval.default_top_k;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let chain = Arc::new(build_chain(&config)?);
            let app = GatewayServer::build(chain);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Estimator gateway listening on {}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Retrieve { query } => {
            let retriever = build_retriever(&config)?;
            let results = retriever
                .retrieve_with(&query.into_context(default_top_k))
                .await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Estimate { query } => {
            let chain = build_chain(&config)?;
            let estimate = chain.estimate(&query.into_context(default_top_k)).await?;

            println!("{}", estimate.text);
            if !estimate.sources.is_empty() {
                println!("\nSources:");
                for (idx, source) in estimate.sources.iter().enumerate() {
                    println!(
                        "  [{}] {} (score {:.4})",
                        idx + 1,
                        source.id().unwrap_or("-"),
                        source.final_score
                    );
                }
            }
        }
    }

    Ok(())
}
