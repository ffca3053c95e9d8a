use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use linkstore::config::Config;
use linkstore::content::ContentRef;
use linkstore::resolver::Resolver;
use linkstore::transform::TransformSpec;
use std::io::Write;
use std::path::PathBuf;

/// Linkstore - content-addressed cache of derived image artifacts
#[derive(Parser, Debug)]
#[command(name = "linkstore")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a file and print its content ref
    Put { file: PathBuf },

    /// Resolve a request such as `/ipfs/<ref>&w=100,h=50` and write the bytes
    Get {
        request: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the derived ref cached for an original and a parameter fragment
    ///
    /// With `a=0` the original is read to settle the height first.
    Lookup { original: String, params: String },

    /// Rewrite the linkstore log without superseded entries
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    linkstore::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        config_file = %args.config.display(),
        store_backend = ?config.store.backend,
        linkstore_backend = ?config.linkstore.backend,
        race_on_hit = config.resolver.race_on_hit,
        "Configuration loaded successfully"
    );

    let resolver = Resolver::from_config(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize resolver: {}", e))?;

    match args.command {
        Command::Put { file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let content = resolver.store().put(Bytes::from(data)).await?;
            println!("{}", content);
        }
        Command::Get { request, output } => {
            let resolved = resolver
                .resolve(&request)
                .await
                .with_context(|| format!("Failed to resolve {}", request))?;
            tracing::info!(
                content = %resolved.content,
                via = resolved.via.as_str(),
                bytes = resolved.data.len(),
                "Resolved request"
            );
            match output {
                Some(path) => tokio::fs::write(&path, &resolved.data)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => std::io::stdout().write_all(&resolved.data)?,
            }
            tracing::debug!(
                stats = %serde_json::to_string(&resolver.stats().snapshot())?,
                "Resolver statistics"
            );
        }
        Command::Lookup { original, params } => {
            let original = ContentRef::parse(&original)?;
            let spec = TransformSpec::parse(&params)?;
            let key = resolver.cache_key(original, spec).await?;
            match resolver.links().lookup(&key).await? {
                Some(derived) => println!("{}", derived),
                None => anyhow::bail!("No cache entry for {}", key),
            }
        }
        Command::Compact => {
            resolver.links().compact().await?;
            tracing::info!(entries = resolver.links().len().await, "Compacted linkstore");
        }
    }

    Ok(())
}
