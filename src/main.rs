mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use morphd::{config, jobs, server};
use morphd_core::BatchId;
use morphd_engines::{check_tools, CapabilityRegistry, ConvertOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "morphd=trace,morphd_engines=trace,morphd_core=debug,tower_http=debug".to_string()
        } else {
            "morphd=info,morphd_engines=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Run {
            inputs,
            to,
            pages,
            split,
            merge,
            images,
            output_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            let options = ConvertOptions {
                page_range: pages,
                split,
                merge,
                pdf_to_images: images,
                ..ConvertOptions::default()
            };
            rt.block_on(run_files(cli.config.as_deref(), inputs, to, options, output_dir))
        }
        Commands::Formats { json } => show_formats(cli.config.as_deref(), json),
        Commands::CheckTools => show_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config_file(path.as_deref())
        }
        Commands::Version => {
            println!("morphd {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(host: String, port: u16, config_path: Option<&std::path::Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    config.server.host = host;
    config.server.port = port;
    config::ensure_directories(&config)?;

    // Scratch space from a previous run is garbage by definition.
    if let Err(e) = clean_stale_work_files(&config.conversion.work_dir) {
        tracing::warn!("Failed to clean work dir: {}", e);
    }

    tracing::info!("Starting morphd server");

    let capabilities = Arc::new(CapabilityRegistry::new(config.tools.overrides()));
    let registry = jobs::JobRegistry::new();
    let runner = jobs::JobRunner::new(
        Arc::clone(&registry),
        Arc::clone(&capabilities),
        &config.conversion,
    );

    let ctx = server::AppContext {
        registry,
        runner,
        capabilities,
        config: Arc::new(config),
    };

    server::start_server(ctx).await
}

async fn run_files(
    config_path: Option<&std::path::Path>,
    inputs: Vec<PathBuf>,
    to: String,
    options: ConvertOptions,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(dir) = output_dir {
        config.conversion.output_dir = dir;
    }
    config::ensure_directories(&config)?;

    let capabilities = Arc::new(CapabilityRegistry::new(config.tools.overrides()));
    let registry = jobs::JobRegistry::new();
    let runner = jobs::JobRunner::new(
        Arc::clone(&registry),
        Arc::clone(&capabilities),
        &config.conversion,
    );

    let output_format = to.trim().to_lowercase();
    let batch_id = if inputs.len() > 1 {
        Some(BatchId::new())
    } else {
        None
    };

    let mut ids = Vec::with_capacity(inputs.len());
    for input in &inputs {
        if !input.is_file() {
            anyhow::bail!("Input file does not exist: {:?}", input);
        }
        let category = capabilities
            .validate(input, &output_format)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let job = registry.create(
            input.clone(),
            category,
            output_format.clone(),
            options.clone(),
            batch_id,
        );
        ids.push(job.id);
    }

    runner.run_batch(ids.clone()).await;

    let mut any_failed = false;
    for id in ids {
        let Some(job) = registry.get(id) else { continue };
        match job.status {
            jobs::JobStatus::Completed => {
                println!("{}:", job.file_name);
                for path in &job.output_paths {
                    println!("  {}", path.display());
                }
            }
            _ => {
                any_failed = true;
                eprintln!(
                    "{}: {} ({})",
                    job.file_name,
                    job.status,
                    job.error.as_deref().unwrap_or("no error recorded")
                );
            }
        }
    }

    if any_failed {
        anyhow::bail!("One or more conversions failed");
    }
    Ok(())
}

fn show_formats(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let capabilities = CapabilityRegistry::new(config.tools.overrides());
    let formats = capabilities.formats();

    if json {
        println!("{}", serde_json::to_string_pretty(&formats)?);
        return Ok(());
    }

    for entry in formats {
        println!("{}:", entry.category);
        println!("  in:  {}", entry.inputs.join(", "));
        println!("  out: {}", entry.outputs.join(", "));
    }
    Ok(())
}

fn show_tools() -> Result<()> {
    let mut missing = false;
    for info in check_tools() {
        if info.available {
            println!(
                "{:<15} OK   {}",
                info.name,
                info.version.as_deref().unwrap_or("")
            );
        } else {
            missing = true;
            println!("{:<15} MISSING", info.name);
        }
    }
    if missing {
        println!("\nConversions needing a missing engine will fail at run time.");
    }
    Ok(())
}

fn clean_stale_work_files(dir: &std::path::Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with("morphd-") {
            continue;
        }
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => tracing::debug!("Removed stale work artifact {}", path.display()),
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    Ok(())
}

fn validate_config_file(path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(path)?;
    config::validate_config(&config)?;
    println!("Configuration is valid");
    tracing::debug!("Config: {:?}", config);
    Ok(())
}
