mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./morphd.toml",
        "~/.config/morphd/config.toml",
        "/etc/morphd/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.conversion.max_concurrent_jobs == 0 {
        anyhow::bail!("conversion.max_concurrent_jobs must be at least 1");
    }

    if config.conversion.output_dir == config.conversion.work_dir {
        anyhow::bail!("conversion.output_dir and conversion.work_dir must differ");
    }

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg),
        ("soffice", &config.tools.soffice),
        ("pdftoppm", &config.tools.pdftoppm),
        ("magick", &config.tools.magick),
        ("sevenzip", &config.tools.sevenzip),
        ("fontforge", &config.tools.fontforge),
        ("ebook_convert", &config.tools.ebook_convert),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    Ok(())
}

/// Create the output and work directories if missing.
pub fn ensure_directories(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.conversion.output_dir).with_context(|| {
        format!(
            "Failed to create output dir {:?}",
            config.conversion.output_dir
        )
    })?;
    std::fs::create_dir_all(&config.conversion.work_dir)
        .with_context(|| format!("Failed to create work dir {:?}", config.conversion.work_dir))?;
    Ok(())
}
