//! Config command implementation.

use anyhow::Result;
use semantic_tiles_ops::Config;

/// Show the effective configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Semantic Tiles Configuration");
    println!("{:-<40}", "");
    println!("Canvas:          {} x {}", config.width, config.height);
    println!("Store Root:      {}", config.store_root.display());
    println!("Seed:            {}", config.layout.seed);
    println!("Margin:          {}", config.layout.margin);
    println!(
        "Iterations:      {}..{} (threshold {})",
        config.layout.min_iterations, config.layout.max_iterations, config.layout.convergence_threshold
    );
    println!("Link Scale:      {:?}", config.layout.link_scale);
    println!("Jitter:          {}", config.tessellation.jitter);

    println!("\nFull configuration:");
    println!("{}", serde_json::to_string_pretty(config)?);

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Show path to config file.
pub fn path() -> Result<()> {
    match Config::config_file_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("(no config directory available)"),
    }
    Ok(())
}
