//! `steadyhand init`: write the default config.

use std::path::Path;

use steadyhand_config::AppConfig;

pub fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
        return Ok(());
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", config_path.display());
    println!("   Set BOT_PASSWORD in the environment rather than in the file.");

    Ok(())
}
