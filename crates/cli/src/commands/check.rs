//! `steadyhand check-config`: load, validate, and summarize the config.

use std::path::Path;

use steadyhand_config::AppConfig;

pub fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", config_path.display());

    let config = AppConfig::load_with_env(config_path)?;
    println!("   Config parsed and validated");

    let mut warnings = Vec::new();
    if config.auto_auth.enabled && config.auto_auth.password.is_none() {
        warnings.push("auto_auth is enabled but no password is set (set BOT_PASSWORD)");
    }
    if config.chat.enabled && config.chat.messages.is_empty() {
        warnings.push("chat is enabled but has no messages; the chat loop will not run");
    }
    if !config.reconnect.enabled {
        warnings.push("reconnect is disabled; the agent stays offline after the first disconnect");
    }
    if !config.gateway.enabled {
        warnings.push("gateway is disabled; hosting platforms cannot probe liveness");
    }
    for w in &warnings {
        println!("   warning: {w}");
    }

    println!();
    println!("   Account:    {} ({:?})", config.account.username, config.account.auth);
    println!("   Server:     {}:{}", config.server.host, config.server.port);
    println!(
        "   Combat:     {} (radius {}, retreat at {} health)",
        on_off(config.combat.enabled),
        config.combat.kill_radius,
        config.combat.retreat_health
    );
    println!(
        "   Rest:       {} (search radius {})",
        on_off(config.rest.enabled),
        config.rest.search_radius
    );
    println!(
        "   Behavior:   {} (reaction {}-{} ms)",
        on_off(config.behavior.enabled),
        config.behavior.reaction_delay_ms.min,
        config.behavior.reaction_delay_ms.max
    );
    println!("   Humanizer:  {}", on_off(config.behavior.humanizer.enabled));
    println!("   Hunger:     {}", on_off(config.hunger.enabled));
    println!("   Chat:       {}", on_off(config.chat.enabled));
    println!(
        "   Reconnect:  {} (base {} ms, cap +{} ms)",
        on_off(config.reconnect.enabled),
        config.reconnect.base_delay_ms,
        config.reconnect.max_backoff_ms
    );

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
