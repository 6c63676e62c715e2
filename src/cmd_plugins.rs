//! Plugin listing for ShivAI.

use serde_json::json;

use shivai_config::Config;
use shivai_runtime::Agent;

/// Boot the registry and print every plugin with its state.
pub(crate) async fn plugins_list(config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let agent = Agent::builder(config).build().await?;
    let plugins = agent.registry().list();
    let discovery = agent.discovery_report();
    let boot = agent.boot_report();

    match format {
        "json" => {
            let report = json!({
                "plugins": plugins,
                "discovery": discovery,
                "boot": boot,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "{:<20} {:<10} {:<24} {}",
                "NAME", "VERSION", "STATE", "CAPABILITIES"
            );
            println!("{}", "-".repeat(80));
            for plugin in &plugins {
                let capabilities: Vec<&str> = plugin
                    .descriptor
                    .capabilities
                    .iter()
                    .map(String::as_str)
                    .collect();
                println!(
                    "{:<20} {:<10} {:<24} {}",
                    plugin.name(),
                    plugin.descriptor.version.to_string(),
                    plugin.state.to_string(),
                    capabilities.join(", ")
                );
            }

            if !discovery.rejected.is_empty() {
                println!();
                println!("Rejected manifests:");
                for rejected in &discovery.rejected {
                    println!("  {} ({}): {}", rejected.origin, rejected.kind, rejected.reason);
                }
            }
            for cycle in &discovery.cycles {
                println!("Dependency cycle: {}", cycle.join(" -> "));
            }
            for failure in &boot.failed {
                println!("Not enabled: {} ({})", failure.plugin, failure.reason);
            }
        }
    }

    agent.shutdown().await?;
    Ok(())
}
