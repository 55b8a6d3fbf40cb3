//! Built-in capabilities for stepwise.
//!
//! Two tools are available to the model: a weather lookup over HTTP and
//! a shell command runner. Which of them get registered is decided by
//! `[tools] enabled` in the config.

pub mod command;
pub mod weather;

use stepwise_config::ToolsConfig;
use stepwise_core::tool::ToolRegistry;
use tracing::warn;

pub use command::CommandCapability;
pub use weather::WeatherCapability;

/// Names of every built-in capability.
pub const BUILTIN_TOOLS: &[&str] = &["get_weather", "run_command"];

/// Create a registry holding the enabled built-in capabilities.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    if config.is_enabled("get_weather") {
        registry.register(WeatherCapability::new(&config.weather_url));
    }
    if config.is_enabled("run_command") {
        registry.register(CommandCapability::new());
    }

    for name in &config.enabled {
        if !BUILTIN_TOOLS.contains(&name.as_str()) {
            warn!(tool = %name, "Ignoring unknown tool in [tools] enabled");
        }
    }

    registry
}
