//! `stepwise tools` — List the tools the model can call.

use std::fmt::Write;

use stepwise_config::AppConfig;
use stepwise_core::tool::ToolRegistry;
use stepwise_tools::default_registry;

pub fn run(config: &AppConfig) {
    let registry = default_registry(&config.tools);
    print!("{}", render_catalog(&registry));
}

fn render_catalog(registry: &ToolRegistry) -> String {
    let mut out = String::from("🛠️  Available tools\n==================\n\n");

    if registry.is_empty() {
        out.push_str("  (none enabled; see [tools] enabled in config.toml)\n");
        return out;
    }

    for info in registry.catalog() {
        let _ = writeln!(out, "  {}", info.signature);
        let _ = writeln!(out, "      {}", info.description);
    }
    out
}
