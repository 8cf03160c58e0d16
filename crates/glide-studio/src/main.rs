use std::path::Path;

use glide_core::prelude::*;
use serde_json::Value;

const CONFIG_FILE: &str = "glide.toml";
const ASSETS_DIR: &str = "assets";

fn load_config() -> anyhow::Result<AppConfig> {
    let path = Path::new(CONFIG_FILE);
    let mut config = if path.exists() { AppConfig::load_from_file(path)? } else { AppConfig::default() };
    config.apply_env()?;
    if config.assets_dir.is_none() && Path::new(ASSETS_DIR).is_dir() {
        config.assets_dir = Some(ASSETS_DIR.into());
    }
    Ok(config)
}

/// `activeIndex` is zero-based and absent until the renderer first reports it.
fn slide_label(index: Value) -> anyhow::Result<Output> {
    match index.as_u64() {
        Some(i) => Ok(Output::one(format!("Slide {}", i + 1))),
        None if index.is_null() => Ok(Output::NoUpdate),
        None => anyhow::bail!("activeIndex must be a non-negative integer, got {index}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_logging(LoggingConfig::from_app_config(&config));

    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║            GLIDE STUDIO v0.1           ║");
    println!("  ║   slider widgets  ·  callback bridge   ║");
    println!("  ╠════════════════════════════════════════╣");
    println!("  ║  Serving on http://{:<20}║", config.bind_address());
    println!("  ╚════════════════════════════════════════╝");
    println!();

    Application::new()
        .config(config)
        .component("PageHeader", include_str!("../ui/header.glide"))
        .layout_markup(include_str!("../ui/page.glide"))
        .callback(
            [Target::new("my-swiper", "activeIndex")],
            [Target::new("active-label", "text")],
            handler::from_fn1(slide_label),
        )
        .run()
        .await?;
    Ok(())
}
