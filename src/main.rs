// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use product_detector::{
    api::{start_server, AppState},
    config::Config,
    version,
    vision::{DetectorHandle, Visualizer},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    println!("🚀 Starting Product Detector...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();
    info!("{}", version::get_version_string());

    println!("🧠 Loading detection model from {}...", config.model_path.display());
    let detector = DetectorHandle::load(config.yolo_config()).await;
    if detector.is_available() {
        println!("✅ Detection model ready");
    } else {
        println!("⚠️  Detection model not loaded; detection endpoints will return 500");
    }

    let visualizer = Visualizer::discover(config.label_font_path.as_deref());

    let state = AppState::new(detector, visualizer);
    start_server(state, &config).await?;

    println!("👋 Product Detector stopped");
    Ok(())
}
