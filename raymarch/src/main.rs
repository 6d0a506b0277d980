//! # Raymarch runtime
//!
//! Entry point for the `raymarch` binary. Settings come from `raymarch.toml`
//! (or `--config`), and the command-line flags below override them.

mod app;
mod watcher;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use raymarch::config::{BackendKind, RuntimeConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "raymarch", version, about = "Keep an SDF raymarcher's shape buffer in step with a scene file")]
struct Cli {
    /// Settings file
    #[arg(long, default_value = "raymarch.toml")]
    config: PathBuf,

    /// Scene description to load instead of the configured one
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Frames to run, 0 runs until interrupted
    #[arg(long)]
    frames: Option<u64>,

    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Reload the scene when its file changes
    #[arg(long)]
    watch: bool,
}

impl Cli {
    fn apply(self, config: &mut RuntimeConfig) {
        if let Some(scene) = self.scene {
            config.scene = scene;
        }
        if let Some(frames) = self.frames {
            config.frames = frames;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        config.watch |= self.watch;
    }
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &RuntimeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, source) = RuntimeConfig::load(&cli.config);
    cli.apply(&mut config);

    init_tracing(&config);
    source.log();

    app::run(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from(["raymarch", "--frames", "5", "--backend", "wgpu", "--watch"]);
        let mut config = RuntimeConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.frames, 5);
        assert_eq!(config.backend, BackendKind::Wgpu);
        assert!(config.watch);
        assert_eq!(config.scene, RuntimeConfig::default().scene);
    }
}
