//! Server configuration: CLI arguments layered over an optional TOML file.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "vod-server", version, about = "VOD HLS packaging server")]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "VOD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(long, env = "VOD_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Directory containing the MP4 assets
    #[arg(long, env = "VOD_MEDIA_DIR")]
    pub media_dir: Option<PathBuf>,

    /// Directory holding persisted fragment indexes
    #[arg(long, env = "VOD_INDEX_DIR")]
    pub index_dir: Option<PathBuf>,

    /// Target fragment duration in seconds
    #[arg(long, env = "VOD_FRAGMENT_DURATION")]
    pub fragment_duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen: SocketAddr,
    pub media_dir: PathBuf,
    pub index_dir: PathBuf,
    pub fragment_duration: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".parse().expect("valid default address"),
            media_dir: PathBuf::from("media"),
            index_dir: PathBuf::from("index"),
            fragment_duration: 10.0,
        }
    }
}

impl Config {
    /// Load the configuration file (when given) and apply CLI/env
    /// overrides on top.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };

        if let Some(listen) = args.listen {
            config.listen = listen;
        }
        if let Some(media_dir) = &args.media_dir {
            config.media_dir = media_dir.clone();
        }
        if let Some(index_dir) = &args.index_dir {
            config.index_dir = index_dir.clone();
        }
        if let Some(fragment_duration) = args.fragment_duration {
            config.fragment_duration = fragment_duration;
        }

        if !(config.fragment_duration > 0.0) {
            bail!(
                "fragment duration must be positive, got {}",
                config.fragment_duration
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> Args {
        Args {
            config: None,
            listen: None,
            media_dir: None,
            index_dir: None,
            fragment_duration: None,
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::load(&no_args()).unwrap();
        assert_eq!(config.fragment_duration, 10.0);
        assert_eq!(config.media_dir, PathBuf::from("media"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vod.toml");
        std::fs::write(
            &path,
            "fragment_duration = 6.0\nmedia_dir = \"/srv/media\"\n",
        )
        .unwrap();

        let mut args = no_args();
        args.config = Some(path);
        args.fragment_duration = Some(4.0);
        let config = Config::load(&args).unwrap();
        assert_eq!(config.fragment_duration, 4.0);
        assert_eq!(config.media_dir, PathBuf::from("/srv/media"));
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let mut args = no_args();
        args.fragment_duration = Some(0.0);
        assert!(Config::load(&args).is_err());
    }

    #[test]
    fn test_rejects_unknown_config_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vod.toml");
        std::fs::write(&path, "fragments = 3\n").unwrap();
        let mut args = no_args();
        args.config = Some(path);
        assert!(Config::load(&args).is_err());
    }
}
