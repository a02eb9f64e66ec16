use clap::{Args, Parser, Subcommand};
use config::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gallery_prep", version, about = "Prepare photos for a static gallery")]
pub struct Cli {
    /// Directory holding default.toml, <RUN_MODE>.toml and local.toml
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the EXIF editing form
    Serve(ServeArgs),
    /// Normalize, thumbnail and catalog a gallery
    Prepare(PrepareArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to the directory containing images
    #[arg(long)]
    pub fulls: Option<String>,

    /// Host IP interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub struct PrepareArgs {
    /// Gallery root containing fulls/, thumbs/ and metadata/
    #[arg(long)]
    pub root: Option<String>,

    /// Number of sample images to create first
    #[arg(long)]
    pub samples: Option<usize>,

    /// JPEG quality for thumbnails and samples
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Worker threads (0 = one per CPU, 1 = sequential)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Skip thumbnails that exist and entries already extracted without error
    #[arg(long)]
    pub check: bool,
}

impl Cli {
    /// Flags that were given, as config overrides.
    pub fn overrides(&self) -> Vec<(&'static str, Value)> {
        let mut overrides = Vec::new();
        if let Some(level) = &self.log_level {
            overrides.push(("log_level", Value::from(level.clone())));
        }
        match &self.command {
            Command::Serve(args) => {
                if let Some(fulls) = &args.fulls {
                    overrides.push(("server.fulls_directory", Value::from(fulls.clone())));
                }
                if let Some(host) = &args.host {
                    overrides.push(("server.host", Value::from(host.clone())));
                }
                if let Some(port) = args.port {
                    overrides.push(("server.port", Value::from(port as i64)));
                }
            }
            Command::Prepare(args) => {
                if let Some(root) = &args.root {
                    overrides.push(("prepare.root_directory", Value::from(root.clone())));
                }
                if let Some(samples) = args.samples {
                    overrides.push(("prepare.sample_images", Value::from(samples as i64)));
                }
                if let Some(quality) = args.quality {
                    overrides.push(("prepare.jpeg_quality", Value::from(quality as i64)));
                }
                if let Some(workers) = args.workers {
                    overrides.push(("prepare.workers", Value::from(workers as i64)));
                }
                if args.check {
                    overrides.push(("prepare.check", Value::from(true)));
                }
            }
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_flags_become_overrides() {
        let cli = Cli::parse_from(["gallery_prep", "serve", "--fulls", "pics", "--port", "5000"]);
        let keys: Vec<_> = cli.overrides().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["server.fulls_directory", "server.port"]);
    }

    #[test]
    fn quality_is_range_checked() {
        assert!(Cli::try_parse_from(["gallery_prep", "prepare", "--quality", "0"]).is_err());
        assert!(Cli::try_parse_from(["gallery_prep", "prepare", "--quality", "101"]).is_err());
        let cli = Cli::try_parse_from(["gallery_prep", "prepare", "--quality", "90", "--check"]).unwrap();
        match cli.command {
            Command::Prepare(args) => {
                assert_eq!(args.quality, Some(90));
                assert!(args.check);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
