use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version = env!("APP_VERSION"), about, long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long, help = "Path to the YAML configuration file.")]
    pub config: Option<PathBuf>,

    #[arg(
        short = 's',
        long,
        help = "Path to the team id store (overrides `store_path` from the config)."
    )]
    pub store: Option<PathBuf>,

    #[arg(
        short = 'w',
        long,
        help = "Reload team ids when the store file changes on disk."
    )]
    pub watch_store: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_overrides() {
        let cli = Cli::parse_from(["archive-redirect"]);
        assert_eq!(cli.config, None);
        assert_eq!(cli.store, None);
        assert!(!cli.watch_store);
    }

    #[test]
    fn accepts_short_flags() {
        let cli = Cli::parse_from(["archive-redirect", "-c", "conf.yaml", "-s", "ids.yaml", "-w"]);
        assert_eq!(cli.config, Some(PathBuf::from("conf.yaml")));
        assert_eq!(cli.store, Some(PathBuf::from("ids.yaml")));
        assert!(cli.watch_store);
    }
}
