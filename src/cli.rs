use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments shared by the headless and web front-ends.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "fusion-drift")]
#[command(about = "Element-driven generative visuals and tones")]
pub struct Args {
    /// Engine settings (JSON); defaults to the platform config dir.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Periodic table (JSON keyed by id); defaults to the built-in table.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Stop after N seconds (headless only).
    #[arg(long)]
    pub seconds: Option<u64>,

    /// Advance to the next element every N ms (headless only).
    #[arg(long, default_value_t = 3000)]
    pub step_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("fusion-drift").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.config, None);
        assert_eq!(args.catalog, None);
        assert_eq!(args.seconds, None);
        assert_eq!(args.step_ms, 3000);
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "--config", "a.json", "--catalog", "t.json", "--seconds", "5", "--step-ms", "250",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("a.json")));
        assert_eq!(args.catalog, Some(PathBuf::from("t.json")));
        assert_eq!(args.seconds, Some(5));
        assert_eq!(args.step_ms, 250);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["--seconds"]).is_err());
        assert!(parse(&["--seconds", "soon"]).is_err());
        assert!(parse(&["--fast"]).is_err());
    }
}
