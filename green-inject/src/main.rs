use anyhow::{anyhow, Result};
use clap::Parser;
use green_cleanup::{builtin_maps, create_cleanup_js, find_map, CleanupConfig};
use log::{debug, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "green-inject")]
#[command(about = "Print the web view cleanup script for an embedded map provider", long_about = None)]
struct Cli {
    /// Built-in map id
    map: Option<String>,

    /// Load the cleanup profile from a JSON file instead of a built-in map
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Check that the profile's selectors and css target the same elements
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Print the map url instead of the script
    #[arg(long, default_value_t = false)]
    url: bool,

    /// Observer teardown ceiling in milliseconds, 0 keeps it alive
    #[arg(long)]
    observer_timeout_ms: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let cli = Cli::parse();
    let output = run(&cli)?;
    println!("{}", output);

    Ok(())
}

fn run(cli: &Cli) -> Result<String> {
    if cli.url {
        let id = cli
            .map
            .as_deref()
            .ok_or_else(|| anyhow!("--url needs a map id"))?;
        let map = find_map(id).ok_or_else(|| unknown_map(id))?;
        return Ok(map.url);
    }

    let mut profile = load_profile(cli)?;
    if let Some(observer_timeout_ms) = cli.observer_timeout_ms {
        profile.observer_timeout_ms = observer_timeout_ms;
    }

    if cli.check {
        if !profile.is_consistent() {
            return Err(anyhow!(
                "selectors and css rules disagree\n  selectors: {:?}\n  css:       {:?}",
                profile.selectors,
                profile.css_selectors()
            ));
        }
        return Ok(format!("ok: {} selectors", profile.selectors.len()));
    }

    debug!("Rendering script for {} selectors", profile.selectors.len());
    Ok(create_cleanup_js(&profile))
}

fn load_profile(cli: &Cli) -> Result<CleanupConfig> {
    if let Some(path) = &cli.profile {
        info!("Loading profile from {}", path.display());
        return Ok(CleanupConfig::from_json_file(path)?);
    }

    let id = cli
        .map
        .as_deref()
        .ok_or_else(|| anyhow!("expected a map id or --profile"))?;
    let map = find_map(id).ok_or_else(|| unknown_map(id))?;
    map.cleanup
        .ok_or_else(|| anyhow!("map {} has no cleanup profile", map.id))
}

fn unknown_map(id: &str) -> anyhow::Error {
    let known: Vec<String> = builtin_maps().into_iter().map(|map| map.id).collect();
    anyhow!("unknown map {}, expected one of: {}", id, known.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use green_cleanup::windy;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("green-inject").chain(args.iter().copied()))
    }

    #[test]
    fn test_builtin_script() {
        assert_eq!(run(&cli(&["windy"])).unwrap(), create_cleanup_js(&windy()));
    }

    #[test]
    fn test_url() {
        assert_eq!(
            run(&cli(&["windy", "--url"])).unwrap(),
            "https://www.windy.com/?21.0245,105.8412,5"
        );
        assert!(run(&cli(&["--url"])).is_err());
    }

    #[test]
    fn test_check() {
        assert_eq!(run(&cli(&["green-map", "--check"])).unwrap(), "ok: 4 selectors");
    }

    #[test]
    fn test_observer_override() {
        let script = run(&cli(&["windy", "--observer-timeout-ms", "0"])).unwrap();
        assert!(!script.contains("observer.disconnect()"));
    }

    #[test]
    fn test_unknown_map() {
        let err = run(&cli(&["osm"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown map osm, expected one of: windy, green-map"
        );
        assert!(run(&cli(&[])).is_err());
    }
}
