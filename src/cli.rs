use crate::server::client::DEFAULT_TIMEOUT_MS;
use clap::Parser;
use url::Url;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "expdash", version = VERSION, about = "Experiment dashboard TUI")]
pub struct Cli {
    /// Dashboard server root URL
    #[arg(short, long, default_value = "http://127.0.0.1:5000", value_parser = parse_server_url)]
    pub server: Url,

    /// Project whose experiments are listed
    #[arg(short, long, default_value = "default")]
    pub project: String,

    /// Experiment filter as a JSON object (invalid input falls back to {})
    #[arg(short, long, default_value = "{}")]
    pub mask: String,

    /// Request timeout in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,

    /// Do not load the experiment list on startup
    #[arg(long)]
    pub no_autoload: bool,

    /// Enable verbose logging to $XDG_STATE_HOME/expdash/debug.log
    #[arg(long)]
    pub verbose: bool,
}

/// Accepts absolute http(s) URLs only.
pub fn parse_server_url(s: &str) -> Result<Url, String> {
    let url = Url::parse(s).map_err(|e| format!("Invalid server URL '{s}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!(
            "Invalid server URL '{s}': expected http or https, got '{other}'"
        )),
    }
}
