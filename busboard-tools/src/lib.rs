use busboard::board::config::ConfigError;
use busboard::board::{BoardConfig, BoardKind, Reconciled};
use busboard::link::Event;

use getopts::Options;
use serde::Deserialize;
use std::path::Path;

#[macro_export]
macro_rules! log{
    ($tf:expr, $msg:expr)=>{
    {
        println!("{}{}", chrono::Local::now().format(&$tf), $msg);
    }
    };
    ($tf:expr, $f:expr,$($a:tt)*)=>{
    {
        $crate::log!($tf, format!($f, $($a)*));
    }
    };
}

pub static DEFAULT_TIMESTAMP_FORMAT: &str = "%T%.3f ";

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid configuration '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Usage(String),
}

/// Layout of a configuration file. The board section is optional, as is
/// every field in it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub board: BoardConfig,
    /// Overrides the endpoint derived from the page location.
    pub url: Option<String>,
    pub timestamp_format: Option<String>,
}

pub fn parse_config(text: &str) -> Result<ToolConfig, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(ToolConfig::default());
    }
    serde_yaml::from_str(text)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ToolConfig, ToolError> {
    let path_str = path.as_ref().display().to_string();
    let text = std::fs::read_to_string(&path).map_err(|source| ToolError::Read {
        path: path_str.clone(),
        source,
    })?;
    parse_config(&text).map_err(|source| ToolError::Parse {
        path: path_str,
        source,
    })
}

pub fn board_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("c", "", "YAML configuration file", "path");
    opts.optopt(
        "u",
        "",
        "Websocket url (default: derived from the configured page location)",
        "url",
    );
    opts.optflag("", "morning", "Morning board (read-only, default)");
    opts.optflag("", "afternoon", "Afternoon board (interactive)");
    opts.optflag("", "admin", "Allow authoring announcements");
    opts.optopt("t", "", "Timestamp format (default '%T%.3f ')", "fmt");
    opts.optflag("v", "", "Verbose output");
    opts.optflag("d", "", "Debugging output");
    opts.optflag("h", "help", "Print this help");
    opts
}

/// Everything a tool needs after option parsing.
pub struct BoardArgs {
    pub matches: getopts::Matches,
    pub config: BoardConfig,
    pub url: String,
    pub tf: String,
    pub verbose: bool,
    pub debugging: bool,
}

pub fn board_parseopts(opts: &Options, args: &[String]) -> Result<BoardArgs, ToolError> {
    let matches = opts
        .parse(args)
        .map_err(|f| ToolError::Usage(f.to_string()))?;

    let file = match matches.opt_str("c") {
        Some(path) => load_config(path)?,
        None => ToolConfig::default(),
    };
    let mut config = file.board;

    match (matches.opt_present("morning"), matches.opt_present("afternoon")) {
        (true, true) => {
            return Err(ToolError::Usage(
                "--morning and --afternoon are mutually exclusive".to_string(),
            ))
        }
        (true, false) => config.board = BoardKind::Morning,
        (false, true) => config.board = BoardKind::Afternoon,
        (false, false) => {}
    }
    if matches.opt_present("admin") {
        config.admin = true;
    }
    config.validate()?;

    let url = match matches.opt_str("u").or(file.url) {
        Some(url) => url,
        None => config.endpoint().map_err(ConfigError::from)?.url(),
    };
    let tf = matches
        .opt_str("t")
        .or(file.timestamp_format)
        .unwrap_or(DEFAULT_TIMESTAMP_FORMAT.to_string());

    Ok(BoardArgs {
        verbose: matches.opt_present("v"),
        debugging: matches.opt_present("d"),
        matches,
        config,
        url,
        tf,
    })
}

/// One line describing a link event, or `None` for events only worth
/// showing when debugging.
pub fn describe_event(event: &Event, verbose: bool) -> Option<String> {
    match event {
        Event::Connected => Some("Connected".to_string()),
        Event::Disconnected => Some("Disconnected".to_string()),
        Event::ConnectFailed(why) => Some(format!("Connection attempt failed: {}", why)),
        Event::Reconnecting { attempt, delay } => {
            if verbose {
                Some(format!(
                    "Reconnecting in {:.3}s (attempt {})",
                    delay.as_secs_f64(),
                    attempt
                ))
            } else {
                None
            }
        }
        Event::HeartbeatSent => None,
        Event::HeartbeatTimeout => Some("No heartbeat response, refreshing".to_string()),
        Event::Refreshing => Some("Refreshing connection".to_string()),
        Event::Message(_) => None,
        Event::ProtocolError(err) => Some(format!("Dropped malformed frame: {}", err)),
        Event::SendDropped(msg) => Some(format!("Not connected, dropped {}", msg.to_json())),
        Event::Exiting => Some("Link exiting".to_string()),
    }
}

/// Lines describing what a snapshot changed.
pub fn describe_outcome(outcome: &Reconciled) -> Vec<String> {
    match outcome {
        Reconciled::Rejected(error) => vec![format!("Server error: {}", error)],
        Reconciled::Applied {
            transitions,
            user_route_changed,
        } => {
            let mut lines: Vec<String> = transitions
                .iter()
                .map(|t| match t.from {
                    Some(from) => format!("{} ({}): {} -> {}", t.route_name, t.id, from, t.to),
                    None => format!("{} ({}): new, {}", t.route_name, t.id, t.to),
                })
                .collect();
            if *user_route_changed {
                lines.push("User route changed".to_string());
            }
            lines
        }
    }
}
