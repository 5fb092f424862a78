use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Stream one chat reply from a chatflow backend into the terminal
#[derive(Debug, Parser)]
#[command(name = "chatflow", version, about)]
pub struct Cli {
    /// Message to send
    pub message: String,

    /// Which backend endpoint answers the message
    #[arg(long, value_enum, default_value_t = Mode::Chat)]
    pub mode: Mode,

    /// Knowledge base id for `--mode rag` (repeatable)
    #[arg(long = "kb", value_name = "ID")]
    pub knowledge_bases: Vec<String>,

    /// Text printed above the reply
    #[arg(long)]
    pub header: Option<String>,

    /// Extra TOML config file, layered over config/default.toml and config/{ENV}.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `server.base_url`
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override `stream.throttle_ms`
    #[arg(long)]
    pub throttle_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Plain chat (NDJSON reply)
    Chat,
    /// Knowledge-base chat (SSE reply)
    Rag,
    /// Web search, then chat on the enriched prompt
    Search,
}
