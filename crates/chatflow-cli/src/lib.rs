pub mod cli;
pub mod config;
pub mod logging;
pub mod session;
pub mod terminal;

pub use cli::{Cli, Mode};
pub use config::Config;
pub use session::run_turn;
pub use terminal::TerminalSink;
