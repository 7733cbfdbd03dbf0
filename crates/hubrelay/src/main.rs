// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hubrelay - relays HipChat room traffic to a bot pipeline and back.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod send;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

/// Hubrelay - relays HipChat room traffic to a bot pipeline and back.
#[derive(Parser, Debug)]
#[command(name = "hubrelay", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Watch the configured rooms and relay messages (default).
    Serve,
    /// Send one message to a room and exit.
    Send {
        /// Room to post to.
        #[arg(long)]
        room: String,
        /// Send as an action ("/me ...").
        #[arg(long)]
        emote: bool,
        /// Message text; multiple words are joined with spaces.
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Verify the credential and print the account it belongs to.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => hubrelay_config::load_and_validate_path(path),
        None => hubrelay_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            hubrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.relay.log_level);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Send { room, emote, text } => {
            send::run_send(&config, &room, &text.join(" "), emote).await
        }
        Commands::Check => check::run_check(&config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "hubrelay exiting with error");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["hubrelay"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn send_collects_words() {
        let cli = Cli::try_parse_from([
            "hubrelay", "send", "--room", "ops", "--emote", "deploys", "the", "thing",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Send {
                room: "ops".into(),
                emote: true,
                text: vec!["deploys".into(), "the".into(), "thing".into()],
            })
        );
    }

    #[test]
    fn send_requires_text_and_room() {
        assert!(Cli::try_parse_from(["hubrelay", "send", "--room", "ops"]).is_err());
        assert!(Cli::try_parse_from(["hubrelay", "send", "hello"]).is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["hubrelay", "check", "--config", "/tmp/relay.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/relay.toml")));
        assert_eq!(cli.command, Some(Commands::Check));
    }
}
