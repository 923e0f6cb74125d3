//! Command-line flags of the `arena` binary

use clap::error::{ContextKind, ErrorKind};
use clap::Parser;
use shared::{ArenaError, Config, Result};
use std::ffi::OsString;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about = "Multiplayer arena game", long_about = None)]
pub struct Args {
    /// Run a dedicated server, listening on PORT
    #[arg(long, value_name = "PORT", num_args = 0..=1, conflicts_with = "client")]
    pub server: Option<Option<u16>>,

    /// Join the server at HOST:PORT
    #[arg(long, value_names = ["HOST", "PORT"], num_args = 0..=2)]
    pub client: Option<Vec<String>>,

    /// Local keyboard players
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub players: usize,

    /// Computer-controlled players
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub ai: usize,

    /// Ruleset loaded from config/<NAME>.gamemode
    #[arg(long, value_name = "NAME")]
    pub gamemode: Option<String>,

    /// Name shown to other players when joining a server
    #[arg(long, value_name = "NAME", default_value = "")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Server { port: u16 },
    Client { host: String, port: u16 },
}

/// What to do after reading the command line.
#[derive(Debug)]
pub enum Outcome {
    Run(Args),
    /// Print `message` and exit with `code` without starting anything.
    Exit {
        code: i32,
        message: String,
        stderr: bool,
    },
}

pub fn parse<I, T>(args: I) -> Outcome
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(args) {
        Ok(args) => Outcome::Run(args),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Outcome::Exit {
                code: 0,
                message: err.render().to_string(),
                stderr: false,
            },
            ErrorKind::UnknownArgument => {
                let arg = err
                    .get(ContextKind::InvalidArg)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                Outcome::Exit {
                    code: 1,
                    message: format!("Unrecognized option '{}'. Use --help for usage info.", arg),
                    stderr: true,
                }
            }
            _ => Outcome::Exit {
                code: 1,
                message: err.render().to_string(),
                stderr: true,
            },
        },
    }
}

impl Args {
    /// Picks the process mode, filling omitted host and port from `config`.
    pub fn mode(&self, config: &Config) -> Result<Mode> {
        if let Some(port) = self.server {
            return Ok(Mode::Server {
                port: port.unwrap_or(config.default_port),
            });
        }

        let Some(values) = &self.client else {
            return Ok(Mode::Interactive);
        };

        let host = values
            .first()
            .cloned()
            .unwrap_or_else(|| config.default_host.clone());
        let port = match values.get(1) {
            Some(port) => port
                .parse()
                .map_err(|_| ArenaError::InvalidAddress(format!("{}:{}", host, port)))?,
            None => config.default_port,
        };

        Ok(Mode::Client { host, port })
    }
}
