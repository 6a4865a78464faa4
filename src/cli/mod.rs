//! Command line definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::collections::{CollectionId, CollectionItemId};
use crate::history::HistoryId;
use crate::http::method::HttpMethod;
use crate::http::request::RequestInput;

#[derive(Parser, Debug)]
#[command(name = "apiprobe")]
#[command(about = "Send HTTP requests, keep a history and named collections", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory holding the database and config.json (default: ./.apiprobe)
    #[arg(long, env = "APIPROBE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log filter, used when RUST_LOG is not set
    #[arg(long, env = "APIPROBE_LOG", global = true)]
    pub log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the forwarder endpoint (POST /api/proxy)
    Serve {
        #[arg(long, env = "APIPROBE_BIND")]
        bind: Option<SocketAddr>,
    },
    /// Send a request and record it in the history
    Send(SendArgs),
    /// Inspect or prune the request history
    #[command(subcommand)]
    History(HistoryCommands),
    /// Manage collections of saved requests
    #[command(subcommand)]
    Collections(CollectionCommands),
    /// Show or persist the effective configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    pub url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    pub method: HttpMethod,

    /// Headers as a JSON object
    #[arg(short = 'H', long, default_value = "")]
    pub headers: String,

    /// Request body, sent as-is for non-GET methods
    #[arg(short = 'd', long, default_value = "")]
    pub body: String,
}

impl From<&RequestArgs> for RequestInput {
    fn from(args: &RequestArgs) -> Self {
        RequestInput {
            method: args.method,
            url: args.url.clone(),
            headers: args.headers.clone(),
            body: args.body.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Go through a forwarder endpoint, e.g. http://127.0.0.1:3000/api/proxy
    #[arg(long, env = "APIPROBE_FORWARDER")]
    pub via: Option<String>,

    /// Also copy a derived text to the clipboard sink (stdout)
    #[arg(long, value_enum)]
    pub copy: Option<CopyFormat>,
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    #[command(flatten)]
    pub transport: TransportArgs,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List entries, newest first
    List,
    /// Print one entry including its stored response
    Show { id: HistoryId },
    /// Send a past request again
    Resend {
        id: HistoryId,
        #[command(flatten)]
        transport: TransportArgs,
    },
    /// Delete one entry
    Delete { id: HistoryId },
    /// Delete every entry
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum CollectionCommands {
    List,
    Create { name: String },
    /// List the requests saved in a collection
    Items { collection_id: CollectionId },
    /// Save a request into a collection
    Save {
        collection_id: CollectionId,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Send a saved request
    Run {
        collection_id: CollectionId,
        item_id: CollectionItemId,
        #[command(flatten)]
        transport: TransportArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Show,
    /// Write the effective configuration to config.json
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CopyFormat {
    Json,
    Curl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_send_with_method_and_body() {
        let cli = Cli::try_parse_from([
            "apiprobe",
            "send",
            "https://example.com/echo",
            "-X",
            "post",
            "-d",
            "{\"a\":1}",
            "--copy",
            "curl",
        ])
        .unwrap();

        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.request.method, HttpMethod::Post);
        assert_eq!(args.request.body, "{\"a\":1}");
        assert_eq!(args.transport.copy, Some(CopyFormat::Curl));
        assert_eq!(cli.output, OutputFormat::Text);

        let form = RequestInput::from(&args.request);
        assert_eq!(form.url, "https://example.com/echo");
    }

    #[test]
    fn rejects_unsupported_methods() {
        let result = Cli::try_parse_from(["apiprobe", "send", "https://a.com", "-X", "PATCH"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_output_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["apiprobe", "history", "list", "--output", "json"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::History(HistoryCommands::List)));
    }
}
