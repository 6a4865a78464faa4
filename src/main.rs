use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apiprobe::cli::{
    Cli, CollectionCommands, Commands, ConfigCommands, CopyFormat, HistoryCommands, OutputFormat,
    RequestArgs, TransportArgs,
};
use apiprobe::clipboard::StdoutClipboard;
use apiprobe::collections::{CollectionId, normalize_name};
use apiprobe::config::{AppConfig, database_path};
use apiprobe::forwarder;
use apiprobe::http::client::Transport;
use apiprobe::http::request::RequestInput;
use apiprobe::runtime::Runtime;
use apiprobe::session::{Message, Session};
use apiprobe::storage::{self, SqliteStore};
use apiprobe::ui::{response_panel, sidebar};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(storage::default_data_dir);
    let mut config = AppConfig::load(&data_dir)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    init_logging(&config.log_level)?;
    debug!(data_dir = %data_dir.display(), "starting");

    match cli.command {
        Commands::Serve { bind } => {
            let addr = bind.unwrap_or(config.bind_addr);
            forwarder::serve(addr)
                .await
                .with_context(|| format!("Forwarder on {addr} failed"))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Send(args) => {
            let mut runtime = open_runtime(&data_dir, &config, &args.transport)?;
            runtime.boot().await;
            fill_form(&mut runtime, &RequestInput::from(&args.request));
            send(runtime, cli.output, args.transport.copy).await
        }
        Commands::History(command) => handle_history(command, &data_dir, &config, cli.output).await,
        Commands::Collections(command) => {
            handle_collections(command, &data_dir, &config, cli.output).await
        }
        Commands::Config(ConfigCommands::Show) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config(ConfigCommands::Save) => {
            config.save(&data_dir)?;
            println!("Saved {}", apiprobe::config::config_path(&data_dir).display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn handle_history(
    command: HistoryCommands,
    data_dir: &Path,
    config: &AppConfig,
    output: OutputFormat,
) -> Result<ExitCode> {
    let transport = match &command {
        HistoryCommands::Resend { transport, .. } => transport.clone(),
        _ => TransportArgs {
            via: None,
            copy: None,
        },
    };
    let mut runtime = open_runtime(data_dir, config, &transport)?;
    runtime.boot().await;

    match command {
        HistoryCommands::List => {}
        HistoryCommands::Show { id } => {
            let Some(entry) = runtime.session().history().iter().find(|entry| entry.id == id) else {
                bail!("No history entry #{id}");
            };
            print_value(output, entry, || {
                format!(
                    "{}\nResponse:\n{}",
                    sidebar::render_history(std::slice::from_ref(entry)),
                    apiprobe::http::json::pretty(&entry.response)
                )
            })?;
            return Ok(ExitCode::SUCCESS);
        }
        HistoryCommands::Resend { id, .. } => {
            if !runtime.session().history().iter().any(|entry| entry.id == id) {
                bail!("No history entry #{id}");
            }
            runtime.dispatch(Message::HistoryEntrySelected(id));
            return send(runtime, output, transport.copy).await;
        }
        HistoryCommands::Delete { id } => {
            runtime.submit(Message::HistoryEntryDeletePressed(id)).await;
        }
        HistoryCommands::Clear => {
            runtime.submit(Message::HistoryClearPressed).await;
        }
    }

    let session = runtime.session();
    print_value(output, session.history(), || sidebar::render_history(session.history()))?;
    Ok(exit_code(session))
}

async fn handle_collections(
    command: CollectionCommands,
    data_dir: &Path,
    config: &AppConfig,
    output: OutputFormat,
) -> Result<ExitCode> {
    let transport = match &command {
        CollectionCommands::Run { transport, .. } => transport.clone(),
        _ => TransportArgs {
            via: None,
            copy: None,
        },
    };
    let mut runtime = open_runtime(data_dir, config, &transport)?;
    runtime.boot().await;

    match command {
        CollectionCommands::List => {}
        CollectionCommands::Create { name } => {
            if normalize_name(&name).is_none() {
                bail!("Collection name cannot be empty");
            }
            runtime.dispatch(Message::CollectionNameChanged(name));
            runtime.submit(Message::CreateCollectionPressed).await;
        }
        CollectionCommands::Items { collection_id } => {
            select_collection(&mut runtime, collection_id).await?;
            let session = runtime.session();
            print_value(output, session.collection_items(), || {
                sidebar::render_items(session.collection_items())
            })?;
            return Ok(exit_code(session));
        }
        CollectionCommands::Save {
            collection_id,
            request,
        } => {
            select_collection(&mut runtime, collection_id).await?;
            save_to_collection(&mut runtime, &request).await?;
            let session = runtime.session();
            print_value(output, session.collection_items(), || {
                sidebar::render_items(session.collection_items())
            })?;
            return Ok(exit_code(session));
        }
        CollectionCommands::Run {
            collection_id,
            item_id,
            ..
        } => {
            select_collection(&mut runtime, collection_id).await?;
            if !runtime
                .session()
                .collection_items()
                .iter()
                .any(|item| item.id == item_id)
            {
                bail!("No request #{item_id} in collection #{collection_id}");
            }
            runtime.dispatch(Message::CollectionItemSelected(item_id));
            return send(runtime, output, transport.copy).await;
        }
    }

    let session = runtime.session();
    print_value(output, session.collections(), || {
        sidebar::render_collections(session.collections(), session.selected_collection())
    })?;
    Ok(exit_code(session))
}

async fn select_collection(runtime: &mut Runtime, collection_id: CollectionId) -> Result<()> {
    if !runtime
        .session()
        .collections()
        .iter()
        .any(|collection| collection.id == collection_id)
    {
        bail!("No collection #{collection_id}");
    }
    runtime.submit(Message::CollectionSelected(collection_id)).await;
    Ok(())
}

async fn save_to_collection(runtime: &mut Runtime, request: &RequestArgs) -> Result<()> {
    fill_form(runtime, &RequestInput::from(request));
    runtime.submit(Message::SaveToCollectionPressed).await;
    if let Some(notice) = runtime.session().notice() {
        bail!("{notice}");
    }
    Ok(())
}

async fn send(mut runtime: Runtime, output: OutputFormat, copy: Option<CopyFormat>) -> Result<ExitCode> {
    runtime.submit(Message::SendPressed).await;

    let session = runtime.session();
    let Some(response) = session.response() else {
        bail!("No response recorded");
    };
    print_value(output, response, || {
        response_panel::render(Some(response), session.notice())
    })?;

    match copy {
        Some(CopyFormat::Json) => runtime.dispatch(Message::CopyJsonPressed),
        Some(CopyFormat::Curl) => runtime.dispatch(Message::CopyCurlPressed),
        None => {}
    }

    Ok(exit_code(runtime.session()))
}

fn fill_form(runtime: &mut Runtime, form: &RequestInput) {
    runtime.dispatch(Message::MethodSelected(form.method));
    runtime.dispatch(Message::UrlChanged(form.url.clone()));
    runtime.dispatch(Message::HeadersEdited(form.headers.clone()));
    runtime.dispatch(Message::BodyEdited(form.body.clone()));
}

fn open_runtime(data_dir: &Path, config: &AppConfig, transport: &TransportArgs) -> Result<Runtime> {
    storage::ensure_data_dir(data_dir)
        .with_context(|| format!("Failed to create data directory `{}`", data_dir.display()))?;
    let path = database_path(data_dir);
    let store = SqliteStore::open(&path)
        .with_context(|| format!("Failed to open database `{}`", path.display()))?;

    let transport = match transport.via.as_ref().or(config.forwarder_url.as_ref()) {
        Some(endpoint) => Transport::via_forwarder(endpoint.clone()),
        None => Transport::direct(),
    };

    Ok(Runtime::new(
        Arc::new(store),
        transport,
        Arc::new(StdoutClipboard),
    ))
}

fn print_value<T, F>(output: OutputFormat, value: &T, text: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

/// Store failures do not stop the command, but they should not look like
/// success either.
fn exit_code(session: &Session) -> ExitCode {
    if let Some(notice) = session.notice() {
        warn!("{notice}");
    }
    if session.has_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to initialize logging filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
