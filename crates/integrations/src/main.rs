use std::fs::{self, OpenOptions};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;

mod render;
mod tui;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use integrations_core::backend::BackendClient;
use integrations_core::config::{ConfigLocator, FileConfig, Overrides, Settings};
use integrations_core::services::credentials::{parse_credentials, CredentialError, CredentialService};
use integrations_core::services::loader::DataLoader;
use integrations_core::view::render_cards;
use integrations_core::{IntegrationParams, IntegrationType};
use serde_json::{json, Value};
use tokio::task;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load and inspect integration items from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the supported integration types
    List(ListArgs),
    /// Authorize an integration through the backend and print its credentials
    Connect(ConnectArgs),
    /// Load integration items and print them as cards
    Load(LoadArgs),
    /// Launch interactive TUI
    Tui(TuiArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct BackendArgs {
    /// Backend base URL (defaults to http://localhost:8000)
    #[arg(long = "backend-url")]
    backend_url: Option<String>,
    /// User identity sent with authorization requests
    #[arg(long)]
    user: Option<String>,
    /// Organization identity sent with authorization requests
    #[arg(long)]
    org: Option<String>,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// Integration type (notion, airtable, hubspot)
    #[arg(long)]
    integration: IntegrationType,
    /// Print the authorization URL without launching a browser
    #[arg(long = "no-browser")]
    no_browser: bool,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Integration type (notion, airtable, hubspot)
    #[arg(long)]
    integration: IntegrationType,
    /// Credentials as a JSON object
    #[arg(long, conflicts_with = "credentials_file")]
    credentials: Option<String>,
    /// Read credentials JSON from a file
    #[arg(long = "credentials-file")]
    credentials_file: Option<PathBuf>,
    /// Print the authorization URL without launching a browser
    #[arg(long = "no-browser")]
    no_browser: bool,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args, Debug)]
struct TuiArgs {
    #[command(flatten)]
    backend: BackendArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let locator = ConfigLocator::new().context("unable to initialise config directory")?;
    init_logging(&locator, matches!(cli.command, Commands::Tui(_)))?;

    match cli.command {
        Commands::List(args) => list(args),
        Commands::Connect(args) => connect(&locator, args).await,
        Commands::Load(args) => load(&locator, args).await,
        Commands::Tui(args) => {
            let settings = resolve_settings(&locator, &args.backend)?;
            tui::run(settings).await
        }
    }
}

/// Log to stderr, or to a file in the config directory while the TUI owns the terminal.
fn init_logging(locator: &ConfigLocator, to_file: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(locator.log_file())
            .context("failed to open log file")?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

fn resolve_settings(locator: &ConfigLocator, args: &BackendArgs) -> Result<Settings> {
    let file = FileConfig::load(locator).context("failed to read config file")?;
    Ok(Settings::resolve(
        file,
        Overrides {
            backend_url: args.backend_url.clone(),
            user: args.user.clone(),
            org: args.org.clone(),
        },
    ))
}

fn build_client(settings: &Settings) -> Result<BackendClient> {
    BackendClient::with_base_url(&settings.backend_url)
        .with_context(|| format!("invalid backend URL '{}'", settings.backend_url))
}

fn list(args: ListArgs) -> Result<()> {
    if args.json {
        let entries: Vec<Value> = IntegrationType::ALL
            .iter()
            .map(|kind| json!({ "type": kind.label(), "slug": kind.slug() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{:<12} {:<12}", "TYPE", "SLUG");
        println!("{}", "-".repeat(24));
        for kind in IntegrationType::ALL {
            println!("{:<12} {:<12}", kind.label(), kind.slug());
        }
    }
    Ok(())
}

async fn connect(locator: &ConfigLocator, args: ConnectArgs) -> Result<()> {
    let settings = resolve_settings(locator, &args.backend)?;
    let service = CredentialService::new(build_client(&settings)?);
    let credentials = run_connect(&service, &settings, args.integration, !args.no_browser).await?;
    println!("{}", serde_json::to_string_pretty(&credentials)?);
    Ok(())
}

async fn run_connect(
    service: &CredentialService,
    settings: &Settings,
    kind: IntegrationType,
    open_browser: bool,
) -> Result<Value> {
    service
        .connect(
            kind,
            &settings.identity,
            open_browser,
            print_authorization_url,
            || async { wait_for_enter().await },
        )
        .await
        .map_err(|err| anyhow!(err.user_message()))
        .with_context(|| format!("failed to connect {}", kind))
}

async fn load(locator: &ConfigLocator, args: LoadArgs) -> Result<()> {
    let settings = resolve_settings(locator, &args.backend)?;
    let client = build_client(&settings)?;

    let explicit = match (&args.credentials, &args.credentials_file) {
        (Some(raw), _) => Some(parse_credentials(raw).context("invalid --credentials")?),
        (None, Some(path)) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Some(
                parse_credentials(&raw)
                    .with_context(|| format!("invalid credentials in {}", path.display()))?,
            )
        }
        (None, None) => None,
    };

    let mut params = IntegrationParams::default();
    let service = CredentialService::new(client.clone());
    publish_credentials(
        &service,
        &mut params,
        &settings,
        args.integration,
        explicit,
        !args.no_browser,
        || async { wait_for_enter().await },
    )
    .await?;

    let loader = DataLoader::new(client);
    loader
        .load(&mut params)
        .await
        .map_err(|err| anyhow!(err.user_message()))
        .context("load failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&params.items)?);
    } else {
        render::print_cards(&render_cards(&params.items));
    }
    Ok(())
}

/// Publish the `{type, credentials}` pair, running the backend flow when none were given.
async fn publish_credentials<W, Fut>(
    service: &CredentialService,
    params: &mut IntegrationParams,
    settings: &Settings,
    kind: IntegrationType,
    explicit: Option<Value>,
    open_browser: bool,
    wait_for_user: W,
) -> Result<()>
where
    W: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), CredentialError>>,
{
    match explicit {
        Some(credentials) => params.set_credentials(kind, credentials),
        None => service
            .connect_into(
                params,
                kind,
                &settings.identity,
                open_browser,
                print_authorization_url,
                wait_for_user,
            )
            .await
            .map_err(|err| anyhow!(err.user_message()))
            .with_context(|| format!("failed to connect {}", kind))?,
    }
    Ok(())
}

fn print_authorization_url(url: &Url) -> Result<(), CredentialError> {
    eprintln!("\nAuthorize the integration by visiting:\n  {}\n", url);
    Ok(())
}

async fn wait_for_enter() -> Result<(), CredentialError> {
    task::spawn_blocking(|| {
        use std::io::{self, Write};
        eprint!("Press Enter once authorization has completed in the browser: ");
        io::stderr()
            .flush()
            .map_err(|_| CredentialError::Cancelled)?;
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => Err(CredentialError::Cancelled),
            Ok(_) => Ok(()),
        }
    })
    .await
    .map_err(|_| CredentialError::Cancelled)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use integrations_core::Identity;

    fn settings_for(server: &MockServer) -> Settings {
        Settings {
            backend_url: server.base_url(),
            identity: Identity::default(),
        }
    }

    #[tokio::test]
    async fn missing_credentials_run_backend_flow() {
        let server = MockServer::start();
        let authorize = server.mock(|when, then| {
            when.method(POST).path("/integrations/airtable/authorize");
            then.status(200)
                .json_body_obj(&json!("https://airtable.com/oauth2/v1/authorize"));
        });
        let stored = server.mock(|when, then| {
            when.method(POST).path("/integrations/airtable/credentials");
            then.status(200).json_body_obj(&json!({ "access_token": "air" }));
        });

        let settings = settings_for(&server);
        let service = CredentialService::new(build_client(&settings).unwrap());
        let mut params = IntegrationParams::default();
        publish_credentials(
            &service,
            &mut params,
            &settings,
            IntegrationType::Airtable,
            None,
            false,
            || async { Ok(()) },
        )
        .await
        .unwrap();

        authorize.assert();
        stored.assert();
        assert_eq!(params.integration_type, Some(IntegrationType::Airtable));
        assert_eq!(params.credentials.unwrap()["access_token"], "air");
    }

    #[tokio::test]
    async fn explicit_credentials_skip_backend_flow() {
        let server = MockServer::start();
        let any = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body_obj(&json!({}));
        });

        let settings = settings_for(&server);
        let service = CredentialService::new(build_client(&settings).unwrap());
        let mut params = IntegrationParams::default();
        publish_credentials(
            &service,
            &mut params,
            &settings,
            IntegrationType::Hubspot,
            Some(json!({ "access_token": "given" })),
            false,
            || async { Err(CredentialError::Cancelled) },
        )
        .await
        .unwrap();

        any.assert_hits(0);
        assert_eq!(params.integration_type, Some(IntegrationType::Hubspot));
        assert_eq!(params.credentials.unwrap()["access_token"], "given");
    }
}
