use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ClientSettings, HttpDataSource, LoadOutcome, PaginatedListController, Params,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::ListResource,
    protocol::{CartItem, FeedbackEntry, Notification, Order},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Page through storefront lists from the command line")]
struct Cli {
    /// Overrides the api url from storefront.toml and the environment.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a list resource (feedback, cart, orders, notifications) as JSON lines.
    List {
        resource: ListResource,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }

    match cli.command {
        Command::List {
            resource,
            pages,
            page_size,
            params,
        } => {
            if let Some(page_size) = page_size {
                settings.page_size = page_size;
            }
            settings.validate().context("invalid client settings")?;
            let params: Params = params.into_iter().collect();
            match resource {
                ListResource::Feedback => {
                    print_list::<FeedbackEntry>(&settings, resource, pages, params).await
                }
                ListResource::Cart => {
                    print_list::<CartItem>(&settings, resource, pages, params).await
                }
                ListResource::Orders => {
                    print_list::<Order>(&settings, resource, pages, params).await
                }
                ListResource::Notifications => {
                    print_list::<Notification>(&settings, resource, pages, params).await
                }
            }
        }
    }
}

async fn print_list<T>(
    settings: &ClientSettings,
    resource: ListResource,
    pages: u32,
    params: Params,
) -> Result<()>
where
    T: DeserializeOwned + Serialize + Clone + Send + Sync + 'static,
{
    let source = HttpDataSource::<T>::new(settings, resource)
        .with_context(|| format!("failed to set up {resource} source"))?;
    let controller: PaginatedListController<T, _> =
        PaginatedListController::new(source).with_label(resource.name());

    let mut outcome = controller.initialize(settings.page_size, params).await?;
    let mut printed = 0;
    let mut loaded = 0;
    loop {
        if let LoadOutcome::Failed(err) = &outcome {
            warn!(list = %resource, error = %err, "retrying failed page once");
            outcome = controller.load_next().await;
            if let LoadOutcome::Failed(err) = &outcome {
                bail!("loading {resource} failed: {err}");
            }
        }

        let state = controller
            .snapshot()
            .ok_or_else(|| anyhow!("{resource} list was not initialized"))?;
        for item in &state.items[printed..] {
            println!("{}", serde_json::to_string(item)?);
        }
        printed = state.len();

        loaded += 1;
        if state.is_last_page || loaded >= pages {
            info!(
                list = %resource,
                items = state.len(),
                pages_loaded = loaded,
                exhausted = state.is_last_page,
                "done"
            );
            return Ok(());
        }
        outcome = controller.load_next().await;
    }
}
