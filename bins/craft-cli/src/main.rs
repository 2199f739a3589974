//! craft-cli: live view of the $CRAFT contracts and guided transactions.
//!
//! Reads are served from a block-keyed cache; `mint` and `delegate` check
//! their preconditions on the current snapshot before submitting anything.

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use craft_core::config::ClientConfig;
use craft_core::error::OrchestrationError;
use craft_core::format::{format_by_thousands, format_units};
use craft_core::traits::ContractGateway;
use craft_core::types::Governor;
use craft_orchestrator::{Action, Delegate, MintGamePiece, OrchestrationStatus, Orchestrator};
use craft_rpc::RpcGateway;
use craft_sync::views::{BalanceView, DelegateView, MintView, StreamView};
use craft_sync::{BlockWatcher, ContractStateCache, Observation};
use tracing::{info, warn};

/// Placeholder for a value that has not been read yet.
const LOADING: &str = "...";

#[derive(Parser)]
#[command(name = "craft-cli")]
#[command(version, about = "Live $CRAFT balances, stream rate, minting and delegation.")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Config file (default: <config dir>/craft/config.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint, overriding the config file.
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Account to read for and send from.
    #[arg(long, global = true)]
    account: Option<Address>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json").
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the account's larpcoin balance.
    Balance,
    /// Show how many larpcoins the slowlock streams over the next 30 days.
    StreamRate,
    /// Approve (if needed) and mint a game piece.
    Mint,
    /// Register to vote by delegating to yourself.
    Delegate(DelegateArgs),
    /// Follow the chain and print every fresh snapshot.
    Watch,
}

#[derive(Args)]
struct DelegateArgs {
    /// Which governor to register with.
    #[arg(long, value_enum, default_value_t = GovernorArg::Larpcoin)]
    governor: GovernorArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum GovernorArg {
    Larpcoin,
    GamePiece,
}

impl From<GovernorArg> for Governor {
    fn from(g: GovernorArg) -> Self {
        match g {
            GovernorArg::Larpcoin => Governor::Larpcoin,
            GovernorArg::GamePiece => Governor::GamePiece,
        }
    }
}

/// Gateway, cache and orchestrator wired from one config.
struct Client {
    config: ClientConfig,
    cache: Arc<ContractStateCache>,
    orchestrator: Orchestrator,
}

impl Client {
    fn new(config: ClientConfig) -> Result<Self> {
        let gateway: Arc<dyn ContractGateway> =
            Arc::new(RpcGateway::from_config(&config).context("Failed to build RPC client")?);
        let cache = Arc::new(ContractStateCache::new(gateway.clone(), config.sync.clone()));
        let orchestrator = Orchestrator::new(gateway, cache.clone(), config.orchestrator.clone());
        Ok(Self { config, cache, orchestrator })
    }

    async fn sync(&self) -> Result<()> {
        self.cache.sync().await.context("Failed to sync contract state")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.global)?;
    init_logging(&config.log_level, &config.log_format);
    info!(endpoint = %config.rpc_endpoint, account = %config.account, "craft-cli starting");

    let client = Client::new(config)?;
    match cli.command {
        Commands::Balance => balance(&client).await,
        Commands::StreamRate => stream_rate(&client).await,
        Commands::Mint => mint(&client).await,
        Commands::Delegate(args) => delegate(&client, args.governor.into()).await,
        Commands::Watch => watch(client).await,
    }
}

fn load_config(args: &GlobalArgs) -> Result<ClientConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = ClientConfig::load(path.as_deref())
        .with_context(|| format!("Failed to load config{}", describe_path(path.as_ref())))?;
    if let Some(url) = &args.rpc_url {
        config.rpc_endpoint = url.clone();
    }
    if let Some(account) = args.account {
        config.account = account;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.log_format = format.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("craft").join("config.toml");
    path.exists().then_some(path)
}

fn describe_path(path: Option<&PathBuf>) -> String {
    path.map(|p| format!(" from {}", p.display())).unwrap_or_default()
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

async fn balance(client: &Client) -> Result<()> {
    let view = BalanceView::new(client.config.larpcoin()?, client.config.account()?);
    client.cache.register(view.batch().clone());
    client.sync().await?;
    println!("{}", render_balance(client, &view));
    Ok(())
}

fn render_balance(client: &Client, view: &BalanceView) -> String {
    let name = &client.config.names.larpcoin;
    match client.cache.observe(view.batch()).reads().map(|r| view.values(r)) {
        Some(Ok(v)) => format!("{} {name}", v.display()),
        _ => format!("{LOADING} {name}"),
    }
}

async fn stream_rate(client: &Client) -> Result<()> {
    let view = StreamView::new(client.config.slowlock()?, client.config.larpcoin()?, now());
    client.cache.register(view.batch().clone());
    client.sync().await?;
    println!("{}", render_stream_rate(client, &view));
    Ok(())
}

fn render_stream_rate(client: &Client, view: &StreamView) -> String {
    let name = &client.config.names.larpcoin;
    let Some(Ok(v)) = client.cache.observe(view.batch()).reads().map(|r| view.values(r)) else {
        return format!("{LOADING} {name} / month");
    };
    let rate = craft_decay::stream_rate_from_pair(v.target, v.current);
    match format_units(rate, v.decimals).parse::<f64>() {
        Ok(units) => format!("{} {name} / month", format_by_thousands(units)),
        Err(_) => format!("{LOADING} {name} / month"),
    }
}

fn render_mint(client: &Client, view: &MintView) -> String {
    let name = &client.config.names.larpcoin;
    match client.cache.observe(view.batch()).reads().map(|r| view.values(r)) {
        Some(Ok(v)) => format!(
            "balance {}, allowance {}, cost {} (base units of {name})",
            v.balance, v.allowance, v.cost
        ),
        _ => format!("cost {LOADING} {name}"),
    }
}

fn render_delegate(view: &DelegateView, observation: &Observation, governor: Governor) -> String {
    match observation.reads().map(|r| view.values(r)) {
        Some(Ok(v)) if v.is_registered() => format!("{governor}: registered ({} votes)", v.votes),
        Some(Ok(v)) => format!("{governor}: not registered ({} votes)", v.votes),
        _ => format!("{governor}: {LOADING}"),
    }
}

async fn mint(client: &Client) -> Result<()> {
    let action = MintGamePiece::from_config(&client.config)?;
    client.orchestrator.prepare(&action).await.context("Failed to sync contract state")?;
    println!("{}", render_mint(client, action.view()));
    drive(client, &action).await
}

async fn delegate(client: &Client, governor: Governor) -> Result<()> {
    let action = Delegate::from_config(&client.config, governor)?;
    client.orchestrator.prepare(&action).await.context("Failed to sync contract state")?;
    let observation = client.cache.observe(action.view().batch());
    println!("{}", render_delegate(action.view(), &observation, governor));
    drive(client, &action).await
}

/// Start the run and print every status change until it ends.
async fn drive(client: &Client, action: &dyn Action) -> Result<()> {
    let handle = match client.orchestrator.run(action) {
        Ok(handle) => handle,
        Err(OrchestrationError::Precondition(p)) => bail!("Cannot {}: {p}", action.key()),
        Err(e) => return Err(e).context("Failed to start transaction"),
    };

    let mut status = handle.subscribe();
    loop {
        let current = status.borrow_and_update().clone();
        if current != OrchestrationStatus::Idle && !current.is_terminal() {
            println!("{}: {current}", handle.key());
        }
        if current.is_terminal() || status.changed().await.is_err() {
            break;
        }
    }

    let report = handle.wait().await?;
    for tx in &report.handles {
        println!("  tx {} {:?}", tx.id(), tx.status());
    }
    match report.status {
        OrchestrationStatus::Succeeded => {
            println!("{}: done", report.key);
            Ok(())
        }
        OrchestrationStatus::Failed(reason) => bail!("{} failed: {reason}", report.key),
        other => bail!("{} ended in unexpected state {other}", report.key),
    }
}

async fn watch(client: Client) -> Result<()> {
    let larpcoin = client.config.larpcoin()?;
    let account = client.config.account()?;
    let slowlock = client.config.slowlock()?;
    let balance = BalanceView::new(larpcoin, account);
    client.cache.register(balance.batch().clone());

    let watcher = BlockWatcher::new(client.cache.clone());
    let mut fresh = watcher.subscribe();
    let (task, stop) = watcher.spawn();

    println!("{}", render_balance(&client, &balance));
    loop {
        tokio::select! {
            changed = fresh.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(block) = *fresh.borrow_and_update() else { continue };
                println!("block {block}");
                println!("  balance     {}", render_balance(&client, &balance));
                let stream = refresh_stream_view(&client, slowlock, larpcoin).await;
                println!("  stream rate {}", render_stream_rate(&client, &stream));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, stopping watcher");
                break;
            }
        }
    }

    stop.send(true).ok();
    task.await.context("Block watcher task failed")?;
    Ok(())
}

/// Stream view with its one-month horizon moved up to now. Registering under
/// the same name replaces the previous horizon's read; the refetch lands
/// before this returns unless the node is unreachable.
async fn refresh_stream_view(client: &Client, slowlock: Address, larpcoin: Address) -> StreamView {
    let view = StreamView::new(slowlock, larpcoin, now());
    client.cache.register(view.batch().clone());
    if let Err(e) = client.cache.sync().await {
        warn!(error = %e, "stream rate refetch failed");
    }
    view
}

/// Initialize tracing with the given level and output format.
///
/// `RUST_LOG` overrides the level. Pass `format = "json"` for structured output.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
