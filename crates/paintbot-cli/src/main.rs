use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use paintbot_contracts::catalog::build_carousel;
use paintbot_contracts::events::{parse_webhook_body, InboundEvent, PostbackEvent, TextEvent};
use paintbot_contracts::menus::{MenuManifest, MenuRegistry};
use paintbot_contracts::runs::{write_report, DeploymentReport};
use paintbot_engine::bot::CATALOG_ALT_TEXT;
use paintbot_engine::config::menu_dir_from_env;
use paintbot_engine::{
    Bot, BotSettings, CatalogSource, DeployOptions, DryrunPlatform, EventOutcome, FileCatalog,
    LineClient, LineConfig, MenuDeployer, NotionCatalog, NotionConfig,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const CHAT_USER_ID: &str = "dryrun-user";
const POSTBACK_PREFIX: &str = "postback:";

#[derive(Debug, Parser)]
#[command(name = "paintbot", version, about = "Paint catalog bot and rich menu deployer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create rich menus, bind their aliases and set the default menu.
    Deploy(DeployArgs),
    /// Print the catalog carousel as Flex JSON.
    Render(RenderArgs),
    /// Dispatch the events of a webhook body against the live platform.
    Handle(HandleArgs),
    /// Interactive session against an in-memory platform.
    Chat(ChatArgs),
}

#[derive(Debug, Parser)]
struct DeployArgs {
    /// Menu to deploy; repeatable. Defaults to every menu in the manifest.
    #[arg(long = "menu")]
    menus: Vec<String>,
    #[arg(long)]
    delete_old: bool,
    #[arg(long = "default")]
    default_menu: Option<String>,
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct RenderArgs {
    /// Saved query response to render instead of querying the database.
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct HandleArgs {
    #[arg(long)]
    event: PathBuf,
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    catalog: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("paintbot error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("PAINTBOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run() -> Result<i32> {
    init_logging();
    if let Err(err) = dotenv::dotenv() {
        debug!("no .env file loaded: {err}");
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Deploy(args) => run_deploy(args),
        Command::Render(args) => {
            run_render(args)?;
            Ok(0)
        }
        Command::Handle(args) => run_handle(args),
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
    }
}

fn catalog_source(path: Option<PathBuf>) -> Result<Arc<dyn CatalogSource>> {
    match path {
        Some(path) => Ok(Arc::new(FileCatalog::new(path))),
        None => {
            let config = NotionConfig::from_env().context("catalog database is not configured")?;
            Ok(Arc::new(NotionCatalog::new(config)?))
        }
    }
}

fn run_deploy(args: DeployArgs) -> Result<i32> {
    let menu_dir = menu_dir_from_env();
    let manifest = MenuManifest::load(&menu_dir)?;
    let definitions = manifest.select(&args.menus)?;
    if let Some(name) = args.default_menu.as_deref() {
        if !definitions.iter().any(|definition| definition.name == name) {
            bail!("default menu '{name}' is not among the menus being deployed");
        }
    }

    let config = LineConfig::from_env()?;
    let deployer = MenuDeployer::new(
        Arc::new(LineClient::new(&config)),
        Arc::new(MenuRegistry::new()),
    );
    let options = DeployOptions {
        delete_old: args.delete_old,
        default_menu: args.default_menu.clone(),
    };

    let mut report = DeploymentReport::start(options.delete_old);
    let outcome = deployer.deploy_into(&definitions, &options, &mut report);

    for entry in &report.cleanup {
        if let Some(error) = entry.error.as_deref() {
            println!("cleanup {}: failed ({error})", entry.resource_id);
        }
    }
    for menu in &report.menus {
        println!(
            "{} -> {} [{}] alias={}",
            menu.name,
            menu.resource_id.as_deref().unwrap_or("-"),
            menu.stage,
            menu.alias
        );
    }

    if let Some(path) = args.report.as_deref() {
        let mut extra = Map::new();
        extra.insert("menu_dir".to_string(), json!(menu_dir.display().to_string()));
        extra.insert("requested".to_string(), json!(args.menus));
        write_report(path, &report, Some(&extra))?;
        info!(path = %path.display(), "wrote deployment report");
    }

    outcome.context("rich menu deployment failed")?;
    Ok(0)
}

fn run_render(args: RenderArgs) -> Result<()> {
    let settings = BotSettings::from_env()?;
    let records = catalog_source(args.catalog)?.fetch_records()?;
    let carousel = build_carousel(&records, settings.max_cards);
    if carousel.omitted > 0 {
        warn!(omitted = carousel.omitted, "records beyond the card limit were dropped");
    }

    let rendered = serde_json::to_string_pretty(&carousel.to_flex_message(CATALOG_ALT_TEXT))?;
    match args.out {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("failed writing {}", path.display()))?;
            println!("Wrote {} cards to {}", carousel.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn run_handle(args: HandleArgs) -> Result<i32> {
    let raw = fs::read_to_string(&args.event)
        .with_context(|| format!("failed reading {}", args.event.display()))?;
    let body: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.event.display()))?;
    let events = parse_webhook_body(&body);
    if events.is_empty() {
        println!("No actionable events.");
        return Ok(0);
    }

    let config = LineConfig::from_env()?;
    let line = Arc::new(LineClient::new(&config));
    let registry = Arc::new(MenuRegistry::new());
    let manifest = MenuManifest::load(&menu_dir_from_env())?;
    let definitions = manifest.select(&[])?;
    let adopted = MenuDeployer::new(line.clone(), registry.clone()).adopt_existing(&definitions);
    debug!(adopted, "loaded menu aliases from platform");

    let bot = Bot::new(
        catalog_source(args.catalog)?,
        line,
        registry,
        BotSettings::from_env()?,
    );
    let mut failed = 0;
    for event in &events {
        let outcome = bot.handle(event);
        if matches!(outcome, EventOutcome::Failed { .. }) {
            failed += 1;
        }
        print_outcome(&outcome)?;
    }
    Ok(if failed > 0 { 1 } else { 0 })
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let platform = Arc::new(DryrunPlatform::new());
    let registry = Arc::new(MenuRegistry::new());

    let manifest = MenuManifest::load(&menu_dir_from_env())?;
    let definitions = manifest.select(&[])?;
    let deployer = MenuDeployer::new(platform.clone(), registry.clone());
    if let Err(err) = deployer.deploy(&definitions, &DeployOptions::default()) {
        warn!("menus not fully deployed; postbacks may not route: {err}");
    }

    let bot = Bot::new(
        catalog_source(args.catalog)?,
        platform.clone(),
        registry.clone(),
        BotSettings::from_env()?,
    );

    println!(
        "Paintbot chat started ({} menus deployed). Type text, `postback:<data>`, or /quit.",
        registry.len()
    );
    let stdin = io::stdin();
    let mut line = String::new();
    let mut turn = 0u64;
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        if input.trim().is_empty() {
            continue;
        }
        if matches!(input.trim(), "/quit" | "/exit") {
            break;
        }

        turn += 1;
        let reply_token = format!("dryrun-reply-{turn}");
        let event = match input.strip_prefix(POSTBACK_PREFIX) {
            Some(data) => InboundEvent::Postback(PostbackEvent {
                reply_token: Some(reply_token),
                user_id: CHAT_USER_ID.to_string(),
                data: data.trim().to_string(),
            }),
            None => InboundEvent::Text(TextEvent {
                reply_token,
                user_id: Some(CHAT_USER_ID.to_string()),
                text: input.to_string(),
            }),
        };

        let outcome = bot.handle(&event);
        for reply in platform.take_replies() {
            for message in &reply.messages {
                println!("{}", serde_json::to_string_pretty(message)?);
            }
        }
        if !matches!(outcome, EventOutcome::Replied { .. }) {
            print_outcome(&outcome)?;
        }
    }
    Ok(())
}

fn print_outcome(outcome: &EventOutcome) -> Result<()> {
    match outcome {
        EventOutcome::Replied { messages } => {
            for message in messages {
                println!("{}", serde_json::to_string_pretty(message)?);
            }
        }
        EventOutcome::MenuLinked { menu, resource_id } => {
            println!("Menu switched to {menu} ({resource_id})");
        }
        EventOutcome::Ignored { reason } => println!("Ignored: {reason}"),
        EventOutcome::Failed { reason } => println!("Failed: {reason}"),
    }
    Ok(())
}
