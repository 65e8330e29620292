//! Optable SDK CLI: the `optable` command.
//!
//! Drives a sandbox from the shell: open a session, identify a visitor,
//! attach traits, fetch targeting and log events. State (passport and
//! targeting cache) lives in a directory so consecutive invocations behave
//! like consecutive launches of an app.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use optable_sdk::config::{ENV_APP, ENV_HOST, ENV_INSECURE, ENV_STATE_DIR, ENV_USER_AGENT};
use optable_sdk::storage::default_state_dir;
use optable_sdk::{
    aaid, cid, eid, eid_from_url, AdvertisingIdProvider, Config, FileStore,
    FixedValue, Identifier, IdentifyRequest, OptableSdk,
};

// ── Argument helpers ──────────────────────────────────────────────────────────

/// Parse `KEY=VALUE`. The value is taken as JSON when it parses, otherwise
/// as a plain string, so `visits=3` yields a number and `plan=pro` a string.
fn parse_key_value(arg: &str) -> Result<(String, Value)> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{arg}'"))?;
    if key.is_empty() {
        bail!("empty key in '{arg}'");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn key_values(args: &[String]) -> Result<Map<String, Value>> {
    args.iter().map(|arg| parse_key_value(arg)).collect()
}

// ── Output helpers ────────────────────────────────────────────────────────────

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Optable SDK CLI: identify visitors, attach traits, fetch targeting and
/// log events against an Optable sandbox.
#[derive(Parser, Debug)]
#[command(
    name = "optable",
    about = "Optable SDK CLI",
    version,
    long_about = "optable: Optable SDK CLI\n\nTalk to an Optable sandbox from the shell. The visitor passport and the\ntargeting cache persist in --state-dir between invocations."
)]
struct Cli {
    /// Sandbox host, optionally with a port
    #[arg(long, global = true, env = ENV_HOST)]
    host: Option<String>,

    /// Application slug within the sandbox
    #[arg(long, global = true, env = ENV_APP)]
    app: Option<String>,

    /// Use plain http instead of https
    #[arg(long, global = true, env = ENV_INSECURE, value_parser = FalseyValueParser::new())]
    insecure: bool,

    /// User-Agent header to send
    #[arg(long, global = true, env = ENV_USER_AGENT)]
    user_agent: Option<String>,

    /// Directory holding the passport and targeting cache (default: ~/.optable)
    #[arg(long, global = true, env = ENV_STATE_DIR)]
    state_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a session and receive a passport
    Init,

    /// Identify the visitor
    Identify {
        /// Email address, sent as a hashed email id
        #[arg(long)]
        email: Option<String>,

        /// Device advertising id (IDFA / AAID)
        #[arg(long)]
        ad_id: Option<String>,

        /// Publisher-provided id
        #[arg(long)]
        ppid: Option<String>,

        /// Already-prefixed identifiers (e:…, a:…, c:…), sent after the above
        ids: Vec<String>,
    },

    /// Attach traits to the visitor
    Profile {
        /// Traits as KEY=VALUE (VALUE may be JSON)
        traits: Vec<String>,
    },

    /// Fetch targeting key/values
    Targeting {
        /// Print the cached payload without contacting the sandbox
        #[arg(long, conflicts_with = "clear_cache")]
        cached: bool,

        /// Remove the cached payload
        #[arg(long)]
        clear_cache: bool,
    },

    /// Log an event
    Witness {
        /// Event name, e.g. app.screenView
        event: String,

        /// Properties as KEY=VALUE (VALUE may be JSON)
        properties: Vec<String>,
    },

    /// Extract the hashed email from a link's oeid parameter
    FromUrl {
        /// Link to inspect
        url: String,

        /// Identify with the extracted id
        #[arg(long)]
        identify: bool,
    },

    /// Print the hashed email id for an address
    Eid {
        /// Email address
        email: String,
    },

    /// Print the prefixed device advertising id
    Aaid {
        /// Advertising id
        ad_id: String,
    },

    /// Print the prefixed publisher id
    Cid {
        /// Publisher-provided id
        ppid: String,
    },

    /// Print the stored passport
    Passport,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => cmd_init(&cli).await,
        Commands::Identify {
            email,
            ad_id,
            ppid,
            ids,
        } => cmd_identify(&cli, email.as_deref(), ad_id.as_deref(), ppid.as_deref(), ids).await,
        Commands::Profile { traits } => cmd_profile(&cli, traits).await,
        Commands::Targeting {
            cached,
            clear_cache,
        } => cmd_targeting(&cli, *cached, *clear_cache).await,
        Commands::Witness { event, properties } => cmd_witness(&cli, event, properties).await,
        Commands::FromUrl { url, identify } => cmd_from_url(&cli, url, *identify).await,
        Commands::Eid { email } => print_json(&Value::String(eid(email))),
        Commands::Aaid { ad_id } => print_json(&Value::String(aaid(ad_id))),
        Commands::Cid { ppid } => print_json(&Value::String(cid(ppid))),
        Commands::Passport => cmd_passport(&cli),
    }
}

// ── SDK construction ──────────────────────────────────────────────────────────

fn config(cli: &Cli) -> Result<Config> {
    let host = cli
        .host
        .clone()
        .ok_or_else(|| anyhow!("--host (or {ENV_HOST}) is required"))?;
    let app = cli
        .app
        .clone()
        .ok_or_else(|| anyhow!("--app (or {ENV_APP}) is required"))?;

    let mut config = Config::new(host, app).insecure(cli.insecure);
    if let Some(ua) = &cli.user_agent {
        config = config.user_agent(ua.clone());
    }
    Ok(config)
}

fn open_sdk(cli: &Cli) -> Result<OptableSdk> {
    let state_dir = match &cli.state_dir {
        Some(dir) => dir.clone(),
        None => default_state_dir()
            .ok_or_else(|| anyhow!("HOME not set; pass --state-dir or set {ENV_STATE_DIR}"))?,
    };
    let store = FileStore::new(&state_dir)
        .with_context(|| format!("failed to open state directory {}", state_dir.display()))?;

    let sdk = OptableSdk::builder(config(cli)?)
        .store(Arc::new(store))
        .build()?;

    log::debug!(
        "sandbox {} app {} state {}",
        sdk.config().host,
        sdk.config().app,
        state_dir.display()
    );
    Ok(sdk)
}

// ── Command implementations ───────────────────────────────────────────────────

/// `optable init`
async fn cmd_init(cli: &Cli) -> Result<()> {
    let sdk = open_sdk(cli)?;
    let response = sdk.init().await?;
    print_json(&response.summary())
}

/// `optable identify [--email E] [--ad-id A] [--ppid P] [IDS...]`
async fn cmd_identify(
    cli: &Cli,
    email: Option<&str>,
    ad_id: Option<&str>,
    ppid: Option<&str>,
    extra: &[String],
) -> Result<()> {
    let explicit: Vec<Identifier> = extra
        .iter()
        .map(|raw| Identifier::from_str(raw).with_context(|| format!("invalid identifier '{raw}'")))
        .collect::<Result<_>>()?;

    let mut request = IdentifyRequest::new().ad_id(ad_id.is_some());
    if let Some(email) = email {
        request = request.email(email);
    }
    if let Some(ppid) = ppid {
        request = request.ppid(ppid);
    }

    // A shell has no device ad id; the flag value stands in for one.
    let provider = ad_id.map(FixedValue::new);
    let mut ids = request
        .resolve(provider.as_ref().map(|p| p as &dyn AdvertisingIdProvider))
        .await;
    ids.extend(explicit);

    if ids.is_empty() {
        bail!("nothing to identify: pass --email, --ad-id, --ppid or prefixed ids");
    }

    let sdk = open_sdk(cli)?;
    let response = sdk.identify(ids).await?;
    print_json(&response.summary())
}

/// `optable profile KEY=VALUE...`
async fn cmd_profile(cli: &Cli, traits: &[String]) -> Result<()> {
    let traits = key_values(traits)?;
    let sdk = open_sdk(cli)?;
    let response = sdk.profile(&traits).await?;
    print_json(&response.summary())
}

/// `optable targeting [--cached | --clear-cache]`
async fn cmd_targeting(cli: &Cli, cached: bool, clear_cache: bool) -> Result<()> {
    let sdk = open_sdk(cli)?;

    if clear_cache {
        sdk.targeting_clear_cache()?;
        log::info!("targeting cache cleared");
        return Ok(());
    }

    let keyvalues = if cached {
        sdk.targeting_from_cache()?
    } else {
        Some(sdk.targeting().await?)
    };
    print_json(&keyvalues.map(Value::Object).unwrap_or(Value::Null))
}

/// `optable witness EVENT [KEY=VALUE...]`
async fn cmd_witness(cli: &Cli, event: &str, properties: &[String]) -> Result<()> {
    let properties = key_values(properties)?;
    let sdk = open_sdk(cli)?;
    let response = sdk.witness(event, &properties).await?;
    print_json(&response.summary())
}

/// `optable from-url URL [--identify]`
async fn cmd_from_url(cli: &Cli, url: &str, identify: bool) -> Result<()> {
    if !identify {
        return print_json(&eid_from_url(url).map(Value::String).unwrap_or(Value::Null));
    }

    let sdk = open_sdk(cli)?;
    match sdk.try_identify_from_url(url).await? {
        Some(response) => print_json(&response.summary()),
        None => {
            log::info!("no valid oeid in link; nothing sent");
            print_json(&Value::Null)
        }
    }
}

/// `optable passport`
fn cmd_passport(cli: &Cli) -> Result<()> {
    let sdk = open_sdk(cli)?;
    let passport = sdk.storage().get_passport()?;
    print_json(&passport.map(Value::String).unwrap_or(Value::Null))
}
