//! LogWayss CLI - Command line interface for the encrypted journal vault.
//!
//! Every command that touches entries unlocks the profile, does its work and
//! locks again before exiting. Entries are printed as one JSON object per
//! line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use logwayss_common::{format_timestamp, parse_timestamp, SensitiveBytes};
use logwayss_vault::{
    Entry, EntryId, EntryMeta, EntryType, NewEntry, Pagination, ProfileManager, QueryFilter,
    ScryptParams, Session, StoreOptions,
};

/// Environment variable checked for the password before prompting.
const PASSWORD_ENV: &str = "LOGWAYSS_PASSWORD";

#[derive(Parser)]
#[command(name = "logwayss")]
#[command(about = "LogWayss - Encrypted personal journal")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Vault directory (default: the platform data directory).
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Sync every commit to disk (mobile durability).
    #[arg(long, global = true)]
    full_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new profile.
    Init {
        /// Use lighter key derivation for phones.
        #[arg(long)]
        mobile: bool,
    },

    /// Add an entry.
    Add {
        /// Entry type: text, markdown, metrics, media_ref, event or log.
        #[arg(short = 't', long = "type")]
        entry_type: EntryType,

        /// JSON payload.
        #[arg(short, long)]
        payload: String,

        /// Tag, may be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Source label.
        #[arg(long)]
        source: Option<String>,

        /// Device identifier.
        #[arg(long)]
        device: Option<String>,

        /// Metadata as a JSON object.
        #[arg(long)]
        meta: Option<String>,
    },

    /// Show one entry.
    Get {
        /// Entry id.
        id: String,
    },

    /// List entries, newest first.
    List {
        /// Only entries of this type.
        #[arg(short = 't', long = "type")]
        entry_type: Option<EntryType>,

        /// Only entries carrying this tag. Repeat to require several.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Earliest creation time (RFC3339).
        #[arg(long)]
        from: Option<String>,

        /// Latest creation time (RFC3339).
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of entries.
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of entries to skip.
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },

    /// Export the vault to an archive file.
    Export {
        /// Archive path to create.
        dest: PathBuf,
    },

    /// Replace the vault contents with an archive.
    Import {
        /// Archive path to read.
        source: PathBuf,
    },

    /// Show profile information.
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG overrides the flag.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let dir = match cli.dir {
        Some(dir) => dir,
        None => default_dir()?,
    };
    debug!(dir = %dir.display(), "Using vault directory");

    let options = if cli.full_sync {
        StoreOptions::mobile()
    } else {
        StoreOptions::desktop()
    };
    let vault = Vault { dir: &dir, options };

    match cli.command {
        Commands::Init { mobile } => cmd_init(&vault, mobile),
        Commands::Add {
            entry_type,
            payload,
            tags,
            source,
            device,
            meta,
        } => cmd_add(&vault, entry_type, &payload, tags, source, device, meta.as_deref()),
        Commands::Get { id } => cmd_get(&vault, &id),
        Commands::List {
            entry_type,
            tags,
            from,
            to,
            limit,
            offset,
        } => {
            let filter = build_filter(entry_type, tags, from.as_deref(), to.as_deref())?;
            let pagination = Pagination { limit, offset };
            cmd_list(&vault, &filter, &pagination)
        }
        Commands::Export { dest } => cmd_export(&vault, &dest),
        Commands::Import { source } => cmd_import(&vault, &source),
        Commands::Info => cmd_info(&dir),
    }
}

fn default_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("logwayss"))
        .context("No data directory on this platform; pass --dir")
}

/// Read the password from the environment or prompt for it.
fn read_password(prompt: &str) -> Result<SensitiveBytes> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(SensitiveBytes::from(password));
    }
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(SensitiveBytes::from(password))
}

/// Vault directory plus the store options to open it with.
struct Vault<'a> {
    dir: &'a Path,
    options: StoreOptions,
}

/// Unlock the profile in `vault`, run `f`, and lock again.
fn with_unlocked<T>(vault: &Vault<'_>, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
    let password = read_password("Password: ")?;
    let session = Session::with_options(vault.options);
    session
        .profiles()
        .unlock(vault.dir, password.as_bytes())
        .context("Failed to unlock profile")?;
    drop(password);

    let result = f(&session);
    session.profiles().lock();
    result
}

fn build_filter(
    entry_type: Option<EntryType>,
    tags: Vec<String>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<QueryFilter> {
    let from = from
        .map(parse_timestamp)
        .transpose()
        .context("Invalid --from time")?;
    let to = to
        .map(parse_timestamp)
        .transpose()
        .context("Invalid --to time")?;

    Ok(QueryFilter {
        entry_type,
        tags,
        ..QueryFilter::default()
    }
    .between(from, to))
}

fn entry_json(entry: &Entry) -> Value {
    let payload = serde_json::from_slice::<Value>(&entry.payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&entry.payload).into_owned()));
    json!({
        "id": entry.id.as_str(),
        "type": entry.entry_type.as_str(),
        "created_at": format_timestamp(&entry.created_at),
        "updated_at": format_timestamp(&entry.updated_at),
        "schema_version": entry.schema_version,
        "tags": entry.tags,
        "source": entry.source,
        "device_id": entry.device_id,
        "meta": entry.meta,
        "payload": payload,
    })
}

/// Create a new profile.
fn cmd_init(vault: &Vault<'_>, mobile: bool) -> Result<()> {
    let dir = vault.dir;
    info!("Creating profile in {}", dir.display());

    let password = read_password("New password: ")?;
    if std::env::var_os(PASSWORD_ENV).is_none() {
        let confirm = read_password("Confirm password: ")?;
        if password != confirm {
            anyhow::bail!("Passwords do not match");
        }
    }
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    let params = if mobile {
        ScryptParams::mobile()
    } else {
        ScryptParams::desktop()
    };

    Session::with_options(vault.options)
        .profiles()
        .create_profile(dir, password.as_bytes(), &params)
        .context("Failed to create profile")?;

    println!("Profile created in {}", dir.display());
    Ok(())
}

/// Add an entry.
fn cmd_add(
    vault: &Vault<'_>,
    entry_type: EntryType,
    payload: &str,
    tags: Vec<String>,
    source: Option<String>,
    device: Option<String>,
    meta: Option<&str>,
) -> Result<()> {
    let payload: Value = serde_json::from_str(payload).context("Payload is not valid JSON")?;
    let meta: Option<EntryMeta> = meta
        .map(serde_json::from_str)
        .transpose()
        .context("Invalid --meta")?;

    let mut new = NewEntry::json(entry_type, &payload)?;
    new.tags = tags;
    new.source = source;
    new.device_id = device;
    new.meta = meta;

    let entry = with_unlocked(vault, |session| {
        session
            .entries()
            .create_entry(new)
            .context("Failed to add entry")
    })?;

    println!("{}", entry_json(&entry));
    Ok(())
}

/// Show one entry.
fn cmd_get(vault: &Vault<'_>, id: &str) -> Result<()> {
    let id = EntryId::new(id).context("Invalid entry id")?;
    let entry = with_unlocked(vault, |session| {
        session.entries().get_entry(&id).context("Failed to read entry")
    })?;

    println!("{}", entry_json(&entry));
    Ok(())
}

/// List entries.
fn cmd_list(vault: &Vault<'_>, filter: &QueryFilter, pagination: &Pagination) -> Result<()> {
    let entries = with_unlocked(vault, |session| {
        session
            .entries()
            .query(filter, pagination)
            .context("Failed to list entries")
    })?;

    for entry in &entries {
        println!("{}", entry_json(entry));
    }
    info!("{} entries", entries.len());
    Ok(())
}

/// Export the vault.
fn cmd_export(vault: &Vault<'_>, dest: &Path) -> Result<()> {
    with_unlocked(vault, |session| {
        session
            .archive()
            .export_archive(dest)
            .context("Failed to export archive")
    })?;

    println!("Exported to {}", dest.display());
    Ok(())
}

/// Import an archive over the vault.
fn cmd_import(vault: &Vault<'_>, source: &Path) -> Result<()> {
    with_unlocked(vault, |session| {
        session
            .archive()
            .import_archive(source)
            .context("Failed to import archive")
    })?;

    println!("Imported {}", source.display());
    Ok(())
}

/// Show profile information.
fn cmd_info(dir: &Path) -> Result<()> {
    let info = ProfileManager::profile_info(dir).context("Failed to read profile")?;

    println!("Profile Information:");
    println!("  Location: {}", dir.display());
    println!("  Schema version: {}", info.schema_version);
    println!("  KDF Parameters (scrypt):");
    println!("    N: {}", info.scrypt.n);
    println!("    r: {}", info.scrypt.r);
    println!("    p: {}", info.scrypt.p);

    Ok(())
}
