//! Token Signer CLI
//!
//! Signs documents with a PKCS#12 keystore or a `YubiKey` PIV slot, verifies
//! signature envelopes and manages the configuration file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use token_signer::adapters::{EnvPin, PinProvider, TerminalPin};
use token_signer::infra::config::{ConfigManager, ExportFormat, SigningConfiguration};
use token_signer::{
    CancellationToken, DigestAlgorithm, Document, KeyEntry, KeystoreToken, SignaturePackaging,
    SignatureParameters, SigningContext, SigningError, SigningOrchestrator, SigningResult,
    TokenConnection, VerifyWorkflow,
};

#[derive(Parser)]
#[command(name = "token-signer")]
#[command(about = "Detached document signing with hardware and software signing tokens")]
#[command(long_about = "
Token Signer - detached signatures over one or more documents

EXAMPLES:
    # Sign with a PKCS#12 keystore (password from $TOKEN_SIGNER_PIN)
    token-signer sign contract.pdf --keystore signer.p12

    # Sign two documents together and timestamp the signature
    token-signer sign contract.pdf --attach annex.pdf -t http://timestamp.digicert.com

    # Sign with YubiKey slot 9c (built with --features pcsc-backend)
    token-signer sign contract.pdf --slot 9c

    # Verify a detached signature
    token-signer verify contract.pdf.sig.json -d contract.pdf -d annex.pdf

ENVIRONMENT VARIABLES:
    TOKEN_SIGNER_PIN    Keystore password or PIV PIN (prompted when unset)
    RUST_LOG            Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a document and any attached documents with one signature
    Sign(SignArgs),

    /// Verify a signature envelope against its documents
    Verify {
        /// Signature envelope (.sig.json or .signed.json)
        #[arg(value_name = "SIGNATURE")]
        signature: PathBuf,

        /// Detached document, repeated in signing order
        #[arg(short, long = "document", value_name = "FILE")]
        documents: Vec<PathBuf>,

        /// Show every check
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the digest of files
    Digest {
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "sha256")]
        algorithm: DigestArg,
    },

    /// List the keys held by a token
    Keys(TokenArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct TokenArgs {
    /// PKCS#12 keystore (overrides config)
    #[arg(short, long, value_name = "FILE", conflicts_with = "slot")]
    keystore: Option<PathBuf>,

    /// YubiKey PIV slot (9a, 9c, 9d, 9e)
    #[arg(short, long, value_name = "SLOT_ID")]
    slot: Option<String>,

    /// Environment variable holding the PIN or password (overrides config)
    #[arg(long, value_name = "VAR")]
    pin_env: Option<String>,
}

#[derive(clap::Args)]
struct SignArgs {
    /// Document to sign
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Further documents covered by the same signature
    #[arg(short, long, value_name = "FILE")]
    attach: Vec<PathBuf>,

    #[command(flatten)]
    token: TokenArgs,

    /// Key alias when the token holds several keys
    #[arg(long, value_name = "ALIAS")]
    key: Option<String>,

    /// Digest algorithm (overrides config)
    #[arg(long, value_enum)]
    digest: Option<DigestArg>,

    /// Timestamp server URL (overrides config)
    #[arg(short, long, value_name = "URL")]
    timestamp_url: Option<String>,

    /// Carry the documents inside the signature
    #[arg(long)]
    enveloping: bool,

    /// Skip certificate validation
    #[arg(long)]
    skip_validation: bool,

    /// Output file (defaults to the envelope name next to the input)
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key, e.g. `timestamp.url`
        key: String,
        /// Configuration value (empty to unset optional keys)
        value: String,
    },

    /// Export configuration
    Export {
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import configuration
    Import {
        file: PathBuf,
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum DigestArg {
    Sha256,
    Sha384,
    Sha512,
}

impl From<DigestArg> for DigestAlgorithm {
    fn from(arg: DigestArg) -> Self {
        match arg {
            DigestArg::Sha256 => DigestAlgorithm::Sha256,
            DigestArg::Sha384 => DigestAlgorithm::Sha384,
            DigestArg::Sha512 => DigestAlgorithm::Sha512,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sign(args) => handle_sign_command(args).await?,
        Commands::Verify {
            signature,
            documents,
            verbose,
        } => handle_verify_command(signature, documents, verbose).await?,
        Commands::Digest { files, algorithm } => {
            handle_digest_command(&files, algorithm.into())?;
        }
        Commands::Keys(args) => handle_keys_command(args).await?,
        Commands::Config(config_cmd) => handle_config_command(config_cmd)?,
    }

    Ok(())
}

fn load_configuration() -> Result<SigningConfiguration> {
    let manager = ConfigManager::new()?;
    let config = manager
        .load_or_default()
        .wrap_err_with(|| format!("Loading {}", manager.config_path().display()))?;
    Ok(config)
}

fn pin_provider(variable: &str) -> Arc<dyn PinProvider> {
    if std::env::var_os(variable).is_some() {
        Arc::new(EnvPin::new(variable))
    } else {
        Arc::new(TerminalPin::new())
    }
}

/// Open the token selected on the command line, falling back to the configured keystore.
fn open_token(
    args: &TokenArgs,
    config: &SigningConfiguration,
) -> SigningResult<Box<dyn TokenConnection>> {
    let pin_env = args.pin_env.as_deref().unwrap_or(&config.pin_env_var);
    let pins = pin_provider(pin_env);

    if let Some(slot) = &args.slot {
        return open_piv_token(slot, pins);
    }
    let keystore = args
        .keystore
        .clone()
        .or_else(|| config.keystore_path.clone())
        .ok_or_else(|| {
            SigningError::ConfigurationError(
                "No token selected: pass --keystore or --slot, or set keystore_path".into(),
            )
        })?;
    Ok(Box::new(KeystoreToken::from_pkcs12_file(
        keystore,
        pins.as_ref(),
    )?))
}

#[cfg(feature = "pcsc-backend")]
fn open_piv_token(
    slot: &str,
    pins: Arc<dyn PinProvider>,
) -> SigningResult<Box<dyn TokenConnection>> {
    let slot = slot.parse()?;
    Ok(Box::new(token_signer::adapters::PivToken::new(slot, pins)))
}

#[cfg(not(feature = "pcsc-backend"))]
fn open_piv_token(
    slot: &str,
    _pins: Arc<dyn PinProvider>,
) -> SigningResult<Box<dyn TokenConnection>> {
    Err(SigningError::ConfigurationError(format!(
        "PIV slot {slot} requested but this build has no pcsc-backend support"
    )))
}

fn select_key(token: &dyn TokenConnection, alias: Option<&str>) -> SigningResult<KeyEntry> {
    let keys = token.keys()?;
    let found = match alias {
        Some(alias) => keys.into_iter().find(|k| k.handle().as_str() == alias),
        None => keys.into_iter().next(),
    };
    found.ok_or_else(|| {
        SigningError::token(
            token_signer::TokenFailure::KeyNotFound,
            match alias {
                Some(alias) => format!("Token holds no key '{alias}'"),
                None => "Token holds no key".to_string(),
            },
        )
    })
}

async fn handle_sign_command(args: SignArgs) -> Result<()> {
    let mut config = load_configuration()?;
    if let Some(url) = &args.timestamp_url {
        config.timestamp.url = Some(url.clone());
    }
    if let Some(digest) = args.digest {
        config.default_digest_algorithm = DigestAlgorithm::from(digest).as_str().to_string();
    }
    if args.enveloping {
        config.packaging = SignaturePackaging::Enveloping;
    }
    if args.skip_validation {
        config.certificate_validation.enabled = false;
    }
    config.validate()?;

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling signing session");
            on_interrupt.cancel();
        }
    });

    let input = args.input_file.clone();
    let output = args.output.clone();
    // Token I/O and the blocking HTTP client stay off the async runtime.
    let signed = tokio::task::spawn_blocking(move || -> SigningResult<Document> {
        let context = SigningContext::from_configuration(&config)?;
        let token = open_token(&args.token, &config)?;
        let key_entry = select_key(token.as_ref(), args.key.as_deref())?;

        let mut document = Document::from_file(&args.input_file)?;
        for path in &args.attach {
            document.append_document(Document::from_file(path)?);
        }

        let parameters = SignatureParameters::new()
            .with_digest_algorithm(config.digest_algorithm()?)
            .with_signing_certificate(key_entry.certificate().clone())
            .with_certificate_chain(key_entry.certificate_chain().to_vec())
            .with_packaging(config.packaging);

        SigningOrchestrator::new(context).sign_document_with_cancellation(
            &document,
            &parameters,
            &key_entry,
            token.as_ref(),
            cancellation,
        )
    })
    .await
    .into_diagnostic()??;

    let output = output.unwrap_or_else(|| output_next_to(&input, signed.name()));
    signed.save(&output)?;
    println!("✅ Signature written to {}", output.display());
    Ok(())
}

fn output_next_to(input: &Path, name: &str) -> PathBuf {
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

async fn handle_verify_command(
    signature: PathBuf,
    documents: Vec<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let report = tokio::task::spawn_blocking(move || {
        VerifyWorkflow::new().run_files(&signature, &documents.iter().collect::<Vec<_>>())
    })
    .await
    .into_diagnostic()??;

    if verbose {
        println!("  Signature value:   {}", mark(report.signature_ok));
        println!("  Certificate:       {}", mark(report.certificate_ok));
        println!("  Document digests:  {}", mark(report.references_ok));
        if report.timestamped {
            println!("  Timestamp:         {}", mark(report.timestamp_ok));
        }
    }

    if report.success() {
        println!("✅ Signature is valid");
        Ok(())
    } else {
        eprintln!("❌ Verification failed:");
        for problem in &report.problems {
            eprintln!("  - {problem}");
        }
        std::process::exit(1);
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "FAILED"
    }
}

fn handle_digest_command(files: &[PathBuf], algorithm: DigestAlgorithm) -> Result<()> {
    for file in files {
        let document = Document::from_file(file)?;
        let digest = document.digest_bytes(algorithm)?;
        println!(
            "{}  {}  {}",
            hex::encode(digest.as_slice()),
            digest.to_base64(),
            file.display()
        );
    }
    Ok(())
}

async fn handle_keys_command(args: TokenArgs) -> Result<()> {
    let config = load_configuration()?;
    let keys = tokio::task::spawn_blocking(move || {
        let token = open_token(&args, &config)?;
        token.keys()
    })
    .await
    .into_diagnostic()??;

    if keys.is_empty() {
        println!("No keys found");
    }
    for key in keys {
        let subject = key
            .certificate()
            .subject()
            .unwrap_or_else(|e| format!("<{e}>"));
        println!("{}  {}  {}", key.handle(), key.key_algorithm(), subject);
    }
    Ok(())
}

fn handle_config_command(config_cmd: ConfigCommands) -> Result<()> {
    let config_manager = ConfigManager::new()?;

    match config_cmd {
        ConfigCommands::Show => {
            let config = config_manager.load_or_default()?;
            println!("📋 Current Configuration:");
            println!("  Digest algorithm: {}", config.default_digest_algorithm);
            println!("  Packaging: {}", config.packaging);
            println!(
                "  Timestamp server: {}",
                config.timestamp.url.as_deref().unwrap_or("(none)")
            );
            println!("  Timestamp timeout: {}s", config.timestamp.timeout_seconds);
            if let Some(path) = &config.keystore_path {
                println!("  Keystore: {}", path.display());
            }
            println!("  PIN variable: {}", config.pin_env_var);
            println!(
                "  Certificate validation: {}",
                if config.certificate_validation.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!(
                "  Configuration file: {}",
                config_manager.config_path().display()
            );
        }

        ConfigCommands::Init => {
            config_manager.load_or_create_default()?;
            println!(
                "✅ Configuration initialized: {}",
                config_manager.config_path().display()
            );
        }

        ConfigCommands::Set { key, value } => {
            config_manager.update_value(&key, &value)?;
            println!("✅ Configuration updated: {key} = {value}");
        }

        ConfigCommands::Export { format, output } => {
            let content = config_manager.export_config(format.into())?;
            if let Some(output_path) = output {
                std::fs::write(&output_path, content).into_diagnostic()?;
                println!("✅ Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }

        ConfigCommands::Import { file, format } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            config_manager.import_config(&content, format.into())?;
            println!("✅ Configuration imported from: {}", file.display());
        }
    }

    Ok(())
}
