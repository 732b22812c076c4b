//! EduVault command line: drives the service against the configured store.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;

use eduvault_node::{EduVaultNode, NodeConfig, StorageBackend};
use eduvault_types::{CertificateId, CertificateInput, FacultyStatus, MlStatus, Timestamp};
use eduvault_utils::{init_logging, LogFormat, TokioTaskRunner};

/// How long `upload` waits for background verification before returning.
const VERIFICATION_WAIT: Duration = Duration::from_secs(10);
const VERIFICATION_POLL: Duration = Duration::from_millis(25);

#[derive(Parser)]
#[command(name = "eduvault", about = "Student certificate verification")]
struct Cli {
    /// Storage backend: "lmdb" or "memory".
    #[arg(long, env = "EDUVAULT_STORAGE")]
    storage: Option<String>,

    /// Directory holding the LMDB environment.
    #[arg(long, env = "EDUVAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Regular expression every evidence link must match.
    #[arg(long, env = "EDUVAULT_SOURCE_PATTERN")]
    source_pattern: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "EDUVAULT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "EDUVAULT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "EDUVAULT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the effective configuration without opening the store.
    Config,
    #[command(flatten)]
    Service(ServiceCommand),
}

#[derive(clap::Subcommand)]
enum ServiceCommand {
    /// Create statistics rows so certificates can reference them.
    Provision {
        #[command(subcommand)]
        target: ProvisionTarget,
    },
    /// Upload up to 10 certificates from a JSON array ("-" reads stdin).
    Upload {
        file: PathBuf,
        /// Return without waiting for background verification.
        #[arg(long)]
        no_wait: bool,
    },
    /// Run machine verification on a pending certificate.
    Verify { id: CertificateId },
    /// Record a faculty decision: "legit" or "not-legit".
    Decide {
        id: CertificateId,
        status: FacultyStatus,
        /// Legitimacy flag; defaults to whether the status is legit.
        #[arg(long)]
        is_legit: Option<bool>,
    },
    /// Show one certificate.
    Show { id: CertificateId },
    /// Mark a certificate archived.
    Archive { id: CertificateId },
    /// List certificates awaiting faculty review, oldest first.
    Pending {
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Export a section's or a student's certificates as JSON.
    Export {
        #[command(subcommand)]
        target: ExportTarget,
        /// Write into this directory instead of stdout.
        #[arg(long, global = true)]
        out_dir: Option<PathBuf>,
    },
    /// Totals across all live certificates.
    Overview,
    /// Per-section totals and verification rate.
    Sections,
    /// Per-student totals for one uploader.
    Students { uploader: String },
    /// Reconcile statistics with certificate rows.
    Audit,
    /// Workflow counters for this process.
    Counters,
}

#[derive(clap::Subcommand)]
enum ProvisionTarget {
    Student { register_number: String },
    Section { section: String },
}

#[derive(clap::Subcommand)]
enum ExportTarget {
    Section { section: String },
    Student { register_number: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(storage) = &cli.storage {
        config.storage = match storage.to_ascii_lowercase().as_str() {
            "lmdb" => StorageBackend::Lmdb,
            "memory" => StorageBackend::Memory,
            other => bail!("unknown storage backend: {other}"),
        };
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(pattern) = &cli.source_pattern {
        config.accepted_source_pattern = pattern.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn read_inputs(file: &Path) -> anyhow::Result<Vec<CertificateInput>> {
    let content = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?
    };
    serde_json::from_str(&content).context("parsing certificate inputs")
}

/// Poll until no certificate in `ids` is still machine-pending.
async fn wait_for_verification(node: &EduVaultNode, ids: &[CertificateId]) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + VERIFICATION_WAIT;
    loop {
        let mut pending = 0;
        for id in ids {
            if node.machine().certificate(id)?.ml_status == MlStatus::Pending {
                pending += 1;
            }
        }
        if pending == 0 {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(pending, "background verification still running");
            return Ok(());
        }
        tokio::time::sleep(VERIFICATION_POLL).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string());
            Ok(())
        }
        Command::Service(command) => {
            let node = EduVaultNode::open(config, Arc::new(TokioTaskRunner::current()))?;
            run(&node, command).await
        }
    }
}

async fn run(node: &EduVaultNode, command: ServiceCommand) -> anyhow::Result<()> {
    match command {
        ServiceCommand::Provision { target } => {
            let created = match &target {
                ProvisionTarget::Student { register_number } => {
                    node.provision_student(register_number)?
                }
                ProvisionTarget::Section { section } => node.provision_section(section)?,
            };
            print_json(&serde_json::json!({ "created": created }))?;
        }
        ServiceCommand::Upload { file, no_wait } => {
            let inputs = read_inputs(&file)?;
            let ids = node.machine().upload(inputs)?;
            if !no_wait {
                wait_for_verification(node, &ids).await?;
            }
            print_json(&ids)?;
        }
        ServiceCommand::Verify { id } => print_json(&node.machine().trigger_verification(&id)?)?,
        ServiceCommand::Decide {
            id,
            status,
            is_legit,
        } => {
            let is_legit = is_legit.unwrap_or(status == FacultyStatus::Legit);
            print_json(&node.machine().submit_decision(&id, status, is_legit)?)?;
        }
        ServiceCommand::Show { id } => print_json(&node.machine().certificate(&id)?)?,
        ServiceCommand::Archive { id } => print_json(&node.machine().store().archive(&id)?)?,
        ServiceCommand::Pending { limit } => print_json(&node.pending_review(limit)?)?,
        ServiceCommand::Export { target, out_dir } => {
            let export = match &target {
                ExportTarget::Section { section } => {
                    node.reports().certificates_for_section(section)?
                }
                ExportTarget::Student { register_number } => {
                    node.reports().certificates_for_student(register_number)?
                }
            };
            match out_dir {
                Some(dir) => {
                    std::fs::create_dir_all(&dir)?;
                    let path = dir.join(export.file_name(Timestamp::now(), "json"));
                    std::fs::write(&path, serde_json::to_vec_pretty(&export)?)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(
                        path = %path.display(),
                        certificates = export.certificates.len(),
                        "export written"
                    );
                    println!("{}", path.display());
                }
                None => print_json(&export)?,
            }
        }
        ServiceCommand::Overview => print_json(&node.reports().overview()?)?,
        ServiceCommand::Sections => print_json(&node.reports().section_summaries()?)?,
        ServiceCommand::Students { uploader } => {
            print_json(&node.reports().student_summaries_by_uploader(&uploader)?)?
        }
        ServiceCommand::Audit => {
            let report = node.reports().audit()?;
            print_json(&serde_json::json!({
                "healthy": report.is_healthy(),
                "certificates_checked": report.certificates_checked,
                "rows_checked": report.rows_checked,
                "errors": report.errors,
            }))?;
        }
        ServiceCommand::Counters => print_json(&node.machine().operation_counters())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "eduvault",
            "--storage",
            "memory",
            "--log-format",
            "json",
            "overview",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, NodeConfig::default().log_level);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let cli = Cli::try_parse_from(["eduvault", "--storage", "sqlite", "audit"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn decisions_parse_from_the_command_line() {
        let id = CertificateId::new([1; 16]);
        let cli = Cli::try_parse_from(["eduvault", "decide", &id.to_string(), "not-legit"])
            .unwrap();
        match cli.command {
            Command::Service(ServiceCommand::Decide {
                id: parsed,
                status,
                is_legit,
            }) => {
                assert_eq!(parsed, id);
                assert_eq!(status, FacultyStatus::NotLegit);
                assert_eq!(is_legit, None);
            }
            _ => panic!("expected decide"),
        }
    }

    #[test]
    fn config_is_split_from_service_commands() {
        let cli = Cli::try_parse_from(["eduvault", "config"]).unwrap();
        assert!(matches!(cli.command, Command::Config));
        let cli = Cli::try_parse_from(["eduvault", "audit"]).unwrap();
        assert!(matches!(cli.command, Command::Service(ServiceCommand::Audit)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn service_commands_run_against_memory_storage() {
        let config = NodeConfig::in_memory();
        let node = EduVaultNode::open(config, Arc::new(TokioTaskRunner::current())).unwrap();
        run(
            &node,
            ServiceCommand::Provision {
                target: ProvisionTarget::Section {
                    section: "CSE-A".into(),
                },
            },
        )
        .await
        .unwrap();
        run(&node, ServiceCommand::Audit).await.unwrap();
        run(&node, ServiceCommand::Sections).await.unwrap();

        let missing = CertificateId::new([3; 16]);
        assert!(run(&node, ServiceCommand::Show { id: missing }).await.is_err());
    }
}
