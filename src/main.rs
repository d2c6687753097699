use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

use ct_scan_dashboard::dicom::load_scan_file;
use ct_scan_dashboard::notify::{Notice, NoticeLevel, Notifier};
use ct_scan_dashboard::telemetry::init_tracing;
use ct_scan_dashboard::{
    CtScan, Dashboard, DashboardConfig, ExternalApiConfig, HttpBackend, Landing, MutationError,
    QueryOutcome, ScanId, Session, UserProfile,
};

#[derive(Parser, Debug)]
#[command(name = "ct-dashboard", version, about = "CT scan upload and tumor analysis dashboard")]
struct Cli {
    /// Base URL of the scan service
    #[arg(long, env = "CT_DASHBOARD_URL", global = true)]
    url: Option<String>,

    /// Bearer token of the signed-in caller
    #[arg(long, env = "CT_DASHBOARD_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "CT_DASHBOARD_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show or save the caller's profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// List or inspect uploaded scans
    Scans {
        #[command(subcommand)]
        action: ScansAction,
    },
    /// Upload a CT scan image
    Upload {
        #[arg(long)]
        file: PathBuf,
        /// Patient ID; read from the DICOM PatientID tag when omitted
        #[arg(long)]
        patient: Option<String>,
    },
    /// Run tumor detection on an uploaded scan
    Analyze { id: ScanId },
    /// External analysis API settings (administrators only)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show the caller's profile and role
    Whoami,
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    Show,
    Save {
        #[arg(long)]
        name: String,
        #[arg(long)]
        specialization: String,
        #[arg(long)]
        department: String,
    },
}

#[derive(Subcommand, Debug)]
enum ScansAction {
    List,
    Show { id: ScanId },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        key: String,
    },
}

/// Prints notices the way the browser UI would toast them.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("[ok] {}", notice.message),
            NoticeLevel::Error => eprintln!("[error] {}", notice.message),
        }
    }
}

fn resolve_config(cli: &Cli) -> DashboardConfig {
    let mut config = DashboardConfig::from_env();
    if let Some(url) = &cli.url {
        config.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(token) = &cli.token {
        config.auth_token = Some(token.clone()).filter(|t| !t.trim().is_empty());
    }
    if let Some(secs) = cli.timeout_secs.filter(|secs| *secs > 0) {
        config.timeout_secs = secs;
    }
    config
}

fn describe_scan(scan: &CtScan) -> String {
    let status = match &scan.analysis_result {
        None => "not analyzed".to_string(),
        Some(result) if result.tumor_found => {
            format!("tumor detected, {}", result.stage.label())
        }
        Some(_) => "no tumor detected".to_string(),
    };
    format!("#{:<6} patient {:<16} {}", scan.id, scan.patient_id, status)
}

fn print_scan_detail(scan: &CtScan) {
    println!("CT Scan #{}", scan.id);
    println!("  Patient ID:  {}", scan.patient_id);
    println!("  Image size:  {} bytes", scan.scan_image.len());
    match &scan.analysis_result {
        None => println!("  Analysis:    pending"),
        Some(result) => {
            println!(
                "  Detection:   {}",
                if result.tumor_found {
                    "Tumor Detected"
                } else {
                    "No Tumor Detected"
                }
            );
            if result.tumor_found {
                println!("  Stage:       {}", result.stage.label());
            }
            println!("  Probability: {:.1}%", result.probability * 100.0);
            println!("  Confidence:  {:.1}%", result.confidence * 100.0);
            println!("  Mask image:  {} bytes", result.mask_image.len());
        }
    }
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}{}", visible, "*".repeat(secret.chars().count().saturating_sub(4)))
}

async fn require_admin(dashboard: &Dashboard) -> Result<()> {
    if !dashboard.show_admin_controls().await {
        bail!("Only administrators can manage the external API configuration");
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli);
    let backend = HttpBackend::new(&config).context("Failed to set up the scan service client")?;
    let dashboard = Dashboard::new(
        Session::with_backend(Arc::new(backend)),
        Arc::new(ConsoleNotifier),
    );

    match cli.command {
        Command::Profile { action: ProfileAction::Show } => match dashboard.landing().await {
            Landing::Ready(profile) => {
                println!("Name:           {}", profile.name);
                println!("Specialization: {}", profile.specialization);
                println!("Department:     {}", profile.department);
            }
            Landing::NeedsProfile => {
                println!("No profile saved yet. Use `ct-dashboard profile save` to set one up.")
            }
            Landing::Unresolved { message } => bail!("Could not load profile: {}", message),
            Landing::Loading => bail!("Scan service client is not ready"),
        },
        Command::Profile {
            action:
                ProfileAction::Save {
                    name,
                    specialization,
                    department,
                },
        } => {
            dashboard
                .save_profile(&UserProfile {
                    name,
                    specialization,
                    department,
                })
                .await?;
        }
        Command::Scans { action: ScansAction::List } => {
            let scans = dashboard.all_scans().await.resolved_or(Vec::new());
            if scans.is_empty() {
                println!("No scans uploaded yet.");
            }
            for scan in &scans {
                println!("{}", describe_scan(scan));
            }
        }
        Command::Scans {
            action: ScansAction::Show { id },
        } => match dashboard.scan(Some(id)).await {
            QueryOutcome::Ready(Some(scan)) => print_scan_detail(&scan),
            _ => bail!("Scan #{} not found", id),
        },
        Command::Upload { file, patient } => {
            let scan_file = load_scan_file(&file)?;
            let Some(patient_id) = patient.or(scan_file.patient_id) else {
                bail!(
                    "No patient ID given and none found in {}; pass --patient",
                    file.display()
                );
            };
            let id = dashboard.upload_scan(&patient_id, &scan_file.bytes).await?;
            println!("Uploaded scan #{}", id);
        }
        Command::Analyze { id } => {
            let scan = match dashboard.scan(Some(id)).await {
                QueryOutcome::Ready(Some(scan)) => scan,
                _ => bail!("Scan #{} not found", id),
            };
            if scan.is_analyzed() {
                println!("Scan #{} has already been analyzed.", id);
                print_scan_detail(&scan);
                return Ok(());
            }
            if !dashboard.can_analyze().await {
                bail!(
                    "API configuration is incomplete. Please configure both the API endpoint and API key in the settings before running analysis."
                );
            }
            dashboard.analyze_scan(id).await?;
            if let QueryOutcome::Ready(Some(scan)) = dashboard.scan(Some(id)).await {
                print_scan_detail(&scan);
            }
        }
        Command::Config { action: ConfigAction::Show } => {
            require_admin(&dashboard).await?;
            match dashboard.external_api_config().await {
                QueryOutcome::Ready(Some(config)) => {
                    println!("Endpoint URL: {}", config.endpoint_url);
                    println!("API key:      {}", mask_secret(&config.api_key));
                }
                _ => println!("External API is not configured."),
            }
        }
        Command::Config {
            action: ConfigAction::Set { endpoint, key },
        } => {
            require_admin(&dashboard).await?;
            dashboard
                .configure_external_api(&ExternalApiConfig {
                    endpoint_url: endpoint,
                    api_key: key,
                })
                .await?;
        }
        Command::Whoami => {
            let session = dashboard.session();
            println!(
                "Session {} (started {})",
                session.id(),
                session.started_at().format("%Y-%m-%d %H:%M:%S UTC")
            );
            match dashboard.landing().await {
                Landing::Ready(profile) => {
                    println!("{} ({}, {})", profile.name, profile.specialization, profile.department)
                }
                Landing::NeedsProfile => println!("(no profile)"),
                Landing::Unresolved { message } => println!("(profile unavailable: {})", message),
                Landing::Loading => println!("(not signed in)"),
            }
            let role = dashboard.caller_role().await.resolved_or(Default::default());
            println!("Role:  {:?}", role);
            println!("Admin: {}", dashboard.show_admin_controls().await);
        }
    }

    dashboard.logout().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Mutation failures have already been shown as notices.
            if err.downcast_ref::<MutationError>().is_none() {
                error!("{:#}", err);
                eprintln!("error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}
