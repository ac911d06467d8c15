//! DORA - delivery metrics from the CI server and the SCM host
//!
//! The `dora` command computes one metric for one configured project and
//! prints it as JSON.
//!
//! ## Commands
//!
//! - `deployment-frequency`: green builds of the deployment job
//! - `lead-time`: mean time from first staging build to production
//! - `mean-time-to-recovery`: mean gap between hotfix deployments and the changes they fixed
//! - `change-failure-rate`: share of merged changes that were hotfixes

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};

use dora_core::{
    run_metric, Endpoint, ErrorClass, HttpTransport, MetricContext, MetricKind, MetricsError,
    Settings,
};

#[derive(Parser)]
#[command(name = "dora")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DORA delivery metrics from CI build lineage", long_about = None)]
struct Cli {
    /// 1-based index into the configured project lists
    #[arg(short, long, global = true, env = "DORA_PROJECT_ID", default_value_t = 1)]
    project: i64,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    /// CI server base URL
    #[arg(long, global = true, env = "DORA_CI_API_URL")]
    ci_url: Option<String>,

    /// CI username
    #[arg(long, global = true, env = "DORA_CI_USERNAME")]
    ci_username: Option<String>,

    /// CI API token
    #[arg(long, global = true, env = "DORA_CI_API_TOKEN", hide_env_values = true)]
    ci_api_token: Option<String>,

    /// SCM API base URL
    #[arg(long, global = true, env = "DORA_SCM_API_URL")]
    scm_url: Option<String>,

    /// SCM username
    #[arg(long, global = true, env = "DORA_SCM_USERNAME")]
    scm_username: Option<String>,

    /// SCM app password
    #[arg(long, global = true, env = "DORA_SCM_APP_PASSWORD", hide_env_values = true)]
    scm_app_password: Option<String>,

    /// SCM workspace owning the repositories
    #[arg(long, global = true, env = "DORA_SCM_WORKSPACE")]
    scm_workspace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Count green deployments and the window they span
    DeploymentFrequency,

    /// Mean lead time for changes
    LeadTime,

    /// Mean time to recovery around hotfixes
    MeanTimeToRecovery,

    /// Percentage of merged changes that were hotfixes
    ChangeFailureRate,
}

impl Commands {
    fn kind(self) -> MetricKind {
        match self {
            Commands::DeploymentFrequency => MetricKind::DeploymentFrequency,
            Commands::LeadTime => MetricKind::LeadTime,
            Commands::MeanTimeToRecovery => MetricKind::MeanTimeToRecovery,
            Commands::ChangeFailureRate => MetricKind::ChangeFailureRate,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dora_core::telemetry::init_tracing(cli.json_logs, cli.log_level);

    match execute(&cli).await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let (body, code) = error_response(&err);
            println!("{}", body);
            ExitCode::from(code)
        }
    }
}

/// Load settings, apply command-line overrides.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::from_env().context("Failed to load settings")?;

    if let Some(url) = &cli.ci_url {
        settings.ci = Endpoint::new(url);
    }
    if let (Some(user), Some(token)) = (&cli.ci_username, &cli.ci_api_token) {
        settings.ci = settings.ci.with_credentials(user, token);
    }
    if let Some(url) = &cli.scm_url {
        settings.scm = Endpoint::new(url);
    }
    if let (Some(user), Some(password)) = (&cli.scm_username, &cli.scm_app_password) {
        settings.scm = settings.scm.with_credentials(user, password);
    }
    if let Some(workspace) = &cli.scm_workspace {
        settings.scm_workspace = workspace.clone();
    }
    Ok(settings)
}

async fn execute(cli: &Cli) -> Result<String> {
    let kind = cli.command.kind();
    let settings = load_settings(cli)?;
    let project = settings.registry.resolve(cli.project)?;
    let transport =
        HttpTransport::from_settings(&settings).context("Failed to create HTTP transport")?;

    info!(metric = %kind, project_id = project.project_id, repo = %project.repo_slug, "computing metric");

    let ctx = MetricContext {
        transport: &transport,
        project: &project,
        options: &settings.options,
        scm_workspace: &settings.scm_workspace,
    };
    let report = run_metric(kind, ctx).await?;
    serde_json::to_string_pretty(&report).context("Failed to serialize report")
}

/// JSON error body and exit code for a failed invocation.
///
/// Client errors exit with 2, everything else with 1.
fn error_response(err: &anyhow::Error) -> (String, u8) {
    let (message, status_code, class) = match err.downcast_ref::<MetricsError>() {
        Some(metrics_err) => (
            metrics_err.to_string(),
            metrics_err.status_code(),
            metrics_err.class(),
        ),
        None => (format!("{:#}", err), 500, ErrorClass::Server),
    };
    let body = json!({ "message": message, "statusCode": status_code }).to_string();
    let code = match class {
        ErrorClass::Client => 2,
        ErrorClass::Server => 1,
    };
    (body, code)
}
