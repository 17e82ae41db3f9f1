//! cd-projector: apply one projection sync request from a JSON file.
//!
//! The watch layer normally calls the library directly; this binary replays
//! a captured request against Postgres, or prepares a tenant schema.

use std::path::{Path, PathBuf};

use cd_projection::migration::run_migration;
use cd_projection::requests::{
    BranchSync, CodebaseSync, GitServerSync, JenkinsSync, PerfDataSourceRemoval, PipelineSync,
    StageSync, ThirdPartyServiceSync, ToolServerSync,
};
use cd_projection::{PgStore, ProjectionConfig, Projector, TenantSchema};
use clap::{Args, Parser, Subcommand};
use eyre::{eyre, WrapErr};
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(name = "cd-projector", about = "CD pipeline topology projection")]
struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RequestFile {
    /// JSON request to apply
    #[arg(long)]
    file: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Create or update a CD pipeline
    Pipeline(RequestFile),
    /// Create or update one stage of a CD pipeline
    Stage(RequestFile),
    /// Create or update a codebase branch
    Branch(RequestFile),
    /// Create or update a codebase
    Codebase(RequestFile),
    /// Register a third-party service
    Service(RequestFile),
    /// Create a git server or refresh its availability
    GitServer(RequestFile),
    /// Create a Jira or perf server or refresh its availability
    ToolServer(RequestFile),
    /// Register Jenkins slaves and job provisioners
    Jenkins(RequestFile),
    /// Detach a perf data source from a codebase
    DetachPerfDataSource(RequestFile),
    /// Create the projection tables inside an existing tenant schema
    Migrate {
        /// Tenant schema name
        #[arg(long, env = "PROJECTION_TENANT", conflicts_with = "namespace")]
        tenant: Option<String>,
        /// Orchestrator namespace the tenant is derived from
        #[arg(long)]
        namespace: Option<String>,
    },
}

fn read_request<T: DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read request file {}", path.display()))?;
    serde_json::from_str(&raw)
        .wrap_err_with(|| format!("invalid request in {}", path.display()))
}

fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    // The subscriber must be up before the config reader logs its fallbacks.
    init_tracing(&std::env::var("LOG_FORMAT").unwrap_or_default());
    let mut config = ProjectionConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let store = PgStore::connect(&config)?;

    match cli.command {
        Command::Migrate { tenant, namespace } => {
            let tenant = match (tenant, namespace) {
                (Some(tenant), _) => TenantSchema::new(tenant)?,
                (None, Some(namespace)) => {
                    TenantSchema::from_namespace(&namespace, &config.namespace_suffix)?
                }
                (None, None) => return Err(eyre!("either --tenant or --namespace is required")),
            };
            let mut conn = store
                .pool()
                .get()
                .await
                .map_err(|e| eyre!("cannot acquire connection: {e}"))?;
            run_migration(&mut conn, &tenant).await?;
            println!("Migration applied to schema {tenant}");
        }
        Command::Pipeline(args) => {
            let request: PipelineSync = read_request(&args.file)?;
            let pipeline = Projector::new(store).sync_pipeline(&request).await?;
            println!("CD pipeline {} synchronized (id {})", pipeline.name, pipeline.id);
        }
        Command::Stage(args) => {
            let request: StageSync = read_request(&args.file)?;
            let stage_id = Projector::new(store).sync_stage(&request).await?;
            println!(
                "CD stage {}/{} synchronized (id {stage_id})",
                request.pipeline, request.name
            );
        }
        Command::Branch(args) => {
            let request: BranchSync = read_request(&args.file)?;
            let branch_id = Projector::new(store).sync_branch(&request).await?;
            println!(
                "Branch {}/{} synchronized (id {branch_id})",
                request.codebase, request.name
            );
        }
        Command::Codebase(args) => {
            let request: CodebaseSync = read_request(&args.file)?;
            let codebase_id = Projector::new(store).sync_codebase(&request).await?;
            println!("Codebase {} synchronized (id {codebase_id})", request.name);
        }
        Command::Service(args) => {
            let request: ThirdPartyServiceSync = read_request(&args.file)?;
            let service_id = Projector::new(store)
                .sync_third_party_service(&request)
                .await?;
            println!("Third-party service {} synchronized (id {service_id})", request.name);
        }
        Command::GitServer(args) => {
            let request: GitServerSync = read_request(&args.file)?;
            let server_id = Projector::new(store).sync_git_server(&request).await?;
            println!("Git server {} synchronized (id {server_id})", request.name);
        }
        Command::ToolServer(args) => {
            let request: ToolServerSync = read_request(&args.file)?;
            let server_id = Projector::new(store).sync_tool_server(&request).await?;
            println!("{} {} synchronized (id {server_id})", request.kind, request.name);
        }
        Command::Jenkins(args) => {
            let request: JenkinsSync = read_request(&args.file)?;
            let created = Projector::new(store).sync_jenkins(&request).await?;
            println!("Jenkins resources synchronized ({created} added)");
        }
        Command::DetachPerfDataSource(args) => {
            let request: PerfDataSourceRemoval = read_request(&args.file)?;
            let removed = Projector::new(store)
                .remove_codebase_perf_data_source(&request)
                .await?;
            if removed {
                println!("Perf data source {} detached from {}", request.data_source, request.codebase);
            } else {
                println!("Codebase {} had no perf data source {}", request.codebase, request.data_source);
            }
        }
    }

    Ok(())
}
