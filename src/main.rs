use std::{fmt::Display, path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use staffgate::{
    AppState,
    auth::NoSessionResolver,
    config::StaffgateConfig,
    db::DbPool,
    models::{CreateAccount, CreateApiCredential, EnableFederation, RateLimitAction},
    observability, routes,
    secrets::EnvSecretManager,
};
use uuid::Uuid;

const DEFAULT_CONFIG_PATH: &str = "staffgate.toml";

/// CLI arguments for staffgate
#[derive(Parser, Debug)]
#[command(version, about = "Staff records trust boundary", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./staffgate.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Manage credential-owning accounts
    #[command(subcommand)]
    Account(AccountCommand),
    /// Manage API credentials
    #[command(subcommand)]
    Credential(CredentialCommand),
    /// Manage per-tenant directory federation
    #[command(subcommand)]
    Federation(FederationCommand),
    /// Maintain rate limit counters
    #[command(subcommand)]
    RateLimit(RateLimitCommand),
}

#[derive(clap::Subcommand, Debug)]
enum AccountCommand {
    /// Create an account
    Create {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Deactivate an account. Its credentials stop verifying immediately.
    Deactivate {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(clap::Subcommand, Debug)]
enum CredentialCommand {
    /// Issue a credential. The secret is printed once and never stored.
    Issue {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        name: String,
        /// Expiry as an RFC 3339 timestamp
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// List a tenant's credentials
    List {
        #[arg(long)]
        tenant: Uuid,
    },
    /// Flip a credential between active and inactive
    Toggle {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        id: Uuid,
    },
    /// Deactivate a credential
    Revoke {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        id: Uuid,
    },
    /// Permanently delete a credential
    Delete {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(clap::Subcommand, Debug)]
enum FederationCommand {
    /// Enable directory federation for a tenant
    Enable {
        #[arg(long)]
        tenant: Uuid,
        /// Directory (Entra) tenant id
        #[arg(long)]
        external_tenant_id: String,
        /// Application (client) id
        #[arg(long)]
        external_client_id: String,
    },
    /// Disable directory federation, keeping the stored ids
    Disable {
        #[arg(long)]
        tenant: Uuid,
    },
    /// Show a tenant's federation settings
    Status {
        #[arg(long)]
        tenant: Uuid,
    },
    /// Pull directory users and reconcile staff records
    Sync {
        #[arg(long)]
        tenant: Uuid,
    },
}

#[derive(clap::Subcommand, Debug)]
enum RateLimitCommand {
    /// Clear the counter for a key, e.g. `login:10.0.0.1`
    Reset { key: String },
    /// Delete counters whose window has passed
    Purge,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command {
        Some(Command::Migrate) => run_migrate(config_path).await,
        Some(Command::Serve) | None => run_server(config_path).await,
        Some(Command::Account(command)) => {
            let state = load_state(config_path).await;
            run_account(&state, command).await;
        }
        Some(Command::Credential(command)) => {
            let state = load_state(config_path).await;
            run_credential(&state, command).await;
        }
        Some(Command::Federation(command)) => {
            let state = load_state(config_path).await;
            run_federation(&state, command).await;
        }
        Some(Command::RateLimit(command)) => {
            let state = load_state(config_path).await;
            run_rate_limit(&state, command).await;
        }
    }
}

/// Print the error to stderr and exit with status 1.
fn exit_with_error(context: &str, error: impl Display) -> ! {
    tracing::error!(error = %error, "{context}");
    eprintln!("Error: {context}: {error}");
    std::process::exit(1);
}

fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => exit_with_error(context, e),
    }
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => exit_with_error("Failed to render output", e),
    }
}

fn load_config(explicit_config_path: Option<&str>) -> StaffgateConfig {
    let config = match explicit_config_path {
        Some(path) => StaffgateConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            StaffgateConfig::from_file(DEFAULT_CONFIG_PATH)
        }
        None => Ok(StaffgateConfig::default()),
    };

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(1);
    }

    config
}

async fn connect(config: &StaffgateConfig) -> Arc<DbPool> {
    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Add a [database] section to the config.");
        std::process::exit(1);
    }

    let pool = or_exit(
        DbPool::from_config(&config.database).await,
        "Failed to connect to database",
    );
    if config.database.run_migrations() {
        or_exit(pool.run_migrations().await, "Database migrations failed");
    }
    Arc::new(pool)
}

async fn load_state(explicit_config_path: Option<&str>) -> AppState {
    let config = load_config(explicit_config_path);
    let db = connect(&config).await;
    AppState::new(
        config,
        db,
        Arc::new(EnvSecretManager::new()),
        Arc::new(NoSessionResolver),
    )
}

async fn run_server(explicit_config_path: Option<&str>) {
    let state = load_state(explicit_config_path).await;
    let bind_addr = state.config.server.socket_addr();

    let app = routes::build_router(state);
    let listener = or_exit(
        tokio::net::TcpListener::bind(bind_addr).await,
        "Failed to bind to address",
    );

    tracing::info!("Server listening on http://{}", bind_addr);

    or_exit(
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await,
        "Server error",
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn run_migrate(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);

    tracing::info!("Running database migrations");

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to migrate.");
        std::process::exit(1);
    }

    let pool = or_exit(
        DbPool::from_config(&config.database).await,
        "Failed to connect to database",
    );
    or_exit(pool.run_migrations().await, "Database migrations failed");
    tracing::info!("Database migrations completed successfully");
}

async fn run_account(state: &AppState, command: AccountCommand) {
    let accounts = &state.services.accounts;
    match command {
        AccountCommand::Create {
            tenant,
            email,
            name,
        } => {
            let account = or_exit(
                accounts
                    .create(CreateAccount {
                        tenant_id: tenant,
                        email,
                        display_name: name,
                    })
                    .await,
                "Failed to create account",
            );
            print_json(&account);
        }
        AccountCommand::Deactivate { id } => {
            or_exit(
                accounts.set_active(id, false).await,
                "Failed to deactivate account",
            );
            println!("Deactivated account {id}");
        }
    }
}

async fn run_credential(state: &AppState, command: CredentialCommand) {
    let credentials = &state.services.credentials;
    match command {
        CredentialCommand::Issue {
            tenant,
            owner,
            name,
            expires_at,
        } => {
            let subject = owner.to_string();
            if let Err(exceeded) = state
                .services
                .rate_limiter
                .check_action(RateLimitAction::CredentialCreation, &subject)
                .await
                .into_result()
            {
                exit_with_error(
                    "Failed to issue credential",
                    format!(
                        "{exceeded} (in {}s)",
                        exceeded.retry_after_secs(Utc::now())
                    ),
                );
            }

            let created = or_exit(
                credentials
                    .issue(CreateApiCredential {
                        tenant_id: tenant,
                        owner_principal_id: owner,
                        display_name: name,
                        expires_at,
                    })
                    .await,
                "Failed to issue credential",
            );
            print_json(&created);
        }
        CredentialCommand::List { tenant } => {
            let list = or_exit(
                credentials.list_by_tenant(tenant).await,
                "Failed to list credentials",
            );
            print_json(&list);
        }
        CredentialCommand::Toggle { tenant, id } => {
            let Some(credential) = or_exit(
                credentials.get(id, tenant).await,
                "Failed to load credential",
            ) else {
                exit_with_error("Failed to toggle credential", "Record not found");
            };
            let active = !credential.is_active;
            or_exit(
                credentials.set_active(id, tenant, active).await,
                "Failed to toggle credential",
            );
            println!(
                "Credential {id} is now {}",
                if active { "active" } else { "inactive" }
            );
        }
        CredentialCommand::Revoke { tenant, id } => {
            or_exit(
                credentials.revoke(id, tenant).await,
                "Failed to revoke credential",
            );
            println!("Revoked credential {id}");
        }
        CredentialCommand::Delete { tenant, id } => {
            or_exit(
                credentials.delete(id, tenant).await,
                "Failed to delete credential",
            );
            println!("Deleted credential {id}");
        }
    }
}

async fn run_federation(state: &AppState, command: FederationCommand) {
    let configs = &state.services.federation_configs;
    match command {
        FederationCommand::Enable {
            tenant,
            external_tenant_id,
            external_client_id,
        } => {
            let config = or_exit(
                configs
                    .enable(
                        tenant,
                        EnableFederation {
                            external_tenant_id,
                            external_client_id,
                        },
                    )
                    .await,
                "Failed to enable federation",
            );
            print_json(&config);
        }
        FederationCommand::Disable { tenant } => {
            let config = or_exit(
                configs.disable(tenant).await,
                "Failed to disable federation",
            );
            print_json(&config);
        }
        FederationCommand::Status { tenant } => {
            match or_exit(
                configs.status(tenant).await,
                "Failed to load federation status",
            ) {
                Some(config) => print_json(&config),
                None => println!("Federation is not configured for tenant {tenant}"),
            }
        }
        FederationCommand::Sync { tenant } => {
            let report = or_exit(
                state.services.directory_sync.sync_tenant(tenant).await,
                "Directory sync failed",
            );
            print_json(&report);
        }
    }
}

async fn run_rate_limit(state: &AppState, command: RateLimitCommand) {
    let limiter = &state.services.rate_limiter;
    match command {
        RateLimitCommand::Reset { key } => {
            limiter.reset(&key).await;
            println!("Reset rate limit counter {key}");
        }
        RateLimitCommand::Purge => {
            let purged = or_exit(
                limiter.purge_expired().await,
                "Failed to purge rate limit counters",
            );
            println!("Purged {purged} expired counters");
        }
    }
}
