use barberbook_app::{
    Database,
    auth::Session,
    config::{DatabaseConfig, LoggingConfig},
};
use barberbook_core::context::{CallerContext, Role, TenantId, UserId};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

mod auth;
mod barbershop;
mod migrate;
mod query;
mod snapshot;

#[derive(Debug, Parser)]
#[command(name = "barberbook", about = "Barberbook data CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    caller: CallerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the local tables and seed the administrator
    Init,
    /// Read rows from a table
    Query(query::QueryArgs),
    /// Create a barbershop with its default services
    CreateBarbershop(barbershop::CreateBarbershopArgs),
    /// Write every table to a JSON snapshot
    Export(snapshot::ExportArgs),
    /// Replace tables with the contents of a JSON snapshot
    Import(snapshot::ImportArgs),
    /// Copy all data between the local store and the hosted backend
    Migrate(migrate::MigrateArgs),
    /// Sign in with email and password
    SignIn(auth::SignInArgs),
    /// Drop the current session
    SignOut,
    /// Show the current session
    Session,
}

/// Caller identity for row visibility. Falls back to the stored session.
#[derive(Debug, Args)]
struct CallerArgs {
    /// Act on behalf of this barbershop
    #[arg(long, global = true)]
    tenant: Option<String>,

    /// Act as this user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Caller role (admin, barbershop, barber, client)
    #[arg(long, global = true)]
    role: Option<Role>,
}

impl CallerArgs {
    fn is_empty(&self) -> bool {
        self.tenant.is_none() && self.user.is_none() && self.role.is_none()
    }

    fn context(&self) -> CallerContext {
        CallerContext::new(
            self.tenant.clone().map(TenantId::new),
            self.user.clone().map(UserId::new),
            self.role,
        )
    }
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        if let Commands::Migrate(args) = self.command {
            return migrate::run(&self.database, args).await;
        }

        let database = Database::open(&self.database)
            .map_err(|error| format!("failed to open database: {error}"))?;

        apply_caller(&database, &self.caller).await?;

        match self.command {
            Commands::Init => {
                emit(&format!("initialized {:?} database", database.backend()));

                Ok(())
            }
            Commands::Query(args) => query::run(&database, args).await,
            Commands::CreateBarbershop(args) => barbershop::run(&database, args).await,
            Commands::Export(args) => snapshot::export(&database, args).await,
            Commands::Import(args) => snapshot::import(&database, args).await,
            Commands::SignIn(args) => auth::sign_in(&database, args).await,
            Commands::SignOut => auth::sign_out(&database).await,
            Commands::Session => auth::session(&database).await,
            Commands::Migrate(_) => Ok(()),
        }
    }
}

async fn apply_caller(database: &Database, caller: &CallerArgs) -> Result<(), String> {
    if !caller.is_empty() {
        database.set_context(caller.context());

        return Ok(());
    }

    let session = database
        .auth()
        .get_session()
        .await
        .map_err(|error| format!("failed to read session: {error}"))?;

    if let Some(session) = session {
        database.set_context(session_context(&session));
    }

    Ok(())
}

/// Context of a signed-in user. The tenant comes from the `barbershop_id`
/// metadata entry when present.
fn session_context(session: &Session) -> CallerContext {
    let user = &session.user;
    let role = user.role().and_then(|role| role.parse().ok());

    if role == Some(Role::Admin) {
        return CallerContext::admin(UserId::new(user.id.clone()));
    }

    let tenant = user
        .user_metadata
        .get("barbershop_id")
        .and_then(serde_json::Value::as_str)
        .map(TenantId::new);

    CallerContext::new(tenant, Some(UserId::new(user.id.clone())), role)
}

#[expect(clippy::print_stdout, reason = "command output is written to stdout")]
fn emit(line: &str) {
    println!("{line}");
}

fn emit_json(value: &impl Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|error| format!("failed to encode output: {error}"))?;

    emit(&text);

    Ok(())
}
