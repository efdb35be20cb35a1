use barberbook_app::Database;
use clap::Args;
use jiff::Timestamp;

use super::{emit, emit_json};

#[derive(Debug, Args)]
pub(crate) struct SignInArgs {
    #[arg(long)]
    email: String,

    #[arg(long, env = "BARBERBOOK_PASSWORD", hide_env_values = true)]
    password: String,
}

pub(crate) async fn sign_in(database: &Database, args: SignInArgs) -> Result<(), String> {
    let response = database
        .auth()
        .sign_in_with_password(&args.email, &args.password)
        .await
        .map_err(|error| format!("sign-in failed: {error}"))?;

    emit_json(&response.user)
}

pub(crate) async fn sign_out(database: &Database) -> Result<(), String> {
    database
        .auth()
        .sign_out()
        .await
        .map_err(|error| format!("sign-out failed: {error}"))?;

    emit("signed out");

    Ok(())
}

pub(crate) async fn session(database: &Database) -> Result<(), String> {
    let session = database
        .auth()
        .get_session()
        .await
        .map_err(|error| format!("failed to read session: {error}"))?;

    let Some(session) = session else {
        emit("not signed in");

        return Ok(());
    };

    if session.is_expired(Timestamp::now()) {
        emit("session expired");
    }

    emit_json(&session.user)
}
