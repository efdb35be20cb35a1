use barberbook_app::Database;
use clap::Args;
use serde_json::json;

use super::emit_json;

#[derive(Debug, Args)]
pub(crate) struct CreateBarbershopArgs {
    /// Barbershop display name
    #[arg(long)]
    name: String,

    /// Owning user id
    #[arg(long)]
    owner_id: Option<String>,

    /// Owner display name
    #[arg(long)]
    owner_name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    address: Option<String>,

    /// Subscription plan id
    #[arg(long)]
    plan_id: Option<String>,
}

pub(crate) async fn run(database: &Database, args: CreateBarbershopArgs) -> Result<(), String> {
    let params = json!({
        "name": args.name,
        "owner_id": args.owner_id,
        "owner_name": args.owner_name,
        "email": args.email,
        "phone": args.phone,
        "address": args.address,
        "plan_id": args.plan_id,
    });

    let created = database
        .rpc("create_barbershop_with_defaults", params)
        .await
        .map_err(|error| format!("failed to create barbershop: {error}"))?;

    emit_json(&created)
}
