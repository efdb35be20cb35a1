use barberbook_app::Database;
use barberbook_core::{filter::parse_scalar, plan::Direction};
use clap::Args;

use super::emit_json;

#[derive(Debug, Args)]
pub(crate) struct QueryArgs {
    /// Table name
    table: String,

    /// Columns to return, comma separated
    #[arg(long)]
    select: Option<String>,

    /// Equality filter as COLUMN=VALUE; repeatable
    #[arg(long = "eq", value_name = "COLUMN=VALUE")]
    eq: Vec<String>,

    /// Disjunction such as `(status.eq.cancelled,price.gt.50)`
    #[arg(long)]
    or: Option<String>,

    /// Sort column
    #[arg(long)]
    order: Option<String>,

    /// Sort descending
    #[arg(long, requires = "order")]
    desc: bool,

    /// Maximum number of rows
    #[arg(long)]
    limit: Option<usize>,
}

pub(crate) async fn run(database: &Database, args: QueryArgs) -> Result<(), String> {
    let mut query = database
        .table(&args.table)
        .map_err(|error| error.to_string())?;

    if let Some(columns) = &args.select {
        query = query.select(columns);
    }

    for pair in &args.eq {
        let (column, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected COLUMN=VALUE, got `{pair}`"))?;

        query = query.eq(column.trim(), parse_scalar(value.trim()));
    }

    if let Some(expression) = &args.or {
        query = query.or(expression);
    }

    if let Some(column) = &args.order {
        let direction = if args.desc {
            Direction::Descending
        } else {
            Direction::Ascending
        };

        query = query.order(column, direction);
    }

    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }

    let rows = query
        .await
        .map_err(|error| format!("query failed: {error}"))?;

    emit_json(&rows)
}
