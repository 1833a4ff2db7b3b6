pub mod add;
pub mod add_youtube;
pub mod cleanup;
pub mod download;
pub mod import_opml;
pub mod list;
pub mod pipeline;
pub mod providers;
pub mod status;
pub mod sync;

use color_eyre::eyre::{Result, WrapErr};
use pod_db::Database;
use std::env;

/// Connects to the database using `DATABASE_URL`, shared by every
/// maintenance subcommand (the `pipeline` command loads its own
/// connection through `PipelineConfig` instead, since it needs the rest
/// of that config too).
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset or the connection fails.
pub async fn get_database() -> Result<Database> {
    let url = env::var("DATABASE_URL").wrap_err("DATABASE_URL is not set")?;
    let db = Database::connect(&url).await.wrap_err("failed to connect to database")?;
    Ok(db)
}
