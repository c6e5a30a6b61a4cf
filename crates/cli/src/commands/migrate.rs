//! Schema migration command.
//!
//! Both backends migrate when opened, so this opens the configured backend,
//! checks it answers, and reports which one was migrated.

use crate::open_storage;

pub(crate) async fn run() -> anyhow::Result<()> {
    let storage = open_storage().await?;
    storage.ping().await?;
    println!("Migrations applied ({} backend)", storage.kind());
    Ok(())
}
