//! Adds the searchable `text` column to `resource` and backfills it.
//!
//! SQLite has no `ADD COLUMN IF NOT EXISTS`, so the whole change runs in one
//! transaction: either everything lands or nothing does, and the unit can be
//! re-run after a failure.

use schemaforge_common::Result;
use schemaforge_db::SqlChannel;
use schemaforge_migrate::MigrationUnit;

const CHANGES: &str = "
    ALTER TABLE resource ADD COLUMN text TEXT DEFAULT NULL;
    CREATE INDEX IF NOT EXISTS idx_resource_text ON resource (text);
    UPDATE resource SET text = title WHERE text IS NULL;
";

#[derive(Debug, Default)]
pub struct AddResourceText;

impl MigrationUnit for AddResourceText {
    fn up(&self, channel: &dyn SqlChannel) -> Result<()> {
        channel.execute("BEGIN")?;
        match channel.execute(CHANGES) {
            Ok(()) => channel.execute("COMMIT"),
            Err(e) => {
                if let Err(rollback) = channel.execute("ROLLBACK") {
                    tracing::warn!("Rollback after failed change did not complete: {}", rollback);
                }
                Err(e)
            }
        }
    }
}
