pub mod entities;
pub mod error;
pub mod fields;
pub mod query;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::config::CmdbConfig;

/// Opens the connection pool described by `config`.
pub async fn connect(config: &CmdbConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.database_url.to_owned());
    opt.max_connections(config.max_connections).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    info!(max_connections = config.max_connections, "Connected to database");
    Ok(db)
}
