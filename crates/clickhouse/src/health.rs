//! ClickHouse health checks and schema bootstrap.

use crate::client::ClickHouseClient;
use crate::schema::{create_database, create_table};
use outage_core::{Result, Series};
use tracing::{debug, error, info};

pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Create the database and the three outage tables if missing.
///
/// The database statement runs against `default`, since the configured
/// database may not exist yet.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let bootstrap = client.inner().clone().with_database("default");
    client
        .timed(
            "create database",
            bootstrap.query(&create_database(client.database())).execute(),
        )
        .await?;

    for series in Series::ALL {
        let ddl = create_table(client.database(), series);
        client
            .timed("schema DDL", client.inner().query(&ddl).execute())
            .await?;
    }

    info!(database = %client.database(), "ClickHouse schema initialized");
    Ok(())
}
