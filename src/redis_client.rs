use redis::aio::ConnectionManager;

use crate::error::AppError;

/// Parses the URL without touching the network.
pub fn open(url: &str) -> Result<redis::Client, AppError> {
    redis::Client::open(url).map_err(|e| {
        tracing::error!(url, error = %e, "invalid Redis URL");
        AppError::from(e)
    })
}

/// Creates a `ConnectionManager` that auto-reconnects on failure.
///
/// `ConnectionManager` is cheaply cloneable — every clone shares the same
/// underlying multiplexed TCP connection.
pub async fn connect(client: &redis::Client) -> Result<ConnectionManager, AppError> {
    let conn = ConnectionManager::new(client.clone()).await?;
    tracing::info!(addr = %client.get_connection_info().addr, "connected to Redis");
    Ok(conn)
}

/// Round-trip a `PING`.
pub async fn ping(conn: &mut ConnectionManager) -> Result<String, AppError> {
    let reply: String = redis::cmd("PING").query_async(conn).await?;
    Ok(reply)
}
