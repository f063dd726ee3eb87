use redis::{aio::MultiplexedConnection, Client};
use tracing::debug;

use crate::config::RedisConfig;

/// Shared multiplexed connection; clones are cheap handles onto one socket.
#[derive(Clone)]
pub struct RedisClient {
    conn: MultiplexedConnection,
}

impl RedisClient {
    /// Opens the connection and checks the server answers before handing it out.
    pub async fn connect(config: &RedisConfig) -> redis::RedisResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let mut conn = client.get_multiplexed_tokio_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(reply = %pong, "redis handshake");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}
