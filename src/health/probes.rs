use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::{CheckStatus, HealthProbe};
use crate::error::AppError;
use crate::redis_client;

// ─── TCP reachability ────────────────────────────────────────────

/// Healthy when a TCP connection to `addr` can be opened.
pub struct TcpProbe {
    name: String,
    addr: String,
}

impl TcpProbe {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> CheckStatus {
        match TcpStream::connect(&self.addr).await {
            Ok(_) => CheckStatus::Healthy {
                detail: format!("reachable at {}", self.addr),
            },
            Err(e) => CheckStatus::Unhealthy {
                error: format!("{}: {e}", self.addr),
            },
        }
    }
}

// ─── Redis ───────────────────────────────────────────────────────

/// `PING` over a lazily-created connection manager.
pub struct RedisProbe {
    name: String,
    client: redis::Client,
    conn: Mutex<Option<ConnectionManager>>,
}

impl RedisProbe {
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self, AppError> {
        Ok(Self {
            name: name.into(),
            client: redis_client::open(url)?,
            conn: Mutex::new(None),
        })
    }

    async fn ping(&self) -> Result<String, AppError> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(redis_client::connect(&self.client).await?);
        }
        match guard.as_mut() {
            Some(conn) => redis_client::ping(conn).await,
            None => Err(AppError::Internal("redis connection missing".into())),
        }
    }
}

#[async_trait]
impl HealthProbe for RedisProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> CheckStatus {
        match self.ping().await {
            Ok(reply) => CheckStatus::Healthy {
                detail: format!("PING → {reply}"),
            },
            Err(e) => CheckStatus::Unhealthy {
                error: e.to_string(),
            },
        }
    }
}

// ─── Not configured ──────────────────────────────────────────────

/// Stands in for a dependency this deployment has no address for.
pub struct UnconfiguredProbe {
    name: String,
}

impl UnconfiguredProbe {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl HealthProbe for UnconfiguredProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> CheckStatus {
        CheckStatus::NotConfigured
    }
}
