/// Redis wrapper with graceful degradation.
///
/// All operations return `Option<T>` or `bool`; on any Redis error the operation logs
/// a warning and reports failure. Callers decide whether that failure matters: the
/// annotation repository turns it into a persistence error.
use std::collections::HashMap;

use redis::AsyncCommands;
use tracing::warn;

#[derive(Clone)]
pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Attempt to create a client. If the URL is `None` or invalid, returns a
    /// `RedisCache` whose operations always fail.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client"))
                .ok()
        });
        Self { client }
    }

    /// Test the connection by sending a PING. Returns `true` if Redis is reachable.
    pub async fn is_available(&self) -> bool {
        let Some(client) = &self.client else {
            return false;
        };
        match client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
                result.is_ok()
            }
            Err(_) => false,
        }
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }

    /// Set one hash field. Returns `true` if successful.
    pub async fn hset(&self, key: &str, field: &str, value: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .inspect_err(|e| warn!(error = %e, key, field, "redis HSET failed"))
            .is_ok()
    }

    /// All fields of a hash. A missing key yields an empty map; `None` means Redis
    /// could not be asked.
    pub async fn hgetall(&self, key: &str) -> Option<HashMap<String, String>> {
        let mut conn = self.connection().await?;
        conn.hgetall::<_, HashMap<String, String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis HGETALL failed"))
            .ok()
    }
}
