//! Query proxy
//!
//! Composes the connection pool, the result cache and the router. Reads are
//! answered from the cache when possible; otherwise a pooled connection
//! carries the query to the routed endpoint and is released on every path.

use crate::cache::ResultCache;
use crate::config::ProxyConfig;
use crate::pool::ConnectionPool;
use crate::router::{QueryKind, Router};
use crate::transport::{Connection, HttpConnection};
use crate::{Error, Result};
use bytes::Bytes;
use std::sync::Arc;

/// Query proxy over a primary and its replicas
pub struct Proxy<C: Connection = HttpConnection> {
    pool: Arc<ConnectionPool<C>>,
    cache: Arc<ResultCache<Bytes>>,
    router: Router,
}

impl Proxy<HttpConnection> {
    /// Build a proxy with HTTP connections from configuration
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        config.validate()?;

        let timeout = config.request_timeout();
        // Build one client up front so construction errors surface here.
        let template = HttpConnection::new(timeout)?;
        let pool = ConnectionPool::new(config.pool_capacity, || template.clone())?;

        let cache = match config.cache_max_entries {
            Some(max) => ResultCache::bounded(config.cache_ttl(), max)?,
            None => ResultCache::new(config.cache_ttl())?,
        };

        let router = Router::new(config.primary.clone(), config.replicas.clone().into())?;

        Ok(Self::new(Arc::new(pool), Arc::new(cache), router))
    }
}

impl<C: Connection> Proxy<C> {
    /// Assemble a proxy from its parts
    pub fn new(pool: Arc<ConnectionPool<C>>, cache: Arc<ResultCache<Bytes>>, router: Router) -> Self {
        Self {
            pool,
            cache,
            router,
        }
    }

    /// Execute `query` against the routed endpoint
    pub async fn handle_query(&self, query: &str) -> Result<Bytes> {
        let kind = QueryKind::classify(query);

        if kind.is_read() {
            if let Some(hit) = self.cache.get(query) {
                tracing::debug!(query_len = query.len(), "Result cache hit");
                return Ok(hit);
            }
        }

        let conn = self.pool.checkout().map_err(|e| match e {
            Error::PoolExhausted { capacity } => Error::ConnectionUnavailable(format!(
                "all {capacity} pooled connections are in use"
            )),
            other => other,
        })?;

        let route = self.router.route(query);
        tracing::debug!(target_addr = %route.target, kind = ?route.kind, "Routing query");

        let body = conn
            .send(&route.target, Bytes::copy_from_slice(query.as_bytes()))
            .await
            .inspect_err(|e| tracing::warn!(target_addr = %route.target, "Query failed: {}", e))?;
        drop(conn);

        if kind.is_read() {
            self.cache.put(query, body.clone());
        }

        Ok(body)
    }

    /// Connection pool
    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    /// Result cache
    pub fn cache(&self) -> &ResultCache<Bytes> {
        &self.cache
    }

    /// Router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records every request and answers with `"<url>:<body>"`
    #[derive(Clone, Default)]
    struct EchoConnection {
        seen: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Connection for EchoConnection {
        async fn send(&self, url: &str, body: Bytes) -> Result<Bytes> {
            self.seen.lock().push(url.to_string());
            if self.fail {
                return Err(Error::upstream(url, "connection reset"));
            }
            let body = String::from_utf8_lossy(&body);
            Ok(Bytes::from(format!("{url}:{body}")))
        }
    }

    fn proxy(capacity: usize, conn: EchoConnection) -> Proxy<EchoConnection> {
        let pool = ConnectionPool::new(capacity, || conn.clone()).unwrap();
        let cache = ResultCache::new(Duration::from_secs(60)).unwrap();
        let router = Router::new(
            "primary",
            vec!["replica-0".to_string(), "replica-1".to_string()].into(),
        )
        .unwrap();
        Proxy::new(Arc::new(pool), Arc::new(cache), router)
    }

    #[tokio::test]
    async fn test_write_goes_to_primary() {
        let conn = EchoConnection::default();
        let proxy = proxy(2, conn.clone());

        let body = proxy.handle_query("INSERT INTO t VALUES (1)").await.unwrap();
        assert_eq!(body, Bytes::from("primary:INSERT INTO t VALUES (1)"));
        assert_eq!(proxy.pool().idle(), 2);
    }

    #[tokio::test]
    async fn test_reads_alternate_replicas() {
        let conn = EchoConnection::default();
        let proxy = proxy(2, conn.clone());

        proxy.handle_query("SELECT a").await.unwrap();
        proxy.handle_query("SELECT b").await.unwrap();
        proxy.handle_query("SELECT c").await.unwrap();

        assert_eq!(*conn.seen.lock(), vec!["replica-0", "replica-1", "replica-0"]);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let conn = EchoConnection::default();
        let proxy = proxy(1, conn.clone());

        let first = proxy.handle_query("SELECT * FROM users").await.unwrap();
        let second = proxy.handle_query("SELECT * FROM users").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(conn.seen.lock().len(), 1);
        assert_eq!(proxy.pool().stats().acquired, 1);
        assert_eq!(proxy.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_writes_are_not_cached() {
        let conn = EchoConnection::default();
        let proxy = proxy(1, conn.clone());

        proxy.handle_query("DELETE FROM t").await.unwrap();
        proxy.handle_query("DELETE FROM t").await.unwrap();

        assert_eq!(conn.seen.lock().len(), 2);
        assert!(proxy.cache().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_releases_connection() {
        let conn = EchoConnection {
            fail: true,
            ..Default::default()
        };
        let proxy = proxy(1, conn);

        let err = proxy.handle_query("SELECT 1").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
        assert_eq!(proxy.pool().idle(), 1);
        assert!(proxy.cache().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_pool_is_connection_unavailable() {
        let conn = EchoConnection::default();
        let proxy = proxy(1, conn.clone());

        let held = proxy.pool().acquire().unwrap();
        let err = proxy.handle_query("UPDATE t SET a = 1").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionUnavailable(_)));
        assert!(conn.seen.lock().is_empty());

        proxy.pool().release(held);
        assert!(proxy.handle_query("UPDATE t SET a = 1").await.is_ok());
    }

    #[tokio::test]
    async fn test_cached_read_served_while_pool_exhausted() {
        let conn = EchoConnection::default();
        let proxy = proxy(1, conn);

        proxy.handle_query("SELECT 1").await.unwrap();
        let _held = proxy.pool().acquire().unwrap();

        assert!(proxy.handle_query("SELECT 1").await.is_ok());
        assert!(proxy.handle_query("SELECT 2").await.is_err());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = ProxyConfig::default().with_pool_capacity(0);
        assert!(matches!(
            Proxy::from_config(&config),
            Err(Error::Configuration(_))
        ));
    }
}
