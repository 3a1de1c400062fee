//! Consul-backed service discovery.
//!
//! This module queries the Consul health API
//! (`GET /v1/health/service/<name>`) and turns every returned instance
//! into a `host:port` address.

use nsqlookup_core::{Context, ResolveError};
use serde::Deserialize;

use crate::resolver::Resolver;

/// Default Consul agent address.
pub const DEFAULT_ADDRESS: &str = "http://localhost:8500";

/// Default service name registered by nsqlookupd.
pub const DEFAULT_SERVICE: &str = "nsqlookupd";

/// Configuration for the Consul resolver.
///
/// Deserializes with defaults for missing fields, so it can be embedded in a
/// larger configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsulConfig {
    /// Base URL of the Consul agent.
    pub address: String,

    /// Name of the service to look up.
    pub service: String,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            service: DEFAULT_SERVICE.to_string(),
        }
    }
}

impl ConsulConfig {
    /// Create a new config with the given agent address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the service name to look up.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }
}

/// Failures talking to the registry.
///
/// Surfaced as the source of [`ResolveError::ResolveFailed`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The HTTP exchange failed.
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with a non-2xx status.
    #[error("registry returned status {0}")]
    Status(reqwest::StatusCode),

    /// The response body was not the expected JSON.
    #[error("invalid registry response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Resolver backed by the Consul health API.
///
/// Addresses are returned in the order Consul lists the instances. Each
/// instance's service address is used when set, falling back to the address
/// of the node it runs on.
///
/// No timeout is applied; bound the call with [`Context::with_timeout`].
///
/// ## Example
///
/// ```rust,ignore
/// use nsqlookup_core::Context;
/// use nsqlookup_discovery::{ConsulResolver, Resolver};
///
/// let resolver = ConsulResolver::new("http://consul:8500");
/// let addrs = resolver.resolve(&Context::new()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ConsulResolver {
    config: ConsulConfig,
    client: reqwest::Client,
}

impl ConsulResolver {
    /// Create a resolver for the default service on the given agent.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(ConsulConfig::new(address))
    }

    /// Create a resolver with full configuration.
    #[must_use]
    pub fn with_config(config: ConsulConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a resolver sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(config: ConsulConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Get the resolver configuration.
    #[must_use]
    pub fn config(&self) -> &ConsulConfig {
        &self.config
    }

    /// URL of the health query for the configured service.
    ///
    /// Empty fields fall back to [`DEFAULT_ADDRESS`] and [`DEFAULT_SERVICE`].
    /// The service name is percent-encoded as a single path segment.
    #[must_use]
    pub fn url(&self) -> String {
        let address = match self.config.address.trim_end_matches('/') {
            "" => DEFAULT_ADDRESS,
            address => address,
        };
        let service = match self.config.service.as_str() {
            "" => DEFAULT_SERVICE,
            service => service,
        };

        format!(
            "{address}/v1/health/service/{}",
            urlencoding::encode(service)
        )
    }

    async fn fetch(&self) -> Result<Vec<ServiceEntry>, RegistryError> {
        let response = self.client.get(self.url()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl Default for ConsulResolver {
    fn default() -> Self {
        Self::with_config(ConsulConfig::default())
    }
}

impl Resolver for ConsulResolver {
    async fn resolve(&self, ctx: &Context) -> Result<Vec<String>, ResolveError> {
        let entries = ctx
            .run(async {
                self.fetch().await.map_err(|e| {
                    tracing::debug!(
                        service = %self.config.service,
                        error = %e,
                        "consul lookup failed"
                    );
                    ResolveError::failed(e)
                })
            })
            .await?;

        let addrs: Vec<String> = entries.iter().map(ServiceEntry::address).collect();

        tracing::debug!(
            service = %self.config.service,
            count = addrs.len(),
            "resolved service from consul"
        );

        Ok(addrs)
    }
}

/// One element of the health API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceEntry {
    node: NodeInfo,
    service: ServiceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeInfo {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceInfo {
    #[serde(default)]
    address: String,
    port: u16,
}

impl ServiceEntry {
    fn address(&self) -> String {
        let host = if self.service.address.is_empty() {
            &self.node.address
        } else {
            &self.service.address
        };
        join_host_port(host, self.service.port)
    }
}

/// Format `host:port`, bracketing IPv6 literals.
fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    const HEALTH_PATH: &str = "/v1/health/service/nsqlookupd";

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        String::from_utf8_lossy(&request).into_owned()
    }

    /// Serve `body` with `status` on `HEALTH_PATH`, 404 elsewhere.
    async fn spawn_registry(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    let path = request.split_whitespace().nth(1).unwrap_or_default();

                    let (status, body) = if path == HEALTH_PATH {
                        (status, body)
                    } else {
                        ("404 Not Found", String::new())
                    };

                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{addr}")
    }

    fn resolver_for(address: String) -> ConsulResolver {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        ConsulResolver::with_client(ConsulConfig::new(address), client)
    }

    fn three_instances() -> String {
        serde_json::json!([
            {
                "Node": { "Node": "A", "Address": "127.0.0.1" },
                "Service": { "Address": "", "Port": 4242 }
            },
            {
                "Node": { "Node": "B", "Address": "192.168.0.20" },
                "Service": { "Address": "192.168.0.1", "Port": 4161 }
            },
            {
                "Node": { "Node": "C", "Address": "192.168.0.2" },
                "Service": { "Address": "", "Port": 4161 }
            }
        ])
        .to_string()
    }

    #[tokio::test]
    async fn test_resolve_consul() {
        let address = spawn_registry("200 OK", three_instances()).await;
        let resolver = resolver_for(address);

        let ctx = Context::new();
        let addrs = resolver.resolve(&ctx).await.unwrap();
        assert_eq!(
            addrs,
            ["127.0.0.1:4242", "192.168.0.1:4161", "192.168.0.2:4161"]
        );

        ctx.cancel();
        let result = resolver.resolve(&ctx).await;
        assert!(matches!(result, Err(ResolveError::Canceled)));
    }

    #[tokio::test]
    async fn test_empty_instance_list() {
        let address = spawn_registry("200 OK", "[]".to_string()).await;
        let addrs = resolver_for(address).resolve(&Context::new()).await.unwrap();
        assert!(addrs.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_fails() {
        let address = spawn_registry("500 Internal Server Error", "[]".to_string()).await;
        let err = resolver_for(address)
            .resolve(&Context::new())
            .await
            .unwrap_err();

        assert!(err.is_failed());
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_wrong_service_path_fails() {
        let address = spawn_registry("200 OK", three_instances()).await;
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let resolver =
            ConsulResolver::with_client(ConsulConfig::new(address).service("nsqd"), client);

        let err = resolver.resolve(&Context::new()).await.unwrap_err();
        assert!(err.is_failed());
    }

    #[tokio::test]
    async fn test_malformed_json_fails() {
        let address = spawn_registry("200 OK", "{\"not\": \"a list\"".to_string()).await;
        let err = resolver_for(address)
            .resolve(&Context::new())
            .await
            .unwrap_err();

        assert!(err.is_failed());
        assert!(err.to_string().contains("invalid registry response"));
    }

    #[tokio::test]
    async fn test_transport_failure_fails() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = resolver_for(format!("http://{addr}"))
            .resolve(&Context::new())
            .await
            .unwrap_err();

        assert!(err.is_failed());
    }

    #[tokio::test]
    async fn test_cancel_during_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept and never answer.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = resolver_for(format!("http://{addr}"))
            .resolve(&ctx)
            .await
            .unwrap_err();

        assert!(err.is_canceled());
    }

    #[test]
    fn test_url_building() {
        let resolver = ConsulResolver::new("http://consul:8500/");
        assert_eq!(
            resolver.url(),
            "http://consul:8500/v1/health/service/nsqlookupd"
        );

        let resolver =
            ConsulResolver::with_config(ConsulConfig::new("http://consul:8500").service("lookup"));
        assert_eq!(resolver.url(), "http://consul:8500/v1/health/service/lookup");
    }

    #[test]
    fn test_url_empty_fields_fall_back() {
        let resolver = ConsulResolver::with_config(ConsulConfig::new("").service(""));
        assert_eq!(
            resolver.url(),
            "http://localhost:8500/v1/health/service/nsqlookupd"
        );

        let config: ConsulConfig =
            serde_json::from_str(r#"{ "address": "http://consul:8500", "service": "" }"#).unwrap();
        assert_eq!(
            ConsulResolver::with_config(config).url(),
            "http://consul:8500/v1/health/service/nsqlookupd"
        );
    }

    #[test]
    fn test_url_encodes_service_name() {
        let resolver = ConsulResolver::with_config(
            ConsulConfig::new("http://consul:8500").service("nsq lookup/v2?dc=1"),
        );
        assert_eq!(
            resolver.url(),
            "http://consul:8500/v1/health/service/nsq%20lookup%2Fv2%3Fdc%3D1"
        );
    }

    #[tokio::test]
    async fn test_empty_service_queries_default() {
        let address = spawn_registry("200 OK", three_instances()).await;
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let resolver = ConsulResolver::with_client(ConsulConfig::new(address).service(""), client);

        let addrs = resolver.resolve(&Context::new()).await.unwrap();
        assert_eq!(addrs.len(), 3);
    }

    #[test]
    fn test_config_defaults() {
        let config = ConsulConfig::default();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.service, DEFAULT_SERVICE);

        let config: ConsulConfig =
            serde_json::from_str(r#"{ "address": "http://10.0.0.5:8500" }"#).unwrap();
        assert_eq!(config.address, "http://10.0.0.5:8500");
        assert_eq!(config.service, DEFAULT_SERVICE);
    }

    #[test]
    fn test_entry_normalization() {
        let entries: Vec<ServiceEntry> = serde_json::from_str(
            r#"[
                { "Node": { "Address": "10.0.0.1" }, "Service": { "Port": 4161, "Tags": [] } },
                { "Node": { "Address": "10.0.0.2" }, "Service": { "Address": "::1", "Port": 4161 } }
            ]"#,
        )
        .unwrap();

        let addrs: Vec<String> = entries.iter().map(ServiceEntry::address).collect();
        assert_eq!(addrs, ["10.0.0.1:4161", "[::1]:4161"]);
    }
}
