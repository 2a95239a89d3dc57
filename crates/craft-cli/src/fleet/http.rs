//! Fleet API client.
//!
//! A thin blocking REST client. Every call carries the configured timeout;
//! non-2xx answers become [`FleetError::Api`] unless the call maps a status
//! to something more specific (404 on a named cluster, 409 on a launch).

use std::time::Duration;

use craft_shell::{LogLevel, LogLevelSink};
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{
    Archive, ClusterDetail, ClusterInventory, ClusterSummary, DnsRecord, EnvVar, LaunchProxy,
    LaunchServer, ProxyControl, ProxyTask, RestartServer, ServerLifecycle, ServerTask,
    SnapshotStore, StartServer,
};
use crate::error::FleetError;

/// Client for a fleet API endpoint.
#[derive(Debug)]
pub struct HttpFleet {
    client: Client,
    base: Url,
    timeout: Duration,
    level: Mutex<LogLevel>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpFleet {
    /// Create a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute http(s) URL or
    /// the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, FleetError> {
        let base = Url::parse(endpoint).map_err(|e| {
            FleetError::InvalidRequest(format!("invalid endpoint '{endpoint}': {e}"))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(FleetError::InvalidRequest(format!(
                "endpoint must use http or https, got '{}'",
                base.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("craft/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FleetError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base,
            timeout,
            level: Mutex::new(LogLevel::Error),
        })
    }

    /// The endpoint calls are made against.
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    /// Level last applied through [`LogLevelSink`].
    pub fn log_level(&self) -> LogLevel {
        *self.level.lock()
    }

    fn url(&self, segments: &[&str]) -> Result<Url, FleetError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                FleetError::InvalidRequest(format!("endpoint '{}' cannot be a base URL", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, FleetError> {
        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                FleetError::Timeout(self.timeout)
            } else {
                FleetError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if self.log_level() >= LogLevel::Debug {
            debug!(status = status.as_u16(), url = %response.url(), "fleet API response");
        }
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map_or_else(|_| body.trim().to_string(), |b| b.message);
        Err(FleetError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, FleetError> {
        let url = self.url(segments)?;
        decode(self.send(self.client.get(url))?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, FleetError> {
        let url = self.url(segments)?;
        decode(self.send(self.client.post(url).json(body))?)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FleetError> {
    response
        .json()
        .map_err(|e| FleetError::Decode(e.to_string()))
}

/// Replace an [`FleetError::Api`] with `status` by a more specific error.
fn on_status(err: FleetError, status: StatusCode, replace: impl FnOnce() -> FleetError) -> FleetError {
    match err {
        FleetError::Api { status: s, .. } if s == status.as_u16() => replace(),
        other => other,
    }
}

fn cluster_not_found(cluster: &str) -> impl FnOnce() -> FleetError + '_ {
    move || FleetError::ClusterNotFound(cluster.to_string())
}

fn server_not_found<'a>(cluster: &'a str, server: &'a str) -> impl FnOnce() -> FleetError + 'a {
    move || FleetError::ServerNotFound {
        cluster: cluster.to_string(),
        server: server.to_string(),
    }
}

fn proxy_not_found<'a>(cluster: &'a str, proxy: &'a str) -> impl FnOnce() -> FleetError + 'a {
    move || FleetError::ProxyNotFound {
        cluster: cluster.to_string(),
        proxy: proxy.to_string(),
    }
}

impl ClusterInventory for HttpFleet {
    fn list_clusters(&self) -> Result<Vec<ClusterSummary>, FleetError> {
        self.get(&["clusters"])
    }

    fn describe_cluster(&self, cluster: &str) -> Result<ClusterDetail, FleetError> {
        self.get(&["clusters", cluster])
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, cluster_not_found(cluster)))
    }
}

impl ServerLifecycle for HttpFleet {
    fn launch_server(&self, request: &LaunchServer) -> Result<ServerTask, FleetError> {
        self.post(&["clusters", request.cluster.as_str(), "launches"], request)
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, cluster_not_found(&request.cluster)))
            .map_err(|e| {
                on_status(e, StatusCode::CONFLICT, || FleetError::AlreadyExists {
                    kind: "server",
                    name: request.server_name.clone(),
                    cluster: request.cluster.clone(),
                })
            })
    }

    fn start_server(&self, request: &StartServer) -> Result<ServerTask, FleetError> {
        self.post(&["clusters", request.cluster.as_str(), "restores"], request)
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, cluster_not_found(&request.cluster)))
            .map_err(|e| {
                on_status(e, StatusCode::CONFLICT, || FleetError::AlreadyExists {
                    kind: "server",
                    name: request.server_name.clone(),
                    cluster: request.cluster.clone(),
                })
            })
    }

    fn restart_server(&self, request: &RestartServer) -> Result<ServerTask, FleetError> {
        self.post(
            &["clusters", request.cluster.as_str(), "servers", request.server_name.as_str(), "restart"],
            request,
        )
        .map_err(|e| {
            on_status(
                e,
                StatusCode::NOT_FOUND,
                server_not_found(&request.cluster, &request.server_name),
            )
        })
    }

    fn terminate_server(&self, cluster: &str, server: &str) -> Result<ServerTask, FleetError> {
        let url = self.url(&["clusters", cluster, "servers", server])?;
        self.send(self.client.delete(url))
            .and_then(decode)
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, server_not_found(cluster, server)))
    }

    fn list_servers(&self, cluster: &str) -> Result<Vec<ServerTask>, FleetError> {
        self.get(&["clusters", cluster, "servers"])
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, cluster_not_found(cluster)))
    }

    fn describe_server(&self, cluster: &str, server: &str) -> Result<ServerTask, FleetError> {
        self.get(&["clusters", cluster, "servers", server])
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, server_not_found(cluster, server)))
    }

    fn server_env(&self, cluster: &str, server: &str) -> Result<Vec<EnvVar>, FleetError> {
        self.get(&["clusters", cluster, "servers", server, "env"])
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, server_not_found(cluster, server)))
    }
}

impl ProxyControl for HttpFleet {
    fn list_proxies(&self, cluster: &str) -> Result<Vec<ProxyTask>, FleetError> {
        self.get(&["clusters", cluster, "proxies"])
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, cluster_not_found(cluster)))
    }

    fn launch_proxy(&self, request: &LaunchProxy) -> Result<ProxyTask, FleetError> {
        self.post(&["clusters", request.cluster.as_str(), "proxies"], request)
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, cluster_not_found(&request.cluster)))
            .map_err(|e| {
                on_status(e, StatusCode::CONFLICT, || FleetError::AlreadyExists {
                    kind: "proxy",
                    name: request.proxy_name.clone(),
                    cluster: request.cluster.clone(),
                })
            })
    }

    fn attach_proxy(&self, cluster: &str, proxy: &str) -> Result<DnsRecord, FleetError> {
        self.post(&["clusters", cluster, "proxies", proxy, "attach"], &())
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, proxy_not_found(cluster, proxy)))
    }

    fn proxy_dns(&self, cluster: &str, proxy: &str) -> Result<Option<DnsRecord>, FleetError> {
        match self.get(&["clusters", cluster, "proxies", proxy, "dns"]) {
            Ok(record) => Ok(Some(record)),
            Err(FleetError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn add_server_to_proxy(
        &self,
        cluster: &str,
        server: &str,
        proxy: &str,
    ) -> Result<(), FleetError> {
        let url = self.url(&["clusters", cluster, "proxies", proxy, "servers", server])?;
        self.send(self.client.put(url))
            .map(drop)
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, proxy_not_found(cluster, proxy)))
    }

    fn remove_server_from_proxy(
        &self,
        cluster: &str,
        server: &str,
        proxy: &str,
    ) -> Result<(), FleetError> {
        let url = self.url(&["clusters", cluster, "proxies", proxy, "servers", server])?;
        self.send(self.client.delete(url))
            .map(drop)
            .map_err(|e| on_status(e, StatusCode::NOT_FOUND, proxy_not_found(cluster, proxy)))
    }

    fn dns_records(&self) -> Result<Vec<DnsRecord>, FleetError> {
        self.get(&["dns"])
    }
}

impl SnapshotStore for HttpFleet {
    fn list_archives(&self, user: &str, bucket: &str) -> Result<Vec<Archive>, FleetError> {
        self.get(&["archives", bucket, user])
    }
}

impl LogLevelSink for HttpFleet {
    fn set_log_level(&self, level: LogLevel) {
        *self.level.lock() = level;
    }
}
