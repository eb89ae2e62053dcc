//! Camera session
//!
//! A [`Camera`] goes through `Disconnected -> Connecting -> Connected`.
//! Connecting discovers the device, reads its description, opens the RPC
//! channel and builds the capability registry. A failed connect leaves the
//! session in `Connecting`; calling `connect()` again re-runs everything.
//!
//! Commands are only issued in `Connected`; before that they fail with
//! [`CameraError::NotConnected`] without touching the network.

use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::precondition::{PreconditionMap, Resolver};
use crate::registry::{CapabilityRegistry, available_now};
use crate::rpc::{RequestIds, RpcChannel};
use crate::validator::validate;
use crate::ACT_TAKE_PICTURE;
use pmossdp::{DeviceDescription, describe, discover_and_describe};
use serde_json::Value;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Result of a command issued through a command entry point.
///
/// Failures due to the camera's current state are reported here instead of
/// as an error, so that a sequence of commands (a timelapse) can go on.
#[derive(Debug)]
pub enum CallOutcome {
    Done(Value),
    Failed(CameraError),
}

impl CallOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Done(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CameraError> {
        match self {
            Self::Done(_) => None,
            Self::Failed(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<Value> {
        match self {
            Self::Done(value) => Ok(value),
            Self::Failed(e) => Err(e),
        }
    }
}

/// What a successful connect produced
#[derive(Debug)]
struct Connection {
    channel: RpcChannel,
    registry: CapabilityRegistry,
    description: DeviceDescription,
}

/// Remote control session for one camera
#[derive(Debug)]
pub struct Camera {
    config: CameraConfig,
    http: reqwest::Client,
    preconditions: PreconditionMap,
    ids: RequestIds,
    state: ConnectionState,
    connection: Option<Connection>,
}

impl Camera {
    /// Camera with the default configuration
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> CameraBuilder {
        CameraBuilder::default()
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Id the next RPC will carry
    pub fn next_request_id(&self) -> u64 {
        self.ids.peek()
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Discover the camera over SSDP and connect to it.
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting...");
        if !self.config.uses_multicast() {
            info!("Searching at {} instead of the SSDP group", self.config.ssdp_address);
        }
        self.begin_connect();

        let result = self.discover_and_establish().await;
        self.finish_connect(result)
    }

    /// Connect using a known description location, skipping discovery.
    pub async fn connect_to(&mut self, location: &str) -> Result<()> {
        info!("Connecting to {}...", location);
        self.begin_connect();

        let result = self.describe_and_establish(location).await;
        self.finish_connect(result)
    }

    fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
        self.connection = None;
    }

    async fn discover_and_establish(&mut self) -> Result<()> {
        let found = discover_and_describe(&self.config.search_options(), &self.http).await?;
        self.establish(found.description, &found.endpoint).await
    }

    async fn describe_and_establish(&mut self, location: &str) -> Result<()> {
        let (description, endpoint) = describe(location, &self.http).await?;
        self.establish(description, &endpoint).await
    }

    async fn establish(&mut self, description: DeviceDescription, endpoint: &str) -> Result<()> {
        let endpoint = Url::parse(endpoint)?;
        let channel = RpcChannel::new(
            self.http.clone(),
            endpoint,
            self.config.api_version.clone(),
            self.ids.clone(),
        );

        let registry = CapabilityRegistry::build(&channel, &self.config.api_version).await?;
        if registry.is_empty() {
            warn!("Camera declares no method, only raw calls will work");
        }

        info!(
            "✅ Connected to {} ({}, {} methods)",
            channel.host().unwrap_or("camera"),
            description.display_name(),
            registry.len()
        );

        self.connection = Some(Connection {
            channel,
            registry,
            description,
        });
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn finish_connect(&self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            error!("❌ An error occurred while connecting: {}", e);
        }
        result
    }

    fn connection(&self) -> Result<&Connection> {
        match (&self.state, &self.connection) {
            (ConnectionState::Connected, Some(connection)) => Ok(connection),
            _ => Err(CameraError::NotConnected),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Control endpoint of the session
    pub fn endpoint(&self) -> Result<&Url> {
        Ok(self.connection()?.channel.endpoint())
    }

    /// Device description read while connecting
    pub fn device(&self) -> Result<&DeviceDescription> {
        Ok(&self.connection()?.description)
    }

    /// Declared methods
    pub fn registry(&self) -> Result<&CapabilityRegistry> {
        Ok(&self.connection()?.registry)
    }

    /// Signature listing of the declared methods
    pub fn api(&self) -> Result<Vec<String>> {
        Ok(self.registry()?.signatures())
    }

    /// Methods the camera accepts right now
    pub async fn available_api(&self) -> Result<HashSet<String>> {
        available_now(&self.connection()?.channel).await
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Raw RPC, without availability check nor validation
    pub async fn send(&self, method: &str, params: &[Value]) -> Result<Value> {
        self.connection()?.channel.call(method, params).await
    }

    /// Resolve the preconditions of `method`, then call it. Every failure is
    /// an error.
    pub async fn ensure_available_then_call(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<Value> {
        let connection = self.connection()?;
        Resolver::new(
            &connection.channel,
            &self.preconditions,
            self.config.settling_delay(),
            self.config.max_precondition_depth,
        )
        .ensure_available_then_call(method, params)
        .await
    }

    /// Like [`ensure_available_then_call`](Self::ensure_available_then_call),
    /// but failures caused by the camera's state are returned as
    /// [`CallOutcome::Failed`] and logged.
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<CallOutcome> {
        match self.ensure_available_then_call(method, params).await {
            Ok(value) => Ok(CallOutcome::Done(value)),
            Err(e) if e.is_device_state() => {
                warn!("Error while calling {}: {}", method, e);
                Ok(CallOutcome::Failed(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Call a method declared by the camera, checking the arguments against
    /// its signature first. Invalid arguments never reach the network.
    pub async fn invoke(&self, method: &str, args: &[Value]) -> Result<CallOutcome> {
        let descriptor = self
            .connection()?
            .registry
            .get(method)
            .ok_or_else(|| CameraError::UnknownMethod(method.to_string()))?;

        validate(method, args, &descriptor.parameter_types)?;
        self.call(method, args).await
    }

    /// Take a picture (switching to recording mode first if needed)
    pub async fn picture(&self) -> Result<CallOutcome> {
        self.call(ACT_TAKE_PICTURE, &[]).await
    }
}

/// Builder for [`Camera`]
#[derive(Debug, Default)]
pub struct CameraBuilder {
    config: CameraConfig,
    http: Option<reqwest::Client>,
    preconditions: PreconditionMap,
}

impl CameraBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom HTTP client
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Wait after a precondition call
    pub fn settling_delay(mut self, delay: Duration) -> Self {
        self.config.settling_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn max_precondition_depth(mut self, depth: usize) -> Self {
        self.config.max_precondition_depth = depth;
        self
    }

    /// Send the M-SEARCH somewhere else than the multicast group
    pub fn ssdp_address(mut self, address: SocketAddr) -> Self {
        self.config.ssdp_address = address;
        self
    }

    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Replace the precondition table
    pub fn preconditions(mut self, preconditions: PreconditionMap) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn build(self) -> Result<Camera> {
        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.config.http_timeout())
                .user_agent(self.config.user_agent.as_str())
                .build()?,
        };

        Ok(Camera {
            config: self.config,
            http,
            preconditions: self.preconditions,
            ids: RequestIds::new(),
            state: ConnectionState::Disconnected,
            connection: None,
        })
    }
}
