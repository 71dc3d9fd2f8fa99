//! `StakemateServer` builder and server loop.
//!
//! This is the entry point for running a Stakemate server. It ties
//! together all the layers: transport → protocol → coordinator → rooms.

use std::sync::Arc;

use stakemate_protocol::{Codec, JsonCodec};
use stakemate_room::RulesEngine;
use stakemate_transport::{Transport, WebSocketTransport};
use stakemate_vault::SecretVault;

use crate::handler::handle_connection;
use crate::{ServerConfig, SessionCoordinator, StakemateError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<R: RulesEngine, C: Codec> {
    pub(crate) coordinator: SessionCoordinator<R>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Stakemate server.
///
/// # Example
///
/// ```rust,no_run
/// use stakemate::prelude::*;
///
/// # async fn run() -> Result<(), StakemateError> {
/// let server = StakemateServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .build(ChessRules::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct StakemateServerBuilder {
    config: ServerConfig,
    vault: Option<SecretVault>,
}

impl StakemateServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            vault: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config = self.config.with_bind(addr);
        self
    }

    /// Uses this vault instead of building one from the configuration.
    pub fn vault(mut self, vault: SecretVault) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Builds the vault, binds the listener, and returns a server ready
    /// to [`run`](StakemateServer::run).
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// - [`StakemateError::Vault`] if the key is malformed, or missing
    ///   under the production profile
    /// - [`StakemateError::Transport`] if the address can't be bound
    pub async fn build<R: RulesEngine>(
        self,
        rules: R,
    ) -> Result<StakemateServer<R, JsonCodec>, StakemateError> {
        let vault = match self.vault {
            Some(vault) => vault,
            None => self.config.vault()?,
        };
        let transport = WebSocketTransport::bind(self.config.bind_addr()).await?;

        tracing::info!(
            profile = %self.config.profile,
            vault = %vault.mode(),
            code_length = self.config.registry.code_length,
            "server configured"
        );

        let state = Arc::new(ServerState {
            coordinator: SessionCoordinator::new(
                rules,
                self.config.registry,
                vault,
            ),
            codec: JsonCodec,
        });

        Ok(StakemateServer { transport, state })
    }
}

impl Default for StakemateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Stakemate server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct StakemateServer<R: RulesEngine, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<R, C>>,
}

impl<R, C> StakemateServer<R, C>
where
    R: RulesEngine,
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The coordinator every connection talks to.
    pub fn coordinator(&self) -> &SessionCoordinator<R> {
        &self.state.coordinator
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), StakemateError> {
        tracing::info!("Stakemate server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
