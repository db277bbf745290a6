//! Errors raised while configuring, building and querying a tree topology.

/// Errors that can occur during tree topology construction or lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Bad shape syntax, non-positive fan-out, or a host count that cannot
    /// be balanced across every level of the tree.
    #[error("Invalid tree configuration: {0}")]
    Configuration(String),

    #[error("Topology has already been built")]
    AlreadyBuilt,

    #[error("Topology parameters are locked after the first configure")]
    AlreadyConfigured,

    #[error("Topology must be configured before it is built")]
    NotConfigured,

    #[error("Unknown endpoint: {name}")]
    UnknownEndpoint { name: String },

    #[error("Unknown router id {0}")]
    UnknownRouter(usize),

    #[error("Unknown destination endpoint {0}")]
    UnknownDestination(usize),

    #[error("Router {router} has no port {port}")]
    InvalidPort { router: usize, port: usize },
}

impl TopologyError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
