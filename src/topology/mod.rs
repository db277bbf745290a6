//! Tree interconnect topology module.
//!
//! This module contains the shape parser, the tree builder that wires hosts
//! through leaf routers up to a single memory-facing root, and the routing
//! tables derived from a built tree.

pub mod error;
pub mod shape;
pub mod types;
pub mod builder;
pub mod routing;

// Re-export key types and functions for easier access
pub use error::TopologyError;
pub use shape::{LevelLayout, Shape};
pub use types::{
    link_name, parse_router_name, port_name, router_name, Downlinks, Link, LinkId, PortState,
    Router, RouterId, TopologyResult, Uplink,
};
pub use builder::{TreeOptions, TreeTopologyBuilder, DEFAULT_MEMORY_NAME, DEFAULT_NETWORK_NAME};
pub use routing::{PortInfo, RouterRoutes, RoutingTable};
