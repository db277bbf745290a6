//! # Netlist Module
//!
//! Serializable description of a built tree, handed to the simulation
//! framework that instantiates the components and connects the links.
//!
//! ## Netlist Structure
//!
//! - **Network**: name, shape, host count and per-level router counts
//! - **Routers**: component parameters and the link bound to every port
//! - **Links**: every link exactly once, with its endpoints and latency
//! - **Hosts / Memory**: the links the caller attaches endpoint components to
//!
//! Endpoint components (CPU caches, the directory controller) are not
//! described here; only the names they are known by.

pub mod types;

pub use types::{
    Netlist, NetlistEndpoint, NetlistLink, NetlistNetwork, NetlistPort, NetlistRouter,
    RouterComponent, TopologyComponent,
};
