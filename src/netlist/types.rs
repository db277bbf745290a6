//! Netlist type definitions.
//!
//! These structures are serialized to YAML or JSON and describe the routers,
//! links and endpoint attachments of one tree interconnect.

use serde::Serialize;

use crate::config::RouterParams;
use crate::topology::PortState;
use crate::utils::latency::Latency;

/// Component type instantiated for each router
pub const ROUTER_COMPONENT: &str = "merlin.hr_router";

/// Topology subcomponent slotted into each router
pub const TOPOLOGY_COMPONENT: &str = "merlin.tree";

/// Root of the serialized netlist
#[derive(Serialize, Debug)]
pub struct Netlist {
    pub network: NetlistNetwork,
    pub routers: Vec<NetlistRouter>,
    pub links: Vec<NetlistLink>,
    /// Host attachments in host order
    pub hosts: Vec<NetlistEndpoint>,
    pub memory: NetlistEndpoint,
}

/// Summary of the tree
#[derive(Serialize, Debug)]
pub struct NetlistNetwork {
    pub name: String,
    pub shape: String,
    pub total_hosts: usize,
    pub num_routers: usize,
    /// Hosts plus the memory endpoint
    pub num_nodes: usize,
    /// Router count per level, leaf level first
    pub routers_per_level: Vec<usize>,
}

/// One router component and its port bindings
#[derive(Serialize, Debug)]
pub struct NetlistRouter {
    pub name: String,
    pub component: RouterComponent,
    pub topology: TopologyComponent,
    pub level: usize,
    pub ports: Vec<NetlistPort>,
}

/// Router component parameters
#[derive(Serialize, Debug)]
pub struct RouterComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    pub id: usize,
    pub num_ports: usize,
    #[serde(flatten)]
    pub params: RouterParams,
}

/// Topology subcomponent parameters
#[derive(Serialize, Debug)]
pub struct TopologyComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    pub shape: String,
    pub total_hosts: usize,
}

/// Link bound to one router port
#[derive(Serialize, Debug)]
pub struct NetlistPort {
    pub port: String,
    pub link: String,
    pub latency: Latency,
    pub state: PortState,
}

/// A link between two named endpoints
#[derive(Serialize, Debug)]
pub struct NetlistLink {
    pub name: String,
    pub endpoints: [String; 2],
    pub latency: Latency,
}

/// Where an endpoint component attaches to the tree
#[derive(Serialize, Debug)]
pub struct NetlistEndpoint {
    pub name: String,
    pub endpoint_id: usize,
    pub link: String,
    pub router: String,
    pub port: String,
}
