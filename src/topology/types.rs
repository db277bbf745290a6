//! Tree topology type definitions.
//!
//! Routers, links and the aggregated result of a topology build, plus the
//! naming scheme shared by every component the tree wires together.

use serde::Serialize;

use super::shape::{LevelLayout, Shape};
use crate::utils::latency::Latency;

/// Dense router identifier, assigned leaf level first
pub type RouterId = usize;

/// Handle to a link owned by the builder's link registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LinkId(pub(crate) usize);

impl LinkId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Component name of router `id`
pub fn router_name(id: RouterId) -> String {
    format!("rtr_{}", id)
}

/// Parse a router name back into its id.
///
/// Only names `router_name` produces are accepted, so `rtr_01` is not router 1.
pub fn parse_router_name(name: &str) -> Option<RouterId> {
    let digits = name.strip_prefix("rtr_")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let id: RouterId = digits.parse().ok()?;
    (router_name(id) == name).then_some(id)
}

/// Port name for port index `port`
pub fn port_name(port: usize) -> String {
    format!("port{}", port)
}

/// Order an unordered endpoint pair so that `(a, b)` and `(b, a)` share a key
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Deterministic link name for an unordered endpoint pair.
///
/// Names containing `_` can make two pairs share a name (`a`/`b_c` and
/// `a_b`/`c`); the builder refuses the second such pair.
pub fn link_name(a: &str, b: &str) -> String {
    let (first, second) = canonical_pair(a, b);
    format!("link_{}_{}", first, second)
}

/// A named bidirectional link between two endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    /// Endpoint names in canonical order
    pub endpoints: (String, String),
    pub latency: Latency,
}

impl Link {
    /// Returns true if `endpoint` is one side of this link
    pub fn connects(&self, endpoint: &str) -> bool {
        self.endpoints.0 == endpoint || self.endpoints.1 == endpoint
    }
}

/// Whether a router port faces an endpoint (host or memory) or another router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PortState {
    #[serde(rename = "R2N")]
    RouterToNode,
    #[serde(rename = "R2R")]
    RouterToRouter,
}

/// What a router's downward ports are attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downlinks {
    /// Host indices, for leaf routers
    Hosts(Vec<usize>),
    /// Child router ids, for every other level
    Routers(Vec<RouterId>),
}

impl Downlinks {
    pub fn len(&self) -> usize {
        match self {
            Self::Hosts(hosts) => hosts.len(),
            Self::Routers(routers) => routers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a router's last port is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uplink {
    Router(RouterId),
    Memory,
}

/// A router instantiated at one level of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    pub id: RouterId,
    pub name: String,
    pub level: usize,
    /// Fan-out plus the upward (or memory) port
    pub num_ports: usize,
    pub downlinks: Downlinks,
    pub uplink: Uplink,
    /// Link bound to each port, indexed by port number
    pub ports: Vec<LinkId>,
}

impl Router {
    /// Number of downward ports
    pub fn fanout(&self) -> usize {
        self.num_ports - 1
    }

    /// Index of the port facing the parent router or memory
    pub fn uplink_port(&self) -> usize {
        self.num_ports - 1
    }

    pub fn is_root(&self) -> bool {
        self.uplink == Uplink::Memory
    }

    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    pub fn link_on_port(&self, port: usize) -> Option<LinkId> {
        self.ports.get(port).copied()
    }

    /// Port state following the tree layout: host and memory ports face
    /// endpoints, everything else faces another router.
    pub fn port_state(&self, port: usize) -> Option<PortState> {
        if port >= self.num_ports {
            return None;
        }
        let faces_node = if port == self.uplink_port() {
            self.is_root()
        } else {
            self.is_leaf()
        };
        Some(if faces_node {
            PortState::RouterToNode
        } else {
            PortState::RouterToRouter
        })
    }
}

/// Everything a build produces: routers, links, and the endpoint-facing handles
#[derive(Debug, Clone)]
pub struct TopologyResult {
    pub(crate) network_name: String,
    pub(crate) shape: Shape,
    pub(crate) layout: LevelLayout,
    pub(crate) host_names: Vec<String>,
    pub(crate) memory_name: String,
    pub(crate) routers: Vec<Router>,
    pub(crate) links: Vec<Link>,
    pub(crate) host_links: Vec<LinkId>,
    pub(crate) mem_link: LinkId,
}

impl TopologyResult {
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn layout(&self) -> &LevelLayout {
        &self.layout
    }

    pub fn num_hosts(&self) -> usize {
        self.host_names.len()
    }

    pub fn num_routers(&self) -> usize {
        self.routers.len()
    }

    /// Hosts plus the memory endpoint
    pub fn num_nodes(&self) -> usize {
        self.num_hosts() + 1
    }

    pub fn host_names(&self) -> &[String] {
        &self.host_names
    }

    pub fn memory_name(&self) -> &str {
        &self.memory_name
    }

    /// All routers in id order
    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn router(&self, id: RouterId) -> Option<&Router> {
        self.routers.get(id)
    }

    pub fn root(&self) -> &Router {
        &self.routers[self.layout.root_id()]
    }

    pub fn level_of(&self, id: RouterId) -> Option<usize> {
        self.layout.level_of(id)
    }

    pub fn routers_at_level(&self, level: usize) -> &[Router] {
        match self.layout.counts().get(level) {
            Some(&count) => {
                let start = self.layout.offset(level);
                &self.routers[start..start + count]
            }
            None => &[],
        }
    }

    /// Every link bound to a router port, in creation order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|link| link.id == id)
    }

    /// Host-facing links, index-aligned with `host_names`
    pub fn host_links(&self) -> &[LinkId] {
        &self.host_links
    }

    pub fn host_link_names(&self) -> Vec<&str> {
        self.host_links
            .iter()
            .filter_map(|&id| self.link(id).map(|link| link.name.as_str()))
            .collect()
    }

    pub fn mem_link(&self) -> LinkId {
        self.mem_link
    }

    pub fn mem_link_name(&self) -> Option<&str> {
        self.link(self.mem_link).map(|link| link.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(router_name(4), "rtr_4");
        assert_eq!(port_name(2), "port2");
        assert_eq!(link_name("rtr_0", "cpu0"), "link_cpu0_rtr_0");
        assert_eq!(link_name("cpu0", "rtr_0"), "link_cpu0_rtr_0");
        assert_eq!(link_name("rtr_4", "mem"), "link_mem_rtr_4");
    }

    #[test]
    fn test_parse_router_name() {
        assert_eq!(parse_router_name("rtr_12"), Some(12));
        assert_eq!(parse_router_name("rtr_0"), Some(0));
        assert_eq!(parse_router_name("rtr_"), None);
        assert_eq!(parse_router_name("rtr_1a"), None);
        assert_eq!(parse_router_name("router_1"), None);
        // Leading zeros name a different endpoint than rtr_1
        assert_eq!(parse_router_name("rtr_01"), None);
        assert_eq!(parse_router_name("rtr_00"), None);
    }

    #[test]
    fn test_port_state() {
        let leaf = Router {
            id: 0,
            name: router_name(0),
            level: 0,
            num_ports: 3,
            downlinks: Downlinks::Hosts(vec![0, 1]),
            uplink: Uplink::Router(4),
            ports: vec![LinkId(0), LinkId(1), LinkId(2)],
        };
        assert_eq!(leaf.port_state(0), Some(PortState::RouterToNode));
        assert_eq!(leaf.port_state(2), Some(PortState::RouterToRouter));
        assert_eq!(leaf.port_state(3), None);

        let single = Router {
            uplink: Uplink::Memory,
            ..leaf.clone()
        };
        assert_eq!(single.port_state(2), Some(PortState::RouterToNode));

        let root = Router {
            id: 4,
            name: router_name(4),
            level: 1,
            num_ports: 5,
            downlinks: Downlinks::Routers(vec![0, 1, 2, 3]),
            uplink: Uplink::Memory,
            ports: (0..5).map(LinkId).collect(),
        };
        assert_eq!(root.port_state(3), Some(PortState::RouterToRouter));
        assert_eq!(root.port_state(4), Some(PortState::RouterToNode));
        assert_eq!(root.fanout(), 4);
        assert!(root.is_root());
    }
}
