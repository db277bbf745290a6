//! Destination-to-port routing for a built tree.
//!
//! Endpoints are numbered hosts first (`0..num_hosts`) with the memory
//! endpoint last (`num_hosts`). A router forwards a packet down the child
//! port whose subtree holds the destination host, and up its last port for
//! everything else. The root's last port leads to memory.

use std::ops::Range;

use serde::Serialize;

use super::error::TopologyError;
use super::types::{Downlinks, PortState, RouterId, TopologyResult, Uplink};

/// Port table for one router
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterRoutes {
    pub router: RouterId,
    pub name: String,
    /// Output port for each destination endpoint id
    pub next_port: Vec<usize>,
    pub ports: Vec<PortInfo>,
}

/// Static description of one router port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub state: PortState,
    /// Endpoint id attached to this port, for endpoint-facing ports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<usize>,
    /// Router on the other side, for router-facing ports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbor: Option<RouterId>,
}

/// Routing tables for every router of a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingTable {
    num_hosts: usize,
    hosts_per_leaf: usize,
    root: RouterId,
    routers: Vec<RouterRoutes>,
}

impl RoutingTable {
    /// Derive routes from a built topology
    pub fn new(topology: &TopologyResult) -> Self {
        let num_hosts = topology.num_hosts();
        let memory_id = num_hosts;

        // Hosts below each router form a contiguous range; routers are in
        // level order so children are always visited before parents.
        let mut reach: Vec<Range<usize>> = Vec::with_capacity(topology.num_routers());
        let mut routers = Vec::with_capacity(topology.num_routers());

        for router in topology.routers() {
            let child_ranges: Vec<Range<usize>> = match &router.downlinks {
                Downlinks::Hosts(hosts) => hosts.iter().map(|&h| h..h + 1).collect(),
                Downlinks::Routers(children) => {
                    children.iter().map(|&c| reach[c].clone()).collect()
                }
            };

            let start = child_ranges.first().map_or(0, |r| r.start);
            let end = child_ranges.last().map_or(0, |r| r.end);
            reach.push(start..end);

            let uplink_port = router.uplink_port();
            let next_port = (0..=memory_id)
                .map(|dest| {
                    child_ranges
                        .iter()
                        .position(|range| range.contains(&dest))
                        .unwrap_or(uplink_port)
                })
                .collect();

            let ports = (0..router.num_ports)
                .map(|port| {
                    let state = router
                        .port_state(port)
                        .unwrap_or(PortState::RouterToRouter);
                    let endpoint = match (&router.downlinks, state) {
                        (_, PortState::RouterToRouter) => None,
                        (_, PortState::RouterToNode) if port == uplink_port => Some(memory_id),
                        (Downlinks::Hosts(hosts), PortState::RouterToNode) => {
                            hosts.get(port).copied()
                        }
                        (Downlinks::Routers(_), PortState::RouterToNode) => None,
                    };
                    let neighbor = match (&router.downlinks, router.uplink) {
                        (_, Uplink::Router(parent)) if port == uplink_port => Some(parent),
                        (Downlinks::Routers(children), _) => children.get(port).copied(),
                        _ => None,
                    };
                    PortInfo {
                        state,
                        endpoint,
                        neighbor,
                    }
                })
                .collect();

            routers.push(RouterRoutes {
                router: router.id,
                name: router.name.clone(),
                next_port,
                ports,
            });
        }

        Self {
            num_hosts,
            hosts_per_leaf: topology.shape().hosts_per_leaf(),
            root: topology.root().id,
            routers,
        }
    }

    /// Hosts plus the memory endpoint
    pub fn num_endpoints(&self) -> usize {
        self.num_hosts + 1
    }

    /// Endpoint id of the memory endpoint
    pub fn memory_endpoint(&self) -> usize {
        self.num_hosts
    }

    pub fn routers(&self) -> &[RouterRoutes] {
        &self.routers
    }

    fn routes(&self, router: RouterId) -> Result<&RouterRoutes, TopologyError> {
        self.routers
            .get(router)
            .ok_or(TopologyError::UnknownRouter(router))
    }

    fn check_dest(&self, dest: usize) -> Result<(), TopologyError> {
        if dest < self.num_endpoints() {
            Ok(())
        } else {
            Err(TopologyError::UnknownDestination(dest))
        }
    }

    /// Output port `router` uses to forward towards endpoint `dest`
    pub fn next_port(&self, router: RouterId, dest: usize) -> Result<usize, TopologyError> {
        self.check_dest(dest)?;
        Ok(self.routes(router)?.next_port[dest])
    }

    pub fn port_state(&self, router: RouterId, port: usize) -> Result<PortState, TopologyError> {
        self.port_info(router, port).map(|info| info.state)
    }

    /// Endpoint id attached to `port`, or `None` for router-facing ports
    pub fn endpoint_id(&self, router: RouterId, port: usize) -> Result<Option<usize>, TopologyError> {
        self.port_info(router, port).map(|info| info.endpoint)
    }

    fn port_info(&self, router: RouterId, port: usize) -> Result<PortInfo, TopologyError> {
        self.routes(router)?
            .ports
            .get(port)
            .copied()
            .ok_or(TopologyError::InvalidPort { router, port })
    }

    /// Router that endpoint `dest` is attached to
    pub fn dest_router(&self, dest: usize) -> Result<RouterId, TopologyError> {
        self.check_dest(dest)?;
        if dest == self.memory_endpoint() {
            Ok(self.root)
        } else {
            Ok(dest / self.hosts_per_leaf)
        }
    }

    /// Port on `dest_router(dest)` that endpoint `dest` is attached to
    pub fn dest_local_port(&self, dest: usize) -> Result<usize, TopologyError> {
        self.check_dest(dest)?;
        if dest == self.memory_endpoint() {
            let root = self.routes(self.root)?;
            Ok(root.ports.len() - 1)
        } else {
            Ok(dest % self.hosts_per_leaf)
        }
    }

    /// Router ids visited from the router serving `src` to the router serving `dest`
    pub fn path(&self, src: usize, dest: usize) -> Result<Vec<RouterId>, TopologyError> {
        let mut current = self.dest_router(src)?;
        let target = self.dest_router(dest)?;
        let mut path = vec![current];
        while current != target {
            let port = self.next_port(current, dest)?;
            current = self.neighbor(current, port)?;
            path.push(current);
        }
        Ok(path)
    }

    /// Output ports for a broadcast packet that arrived on `in_port`.
    ///
    /// A packet coming down the uplink port (from the parent, or from memory
    /// at the root) is copied to every downward port. A packet arriving on a
    /// downward port is sent up the uplink port only.
    pub fn broadcast_ports(
        &self,
        router: RouterId,
        in_port: usize,
    ) -> Result<Vec<usize>, TopologyError> {
        let num_ports = self.routes(router)?.ports.len();
        if in_port >= num_ports {
            return Err(TopologyError::InvalidPort {
                router,
                port: in_port,
            });
        }
        let uplink_port = num_ports - 1;
        if in_port == uplink_port {
            Ok((0..uplink_port).collect())
        } else {
            Ok(vec![uplink_port])
        }
    }

    fn neighbor(&self, router: RouterId, port: usize) -> Result<RouterId, TopologyError> {
        self.port_info(router, port)?
            .neighbor
            .ok_or(TopologyError::InvalidPort { router, port })
    }
}
