//! Tree topology construction.
//!
//! The builder follows a configure-then-build lifecycle. `configure` locks the
//! shape, host count and host names; `build` materializes every router and
//! link exactly once. Links live in a canonical-key registry so that asking
//! for the same endpoint pair in either order always yields the same link.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use super::error::TopologyError;
use super::shape::{LevelLayout, Shape};
use super::types::{
    canonical_pair, link_name, parse_router_name, router_name, Downlinks, Link, LinkId, Router,
    TopologyResult, Uplink,
};
use crate::utils::latency::Latency;

/// Name given to the memory endpoint when none is configured
pub const DEFAULT_MEMORY_NAME: &str = "mem";

/// Name given to the network when none is configured
pub const DEFAULT_NETWORK_NAME: &str = "tree";

/// Options fixed when the builder is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    pub network_name: String,
    pub memory_name: String,
    /// Latency of router-router and root-memory links
    pub link_latency: Latency,
    /// Latency of host-router links, `link_latency` when unset
    pub host_link_latency: Option<Latency>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            network_name: DEFAULT_NETWORK_NAME.to_string(),
            memory_name: DEFAULT_MEMORY_NAME.to_string(),
            link_latency: Latency::from_nanos(1),
            host_link_latency: None,
        }
    }
}

/// Locked build parameters
#[derive(Debug, Clone)]
struct TreeParams {
    shape: Shape,
    layout: LevelLayout,
    host_names: Vec<String>,
    hosts: HashSet<String>,
}

/// Links keyed by their canonical endpoint pair.
///
/// Link names must also be unique: `link_a_b_c` could name both `(a, b_c)`
/// and `(a_b, c)`, so the second pair to claim a name is rejected.
#[derive(Debug, Clone, Default)]
struct LinkRegistry {
    links: Vec<Link>,
    by_pair: HashMap<(String, String), LinkId>,
    by_name: HashMap<String, LinkId>,
}

impl LinkRegistry {
    fn get_or_create(
        &mut self,
        a: &str,
        b: &str,
        latency: Latency,
    ) -> Result<LinkId, TopologyError> {
        let (first, second) = canonical_pair(a, b);
        let key = (first.to_string(), second.to_string());
        if let Some(&id) = self.by_pair.get(&key) {
            return Ok(id);
        }

        let name = link_name(first, second);
        if let Some(&taken) = self.by_name.get(&name) {
            let (x, y) = &self.links[taken.0].endpoints;
            return Err(TopologyError::config(format!(
                "link name '{}' for ({}, {}) is already used by ({}, {})",
                name, first, second, x, y
            )));
        }

        let id = LinkId(self.links.len());
        debug!("Creating link {} ({} <-> {}, {})", name, first, second, latency);
        self.links.push(Link {
            id,
            name: name.clone(),
            endpoints: key.clone(),
            latency,
        });
        self.by_pair.insert(key, id);
        self.by_name.insert(name, id);
        Ok(id)
    }

    fn get(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }
}

/// Builds a k-ary tree interconnect from hosts through leaf routers up to a
/// single root router attached to memory.
#[derive(Debug)]
pub struct TreeTopologyBuilder {
    options: TreeOptions,
    params: Option<TreeParams>,
    links: LinkRegistry,
    built: bool,
}

impl TreeTopologyBuilder {
    pub fn new(options: &TreeOptions) -> Self {
        Self {
            options: options.clone(),
            params: None,
            links: LinkRegistry::default(),
            built: false,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn is_configured(&self) -> bool {
        self.params.is_some()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Lock the shape, host count and host names.
    ///
    /// Fails if the tree cannot be perfectly balanced, if the host name list
    /// does not match `total_hosts`, if a host name is empty, repeated, or
    /// collides with a router or memory name, or if the memory name is itself
    /// a router name of this tree. Parameters cannot be changed once accepted.
    pub fn configure(
        &mut self,
        shape: Shape,
        total_hosts: usize,
        host_names: Vec<String>,
    ) -> Result<(), TopologyError> {
        if self.built {
            return Err(TopologyError::AlreadyBuilt);
        }
        if self.params.is_some() {
            return Err(TopologyError::AlreadyConfigured);
        }

        let layout = shape.layout(total_hosts)?;

        if parse_router_name(&self.options.memory_name)
            .is_some_and(|id| id < layout.total_routers())
        {
            return Err(TopologyError::config(format!(
                "memory name '{}' collides with a router name",
                self.options.memory_name
            )));
        }

        if host_names.len() != total_hosts {
            return Err(TopologyError::config(format!(
                "expected {} host names, got {}",
                total_hosts,
                host_names.len()
            )));
        }

        let mut hosts = HashSet::with_capacity(host_names.len());
        for name in &host_names {
            if name.trim().is_empty() {
                return Err(TopologyError::config("host names cannot be empty"));
            }
            if *name == self.options.memory_name {
                return Err(TopologyError::config(format!(
                    "host name '{}' collides with the memory endpoint",
                    name
                )));
            }
            if parse_router_name(name).is_some_and(|id| id < layout.total_routers()) {
                return Err(TopologyError::config(format!(
                    "host name '{}' collides with a router name",
                    name
                )));
            }
            if !hosts.insert(name.clone()) {
                return Err(TopologyError::config(format!("duplicate host name '{}'", name)));
            }
        }

        info!(
            "Configured tree '{}' with shape {} for {} hosts: {} routers per level {:?}",
            self.options.network_name,
            shape,
            total_hosts,
            layout.total_routers(),
            layout.counts()
        );

        self.params = Some(TreeParams {
            shape,
            layout,
            host_names,
            hosts,
        });
        Ok(())
    }

    /// Return the canonical link between two endpoints, creating it on first
    /// reference. Both names must be hosts, routers of the configured tree,
    /// or the memory endpoint.
    pub fn get_link(&mut self, a: &str, b: &str) -> Result<LinkId, TopologyError> {
        self.check_endpoint(a)?;
        self.check_endpoint(b)?;
        if a == b {
            return Err(TopologyError::config(format!(
                "cannot link endpoint '{}' to itself",
                a
            )));
        }
        let latency = self.latency_between(a, b);
        self.links.get_or_create(a, b, latency)
    }

    /// Look up a link previously returned by `get_link` or `build`
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    /// Materialize every router and link of the configured tree.
    ///
    /// Only one build is allowed. Routers and links are assembled in a
    /// scratch registry and only committed once the whole tree is wired.
    pub fn build(&mut self) -> Result<TopologyResult, TopologyError> {
        if self.built {
            return Err(TopologyError::AlreadyBuilt);
        }
        let params = self.params.as_ref().ok_or(TopologyError::NotConfigured)?;
        let shape = &params.shape;
        let layout = &params.layout;
        let root_id = layout.root_id();

        let mut links = self.links.clone();
        let mut routers = Vec::with_capacity(layout.total_routers());

        for id in 0..layout.total_routers() {
            let level = layout
                .level_of(id)
                .ok_or(TopologyError::UnknownRouter(id))?;
            let fanout = shape
                .fanout(level)
                .ok_or_else(|| TopologyError::config(format!("no fan-out for level {}", level)))?;
            let local = id - layout.offset(level);

            let downlinks = if level == 0 {
                Downlinks::Hosts((local * fanout..(local + 1) * fanout).collect())
            } else {
                let first_child = layout.offset(level - 1) + local * fanout;
                Downlinks::Routers((first_child..first_child + fanout).collect())
            };

            let uplink = if id == root_id {
                Uplink::Memory
            } else {
                let parent_fanout = shape.fanouts()[level + 1];
                Uplink::Router(layout.offset(level + 1) + local / parent_fanout)
            };

            let name = router_name(id);
            let mut ports = Vec::with_capacity(fanout + 1);
            match &downlinks {
                Downlinks::Hosts(hosts) => {
                    for &host in hosts {
                        let latency = self.host_latency();
                        ports.push(links.get_or_create(&params.host_names[host], &name, latency)?);
                    }
                }
                Downlinks::Routers(children) => {
                    for &child in children {
                        let latency = self.options.link_latency;
                        ports.push(links.get_or_create(&router_name(child), &name, latency)?);
                    }
                }
            }
            let uplink_name = match uplink {
                Uplink::Router(parent) => router_name(parent),
                Uplink::Memory => self.options.memory_name.clone(),
            };
            ports.push(links.get_or_create(&name, &uplink_name, self.options.link_latency)?);

            debug!(
                "Router {} at level {}: {} downward ports, uplink to {}",
                name, level, fanout, uplink_name
            );

            routers.push(Router {
                id,
                name,
                level,
                num_ports: fanout + 1,
                downlinks,
                uplink,
                ports,
            });
        }

        let hosts_per_leaf = shape.hosts_per_leaf();
        let host_links: Vec<LinkId> = (0..params.host_names.len())
            .map(|host| routers[host / hosts_per_leaf].ports[host % hosts_per_leaf])
            .collect();
        let mem_link = routers[root_id].ports[routers[root_id].uplink_port()];

        let mut used: Vec<LinkId> = routers
            .iter()
            .flat_map(|router| router.ports.iter().copied())
            .collect();
        used.sort();
        used.dedup();
        let topology_links: Vec<Link> = used
            .into_iter()
            .filter_map(|id| links.get(id).cloned())
            .collect();

        info!(
            "Built tree '{}': {} routers, {} links, root {} attached to {}",
            self.options.network_name,
            routers.len(),
            topology_links.len(),
            router_name(root_id),
            self.options.memory_name
        );

        let result = TopologyResult {
            network_name: self.options.network_name.clone(),
            shape: shape.clone(),
            layout: layout.clone(),
            host_names: params.host_names.clone(),
            memory_name: self.options.memory_name.clone(),
            routers,
            links: topology_links,
            host_links,
            mem_link,
        };

        self.links = links;
        self.built = true;
        Ok(result)
    }

    fn check_endpoint(&self, name: &str) -> Result<(), TopologyError> {
        let known = name == self.options.memory_name
            || self.params.as_ref().is_some_and(|params| {
                params.hosts.contains(name)
                    || parse_router_name(name)
                        .is_some_and(|id| id < params.layout.total_routers())
            });
        if known {
            Ok(())
        } else {
            Err(TopologyError::UnknownEndpoint {
                name: name.to_string(),
            })
        }
    }

    fn is_host(&self, name: &str) -> bool {
        self.params
            .as_ref()
            .is_some_and(|params| params.hosts.contains(name))
    }

    fn host_latency(&self) -> Latency {
        self.options
            .host_link_latency
            .unwrap_or(self.options.link_latency)
    }

    fn latency_between(&self, a: &str, b: &str) -> Latency {
        if self.is_host(a) || self.is_host(b) {
            self.host_latency()
        } else {
            self.options.link_latency
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::types::PortState;

    fn hosts(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("cache{}", i)).collect()
    }

    fn configured(shape: &str, total: usize) -> TreeTopologyBuilder {
        let mut builder = TreeTopologyBuilder::new(&TreeOptions::default());
        builder
            .configure(shape.parse().unwrap(), total, hosts(total))
            .unwrap();
        builder
    }

    #[test]
    fn test_two_level_tree() {
        let mut builder = configured("2x4", 8);
        let topo = builder.build().unwrap();

        assert_eq!(topo.num_routers(), 5);
        assert_eq!(topo.num_nodes(), 9);
        assert_eq!(topo.host_links().len(), 8);
        // 8 host links, 4 leaf-root links, 1 memory link
        assert_eq!(topo.links().len(), 13);

        for leaf in topo.routers_at_level(0) {
            assert_eq!(leaf.num_ports, 3);
            assert_eq!(leaf.uplink, Uplink::Router(4));
        }
        let root = topo.root();
        assert_eq!(root.id, 4);
        assert_eq!(root.level, 1);
        assert_eq!(root.num_ports, 5);
        assert_eq!(root.downlinks, Downlinks::Routers(vec![0, 1, 2, 3]));
        assert_eq!(root.port_state(4), Some(PortState::RouterToNode));

        for host in 0..8 {
            let leaf = topo.router(host / 2).unwrap();
            assert_eq!(topo.host_links()[host], leaf.ports[host % 2]);
            let link = topo.link(topo.host_links()[host]).unwrap();
            assert!(link.connects(&format!("cache{}", host)));
            assert!(link.connects(&leaf.name));
        }

        assert_eq!(topo.mem_link_name(), Some("link_mem_rtr_4"));
    }

    #[test]
    fn test_single_level_tree() {
        let mut builder = configured("4", 4);
        let topo = builder.build().unwrap();

        assert_eq!(topo.num_routers(), 1);
        let root = topo.root();
        assert_eq!(root.id, 0);
        assert!(root.is_leaf() && root.is_root());
        assert_eq!(root.num_ports, 5);
        assert_eq!(root.downlinks, Downlinks::Hosts(vec![0, 1, 2, 3]));
        assert_eq!(root.ports[4], topo.mem_link());
        assert_eq!(root.port_state(0), Some(PortState::RouterToNode));
        assert_eq!(root.port_state(4), Some(PortState::RouterToNode));
    }

    #[test]
    fn test_three_level_parents() {
        let mut builder = configured("2x2x2", 8);
        let topo = builder.build().unwrap();

        assert_eq!(topo.num_routers(), 7);
        assert_eq!(topo.router(0).unwrap().uplink, Uplink::Router(4));
        assert_eq!(topo.router(1).unwrap().uplink, Uplink::Router(4));
        assert_eq!(topo.router(2).unwrap().uplink, Uplink::Router(5));
        assert_eq!(topo.router(4).unwrap().uplink, Uplink::Router(6));
        assert_eq!(topo.router(5).unwrap().uplink, Uplink::Router(6));
        assert_eq!(topo.router(6).unwrap().uplink, Uplink::Memory);
        assert_eq!(
            topo.router(5).unwrap().downlinks,
            Downlinks::Routers(vec![2, 3])
        );
        // Parent and child share the link on their facing ports
        assert_eq!(topo.router(3).unwrap().ports[2], topo.router(5).unwrap().ports[1]);
    }

    #[test]
    fn test_get_link_is_canonical() {
        let mut builder = configured("2x4", 8);
        let a = builder.get_link("cache0", "rtr_0").unwrap();
        let b = builder.get_link("rtr_0", "cache0").unwrap();
        assert_eq!(a, b);

        let topo = builder.build().unwrap();
        assert_eq!(topo.host_links()[0], a);
        assert_eq!(builder.get_link("rtr_4", "mem").unwrap(), topo.mem_link());
        assert_eq!(builder.link(a).unwrap().name, "link_cache0_rtr_0");
    }

    #[test]
    fn test_get_link_unknown_endpoint() {
        let mut builder = configured("2x4", 8);
        assert_eq!(
            builder.get_link("cache0", "rtr_5"),
            Err(TopologyError::UnknownEndpoint { name: "rtr_5".to_string() })
        );
        assert!(matches!(
            builder.get_link("nobody", "mem"),
            Err(TopologyError::UnknownEndpoint { .. })
        ));
        assert!(matches!(
            builder.get_link("mem", "mem"),
            Err(TopologyError::Configuration(_))
        ));

        let mut fresh = TreeTopologyBuilder::new(&TreeOptions::default());
        assert!(matches!(
            fresh.get_link("rtr_0", "mem"),
            Err(TopologyError::UnknownEndpoint { .. })
        ));
    }

    #[test]
    fn test_lifecycle_guards() {
        let mut builder = TreeTopologyBuilder::new(&TreeOptions::default());
        assert!(matches!(builder.build(), Err(TopologyError::NotConfigured)));

        builder.configure("2x4".parse().unwrap(), 8, hosts(8)).unwrap();
        assert_eq!(
            builder.configure("4".parse().unwrap(), 4, hosts(4)),
            Err(TopologyError::AlreadyConfigured)
        );

        builder.build().unwrap();
        assert!(matches!(builder.build(), Err(TopologyError::AlreadyBuilt)));
        assert_eq!(
            builder.configure("4".parse().unwrap(), 4, hosts(4)),
            Err(TopologyError::AlreadyBuilt)
        );
    }

    #[test]
    fn test_configure_rejects_bad_hosts() {
        let shape: Shape = "2x4".parse().unwrap();
        let mut builder = TreeTopologyBuilder::new(&TreeOptions::default());

        assert!(builder.configure(shape.clone(), 8, hosts(7)).is_err());

        let mut dup = hosts(8);
        dup[3] = "cache0".to_string();
        assert!(builder.configure(shape.clone(), 8, dup).is_err());

        let mut router_like = hosts(8);
        router_like[0] = "rtr_2".to_string();
        assert!(builder.configure(shape.clone(), 8, router_like).is_err());

        let mut mem_like = hosts(8);
        mem_like[0] = "mem".to_string();
        assert!(builder.configure(shape.clone(), 8, mem_like).is_err());

        // Failed attempts do not lock the builder
        assert!(!builder.is_configured());
        builder.configure(shape, 8, hosts(8)).unwrap();
    }

    #[test]
    fn test_unbalanced_configuration_creates_nothing() {
        let mut builder = TreeTopologyBuilder::new(&TreeOptions::default());
        let err = builder
            .configure("2x4".parse().unwrap(), 7, hosts(7))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(_)));
        assert!(matches!(builder.build(), Err(TopologyError::NotConfigured)));
        assert!(builder.link(LinkId(0)).is_none());
    }

    #[test]
    fn test_host_link_latency() {
        let options = TreeOptions {
            link_latency: Latency::from_nanos(1),
            host_link_latency: Some(Latency::from_nanos(5)),
            ..TreeOptions::default()
        };
        let mut builder = TreeTopologyBuilder::new(&options);
        builder.configure("2x4".parse().unwrap(), 8, hosts(8)).unwrap();
        let topo = builder.build().unwrap();

        for &id in topo.host_links() {
            assert_eq!(topo.link(id).unwrap().latency, Latency::from_nanos(5));
        }
        assert_eq!(
            topo.link(topo.mem_link()).unwrap().latency,
            Latency::from_nanos(1)
        );
        let inter = topo.root().ports[0];
        assert_eq!(topo.link(inter).unwrap().latency, Latency::from_nanos(1));
    }

    fn with_memory(memory_name: &str) -> TreeTopologyBuilder {
        TreeTopologyBuilder::new(&TreeOptions {
            memory_name: memory_name.to_string(),
            ..TreeOptions::default()
        })
    }

    #[test]
    fn test_memory_name_cannot_be_a_router() {
        // rtr_3 is a leaf of 2x4; the root's memory port would reuse its uplink
        let mut builder = with_memory("rtr_3");
        let err = builder
            .configure("2x4".parse().unwrap(), 8, hosts(8))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(_)));
        assert!(!builder.is_configured());

        // rtr_0 is the root of a single-level tree; memory would link to itself
        let mut builder = with_memory("rtr_0");
        assert!(matches!(
            builder.configure("4".parse().unwrap(), 4, hosts(4)),
            Err(TopologyError::Configuration(_))
        ));
        assert!(matches!(builder.build(), Err(TopologyError::NotConfigured)));

        // Router names outside the tree are ordinary endpoint names
        let mut builder = with_memory("rtr_5");
        builder.configure("2x4".parse().unwrap(), 8, hosts(8)).unwrap();
        let topo = builder.build().unwrap();
        assert_eq!(topo.links().len(), 13);
        assert_eq!(topo.mem_link_name(), Some("link_rtr_4_rtr_5"));
        assert_ne!(topo.mem_link(), topo.router(3).unwrap().ports[2]);
    }

    #[test]
    fn test_zero_padded_router_name_is_not_a_router() {
        let mut builder = configured("2x4", 8);
        let real = builder.get_link("rtr_1", "mem").unwrap();
        assert_eq!(
            builder.get_link("rtr_01", "mem"),
            Err(TopologyError::UnknownEndpoint { name: "rtr_01".to_string() })
        );
        assert_eq!(builder.get_link("mem", "rtr_1").unwrap(), real);

        // A host may carry such a name since no router does
        let mut names = hosts(8);
        names[0] = "rtr_01".to_string();
        let mut builder = TreeTopologyBuilder::new(&TreeOptions::default());
        builder.configure("2x4".parse().unwrap(), 8, names).unwrap();
        let topo = builder.build().unwrap();
        assert_eq!(topo.host_link_names()[0], "link_rtr_0_rtr_01");
    }

    #[test]
    fn test_link_names_are_unique() {
        let names = ["a", "b_c", "a_b", "c"].map(String::from).to_vec();
        let mut builder = TreeTopologyBuilder::new(&TreeOptions::default());
        builder.configure("4".parse().unwrap(), 4, names).unwrap();

        let first = builder.get_link("a", "b_c").unwrap();
        assert_eq!(builder.link(first).unwrap().name, "link_a_b_c");
        assert!(matches!(
            builder.get_link("c", "a_b"),
            Err(TopologyError::Configuration(_))
        ));
        // The rejected pair left no link behind
        assert!(builder.link(LinkId(first.index() + 1)).is_none());
        assert_eq!(builder.get_link("b_c", "a").unwrap(), first);

        // Ordinary tree links do not clash with it
        let topo = builder.build().unwrap();
        assert_eq!(topo.num_routers(), 1);
        assert_eq!(topo.links().len(), 5);
    }
}
