//! Configuration orchestrator.
//!
//! This module coordinates the overall generation process: configure and
//! build the tree from a validated configuration, derive routing tables, and
//! write the netlist the simulation framework consumes.

use crate::config::{Config, OutputFormat};
use crate::netlist::types::{ROUTER_COMPONENT, TOPOLOGY_COMPONENT};
use crate::netlist::{
    Netlist, NetlistEndpoint, NetlistLink, NetlistNetwork, NetlistPort, NetlistRouter,
    RouterComponent, TopologyComponent,
};
use crate::topology::{port_name, RoutingTable, TopologyResult, TreeTopologyBuilder};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the routing table written next to the netlist
pub const ROUTES_FILE: &str = "routes.json";

/// A built tree with everything derived from it
#[derive(Debug)]
pub struct GeneratedTopology {
    pub topology: TopologyResult,
    pub routes: RoutingTable,
    pub netlist: Netlist,
}

/// Configure and build the tree described by `config`
pub fn build_topology(config: &Config) -> Result<TopologyResult> {
    let shape = config.network.shape()?;
    let mut builder = TreeTopologyBuilder::new(&config.network.tree_options());
    builder.configure(shape, config.network.total_hosts, config.network.host_names())?;
    let topology = builder.build()?;
    Ok(topology)
}

/// Build the tree, its routing tables and its netlist
pub fn generate_netlist(config: &Config) -> Result<GeneratedTopology> {
    let topology = build_topology(config)?;
    let routes = RoutingTable::new(&topology);
    let netlist = assemble_netlist(config, &topology, &routes)?;
    Ok(GeneratedTopology {
        topology,
        routes,
        netlist,
    })
}

/// Turn a built tree into its serializable netlist
pub fn assemble_netlist(
    config: &Config,
    topology: &TopologyResult,
    routes: &RoutingTable,
) -> Result<Netlist> {
    let shape = topology.shape().to_string();

    let mut routers = Vec::with_capacity(topology.num_routers());
    for router in topology.routers() {
        let mut ports = Vec::with_capacity(router.num_ports);
        for (port, &link_id) in router.ports.iter().enumerate() {
            let link = topology
                .link(link_id)
                .ok_or_else(|| eyre!("Router {} port {} has no link", router.name, port))?;
            ports.push(NetlistPort {
                port: port_name(port),
                link: link.name.clone(),
                latency: link.latency,
                state: routes.port_state(router.id, port)?,
            });
        }

        routers.push(NetlistRouter {
            name: router.name.clone(),
            component: RouterComponent {
                component_type: ROUTER_COMPONENT.to_string(),
                id: router.id,
                num_ports: router.num_ports,
                params: config.router.clone(),
            },
            topology: TopologyComponent {
                component_type: TOPOLOGY_COMPONENT.to_string(),
                shape: shape.clone(),
                total_hosts: topology.num_hosts(),
            },
            level: router.level,
            ports,
        });
    }

    let links = topology
        .links()
        .iter()
        .map(|link| NetlistLink {
            name: link.name.clone(),
            endpoints: [link.endpoints.0.clone(), link.endpoints.1.clone()],
            latency: link.latency,
        })
        .collect();

    let mut hosts = Vec::with_capacity(topology.num_hosts());
    for (host, name) in topology.host_names().iter().enumerate() {
        hosts.push(endpoint_attachment(topology, routes, name, host)?);
    }
    let memory = endpoint_attachment(
        topology,
        routes,
        topology.memory_name(),
        routes.memory_endpoint(),
    )?;

    debug!(
        "Assembled netlist with {} routers and {} links",
        routers.len(),
        topology.links().len()
    );

    Ok(Netlist {
        network: NetlistNetwork {
            name: topology.network_name().to_string(),
            shape,
            total_hosts: topology.num_hosts(),
            num_routers: topology.num_routers(),
            num_nodes: topology.num_nodes(),
            routers_per_level: topology.layout().counts().to_vec(),
        },
        routers,
        links,
        hosts,
        memory,
    })
}

fn endpoint_attachment(
    topology: &TopologyResult,
    routes: &RoutingTable,
    name: &str,
    endpoint_id: usize,
) -> Result<NetlistEndpoint> {
    let router_id = routes.dest_router(endpoint_id)?;
    let port = routes.dest_local_port(endpoint_id)?;
    let router = topology
        .router(router_id)
        .ok_or_else(|| eyre!("Endpoint {} attaches to missing router {}", name, router_id))?;
    let link = router
        .link_on_port(port)
        .and_then(|id| topology.link(id))
        .ok_or_else(|| eyre!("Endpoint {} has no link on {} port {}", name, router.name, port))?;

    Ok(NetlistEndpoint {
        name: name.to_string(),
        endpoint_id,
        link: link.name.clone(),
        router: router.name.clone(),
        port: port_name(port),
    })
}

/// Write the netlist (and optionally the routing table) into `output_dir`.
///
/// Returns the paths written.
pub fn write_netlist(
    generated: &GeneratedTopology,
    output_dir: &Path,
    format: OutputFormat,
    include_routes: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", output_dir.display()))?;

    let mut written = Vec::new();

    let netlist_path = output_dir.join(format!("topology.{}", format.extension()));
    let content = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&generated.netlist)?,
        OutputFormat::Json => serde_json::to_string_pretty(&generated.netlist)?,
    };
    fs::write(&netlist_path, content)
        .wrap_err_with(|| format!("Failed to write netlist '{}'", netlist_path.display()))?;
    info!("Wrote netlist: {:?}", netlist_path);
    written.push(netlist_path);

    if include_routes {
        let routes_path = output_dir.join(ROUTES_FILE);
        let routes_json = serde_json::to_string_pretty(&generated.routes)?;
        fs::write(&routes_path, routes_json)
            .wrap_err_with(|| format!("Failed to write routes '{}'", routes_path.display()))?;
        info!("Wrote routing table: {:?}", routes_path);
        written.push(routes_path);
    }

    Ok(written)
}
