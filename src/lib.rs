//! # Treenet - Tree interconnect builder for multiprocessor memory simulations
//!
//! This library builds the k-ary tree interconnect that connects the private
//! caches of a simulated multiprocessor to a shared memory port, and produces
//! the netlist a discrete-event simulation framework instantiates.
//!
//! ## Overview
//!
//! A tree is described by a shape such as `2x4`: two hosts under each leaf
//! router, four leaf routers under the root. The root router's last port is
//! wired to the memory endpoint (typically a directory controller).
//!
//! ```text
//!  host0 host1   host2 host3   host4 host5   host6 host7
//!     \   /         \   /         \   /         \   /
//!     rtr_0         rtr_1         rtr_2         rtr_3
//!          \____________\________/_____________/
//!                          rtr_4
//!                            |
//!                           mem
//! ```
//!
//! ## Architecture
//!
//! - `topology`: shape parsing, the tree builder, and routing tables
//! - `config`: YAML configuration structures and validation
//! - `config_loader`: configuration file loading and CLI overrides
//! - `netlist`: serializable description of routers, links and endpoints
//! - `orchestrator`: ties configuration, builder and netlist output together
//! - `utils`: latency parsing
//!
//! ## Example Usage
//!
//! ```rust
//! use treenet::topology::{TreeOptions, TreeTopologyBuilder};
//!
//! let mut builder = TreeTopologyBuilder::new(&TreeOptions::default());
//! let hosts = (0..8).map(|i| format!("l1cache{}", i)).collect();
//! builder.configure("2x4".parse()?, 8, hosts)?;
//!
//! let topology = builder.build()?;
//! assert_eq!(topology.num_routers(), 5);
//! assert_eq!(topology.host_links().len(), 8);
//! assert_eq!(topology.mem_link_name(), Some("link_mem_rtr_4"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Topology and configuration errors are typed (`TopologyError`,
//! `ValidationError`); the orchestration layer and the binary use
//! `color_eyre` for reporting with context.

pub mod config;
pub mod config_loader;
pub mod netlist;
pub mod orchestrator;
pub mod topology;
pub mod utils;
