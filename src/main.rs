use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::{info, LevelFilter};
use std::env;
use std::path::PathBuf;

use treenet::config::OutputFormat;
use treenet::config_loader::{self, ConfigOverrides};
use treenet::orchestrator;

/// Tree interconnect builder for multiprocessor memory simulations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the tree configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for the generated netlist
    #[arg(short, long, default_value = "tree_output")]
    output: PathBuf,

    /// Override the tree shape, e.g. 2x4
    #[arg(long)]
    shape: Option<String>,

    /// Override the total host count
    #[arg(long)]
    total_hosts: Option<usize>,

    /// Write JSON instead of YAML
    #[arg(long)]
    json: bool,

    /// Also write the per-router routing table
    #[arg(long)]
    routes: bool,

    /// Build and summarize the tree without writing files
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            shape: self.shape.clone(),
            total_hosts: self.total_hosts,
            output_format: self.json.then_some(OutputFormat::Json),
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Start logging before the configuration is read. Without RUST_LOG the
    // logger passes everything and the facade's max level does the filtering,
    // first at info, then at the configured level.
    let rust_log = env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).init();
    if !rust_log {
        log::set_max_level(LevelFilter::Info);
    }

    let mut config = config_loader::load_config(&args.config)?;
    config_loader::apply_overrides(&mut config, &args.overrides())?;

    if !rust_log {
        log::set_max_level(config.log_level_filter());
    }

    info!("Configuration file: {:?}", args.config);
    info!(
        "Tree '{}': shape {}, {} hosts, memory endpoint '{}'",
        config.network.name, config.network.shape, config.network.total_hosts, config.network.memory_name
    );

    let generated = orchestrator::generate_netlist(&config)?;
    let topology = &generated.topology;

    for (level, count) in topology.layout().counts().iter().enumerate() {
        info!("Level {}: {} routers", level, count);
    }
    info!(
        "Built {} routers and {} links; memory link {}",
        topology.num_routers(),
        topology.links().len(),
        topology.mem_link_name().unwrap_or("<none>")
    );

    if args.dry_run {
        info!("Dry run: no files written");
        return Ok(());
    }

    let written = orchestrator::write_netlist(
        &generated,
        &args.output,
        config.output_format(),
        args.routes,
    )?;
    for path in &written {
        info!("Generated: {:?}", path);
    }

    info!("Topology generation completed successfully");
    Ok(())
}
