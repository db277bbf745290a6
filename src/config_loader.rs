use crate::config::{Config, OutputFormat};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;

    info!(
        "Loaded tree '{}' with shape {} for {} hosts",
        config.network.name, config.network.shape, config.network.total_hosts
    );

    Ok(config)
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub shape: Option<String>,
    pub total_hosts: Option<usize>,
    pub output_format: Option<OutputFormat>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) -> Result<()> {
    if let Some(shape) = &overrides.shape {
        info!("Overriding shape: {} -> {}", config.network.shape, shape);
        config.network.shape = shape.clone();
    }

    if let Some(total_hosts) = overrides.total_hosts {
        info!(
            "Overriding total_hosts: {} -> {}",
            config.network.total_hosts, total_hosts
        );
        config.network.total_hosts = total_hosts;
        // Explicit names no longer line up with the new host count
        if config
            .network
            .host_names
            .as_ref()
            .is_some_and(|names| names.len() != total_hosts)
        {
            info!("Discarding configured host_names; generating defaults");
            config.network.host_names = None;
        }
    }

    if let Some(format) = overrides.output_format {
        config.general.output_format = Some(format);
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
general:
  log_level: info
network:
  shape: "2x4"
  total_hosts: 8
  host_names: [l1cache0, l1cache1, l1cache2, l1cache3, l1cache4, l1cache5, l1cache6, l1cache7]
  link_latency: "1ns"
"#;

    #[test]
    fn test_load_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", YAML).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.network.total_hosts, 8);
        assert_eq!(config.network.host_names()[0], "l1cache0");
    }

    #[test]
    fn test_load_invalid_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "network:\n  shape: \"2x4\"\n  total_hosts: 7\n").unwrap();
        assert!(load_config(temp_file.path()).is_err());

        assert!(load_config(Path::new("/nonexistent/tree.yaml")).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config: Config = serde_yaml::from_str(YAML).unwrap();
        let overrides = ConfigOverrides {
            shape: Some("4x4".to_string()),
            total_hosts: Some(16),
            output_format: Some(OutputFormat::Json),
        };

        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.network.shape, "4x4");
        assert_eq!(config.network.total_hosts, 16);
        assert!(config.network.host_names.is_none());
        assert_eq!(config.output_format(), OutputFormat::Json);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config: Config = serde_yaml::from_str(YAML).unwrap();
        let overrides = ConfigOverrides {
            shape: Some("3".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(apply_overrides(&mut config, &overrides).is_err());
    }
}
