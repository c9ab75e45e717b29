use serde::{Deserialize, Serialize};

/// Configuration for Rhai script execution including security limits and other settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RhaiConfig {
    /// Maximum number of operations a script can perform (0 = unlimited)
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    /// Maximum function call nesting depth
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    /// Maximum size of strings in characters
    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,

    /// Maximum number of array elements
    #[serde(default = "default_max_array_size")]
    pub max_array_size: usize,

    /// Maximum number of properties in an object map
    #[serde(default = "default_max_map_size")]
    pub max_map_size: usize,

    /// Maximum nesting depth of expressions
    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,

    /// How many operations pass between two deadline checks
    #[serde(default = "default_progress_check_interval")]
    pub progress_check_interval: u64,
}

impl Default for RhaiConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_call_levels: default_max_call_levels(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_array_size(),
            max_map_size: default_max_map_size(),
            max_expr_depth: default_max_expr_depth(),
            progress_check_interval: default_progress_check_interval(),
        }
    }
}

/// Default security configuration values
fn default_max_operations() -> u64 {
    1_000_000
}

fn default_max_call_levels() -> usize {
    32
}

fn default_max_string_size() -> usize {
    1_048_576
}

fn default_max_array_size() -> usize {
    10_000
}

fn default_max_map_size() -> usize {
    10_000
}

fn default_max_expr_depth() -> usize {
    64
}

fn default_progress_check_interval() -> u64 {
    1_024
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Config;

    #[test]
    fn test_rhai_config_default() {
        let config = RhaiConfig::default();
        assert_eq!(config.max_operations, 1_000_000);
        assert_eq!(config.max_call_levels, 32);
        assert_eq!(config.max_string_size, 1_048_576);
        assert_eq!(config.max_array_size, 10_000);
        assert_eq!(config.max_map_size, 10_000);
        assert_eq!(config.max_expr_depth, 64);
    }

    #[test]
    fn test_rhai_config_custom_values_yaml() {
        let yaml = "
            max_operations: 50000
            max_call_levels: 5
            max_string_size: 4096
            max_array_size: 500
            max_map_size: 100
        ";

        let builder =
            Config::builder().add_source(config::File::from_str(yaml, config::FileFormat::Yaml));
        let config: RhaiConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.max_operations, 50_000);
        assert_eq!(config.max_call_levels, 5);
        assert_eq!(config.max_string_size, 4_096);
        assert_eq!(config.max_array_size, 500);
        assert_eq!(config.max_map_size, 100);
    }

    #[test]
    fn test_rhai_config_partial_yaml_uses_defaults() {
        let yaml = "
            max_operations: 75000
        ";

        let builder =
            Config::builder().add_source(config::File::from_str(yaml, config::FileFormat::Yaml));
        let config: RhaiConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.max_operations, 75_000);
        assert_eq!(config.max_call_levels, default_max_call_levels());
        assert_eq!(config.max_string_size, default_max_string_size());
        assert_eq!(config.progress_check_interval, default_progress_check_interval());
    }
}
