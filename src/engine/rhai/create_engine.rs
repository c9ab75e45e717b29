use rhai::Engine;

use crate::config::RhaiConfig;

/// Language features no sandbox may use.
const MODULE_SYMBOLS: &[&str] = &["import", "export"];

/// Creates a Rhai engine with the configured resource limits and module
/// loading disabled. Capabilities are added by the sandbox builder.
pub fn create_engine(rhai_config: &RhaiConfig) -> Engine {
    let mut engine = Engine::new();

    // Apply security limits
    engine.set_max_operations(rhai_config.max_operations);
    engine.set_max_call_levels(rhai_config.max_call_levels);
    engine.set_max_string_size(rhai_config.max_string_size);
    engine.set_max_array_size(rhai_config.max_array_size);
    engine.set_max_map_size(rhai_config.max_map_size);
    engine.set_max_expr_depths(rhai_config.max_expr_depth, rhai_config.max_expr_depth);

    for &symbol in MODULE_SYMBOLS {
        engine.disable_symbol(symbol);
    }

    engine
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_applied() {
        let config = RhaiConfig {
            max_operations: 500,
            max_call_levels: 4,
            max_string_size: 64,
            max_array_size: 8,
            max_map_size: 8,
            ..Default::default()
        };
        let engine = create_engine(&config);
        assert_eq!(engine.max_operations(), 500);
        assert_eq!(engine.max_call_levels(), 4);
        assert_eq!(engine.max_string_size(), 64);
        assert_eq!(engine.max_array_size(), 8);
        assert_eq!(engine.max_map_size(), 8);
    }

    #[test]
    fn test_operation_limit_stops_infinite_loop() {
        let config = RhaiConfig { max_operations: 1_000, ..Default::default() };
        let engine = create_engine(&config);
        assert!(engine.run("loop { }").is_err());
    }

    #[test]
    fn test_import_is_disabled() {
        let engine = create_engine(&RhaiConfig::default());
        assert!(engine.compile(r#"import "fs" as fs;"#).is_err());
    }

    #[test]
    fn test_array_limit() {
        let config = RhaiConfig { max_array_size: 3, ..Default::default() };
        let engine = create_engine(&config);
        assert!(engine.run("let a = [1, 2, 3]; a.push(4);").is_err());
    }
}
