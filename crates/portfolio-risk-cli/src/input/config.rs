use portfolio_risk_core::EngineConfig;

use super::file;

/// Load the engine configuration and apply command-line overrides.
///
/// Without a file every setting takes its default. Files ending in `.yaml`
/// or `.yml` are parsed as YAML, anything else as JSON.
pub fn load_config(
    path: Option<&str>,
    risk_free_rate: Option<f64>,
    trading_days: Option<f64>,
) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(p) => {
            let (resolved, contents) = file::read_to_string(p)?;
            let is_yaml = resolved
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
            if is_yaml {
                serde_yaml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse '{}': {}", resolved.display(), e))?
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| format!("Failed to parse '{}': {}", resolved.display(), e))?
            }
        }
        None => EngineConfig::default(),
    };

    if let Some(rf) = risk_free_rate {
        config.risk_free_rate = rf;
    }
    if let Some(days) = trading_days {
        config.trading_days_per_year = days;
    }
    config.validate()?;
    tracing::debug!(?config, "engine configuration loaded");
    Ok(config)
}
