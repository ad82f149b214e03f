use crate::app_config::{AppConfig, Environment, GeoPoint};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a `HashMap` lookup.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_u32(var, default)?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("MAPSCOUT_ENV", "development"))?;
    let bind_addr = parse_addr("MAPSCOUT_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("MAPSCOUT_LOG_LEVEL", "info");

    let chrome_path = optional("MAPSCOUT_CHROME_PATH").map(PathBuf::from);
    let headless = parse_bool("MAPSCOUT_HEADLESS", &or_default("MAPSCOUT_HEADLESS", "true"))?;
    let maps_url = or_default("MAPSCOUT_MAPS_URL", "https://www.google.com/maps");
    let warmup_url = optional("MAPSCOUT_WARMUP_URL");

    let query_template = or_default("MAPSCOUT_QUERY_TEMPLATE", "{category} en {locality}");
    if !query_template.contains("{category}") || !query_template.contains("{locality}") {
        return Err(invalid(
            "MAPSCOUT_QUERY_TEMPLATE",
            "template must contain both {category} and {locality}".to_string(),
        ));
    }

    let locale = or_default("MAPSCOUT_LOCALE", "es-AR");
    let timezone = or_default("MAPSCOUT_TIMEZONE", "America/Argentina/Buenos_Aires");
    let geolocation = match lookup("MAPSCOUT_GEOLOCATION") {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(parse_geo_point(&raw)?),
        Err(_) => Some(GeoPoint {
            latitude: -34.6037,
            longitude: -58.3816,
        }),
    };

    let navigation_timeout_secs = parse_u64("MAPSCOUT_NAVIGATION_TIMEOUT_SECS", "60")?;
    let listings_timeout_secs = parse_u64("MAPSCOUT_LISTINGS_TIMEOUT_SECS", "30")?;
    let detail_timeout_secs = parse_u64("MAPSCOUT_DETAIL_TIMEOUT_SECS", "10")?;

    let search_settle_ms = parse_u64("MAPSCOUT_SEARCH_SETTLE_MS", "1000")?;
    let scroll_settle_ms = parse_u64("MAPSCOUT_SCROLL_SETTLE_MS", "1000")?;
    let detail_settle_ms = parse_u64("MAPSCOUT_DETAIL_SETTLE_MS", "1000")?;

    let scroll_delta_px = parse_positive("MAPSCOUT_SCROLL_DELTA_PX", "5000")?;
    let scroll_steps = parse_positive("MAPSCOUT_SCROLL_STEPS", "1")?;
    let iteration_budget = parse_positive("MAPSCOUT_ITERATION_BUDGET", "20")?;
    let stability_threshold = parse_positive("MAPSCOUT_STABILITY_THRESHOLD", "3")?;
    let overfetch_factor = parse_positive("MAPSCOUT_OVERFETCH_FACTOR", "2")?;
    let max_limit = parse_positive("MAPSCOUT_MAX_LIMIT", "120")?;

    let locators_path = optional("MAPSCOUT_LOCATORS_PATH").map(PathBuf::from);

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        chrome_path,
        headless,
        maps_url,
        warmup_url,
        query_template,
        locale,
        timezone,
        geolocation,
        navigation_timeout_secs,
        listings_timeout_secs,
        detail_timeout_secs,
        search_settle_ms,
        scroll_settle_ms,
        detail_settle_ms,
        scroll_delta_px,
        scroll_steps,
        iteration_budget,
        stability_threshold,
        overfetch_factor,
        max_limit,
        locators_path,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MAPSCOUT_ENV".to_string(),
            reason: format!(
                "unrecognized environment \"{other}\"; expected development, test, or production"
            ),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

/// Parses `"lat,lon"` into a [`GeoPoint`], rejecting out-of-range coordinates.
fn parse_geo_point(raw: &str) -> Result<GeoPoint, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "MAPSCOUT_GEOLOCATION".to_string(),
        reason,
    };

    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| invalid(format!("expected \"lat,lon\", got \"{raw}\"")))?;
    let latitude = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(format!("latitude: {e}")))?;
    let longitude = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(format!("longitude: {e}")))?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid(format!("coordinates out of range: {raw}")));
    }

    Ok(GeoPoint {
        latitude,
        longitude,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
