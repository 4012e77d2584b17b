//! Configuration validation
//!
//! Validates critical configuration values at startup to catch
//! misconfigurations early.

use anyhow::Result;
use carbonledger_core::Config;

/// Validate critical configuration values. Fails fast on settings that would
/// cause security problems or runtime errors.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let is_production = config.is_production();

    if is_production && config.cors_origins.contains(&"*".to_string()) {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production - this is a security risk. \
            Please set specific allowed origins via CORS_ORIGINS environment variable."
        ));
    }

    if is_production && config.anthropic_api_key.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set; AI analysis endpoints will be disabled");
    }

    if config.site_url.ends_with('/') {
        tracing::debug!("SITE_URL has a trailing slash; it will be trimmed in redirects");
    }

    Ok(())
}
