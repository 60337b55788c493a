use super::{types::Config, ConfigError};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.api.api_key.trim().is_empty() {
        return Err(invalid("api.api_key is not set (RUNNINGHUB_API_KEY)"));
    }

    let base_url = config.api.base_url.as_str();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid("api.base_url must start with http:// or https://"));
    }

    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.poll.max_attempts == 0 {
        return Err(invalid("poll.max_attempts must be at least 1"));
    }

    if config.batch.max_concurrent == 0 {
        return Err(invalid("batch.max_concurrent must be at least 1"));
    }

    let video = &config.workflows.video;
    if video.landscape.is_empty() || video.portrait.is_empty() {
        return Err(invalid("workflows.video needs both landscape and portrait ids"));
    }
    if video.node_id.is_empty() {
        return Err(invalid("workflows.video.node_id cannot be empty"));
    }

    if let Some(image) = &config.workflows.image {
        if image.workflow_id.is_empty() || image.node_id.is_empty() {
            return Err(invalid("workflows.image needs workflow_id and node_id"));
        }
    }

    if let Some(pose) = &config.workflows.pose {
        if pose.workflow_id.is_empty() {
            return Err(invalid("workflows.pose.workflow_id cannot be empty"));
        }
    }

    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}
