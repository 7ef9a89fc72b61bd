//! Configuration validation rules.

use super::schema::{Config, MemoryBackend};

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.memory.max_history == 0 {
        errors.push("memory.max_history must be > 0".to_string());
    }
    if config.memory.recent_window == 0 {
        errors.push("memory.recent_window must be > 0".to_string());
    }
    if config.memory.backend == MemoryBackend::Durable
        && config.memory.storage_dir.trim().is_empty()
    {
        errors.push(
            "memory.storage_dir is required when the durable backend is used".to_string(),
        );
    }

    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.max_tokens == 0 {
        errors.push("provider.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.provider.timeout_secs == 0 {
        errors.push("provider.timeout_secs must be > 0".to_string());
    }

    if config.agent.max_retries == 0 {
        errors.push("agent.max_retries must be > 0".to_string());
    }
    if config.agent.retry_base_delay_ms > config.agent.retry_max_delay_ms {
        errors.push(
            "agent.retry_base_delay_ms must not exceed agent.retry_max_delay_ms".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_history() {
        let mut config = Config::default();
        config.memory.max_history = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("memory.max_history"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.memory.backend = MemoryBackend::Durable;
        config.memory.storage_dir = "  ".to_string();
        config.agent.max_retries = 0;

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("memory.storage_dir"));
        assert!(message.contains("agent.max_retries"));
    }
}
