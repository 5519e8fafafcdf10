use crate::error::{Result, RouterError};

/// Router configuration with environment overrides.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Whether saga handler failures are suppressed (logged, instance still
    /// committed, processing continues) or propagated to the caller.
    pub suppress_handler_errors: bool,
    /// Group namespace the in-process job engine registers deferred jobs
    /// under.
    pub deadline_group: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            suppress_handler_errors: true,
            deadline_group: "deadlines".to_string(),
        }
    }
}

impl RouterConfig {
    /// Build a configuration from defaults plus `SAGA_CORE_*` environment
    /// variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("SAGA_CORE_SUPPRESS_HANDLER_ERRORS") {
            config.suppress_handler_errors = raw.parse().map_err(|e| {
                RouterError::Configuration(format!("invalid suppress_handler_errors: {e}"))
            })?;
        }

        if let Ok(group) = std::env::var("SAGA_CORE_DEADLINE_GROUP") {
            if group.is_empty() {
                return Err(RouterError::Configuration(
                    "deadline_group must not be empty".to_string(),
                ));
            }
            config.deadline_group = group;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_suppress_handler_errors() {
        let config = RouterConfig::default();
        assert!(config.suppress_handler_errors);
        assert_eq!(config.deadline_group, "deadlines");
    }
}
