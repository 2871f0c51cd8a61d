//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

const KNOWN_IDES: [&str; 2] = ["cursor", "antigravity"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next().map(|e| ConfigError::InvalidValue {
            field: e.path,
            message: e.message,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_agent(config, &mut result);
        Self::validate_cdp(config, &mut result);
        Self::validate_coordinator(config, &mut result);
        Self::validate_stats(config, &mut result);
        Self::validate_timings(config, &mut result);
        Self::validate_profiles(config, &mut result);

        result
    }

    fn validate_agent(config: &Config, result: &mut ValidationResult) {
        let agent = &config.agent;
        if !KNOWN_IDES.contains(&agent.ide.to_lowercase().as_str()) {
            result.add_warning(ValidationWarning::new(
                "agent.ide",
                format!(
                    "Unknown IDE '{}', no actions will be taken (known: {:?})",
                    agent.ide, KNOWN_IDES
                ),
            ));
        }

        if agent.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "agent.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        } else if agent.poll_interval_ms < 100 {
            result.add_warning(ValidationWarning::new(
                "agent.poll_interval_ms",
                "poll_interval_ms below 100 keeps the page busy",
            ));
        }

        if agent.banned_commands.is_empty() {
            result.add_warning(ValidationWarning::new(
                "agent.banned_commands",
                "No banned commands, every run action will be clicked",
            ));
        }

        for (i, pattern) in agent.banned_commands.iter().enumerate() {
            let path = format!("agent.banned_commands[{}]", i);
            if pattern.trim().is_empty() {
                result.add_warning(ValidationWarning::new(path, "Empty pattern is ignored"));
                continue;
            }
            if let Some(body) = regex_body(pattern) {
                if let Err(e) = regex::Regex::new(body) {
                    result.add_warning(ValidationWarning::new(
                        path,
                        format!("Invalid regex, will match literally: {}", e),
                    ));
                }
            }
        }
    }

    fn validate_cdp(config: &Config, result: &mut ValidationResult) {
        let cdp = &config.cdp;
        if cdp.host.is_empty() {
            result.add_error(ValidationError::new("cdp.host", "Host cannot be empty"));
        }

        if cdp.base_port == 0 {
            result.add_error(ValidationError::new("cdp.base_port", "Port cannot be 0"));
        } else if cdp.base_port < cdp.port_range {
            result.add_warning(ValidationWarning::new(
                "cdp.port_range",
                "port_range reaches below port 1, lower ports are clamped",
            ));
        }

        if cdp.port_range > 50 {
            result.add_warning(ValidationWarning::new(
                "cdp.port_range",
                "port_range is very wide (>50), every resync probes each port",
            ));
        }

        if cdp.probe_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "cdp.probe_timeout_ms",
                "probe_timeout_ms must be greater than 0",
            ));
        } else if cdp.probe_timeout_ms > 1000 {
            result.add_warning(ValidationWarning::new(
                "cdp.probe_timeout_ms",
                "probe_timeout_ms above 1000 slows down every resync",
            ));
        }

        if cdp.eval_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "cdp.eval_timeout_ms",
                "eval_timeout_ms must be greater than 0",
            ));
        }
    }

    fn validate_coordinator(config: &Config, result: &mut ValidationResult) {
        let coordinator = &config.coordinator;
        if coordinator.tick_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "coordinator.tick_interval_ms",
                "tick_interval_ms must be greater than 0",
            ));
        }

        if coordinator.stale_threshold_ms <= coordinator.tick_interval_ms {
            result.add_error(ValidationError::new(
                "coordinator.stale_threshold_ms",
                "stale_threshold_ms must exceed tick_interval_ms or the leader loses its lock between ticks",
            ));
        }

        if let Some(path) = &coordinator.state_path {
            if path.is_dir() {
                result.add_error(ValidationError::new(
                    "coordinator.state_path",
                    format!("State path is a directory: {:?}", path),
                ));
            }
        }
    }

    fn validate_stats(config: &Config, result: &mut ValidationResult) {
        if config.stats.collect_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "stats.collect_interval_secs",
                "collect_interval_secs must be greater than 0",
            ));
        }
    }

    fn validate_timings(config: &Config, result: &mut ValidationResult) {
        let timings = &config.timings;
        if timings.tab_poll_ms == 0 {
            result.add_error(ValidationError::new(
                "timings.tab_poll_ms",
                "tab_poll_ms must be greater than 0",
            ));
        }

        if timings.tab_wait_ms < timings.tab_poll_ms {
            result.add_warning(ValidationWarning::new(
                "timings.tab_wait_ms",
                "tab_wait_ms is shorter than tab_poll_ms, tabs are read once per cycle",
            ));
        }
    }

    fn validate_profiles(config: &Config, result: &mut ValidationResult) {
        for (name, profile) in &config.profiles {
            if !KNOWN_IDES.contains(&name.as_str()) {
                result.add_warning(ValidationWarning::new(
                    format!("profiles.{}", name),
                    "Override for an unknown IDE is ignored",
                ));
            }
            for (field, selector) in profile.selectors() {
                if selector.trim().is_empty() {
                    result.add_error(ValidationError::new(
                        format!("profiles.{}.{}", name, field),
                        "Selector cannot be empty",
                    ));
                }
            }
        }
    }
}

/// Body of a `/body/flags` pattern.
fn regex_body(pattern: &str) -> Option<&str> {
    let rest = pattern.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    Some(&rest[..end])
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
