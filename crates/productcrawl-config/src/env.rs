//! Minimal environment-variable loader: typed getters plus a `required`
//! list validated up front, the way `EnvConfigLoader` does it in the
//! surrounding ecosystem.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("environment variable not found: {var}")]
    NotFound { var: String },
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

pub struct EnvConfigLoader {
    defaults: HashMap<String, String>,
    required: Vec<String>,
}

impl EnvConfigLoader {
    pub fn new() -> Self {
        EnvConfigLoader { defaults: HashMap::new(), required: Vec::new() }
    }

    pub fn default(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(var.into(), value.into());
        self
    }

    pub fn require(mut self, var: impl Into<String>) -> Self {
        self.required.push(var.into());
        self
    }

    pub fn get(&self, var: &str) -> Result<String, EnvError> {
        env::var(var)
            .ok()
            .or_else(|| self.defaults.get(var).cloned())
            .ok_or_else(|| EnvError::NotFound { var: var.to_string() })
    }

    pub fn get_optional(&self, var: &str) -> Option<String> {
        env::var(var).ok().or_else(|| self.defaults.get(var).cloned())
    }

    pub fn get_u64(&self, var: &str) -> Result<u64, EnvError> {
        let value = self.get(var)?;
        value.parse().map_err(|e| EnvError::InvalidValue {
            var: var.to_string(),
            reason: format!("not an unsigned integer: {e}"),
        })
    }

    pub fn validate(&self) -> Result<(), EnvError> {
        for var in &self.required {
            self.get(var)?;
        }
        Ok(())
    }
}

impl Default for EnvConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_unset() {
        let loader = EnvConfigLoader::new().default("EXTRACTION_TIMEOUT", "60");
        assert_eq!(loader.get("EXTRACTION_TIMEOUT").unwrap(), "60");
        assert_eq!(loader.get_u64("EXTRACTION_TIMEOUT").unwrap(), 60);
    }

    #[test]
    fn validate_fails_on_missing_required_var() {
        let loader = EnvConfigLoader::new().require("DEFINITELY_NOT_SET_XYZ");
        assert!(loader.validate().is_err());
    }
}
