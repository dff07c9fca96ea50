//! Server configuration loaded from TOML.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::core::{LoanError, LoanProduct, ProductCatalog};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Product(#[from] LoanError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Replaces the seeded product list when present
    #[serde(default)]
    pub products: Option<Vec<LoanProduct>>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            products: None,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Builds the product catalog: configured products if any, otherwise the
    /// seeded defaults.
    pub fn catalog(&self) -> Result<ProductCatalog, ConfigError> {
        match &self.products {
            Some(products) => Ok(ProductCatalog::new(products.clone())?),
            None => Ok(ProductCatalog::seeded()),
        }
    }
}
