use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::BreedApiConfig;
use crate::error::{Error, Result};

/// Answers whether a breed name is present in a breed catalog.
///
/// Implementations report an unreachable or malformed catalog as
/// `Error::UpstreamUnavailable`, never as a negative answer.
#[async_trait]
pub trait BreedValidator: Send + Sync {
    async fn is_recognized(&self, breed: &str) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct CatalogBreed {
    name: String,
}

/// Validator backed by a remote catalog returning a JSON array of
/// `{"name": ...}` objects.
#[derive(Debug, Clone)]
pub struct CatApiBreedValidator {
    url: String,
    client: reqwest::Client,
}

impl CatApiBreedValidator {
    pub fn new(config: &BreedApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spycat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    async fn fetch_catalog(&self) -> std::result::Result<Vec<CatalogBreed>, reqwest::Error> {
        self.client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl BreedValidator for CatApiBreedValidator {
    async fn is_recognized(&self, breed: &str) -> Result<bool> {
        let catalog = self.fetch_catalog().await.map_err(|e| {
            log::warn!("breed catalog request to {} failed: {}", self.url, e);
            Error::UpstreamUnavailable(e.to_string())
        })?;

        let breed = breed.trim();
        Ok(catalog.iter().any(|b| b.name == breed))
    }
}

/// Validator over a fixed list of names, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticBreedValidator {
    breeds: HashSet<String>,
}

impl StaticBreedValidator {
    pub fn new<I, S>(breeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            breeds: breeds.into_iter().map(Into::into).collect(),
        }
    }

    /// A handful of well-known breeds.
    pub fn common() -> Self {
        Self::new([
            "Abyssinian",
            "Bengal",
            "British Shorthair",
            "Maine Coon",
            "Persian",
            "Ragdoll",
            "Siamese",
            "Sphynx",
        ])
    }
}

#[async_trait]
impl BreedValidator for StaticBreedValidator {
    async fn is_recognized(&self, breed: &str) -> Result<bool> {
        Ok(self.breeds.contains(breed.trim()))
    }
}

/// Validator whose catalog is always unreachable.
#[derive(Debug, Clone, Default)]
pub struct UnavailableBreedValidator;

#[async_trait]
impl BreedValidator for UnavailableBreedValidator {
    async fn is_recognized(&self, _breed: &str) -> Result<bool> {
        Err(Error::UpstreamUnavailable(
            "breed catalog is not reachable".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_validator() {
        let validator = StaticBreedValidator::new(["Siamese", "Bengal"]);

        assert!(validator.is_recognized("Siamese").await.unwrap());
        assert!(validator.is_recognized(" Bengal ").await.unwrap());
        assert!(!validator.is_recognized("siamese").await.unwrap());
        assert!(!validator.is_recognized("Dragon").await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_validator() {
        let result = UnavailableBreedValidator.is_recognized("Siamese").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_upstream_error() {
        let config = BreedApiConfig {
            url: "http://127.0.0.1:9/v1/breeds".to_string(),
            timeout_secs: 1,
            ..BreedApiConfig::default()
        };
        let validator = CatApiBreedValidator::new(&config).unwrap();

        let result = validator.is_recognized("Siamese").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }

    #[test]
    fn test_catalog_parsing() {
        let body = r#"[{"id": "abys", "name": "Abyssinian", "origin": "Egypt"}, {"name": "Bengal"}]"#;
        let breeds: Vec<CatalogBreed> = serde_json::from_str(body).unwrap();
        assert_eq!(breeds.len(), 2);
        assert_eq!(breeds[0].name, "Abyssinian");
    }
}
