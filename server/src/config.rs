//! Startup configuration read from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use larder_core::extract::{ExtractorSet, HttpExtractor};
use larder_core::generate::{HttpGenerator, LlmRecipeGenerator, RecipeGenerator};
use larder_core::llm::{ClaudeProvider, LlmProvider};
use larder_core::platform::VideoPlatform;
use larder_core::ImporterConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorConfig {
    Http { endpoint: String },
    Llm { api_key: String, model: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub importer: ImporterConfig,
    pub youtube_extract_url: Option<String>,
    pub tiktok_extract_url: Option<String>,
    pub generator: GeneratorConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr: SocketAddr = parse_or(
            &var,
            "LARDER_BIND_ADDR",
            DEFAULT_BIND_ADDR.parse::<SocketAddr>()?,
        )?;

        let defaults = ImporterConfig::default();
        let concurrency: usize = parse_or(&var, "LARDER_IMPORT_CONCURRENCY", defaults.concurrency)?;
        if concurrency == 0 {
            bail!("LARDER_IMPORT_CONCURRENCY must be at least 1");
        }
        let stage_timeout_secs: u64 = parse_or(
            &var,
            "LARDER_STAGE_TIMEOUT_SECS",
            defaults.stage_timeout.as_secs(),
        )?;

        let generator = match var("LARDER_GENERATOR").as_deref().unwrap_or("http") {
            "http" => GeneratorConfig::Http {
                endpoint: var("LARDER_GENERATE_URL")
                    .context("LARDER_GENERATE_URL must be set when LARDER_GENERATOR=http")?,
            },
            "llm" => GeneratorConfig::Llm {
                api_key: var("ANTHROPIC_API_KEY")
                    .context("ANTHROPIC_API_KEY must be set when LARDER_GENERATOR=llm")?,
                model: var("LARDER_LLM_MODEL")
                    .unwrap_or_else(|| ClaudeProvider::DEFAULT_MODEL.to_string()),
            },
            other => bail!("Unknown LARDER_GENERATOR: {}", other),
        };

        let youtube_extract_url = var("LARDER_EXTRACT_YOUTUBE_URL");
        let tiktok_extract_url = var("LARDER_EXTRACT_TIKTOK_URL");
        if youtube_extract_url.is_none() && tiktok_extract_url.is_none() {
            bail!("At least one of LARDER_EXTRACT_YOUTUBE_URL or LARDER_EXTRACT_TIKTOK_URL must be set");
        }

        Ok(Self {
            database_url,
            bind_addr,
            importer: ImporterConfig {
                concurrency,
                stage_timeout: Duration::from_secs(stage_timeout_secs),
                ..defaults
            },
            youtube_extract_url,
            tiktok_extract_url,
            generator,
        })
    }

    pub fn build_extractors(&self) -> anyhow::Result<ExtractorSet> {
        let mut set = ExtractorSet::new();
        let endpoints = [
            (VideoPlatform::YouTube, &self.youtube_extract_url),
            (VideoPlatform::TikTok, &self.tiktok_extract_url),
        ];

        for (platform, endpoint) in endpoints {
            match endpoint {
                Some(url) => {
                    let extractor = HttpExtractor::new(platform, url.as_str())
                        .map_err(|e| anyhow!("Failed to build {} extractor: {}", platform, e))?;
                    set = set.with(Arc::new(extractor));
                }
                None => tracing::warn!(%platform, "No extraction endpoint configured; imports will fail"),
            }
        }

        Ok(set)
    }

    pub fn build_generator(&self) -> anyhow::Result<Arc<dyn RecipeGenerator>> {
        match &self.generator {
            GeneratorConfig::Http { endpoint } => {
                let generator = HttpGenerator::new(endpoint.as_str())
                    .map_err(|e| anyhow!("Failed to build generator: {}", e))?;
                Ok(Arc::new(generator))
            }
            GeneratorConfig::Llm { api_key, model } => {
                let provider: Arc<dyn LlmProvider> =
                    Arc::new(ClaudeProvider::new(api_key.clone(), model.clone()));
                Ok(Arc::new(LlmRecipeGenerator::new(provider)))
            }
        }
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}={:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/larder"),
        ("LARDER_EXTRACT_YOUTUBE_URL", "http://extract/youtube"),
        ("LARDER_GENERATE_URL", "http://generate"),
    ];

    #[test]
    fn defaults() {
        let config = config(BASE).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.importer.concurrency, 3);
        assert_eq!(config.importer.stage_timeout, Duration::from_secs(120));
        assert_eq!(
            config.generator,
            GeneratorConfig::Http {
                endpoint: "http://generate".to_string()
            }
        );
        assert!(config.tiktok_extract_url.is_none());
    }

    #[test]
    fn overrides() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("LARDER_IMPORT_CONCURRENCY", "5"),
            ("LARDER_STAGE_TIMEOUT_SECS", "30"),
            ("LARDER_BIND_ADDR", "127.0.0.1:8080"),
            ("LARDER_GENERATOR", "llm"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]);
        let config = config(&vars).unwrap();

        assert_eq!(config.importer.concurrency, 5);
        assert_eq!(config.importer.stage_timeout, Duration::from_secs(30));
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(matches!(config.generator, GeneratorConfig::Llm { ref model, .. } if model == ClaudeProvider::DEFAULT_MODEL));
    }

    #[test]
    fn rejects_bad_values() {
        let mut vars = BASE.to_vec();
        vars.push(("LARDER_IMPORT_CONCURRENCY", "lots"));
        let err = config(&vars).unwrap_err().to_string();
        assert!(err.contains("LARDER_IMPORT_CONCURRENCY"), "{}", err);

        let mut vars = BASE.to_vec();
        vars.push(("LARDER_IMPORT_CONCURRENCY", "0"));
        assert!(config(&vars).is_err());

        assert!(config(&[("LARDER_GENERATE_URL", "http://generate")]).is_err());

        let mut vars = BASE.to_vec();
        vars.push(("LARDER_GENERATOR", "llm"));
        assert!(config(&vars).is_err());
    }

    #[tokio::test]
    async fn builds_collaborators() {
        let config = config(BASE).unwrap();
        let extractors = config.build_extractors().unwrap();
        assert!(extractors.get(VideoPlatform::YouTube).is_ok());
        assert!(extractors.get(VideoPlatform::TikTok).is_err());
        assert_eq!(config.build_generator().unwrap().generator_name(), "http");
    }
}
