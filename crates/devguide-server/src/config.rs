use anyhow::anyhow;
use devguide_docs::DocumentSources;
use devguide_provider::OrchestratorSettings;
use devguide_types::CacheFormat;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default config template created when no config exists
pub const DEFAULT_CONFIG: &str = r#"
[server]
name = "devguide"
version = "0.1.0"

[documents]
rules_path = "docs/rules.md"
skills_path = "docs/skills.md"
steering_path = "docs/steering.md"

[orchestrator]
api_key = ""  # Set via OPENAI_API_KEY env var
base_url = ""  # Optional: Set via OPENAI_BASE_URL env var
model = "gpt-4o-mini"
max_tokens = 4000
temperature = 0.7
timeout_secs = 30  # 0 falls back to the default

[cache]
dir = "cache"  # Written by devguide-build-cache; empty disables the on-disk bundle
delivery_format = "plain"  # plain, compressed-text, compressed-serialized

[feedback]
database = "devguide-feedback.db"

[optimizer]
max_response_tokens = 0  # 0 serves documents untruncated

[logging]
level = "info"  # trace, debug, info, warn, error
json = false
"#;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "devguide".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DocumentsConfig {
    pub rules_path: PathBuf,
    pub skills_path: PathBuf,
    pub steering_path: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        let sources = DocumentSources::default();
        Self {
            rules_path: sources.rules,
            skills_path: sources.skills,
            steering_path: sources.steering,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let settings = OrchestratorSettings::default();
        Self {
            api_key: String::new(),
            base_url: String::new(),
            model: settings.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout_secs: settings.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: String,
    pub delivery_format: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "cache".to_string(),
            delivery_format: CacheFormat::Plain.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedbackConfig {
    pub database: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            database: "devguide-feedback.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OptimizerConfig {
    pub max_response_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub documents: DocumentsConfig,
    pub orchestrator: OrchestratorConfig,
    pub cache: CacheConfig,
    pub feedback: FeedbackConfig,
    pub optimizer: OptimizerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the global config path: ~/.devguide/devguide.toml
    fn global_config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".devguide").join("devguide.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()?;

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.devguide/devguide.toml (auto-created if missing)
    /// 2. Local override: ./devguide.toml (optional)
    /// 3. Environment variables with DEVGUIDE__ prefix
    /// 4. OPENAI_API_KEY / OPENAI_BASE_URL (highest priority)
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let global_config_path = Self::ensure_global_config()?;

        let mut config_builder = config::Config::builder()
            .add_source(config::File::from(global_config_path))
            .add_source(config::File::with_name("devguide").required(false))
            .add_source(config::Environment::with_prefix("DEVGUIDE").separator("__"));

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config_builder = config_builder.set_override("orchestrator.api_key", key)?;
        }

        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config_builder = config_builder.set_override("orchestrator.base_url", url)?;
        }

        let config: Self = config_builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Parse a single TOML document, without any other layer
    pub fn from_toml(source: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn document_sources(&self) -> DocumentSources {
        DocumentSources {
            rules: self.documents.rules_path.clone(),
            skills: self.documents.skills_path.clone(),
            steering: self.documents.steering_path.clone(),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let orchestrator = &self.orchestrator;
        OrchestratorSettings {
            api_key: non_empty(&orchestrator.api_key),
            base_url: non_empty(&orchestrator.base_url),
            model: orchestrator.model.clone(),
            max_tokens: orchestrator.max_tokens,
            temperature: orchestrator.temperature,
            timeout: match orchestrator.timeout_secs {
                0 => OrchestratorSettings::default().timeout,
                secs => Duration::from_secs(secs),
            },
        }
    }

    pub fn cache_dir(&self) -> Option<PathBuf> {
        non_empty(&self.cache.dir).map(PathBuf::from)
    }

    pub fn delivery_format(&self) -> anyhow::Result<CacheFormat> {
        Ok(self.cache.delivery_format.parse()?)
    }

    pub fn max_response_tokens(&self) -> Option<usize> {
        match self.optimizer.max_response_tokens {
            0 => None,
            n => Some(n),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
