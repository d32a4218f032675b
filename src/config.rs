use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub cohere: CohereSettings,
    #[serde(default)]
    pub vision: VisionSettings,
    #[serde(default)]
    pub chroma: ChromaSettings,
    #[serde(default)]
    pub sandbox: SandboxSettings,
    #[serde(default)]
    pub upload: UploadSettings,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
    /// Maximum accepted JSON body size
    #[serde(default = "default_json_limit")]
    pub json_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            json_limit_bytes: default_json_limit(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_json_limit() -> usize { 2 * 1024 * 1024 }

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_gemini_model() -> String { "gemini-1.5-flash".to_string() }
fn default_llm_timeout() -> u64 { 120 }

#[derive(Debug, Clone, Deserialize)]
pub struct CohereSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_cohere_url")]
    pub base_url: String,
    #[serde(default = "default_cohere_generate_model")]
    pub generate_model: String,
    #[serde(default = "default_cohere_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_cohere_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_embedding_cache_size")]
    pub embedding_cache_size: u64,
}

impl Default for CohereSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_cohere_url(),
            generate_model: default_cohere_generate_model(),
            chat_model: default_cohere_chat_model(),
            embedding_model: default_cohere_embedding_model(),
            timeout_secs: default_llm_timeout(),
            embedding_cache_size: default_embedding_cache_size(),
        }
    }
}

fn default_cohere_url() -> String { "https://api.cohere.com".to_string() }
fn default_cohere_generate_model() -> String { "command".to_string() }
fn default_cohere_chat_model() -> String { "command-a-03-2025".to_string() }
fn default_cohere_embedding_model() -> String { "embed-english-v3.0".to_string() }
fn default_embedding_cache_size() -> u64 { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct VisionSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_vision_url")]
    pub base_url: String,
    #[serde(default = "default_vision_timeout")]
    pub timeout_secs: u64,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_vision_url(),
            timeout_secs: default_vision_timeout(),
        }
    }
}

fn default_vision_url() -> String { "https://vision.googleapis.com".to_string() }
fn default_vision_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct ChromaSettings {
    #[serde(default = "default_chroma_url")]
    pub url: String,
    #[serde(default = "default_chroma_tenant")]
    pub tenant: String,
    #[serde(default = "default_chroma_database")]
    pub database: String,
    #[serde(default = "default_chroma_collection")]
    pub collection: String,
    #[serde(default = "default_chroma_timeout")]
    pub timeout_secs: u64,
}

impl Default for ChromaSettings {
    fn default() -> Self {
        Self {
            url: default_chroma_url(),
            tenant: default_chroma_tenant(),
            database: default_chroma_database(),
            collection: default_chroma_collection(),
            timeout_secs: default_chroma_timeout(),
        }
    }
}

fn default_chroma_url() -> String { "http://localhost:8001".to_string() }
fn default_chroma_tenant() -> String { "default_tenant".to_string() }
fn default_chroma_database() -> String { "default_database".to_string() }
fn default_chroma_collection() -> String { "code_snippets".to_string() }
fn default_chroma_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct SandboxSettings {
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
    #[serde(default = "default_base_image")]
    pub base_image: String,
    /// Upper bound on how long a test container may run
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on `docker build`, which installs pytest from the network
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,
    #[serde(default = "default_true")]
    pub network_disabled: bool,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            docker_bin: default_docker_bin(),
            base_image: default_base_image(),
            timeout_secs: default_sandbox_timeout(),
            build_timeout_secs: default_build_timeout(),
            memory_limit: default_memory_limit(),
            network_disabled: true,
        }
    }
}

fn default_docker_bin() -> String { "docker".to_string() }
fn default_base_image() -> String { "python:3.9-slim".to_string() }
fn default_sandbox_timeout() -> u64 { 60 }
fn default_build_timeout() -> u64 { 300 }
fn default_memory_limit() -> String { "256m".to_string() }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    /// File parts accepted in one multipart request
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_files: default_max_files(),
        }
    }
}

fn default_max_file_bytes() -> usize { 10 * 1024 * 1024 }
fn default_max_files() -> usize { 20 }

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationSettings {
    /// Minimum similarity for a stored solution to be used as context
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            n_results: default_n_results(),
        }
    }
}

fn default_similarity_threshold() -> f64 { 0.5 }
fn default_n_results() -> usize { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables prefixed with GRADER_, e.g. GRADER_SERVER__PORT -> server.port
    /// 5. Well-known provider variables (GOOGLE_API_KEY, COHERE_API_KEY, ...)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(grader_environment())
            .build()?;

        let settings = substitute_env_vars(settings)?;
        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(grader_environment())
            .build()?;

        let settings = substitute_env_vars(settings)?;
        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Both LLM providers are mandatory; the service refuses to start without keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "GOOGLE_API_KEY environment variable is not set".to_string(),
            ));
        }
        if self.cohere.api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "COHERE_API_KEY environment variable is not set".to_string(),
            ));
        }
        Ok(())
    }
}

fn grader_environment() -> Environment {
    Environment::with_prefix("GRADER")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Apply the provider variables the deployment already exports
///
/// GOOGLE_API_KEY feeds both Gemini and Vision unless GOOGLE_VISION_API_KEY is set.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let google_key = env::var("GOOGLE_API_KEY").ok().filter(|v| !v.is_empty());
    let vision_key = env::var("GOOGLE_VISION_API_KEY")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| google_key.clone());
    let cohere_key = env::var("COHERE_API_KEY").ok().filter(|v| !v.is_empty());
    let chroma_url = env::var("CHROMA_URL").ok().filter(|v| !v.is_empty());

    let mut builder = Config::builder().add_source(settings);

    if let Some(key) = google_key {
        builder = builder.set_override("gemini.api_key", key)?;
    }
    if let Some(key) = vision_key {
        builder = builder.set_override("vision.api_key", key)?;
    }
    if let Some(key) = cohere_key {
        builder = builder.set_override("cohere.api_key", key)?;
    }
    if let Some(url) = chroma_url {
        builder = builder.set_override("chroma.url", url)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let settings = Settings::default();
        assert_eq!(settings.upload.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.upload.max_files, 20);
        assert_eq!(settings.sandbox.build_timeout_secs, 300);
        assert_eq!(settings.evaluation.similarity_threshold, 0.5);
        assert_eq!(settings.evaluation.n_results, 5);
        assert_eq!(settings.chroma.collection, "code_snippets");
        assert!(settings.sandbox.network_disabled);
    }

    #[test]
    fn test_validate_requires_keys() {
        let mut settings = Settings::default();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        settings.gemini.api_key = "g".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("COHERE_API_KEY"));

        settings.cohere.api_key = "c".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grader.toml");
        std::fs::write(
            &path,
            "[gemini]\napi_key = \"g\"\n[cohere]\napi_key = \"c\"\n[server]\nport = 9100\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.cohere.chat_model, "command-a-03-2025");
        assert_eq!(settings.sandbox.base_image, "python:3.9-slim");
    }

    #[test]
    fn test_custom_path_applies_provider_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grader.toml");
        std::fs::write(&path, "[gemini]\napi_key = \"g\"\n[cohere]\napi_key = \"c\"\n").unwrap();

        std::env::set_var("CHROMA_URL", "http://chroma.internal:8000");
        let loaded = Settings::load_from(&path);
        std::env::remove_var("CHROMA_URL");

        assert_eq!(loaded.unwrap().chroma.url, "http://chroma.internal:8000");
    }
}
