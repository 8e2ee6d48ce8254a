use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelConfig,
    pub chunking: ChunkingConfig,
    pub answer: AnswerConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Uploaded files are written here
    pub data_dir: PathBuf,
    /// Persisted indexes live here, one directory per name
    pub index_dir: PathBuf,
    pub max_file_mb: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompletionBackend {
    Ollama,  // local /api/generate
    OpenAi,  // any /chat/completions endpoint, Groq by default
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub ollama_url: String,
    pub embedding_model: String,
    pub completion_backend: CompletionBackend,
    pub completion_url: Option<String>,
    pub completion_model: Option<String>,
    #[serde(skip_serializing)]
    pub completion_api_key: Option<String>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    pub default_k: usize,
    pub max_context_chars: usize,
    pub max_history: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:8000".to_string(),
                data_dir: PathBuf::from("data"),
                index_dir: PathBuf::from("vectorstore"),
                max_file_mb: 50,
            },
            models: ModelConfig {
                ollama_url: "http://localhost:11434".to_string(),
                embedding_model: "nomic-embed-text".to_string(),
                completion_backend: CompletionBackend::Ollama,
                completion_url: None,
                completion_model: None,
                completion_api_key: None,
                temperature: 0.1,
            },
            chunking: ChunkingConfig {
                chunk_size: 800,
                chunk_overlap: 150,
            },
            answer: AnswerConfig {
                default_k: 4,
                max_context_chars: 3000,
                max_history: None,
            },
            concurrency: ConcurrencyConfig {
                request_timeout_secs: 60,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let mut config = Self::default();

        env.string("BIND_ADDR", &mut config.server.bind_addr);
        if let Some(dir) = env.get("DATA_DIR") {
            config.server.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env.get("INDEX_DIR") {
            config.server.index_dir = PathBuf::from(dir);
        }
        env.parse("MAX_FILE_MB", &mut config.server.max_file_mb)?;

        let models = &mut config.models;
        env.string("OLLAMA_URL", &mut models.ollama_url);
        env.string("EMBEDDING_MODEL", &mut models.embedding_model);
        if let Some(backend) = env.get("COMPLETION_BACKEND") {
            models.completion_backend = match backend.to_lowercase().as_str() {
                "ollama" => CompletionBackend::Ollama,
                "openai" | "groq" => CompletionBackend::OpenAi,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "COMPLETION_BACKEND",
                        value: backend,
                        message: "expected ollama or openai".to_string(),
                    });
                }
            };
        }
        models.completion_url = env.get("COMPLETION_URL");
        models.completion_model = env.get("COMPLETION_MODEL");
        models.completion_api_key = env
            .get("COMPLETION_API_KEY")
            .or_else(|| env.get("GROQ_API_KEY"));
        env.parse("TEMPERATURE", &mut models.temperature)?;

        if models.completion_backend == CompletionBackend::OpenAi
            && models.completion_api_key.is_none()
        {
            return Err(ConfigError::Missing("COMPLETION_API_KEY or GROQ_API_KEY"));
        }

        env.parse("CHUNK_SIZE", &mut config.chunking.chunk_size)?;
        env.parse("CHUNK_OVERLAP", &mut config.chunking.chunk_overlap)?;

        env.parse("DEFAULT_K", &mut config.answer.default_k)?;
        if config.answer.default_k == 0 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_K",
                value: "0".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        env.parse("MAX_CONTEXT_CHARS", &mut config.answer.max_context_chars)?;
        if let Some(raw) = env.get("MAX_HISTORY") {
            config.answer.max_history = Some(parse_value("MAX_HISTORY", raw)?);
        }

        env.parse(
            "REQUEST_TIMEOUT_SECS",
            &mut config.concurrency.request_timeout_secs,
        )?;

        env.parse("MAX_RETRIES", &mut config.retry.max_retries)?;
        env.parse("INITIAL_BACKOFF_MS", &mut config.retry.initial_backoff_ms)?;
        env.parse("MAX_BACKOFF_MS", &mut config.retry.max_backoff_ms)?;

        Ok(config)
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.server.max_file_mb * 1024 * 1024
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank both mean "use the default"
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, slot: &mut String) {
        if let Some(value) = self.get(key) {
            *slot = value;
        }
    }

    fn parse<T>(&self, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = self.get(key) {
            *slot = parse_value(key, raw)?;
        }
        Ok(())
    }
}

fn parse_value<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
        value: raw,
    })
}
