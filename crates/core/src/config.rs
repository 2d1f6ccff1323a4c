use std::env;

/// One external extraction provider: a chat-completions-style endpoint with an
/// ordered list of model variants, tried strictly in order.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub models: Vec<String>,
}

impl ProviderConfig {
    pub fn is_usable(&self) -> bool {
        self.api_key.is_some() && !self.models.is_empty()
    }
}

/// Immutable pipeline configuration, built once from the process environment
/// and passed by reference. Nothing inside the pipeline reads env vars ad hoc.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fallback currency when a row carries no detectable code.
    pub default_currency: String,
    /// Kill switch: skip every external call and run deterministic-only.
    pub disable_external: bool,
    /// Strict-privacy redaction tier.
    pub strict_privacy: bool,
    /// Operator-supplied literals, masked unconditionally.
    pub custom_redact_words: Vec<String>,
    /// Providers in fallback order (primary first).
    pub providers: Vec<ProviderConfig>,
    /// Upload cap enforced before any parsing.
    pub max_upload_bytes: usize,
    /// Character budget per extraction chunk.
    pub chunk_max_chars: usize,
    /// Prepared-text length above which chunking kicks in.
    pub chunk_threshold_chars: usize,
    /// Per-call timeout for external providers.
    pub provider_timeout_secs: u64,
    /// Default the log filter to debug level.
    pub debug_logging: bool,
    /// HTTP bind address for the server binary.
    pub bind_addr: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            disable_external: false,
            strict_privacy: false,
            custom_redact_words: Vec::new(),
            providers: Vec::new(),
            max_upload_bytes: 10 * 1024 * 1024,
            chunk_max_chars: 12_000,
            chunk_threshold_chars: 12_000,
            provider_timeout_secs: 60,
            debug_logging: false,
            bind_addr: "127.0.0.1:8377".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let providers = vec![
            provider_from_env(
                "primary",
                "TABULA_PRIMARY",
                "https://api.openai.com/v1",
                &["gpt-4o-mini", "gpt-4o"],
            ),
            provider_from_env(
                "secondary",
                "TABULA_SECONDARY",
                "https://generativelanguage.googleapis.com/v1beta/openai",
                &["gemini-2.0-flash", "gemini-1.5-pro"],
            ),
        ];

        Self {
            default_currency: env::var("TABULA_DEFAULT_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.default_currency),
            disable_external: env_flag("TABULA_DISABLE_EXTERNAL"),
            strict_privacy: env_flag("TABULA_STRICT_PRIVACY"),
            custom_redact_words: env_list("TABULA_REDACT_WORDS"),
            providers,
            max_upload_bytes: env_parsed("TABULA_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            chunk_max_chars: env_parsed("TABULA_CHUNK_MAX_CHARS", defaults.chunk_max_chars),
            chunk_threshold_chars: env_parsed(
                "TABULA_CHUNK_THRESHOLD_CHARS",
                defaults.chunk_threshold_chars,
            ),
            provider_timeout_secs: env_parsed(
                "TABULA_PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout_secs,
            ),
            debug_logging: env_flag("TABULA_DEBUG"),
            bind_addr: env::var("TABULA_BIND").unwrap_or(defaults.bind_addr),
        }
    }

    /// Providers that are actually callable; empty behaves like the kill
    /// switch being on.
    pub fn usable_providers(&self) -> Vec<&ProviderConfig> {
        self.providers.iter().filter(|p| p.is_usable()).collect()
    }
}

fn provider_from_env(
    name: &str,
    prefix: &str,
    default_base_url: &str,
    default_models: &[&str],
) -> ProviderConfig {
    let models = env_list(&format!("{prefix}_MODELS"));
    ProviderConfig {
        name: name.to_string(),
        base_url: env::var(format!("{prefix}_BASE_URL"))
            .unwrap_or_else(|_| default_base_url.to_string()),
        api_key: env::var(format!("{prefix}_API_KEY")).ok().filter(|k| !k.trim().is_empty()),
        models: if models.is_empty() {
            default_models.iter().map(|m| m.to_string()).collect()
        } else {
            models
        },
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
