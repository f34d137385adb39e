//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8000").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "./data").
    pub data_dir: String,

    /// Clerk issuer URL; JWKS is fetched from `<issuer>/.well-known/jwks.json`.
    pub auth_issuer: Option<String>,

    /// API key for the LLM provider.
    pub llm_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (default: Groq).
    pub llm_base_url: String,

    /// Model name (default: `moonshotai/kimi-k2-instruct-0905`).
    pub llm_model: String,

    /// LLM request timeout in seconds.
    pub llm_timeout_seconds: u64,

    /// Python interpreter with Manim installed.
    pub manim_python: String,

    /// Scratch directory for scene scripts.
    pub work_dir: String,

    /// Directory holding rendered videos (served at `/videos`).
    pub media_dir: String,

    /// Public base URL used for locally served video links.
    pub public_base_url: String,

    /// S3 settings (optional; videos stay local without them).
    pub aws: Option<AwsSettings>,

    /// CloudFront signing settings (required alongside `aws`).
    pub cloudfront: Option<CloudFrontSettings>,

    /// Shared secret for payment webhook signatures (optional).
    pub webhook_secret: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds (not applied to generation routes).
    pub request_timeout_seconds: u64,

    /// Number of concurrent render workers.
    pub worker_concurrency: usize,

    /// Maximum number of queued jobs.
    pub queue_capacity: usize,

    /// Upper bound on one job's pipeline, in seconds.
    pub job_timeout_seconds: u64,

    /// How long job progress and results are kept, in seconds.
    pub job_ttl_seconds: u64,

    /// Poll interval for the progress stream, in milliseconds.
    pub stream_poll_interval_ms: u64,

    /// Poll interval for blocking generation, in milliseconds.
    pub generate_poll_interval_ms: u64,
}

/// S3 bucket and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsSettings {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Bucket region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    pub bucket: String,
}

/// CloudFront distribution and signing key.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudFrontSettings {
    /// Distribution domain, e.g. `d111111abcdef8.cloudfront.net`.
    pub domain: String,
    /// Public key id registered with the distribution.
    pub key_pair_id: String,
    /// Base64-encoded PEM private key (takes precedence over the path).
    #[serde(default)]
    pub private_key_base64: Option<String>,
    /// Path to a PEM private key.
    #[serde(default = "default_private_key_path")]
    pub private_key_path: String,
    /// Lifetime of signed URLs in minutes.
    #[serde(default = "default_url_ttl_minutes")]
    pub url_ttl_minutes: i64,
}

/// AWS secrets file structure.
#[derive(Debug, Deserialize)]
struct AwsSecrets {
    #[serde(flatten)]
    aws: AwsSettings,
    #[serde(default)]
    cloudfront: Option<CloudFrontSettings>,
}

fn default_region() -> String {
    "ap-south-1".into()
}

fn default_private_key_path() -> String {
    "./private_key.pem".into()
}

fn default_url_ttl_minutes() -> i64 {
    1440
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (aws, cloudfront) = load_aws_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            auth_issuer: std::env::var("CLERK_ISSUER").ok(),
            llm_api_key: std::env::var("GROQ_API_KEY")
                .or_else(|_| std::env::var("LLM_API_KEY"))
                .ok(),
            llm_base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_timeout_seconds: env_or("LLM_TIMEOUT_SECONDS", defaults.llm_timeout_seconds),
            manim_python: std::env::var("MANIM_PYTHON").unwrap_or(defaults.manim_python),
            work_dir: std::env::var("WORK_DIR").unwrap_or(defaults.work_dir),
            media_dir: std::env::var("MEDIA_DIR").unwrap_or(defaults.media_dir),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            aws,
            cloudfront,
            webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            worker_concurrency: env_or("WORKER_CONCURRENCY", defaults.worker_concurrency).max(1),
            queue_capacity: env_or("QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            job_timeout_seconds: env_or("JOB_TIMEOUT_SECONDS", defaults.job_timeout_seconds),
            job_ttl_seconds: env_or("JOB_TTL_SECONDS", defaults.job_ttl_seconds),
            stream_poll_interval_ms: defaults.stream_poll_interval_ms,
            generate_poll_interval_ms: defaults.generate_poll_interval_ms,
        }
    }

    /// Whether videos go to S3 behind CloudFront.
    #[must_use]
    pub fn has_cloud_storage(&self) -> bool {
        self.aws.is_some() && self.cloudfront.is_some()
    }
}

/// Load AWS and CloudFront secrets from file or environment.
fn load_aws_secrets() -> (Option<AwsSettings>, Option<CloudFrontSettings>) {
    let secret_paths = [".secrets/aws.json", "../.secrets/aws.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<AwsSecrets>(path) {
            tracing::info!(path = %path, "Loaded AWS secrets from file");
            return (
                Some(secrets.aws),
                secrets.cloudfront.or_else(cloudfront_from_env),
            );
        }
    }

    tracing::debug!("AWS secrets file not found, using environment variables");
    let aws = match (
        std::env::var("AWS_ACCESS_KEY_ID"),
        std::env::var("AWS_SECRET_ACCESS_KEY"),
        std::env::var("S3_BUCKET_NAME"),
    ) {
        (Ok(access_key_id), Ok(secret_access_key), Ok(bucket)) => Some(AwsSettings {
            access_key_id,
            secret_access_key,
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| default_region()),
            bucket,
        }),
        _ => None,
    };

    (aws, cloudfront_from_env())
}

fn cloudfront_from_env() -> Option<CloudFrontSettings> {
    let domain = std::env::var("CLOUDFRONT_DOMAIN").ok()?;
    let key_pair_id = std::env::var("CLOUDFRONT_KEY_PAIR_ID").ok()?;
    Some(CloudFrontSettings {
        domain,
        key_pair_id,
        private_key_base64: std::env::var("CLOUDFRONT_PRIVATE_KEY_BASE64").ok(),
        private_key_path: std::env::var("CLOUDFRONT_PRIVATE_KEY_PATH")
            .unwrap_or_else(|_| default_private_key_path()),
        url_ttl_minutes: env_or("CLOUDFRONT_URL_TTL_MINUTES", default_url_ttl_minutes()),
    })
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".into(),
            data_dir: "./data".into(),
            auth_issuer: None,
            llm_api_key: None,
            llm_base_url: "https://api.groq.com/openai/v1".into(),
            llm_model: "moonshotai/kimi-k2-instruct-0905".into(),
            llm_timeout_seconds: 120,
            manim_python: "python3".into(),
            work_dir: "./temp".into(),
            media_dir: "./generated_animations".into(),
            public_base_url: "http://localhost:8000".into(),
            aws: None,
            cloudfront: None,
            webhook_secret: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            worker_concurrency: 2,
            queue_capacity: 256,
            job_timeout_seconds: 600,
            job_ttl_seconds: 3600,
            stream_poll_interval_ms: 500,
            generate_poll_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.worker_concurrency, 2);
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.job_timeout_seconds, 600);
        assert_eq!(config.job_ttl_seconds, 3600);
        assert!(!config.has_cloud_storage());
    }

    #[test]
    fn secrets_file_parses_nested_cloudfront() {
        let json = r#"{
            "access_key_id": "AKIA",
            "secret_access_key": "secret",
            "bucket": "videos",
            "cloudfront": {"domain": "d1.cloudfront.net", "key_pair_id": "K1"}
        }"#;
        let secrets: AwsSecrets = serde_json::from_str(json).unwrap();
        assert_eq!(secrets.aws.region, "ap-south-1");
        let cf = secrets.cloudfront.unwrap();
        assert_eq!(cf.url_ttl_minutes, 1440);
        assert_eq!(cf.private_key_path, "./private_key.pem");
    }
}
