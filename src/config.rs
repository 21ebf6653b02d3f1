use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Object-store bucket holding the release artifacts.
    pub bucket: String,
    /// Optional AWS region override; the SDK default chain applies otherwise.
    pub region: Option<String>,
    /// Key prefix under which release artifacts live.
    pub releases_prefix: String,
    /// Redis connection URL for the cache layer.
    pub redis_url: String,
    /// Cache connection pool bounds.
    pub cache_pool_min: u32,
    pub cache_pool_max: u32,
    /// Static bearer secret required by the cache-clear endpoint.
    pub auth_secret: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Release distribution API")]
pub struct Args {
    /// Host to bind to (overrides RELEASE_API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides RELEASE_API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Object-store bucket name (overrides S3_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Key prefix for release artifacts (overrides RELEASE_API_RELEASES_PREFIX)
    #[arg(long)]
    pub releases_prefix: Option<String>,

    /// Redis connection URL (overrides REDIS_URL)
    #[arg(long)]
    pub redis_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();
        Self::from_env_with(args)
    }

    fn from_env_with(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("RELEASE_API_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("RELEASE_API_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing RELEASE_API_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading RELEASE_API_PORT"),
        };
        let env_bucket = env::var("S3_BUCKET_NAME").ok();
        let env_region = env::var("AWS_REGION").ok();
        let env_prefix = env::var("RELEASE_API_RELEASES_PREFIX")
            .unwrap_or_else(|_| "download/releases/".into());
        let env_redis =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let cache_pool_min = parse_pool_size("RELEASE_API_CACHE_POOL_MIN", 2)?;
        let cache_pool_max = parse_pool_size("RELEASE_API_CACHE_POOL_MAX", 10)?;

        // The clear-cache secret is deliberately env-only so it never shows
        // up in process listings.
        let auth_secret = env::var("AUTH_SECRET_ACCESS_KEY")
            .context("AUTH_SECRET_ACCESS_KEY must be set")?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            bucket: args
                .bucket
                .or(env_bucket)
                .context("S3_BUCKET_NAME must be set (or pass --bucket)")?,
            region: args.region.or(env_region),
            releases_prefix: args.releases_prefix.unwrap_or(env_prefix),
            redis_url: args.redis_url.unwrap_or(env_redis),
            cache_pool_min,
            cache_pool_max,
            auth_secret,
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Hand-written so the bearer secret never lands in a log line.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("releases_prefix", &self.releases_prefix)
            .field("redis_url", &self.redis_url)
            .field("cache_pool_min", &self.cache_pool_min)
            .field("cache_pool_max", &self.cache_pool_max)
            .field("auth_secret", &"<redacted>")
            .finish()
    }
}

fn parse_pool_size(var: &str, default: u32) -> Result<u32> {
    match env::var(var) {
        Ok(value) => value
            .parse::<u32>()
            .with_context(|| format!("parsing {} value `{}`", var, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).context(format!("reading {}", var)),
    }
}
