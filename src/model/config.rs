use clap::Parser;
use serde::{Deserialize, Serialize};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long)]
    pub config_file: String,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Session verification and public routes.
     */
    pub security: AppSecurity,
    /**
     * Server configuration for the application.
     */
    pub server: Server,
    /**
     * Database configuration for the application.
     */
    pub database: Database,
    /**
     * List cache configuration.
     */
    #[serde(default)]
    pub cache: CacheConfig,
    /**
     * Image upload limits.
     */
    #[serde(default)]
    pub upload: UploadConfig,
    /**
     * Google calendar linking. Disabled when absent.
     */
    pub google: Option<GoogleConfig>,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log the source file.
     */
    pub file: bool,
    /**
     * Additional directives for logging configuration, e.g. `sqlx=warn`.
     */
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { target: true, thread_ids: true, thread_names: true, line_number: true, level: true, ansi: true, file: true, directives: vec![] }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database (e.g., `PostgreSQL`).
     */
    pub db_type: DatabaseType,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * `PostgreSQL` database type.
     */
    #[serde(rename_all = "camelCase")]
    Postgresql { connection_string: String, max_connections: u32, min_connections: u32, acquire_timeout: u64, acquire_slow_threshold: u64, idle_timeout: u64, max_lifetime: u64 },
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSecurity {
    /**
     * JWT algorithm of session tokens, e.g. `HS256` or `RS256`.
     */
    pub algorithm: String,
    /**
     * Key used to verify session tokens.
     */
    pub verification_key: KeySource,
    /**
     * Cookie carrying the session token.
     */
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /**
     * Where requests without a session are redirected.
     */
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
    /**
     * Paths that are public only when matched exactly.
     */
    #[serde(default)]
    pub public_paths: Vec<String>,
    /**
     * Path prefixes that are public together with everything below them.
     */
    #[serde(default = "default_public_prefixes")]
    pub public_prefixes: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub enum KeySource {
    /**
     * Shared secret for hmac algorithms.
     */
    #[serde(rename_all = "camelCase")]
    SharedSecret { secret: String },
    /**
     * PEM encoded public key file for rsa, ec and ed algorithms.
     */
    #[serde(rename_all = "camelCase")]
    PublicKeyFile { path: String },
}

fn default_session_cookie() -> String {
    "session_token".to_string()
}

fn default_sign_in_path() -> String {
    "/sign-in".to_string()
}

fn default_public_prefixes() -> Vec<String> {
    ["/sign-in", "/sign-up", "/api/auth", "/api/public", "/metrics"].iter().map(|prefix| (*prefix).to_string()).collect()
}

/**
 * Freshness, retention and retry settings of the list cache.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /**
     * Seconds a cached list is served without refetching.
     */
    pub fresh_secs: u64,
    /**
     * Seconds an unused list is kept before it is dropped.
     */
    pub retention_secs: u64,
    /**
     * Retries of a failed read. Authentication failures are never retried.
     */
    pub max_retries: u32,
    /**
     * Delay before the first retry in milliseconds. Doubles per retry, capped at 30 seconds.
     */
    pub retry_base_delay_ms: u64,
    /**
     * Maximum number of cached lists.
     */
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { fresh_secs: 5 * 60, retention_secs: 10 * 60, max_retries: 3, retry_base_delay_ms: 1000, max_capacity: 10_000 }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    /**
     * Largest accepted image in bytes.
     */
    pub max_image_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig { max_image_bytes: 5 * 1024 * 1024 }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleConfig {
    pub client_id: String,
    /**
     * Callback registered with Google.
     */
    pub redirect_uri: String,
    #[serde(default = "default_google_auth_endpoint")]
    pub auth_endpoint: String,
    #[serde(default = "default_google_scopes")]
    pub scopes: Vec<String>,
}

fn default_google_auth_endpoint() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_google_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/calendar".to_string(), "https://www.googleapis.com/auth/calendar.events".to_string()]
}

/**
 * Represents the server configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /**
     * Number of worker threads for the server.
     */
    pub workers: usize,
    /**
     * HTTP port for the server.
     */
    pub http_port: Option<u16>,
    /**
     * HTTPS configuration for the server.
     */
    pub https_config: Option<HttpsConfig>,
}

/**
 * Represents the HTTPS configuration for the server.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsConfig {
    /**
     * Port for the HTTPS server.
     */
    pub port: u16,
    /**
     * Path to the certificate file.
     */
    pub certificate_file: String,
    /**
     * Path to the private key file.
     */
    pub private_key_file: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            logging: LoggingConfig::default(),
            database: Database {
                db_type: DatabaseType::Postgresql {
                    connection_string: "".to_string(),
                    max_connections: 5,
                    min_connections: 1,
                    acquire_timeout: 30,
                    acquire_slow_threshold: 60,
                    idle_timeout: 300,
                    max_lifetime: 3600,
                },
            },
            security: AppSecurity {
                algorithm: "HS256".to_string(),
                verification_key: KeySource::SharedSecret { secret: "test".to_string() },
                session_cookie: default_session_cookie(),
                sign_in_path: default_sign_in_path(),
                public_paths: vec!["/".to_string()],
                public_prefixes: default_public_prefixes(),
            },
            server: Server { workers: 4, http_port: Some(8080), https_config: None },
            cache: CacheConfig::default(),
            upload: UploadConfig::default(),
            google: None,
        };
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.logging.target, deserialized.logging.target);
        assert_eq!(config.logging.directives, deserialized.logging.directives);
        assert_eq!(config.server.workers, deserialized.server.workers);
        assert_eq!(config.server.http_port, deserialized.server.http_port);
        assert!(deserialized.server.https_config.is_none());
        assert_eq!(deserialized.security.verification_key, KeySource::SharedSecret { secret: "test".to_string() });
        assert_eq!(deserialized.security.public_paths, vec!["/".to_string()]);
        assert_eq!(deserialized.cache.max_retries, 3);
        assert!(deserialized.google.is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config_str = r#"
            [logging]
            target = true
            threadIds = false
            threadNames = false
            lineNumber = false
            level = true
            ansi = false
            file = false
            directives = ["sqlx=warn"]

            [security]
            algorithm = "HS256"
            verificationKey = { sharedSecret = { secret = "secret" } }

            [server]
            workers = 2
            httpPort = 8080

            [database.dbType.postgresql]
            connectionString = "postgres://localhost/opd"
            maxConnections = 5
            minConnections = 1
            acquireTimeout = 1000
            acquireSlowThreshold = 500
            idleTimeout = 60000
            maxLifetime = 600000

            [google]
            clientId = "client"
            redirectUri = "https://example.org/api/google/callback"
        "#;
        let config: Config = toml::from_str(config_str).unwrap();
        assert_eq!(config.security.session_cookie, "session_token");
        assert_eq!(config.security.sign_in_path, "/sign-in");
        assert!(config.security.public_prefixes.contains(&"/api/public".to_string()));
        assert_eq!(config.cache.fresh_secs, 300);
        assert_eq!(config.cache.retention_secs, 600);
        assert_eq!(config.upload.max_image_bytes, 5 * 1024 * 1024);
        let google = config.google.unwrap();
        assert_eq!(google.auth_endpoint, "https://accounts.google.com/o/oauth2/v2/auth");
        assert_eq!(google.scopes.len(), 2);
    }

    #[test]
    fn test_sample_config() {
        let config: Config = toml::from_str(include_str!("../../config/opd_statistics_api.toml")).unwrap();
        assert_eq!(config.security.public_paths, vec!["/".to_string()]);
        assert_eq!(config.server.http_port, Some(8080));
        assert!(config.google.is_some());
    }
}
