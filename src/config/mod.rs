use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub tables: TableConfig,
    pub storage: StorageConfig,
    pub thumbnail: ThumbnailConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// How the Parse stage treats a request body that is absent or not a JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPolicy {
    /// Absent, empty, malformed and non-object bodies all parse as an empty mapping
    Lenient,
    /// Absent or empty bodies parse as an empty mapping; malformed bodies are rejected
    Strict,
}

impl std::str::FromStr for BodyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(BodyPolicy::Lenient),
            "strict" => Ok(BodyPolicy::Strict),
            other => Err(format!("unknown body policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Base URL clients use to reach this service; signed storage URLs are rooted here
    pub public_base_url: String,
    pub body_policy: BodyPolicy,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub category_table: String,
    pub product_table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub signing_secret: String,
    pub signed_url_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    /// Path segment marking uploaded originals, e.g. `images/products/abc.png`
    pub source_segment: String,
    /// Path segment substituted for the source segment in derived keys
    pub derived_segment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub confirmation_code_ttl_hours: u64,
    /// bcrypt work factor for stored passwords
    pub password_cost: u32,
    /// Usernames granted the admin role when they sign up
    pub bootstrap_admins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("HOST") {
            self.api.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("PUBLIC_BASE_URL") {
            self.api.public_base_url = v;
        }
        if let Ok(v) = env::var("API_BODY_POLICY") {
            self.api.body_policy = v.parse().unwrap_or(self.api.body_policy);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        // Table overrides
        if let Ok(v) = env::var("CATEGORY_TABLE_NAME") {
            self.tables.category_table = v;
        }
        if let Ok(v) = env::var("PRODUCT_TABLE_NAME") {
            self.tables.product_table = v;
        }

        // Storage overrides
        if let Ok(v) = env::var("S3_BUCKET_NAME") {
            self.storage.bucket = v;
        }
        if let Ok(v) = env::var("STORAGE_SIGNING_SECRET") {
            self.storage.signing_secret = v;
        }
        if let Ok(v) = env::var("STORAGE_SIGNED_URL_TTL_SECS") {
            self.storage.signed_url_ttl_secs = v.parse().unwrap_or(self.storage.signed_url_ttl_secs);
        }

        // Thumbnail overrides
        if let Ok(v) = env::var("THUMBNAIL_WIDTH") {
            self.thumbnail.width = v.parse().unwrap_or(self.thumbnail.width);
        }
        if let Ok(v) = env::var("THUMBNAIL_HEIGHT") {
            self.thumbnail.height = v.parse().unwrap_or(self.thumbnail.height);
        }

        // Identity overrides
        if let Ok(v) = env::var("IDENTITY_CONFIRMATION_CODE_TTL_HOURS") {
            self.identity.confirmation_code_ttl_hours =
                v.parse().unwrap_or(self.identity.confirmation_code_ttl_hours);
        }
        if let Ok(v) = env::var("IDENTITY_PASSWORD_COST") {
            self.identity.password_cost = v.parse().unwrap_or(self.identity.password_cost);
        }
        if let Ok(v) = env::var("IDENTITY_BOOTSTRAP_ADMINS") {
            self.identity.bootstrap_admins = split_list(&v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                public_base_url: "http://127.0.0.1:3000".to_string(),
                body_policy: BodyPolicy::Lenient,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: "development-secret".to_string(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            tables: TableConfig::default(),
            storage: StorageConfig {
                bucket: "catalog-media-dev".to_string(),
                signing_secret: "development-signing-secret".to_string(),
                signed_url_ttl_secs: 900,
            },
            thumbnail: ThumbnailConfig::default(),
            identity: IdentityConfig {
                confirmation_code_ttl_hours: 24,
                password_cost: bcrypt::DEFAULT_COST,
                bootstrap_admins: Vec::new(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_base_url: "https://staging.example.com".to_string(),
                body_policy: BodyPolicy::Lenient,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 8,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            tables: TableConfig::default(),
            storage: StorageConfig {
                bucket: "catalog-media-staging".to_string(),
                signing_secret: String::new(),
                signed_url_ttl_secs: 900,
            },
            thumbnail: ThumbnailConfig::default(),
            identity: IdentityConfig {
                confirmation_code_ttl_hours: 24,
                password_cost: bcrypt::DEFAULT_COST,
                bootstrap_admins: Vec::new(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_base_url: "https://api.example.com".to_string(),
                body_policy: BodyPolicy::Strict,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 1,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            tables: TableConfig::default(),
            storage: StorageConfig {
                bucket: "catalog-media".to_string(),
                signing_secret: String::new(),
                signed_url_ttl_secs: 300,
            },
            thumbnail: ThumbnailConfig::default(),
            identity: IdentityConfig {
                confirmation_code_ttl_hours: 24,
                password_cost: bcrypt::DEFAULT_COST,
                bootstrap_admins: Vec::new(),
            },
        }
    }

    /// Development defaults without environment overrides, for tests and local tooling
    pub fn for_tests() -> Self {
        let mut config = Self::development();
        // Lowest work factor bcrypt accepts
        config.identity.password_cost = 4;
        config
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            category_table: "categories".to_string(),
            product_table: "products".to_string(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            source_segment: "images".to_string(),
            derived_segment: "thumbnails".to_string(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
