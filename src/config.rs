use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Where uploaded images end up.
#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    Local {
        root: String,
        public_base_url: String,
    },
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
        public_base_url: String,
    },
}

/// Site-wide values shown on the admin settings page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_description: String,
    pub maintenance_mode: bool,
    pub max_file_size: u64,
    pub allowed_file_types: String,
    pub email_enabled: bool,
    pub email_server: String,
    pub notification_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub site: SiteSettings,
    pub admin: SeedAdmin,
}

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@foodvault.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "Admin@123456";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "foodvault"),
            audience: env_or("JWT_AUDIENCE", "foodvault-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let storage = match env_or("STORAGE_BACKEND", "local").to_lowercase().as_str() {
            "s3" | "minio" => {
                let endpoint = std::env::var("MINIO_ENDPOINT")?;
                let bucket = std::env::var("MINIO_BUCKET")?;
                StorageConfig::S3 {
                    public_base_url: env_or(
                        "PUBLIC_BASE_URL",
                        &format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
                    ),
                    access_key: std::env::var("MINIO_ACCESS_KEY")?,
                    secret_key: std::env::var("MINIO_SECRET_KEY")?,
                    region: env_or("MINIO_REGION", "us-east-1"),
                    endpoint,
                    bucket,
                }
            }
            "local" => StorageConfig::Local {
                root: env_or("LOCAL_STORAGE_ROOT", "./uploads"),
                public_base_url: env_or("PUBLIC_BASE_URL", "/uploads"),
            },
            other => anyhow::bail!("unknown STORAGE_BACKEND: {other}"),
        };

        let site = SiteSettings {
            site_name: env_or("SITE_NAME", "FoodVault"),
            site_description: env_or("SITE_DESCRIPTION", "Recipe management system"),
            maintenance_mode: env_parse("MAINTENANCE_MODE", false),
            max_file_size: env_parse("MAX_FILE_SIZE", 5 * 1024 * 1024),
            allowed_file_types: env_or("ALLOWED_FILE_TYPES", "jpg,jpeg,png,webp"),
            email_enabled: env_parse("EMAIL_ENABLED", false),
            email_server: env_or("EMAIL_SERVER", ""),
            notification_enabled: env_parse("NOTIFICATION_ENABLED", true),
        };

        let admin = SeedAdmin {
            email: env_or("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            password: env_or("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
            site,
            admin,
        })
    }
}
