use std::env;
use log::{info, error};

const DEFAULT_MESOMB_URL: &str = "https://mesomb.hachther.com";

#[derive(Clone)]
pub struct MesombConfig {
    pub app_key: String,
    pub access_key: String,
    pub secret_key: String,
    pub base_url: String,
}

impl MesombConfig {
    pub fn is_configured(&self) -> bool {
        !self.app_key.is_empty() && !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

/// Storefront identity used in share pages and referral links.
#[derive(Clone)]
pub struct SiteConfig {
    pub name: String,
    pub frontend_url: String,
}

/// Credentials for the first super admin, read from `SUPER_ADMIN_*`.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub jwt_secret: String,
    pub user_token_days: i64,
    pub admin_token_hours: i64,
    pub frontend_url: String,
    pub site_name: String,
    pub mesomb: MesombConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mesomb = MesombConfig {
            app_key: env::var("MESOMB_APP_KEY").unwrap_or_default(),
            access_key: env::var("MESOMB_ACCESS_KEY").unwrap_or_default(),
            secret_key: env::var("MESOMB_SECRET_KEY").unwrap_or_default(),
            base_url: env_or("MESOMB_BASE_URL", DEFAULT_MESOMB_URL),
        };

        Ok(AppConfig {
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: parse_env("SERVER_PORT", 4000)?,
            log_level: env_or("LOG_LEVEL", "info"),
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_database: env_or("MONGODB_DATABASE", "ecommerce"),
            jwt_secret: required("JWT_SECRET")?,
            user_token_days: parse_env("JWT_EXPIRY_DAYS", 7)?,
            admin_token_hours: parse_env("ADMIN_JWT_EXPIRY_HOURS", 24)?,
            frontend_url: env_or("FRONTEND_URL", "http://localhost:5173"),
            site_name: env_or("SITE_NAME", "Shop"),
            mesomb,
            bootstrap_admin: bootstrap_admin(),
        })
    }

    pub fn site(&self) -> SiteConfig {
        SiteConfig {
            name: self.site_name.clone(),
            frontend_url: self.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Logged once the logger is up, since loading happens before it.
    pub fn log_summary(&self) {
        info!("MongoDB database: {}", self.mongodb_database);
        info!("Storefront URL: {}", self.frontend_url);
        if self.mesomb.is_configured() {
            info!("MeSomb credentials loaded for application key starting with {}",
                self.mesomb.app_key.chars().take(6).collect::<String>());
        } else {
            error!("MeSomb credentials are missing - mobile money payments will fail!");
        }
    }
}

fn bootstrap_admin() -> Option<BootstrapAdmin> {
    let email = env::var("SUPER_ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty())?;
    let password = env::var("SUPER_ADMIN_PASSWORD").ok().filter(|v| !v.is_empty())?;
    Some(BootstrapAdmin {
        username: env_or("SUPER_ADMIN_USERNAME", "admin"),
        email,
        password,
    })
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("{} must be set", name).into()),
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("{} must be a number: {}", name, e).into()),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_defaults_and_errors() {
        assert_eq!(parse_env::<u16>("SHOP_TEST_UNSET_PORT", 4000).unwrap(), 4000);

        env::set_var("SHOP_TEST_BAD_PORT", "forty");
        let err = parse_env::<u16>("SHOP_TEST_BAD_PORT", 4000).unwrap_err();
        assert!(err.to_string().contains("SHOP_TEST_BAD_PORT must be a number"));

        env::set_var("SHOP_TEST_GOOD_PORT", " 8080 ");
        assert_eq!(parse_env::<u16>("SHOP_TEST_GOOD_PORT", 4000).unwrap(), 8080);
    }

    #[test]
    fn test_required_rejects_blank() {
        env::set_var("SHOP_TEST_BLANK_SECRET", "  ");
        assert!(required("SHOP_TEST_BLANK_SECRET").is_err());
        assert!(required("SHOP_TEST_UNSET_SECRET").is_err());
    }

    #[test]
    fn test_mesomb_configured_needs_all_keys() {
        let mut config = MesombConfig {
            app_key: "app".into(),
            access_key: "access".into(),
            secret_key: String::new(),
            base_url: DEFAULT_MESOMB_URL.into(),
        };
        assert!(!config.is_configured());
        config.secret_key = "secret".into();
        assert!(config.is_configured());
    }
}
