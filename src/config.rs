use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub admin: Option<AdminSeed>,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailBackend {
    Smtp,
    Console,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub backend: MailBackend,
    /// Address used in the `From` header. Notifications are skipped when unset.
    pub sender: Option<String>,
    pub manager_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let jwt = JwtConfig {
            secret: required("SECRET")?,
            access_ttl_secs: parsed("ACCESS_TOKEN_TTL_SECS", 300)?,
            refresh_ttl_secs: parsed("REFRESH_TOKEN_TTL_SECS", 86_400)?,
        };

        let mail = MailConfig {
            backend: mail_backend(optional("MAIL_BACKEND").as_deref())?,
            sender: optional("EMAIL_HOST_USER"),
            manager_email: optional("MANAGER_EMAIL"),
            smtp_host: optional("EMAIL_HOST"),
            smtp_port: parsed("EMAIL_PORT", 587)?,
            smtp_password: optional("EMAIL_HOST_PASSWORD"),
        };

        let admin = match (optional("ADMIN_USERNAME"), optional("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminSeed {
                username,
                password,
                email: optional("ADMIN_EMAIL").unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(AppConfig {
            database_url,
            bind_addr,
            jwt,
            mail,
            admin,
        })
    }
}

fn mail_backend(value: Option<&str>) -> Result<MailBackend, ConfigError> {
    match value {
        Some("smtp") => Ok(MailBackend::Smtp),
        Some("console") | None => Ok(MailBackend::Console),
        Some(other) => Err(ConfigError::Invalid {
            name: "MAIL_BACKEND",
            value: other.to_string(),
        }),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_backend_accepts_smtp_and_console_only() {
        assert_eq!(mail_backend(None).unwrap(), MailBackend::Console);
        assert_eq!(mail_backend(Some("console")).unwrap(), MailBackend::Console);
        assert_eq!(mail_backend(Some("smtp")).unwrap(), MailBackend::Smtp);
        assert!(matches!(
            mail_backend(Some("memory")),
            Err(ConfigError::Invalid { name: "MAIL_BACKEND", .. })
        ));
    }
}
