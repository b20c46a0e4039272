use std::net::IpAddr;

use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub registration: RegistrationMode,
    pub max_body_size: usize,
    pub invitation_lifetime: Duration,
    /// Link placed in invitation emails. `{id}` is replaced with the invitation id.
    pub invitation_url: String,
    /// New accounts stay inactive until the emailed activation token is redeemed.
    pub require_activation: bool,
    /// `{token}` is replaced with the activation token.
    pub activation_url: String,
    pub worker_count: usize,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationMode {
    Open,
    /// Only the bootstrap (first) user may register.
    Closed,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("COBRA_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid COBRA_HOST: {e}"))?;

        let port: u16 = env_or("COBRA_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid COBRA_PORT: {e}"))?;

        let base_url = env_or("COBRA_BASE_URL", &format!("http://{host}:{port}"));

        let registration = parse_registration(&env_or("COBRA_REGISTRATION", "open"));

        let max_body_size: usize = env_or("COBRA_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid COBRA_MAX_BODY_SIZE: {e}"))?;

        let invitation_lifetime =
            parse_lifetime_hours(&env_or("COBRA_INVITATION_LIFETIME_HOURS", "24"))?;

        let invitation_url = env_or(
            "COBRA_INVITATION_URL",
            &format!("{}/invitations/{{id}}", base_url.trim_end_matches('/')),
        );

        let require_activation = parse_flag(&env_or("COBRA_REQUIRE_ACTIVATION", "false"));

        let activation_url = env_or(
            "COBRA_ACTIVATION_URL",
            &format!("{}/activate/{{token}}", base_url.trim_end_matches('/')),
        );

        let worker_count: usize = env_or("COBRA_WORKER_COUNT", "1")
            .parse()
            .map_err(|e| format!("Invalid COBRA_WORKER_COUNT: {e}"))?;

        let log_level = env_or("COBRA_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("COBRA_SMTP_HOST").ok(),
            std::env::var("COBRA_SMTP_PORT").ok(),
            std::env::var("COBRA_SMTP_USER").ok(),
            std::env::var("COBRA_SMTP_PASS").ok(),
            std::env::var("COBRA_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid COBRA_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            base_url,
            registration,
            max_body_size,
            invitation_lifetime,
            invitation_url,
            require_activation,
            activation_url,
            worker_count,
            log_level,
            smtp,
        })
    }

    pub fn invitation_link(&self, id: uuid::Uuid) -> String {
        self.invitation_url.replace("{id}", &id.to_string())
    }

    pub fn activation_link(&self, token: &str) -> String {
        self.activation_url.replace("{token}", token)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_registration(value: &str) -> RegistrationMode {
    match value {
        "closed" => RegistrationMode::Closed,
        _ => RegistrationMode::Open,
    }
}

fn parse_lifetime_hours(value: &str) -> Result<Duration, String> {
    let hours: i64 = value
        .parse()
        .map_err(|e| format!("Invalid COBRA_INVITATION_LIFETIME_HOURS: {e}"))?;
    if hours <= 0 {
        return Err("COBRA_INVITATION_LIFETIME_HOURS must be positive".to_string());
    }
    Ok(Duration::hours(hours))
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
