use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub smtp: SmtpConfig,
    pub worker: WorkerSettings,
    pub frontend_base_url: String,
    pub staff_notify_email: Option<String>,
    /// `host:port` for the health listener; hostnames are resolved at bind time.
    pub health_addr: Option<String>,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    pub from: String,
    pub tls: TlsMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TlsMode {
    /// Implicit TLS from the first byte (SMTPS, port 465).
    Wrapper,
    /// STARTTLS must succeed.
    StartTls,
    /// STARTTLS when the server offers it, plaintext otherwise.
    Opportunistic,
    None,
}

impl std::fmt::Display for TlsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TlsMode::Wrapper => "wrapper",
            TlsMode::StartTls => "starttls",
            TlsMode::Opportunistic => "opportunistic",
            TlsMode::None => "none",
        };
        f.write_str(s)
    }
}

/// Knobs for the outbox delivery loop.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
    pub send_timeout: Duration,
    pub max_error_len: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            batch_size: 10,
            max_attempts: 5,
            send_timeout: Duration::from_secs(30),
            max_error_len: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let database_url = env.required("DATABASE_URL")?;

        let smtp_host = env.or("SMTP_HOST", "mailhog");
        let smtp_port: u16 = env.parse("SMTP_PORT", "1025")?;

        let credentials = env
            .optional("SMTP_USER")
            .map(|user| (user, env.or("SMTP_PASS", "")));

        let default_tls = if smtp_port == 465 { "wrapper" } else { "opportunistic" };
        let tls = match env.or("SMTP_TLS", default_tls).to_ascii_lowercase().as_str() {
            "wrapper" | "tls" => TlsMode::Wrapper,
            "starttls" => TlsMode::StartTls,
            "opportunistic" => TlsMode::Opportunistic,
            "none" => TlsMode::None,
            other => return Err(format!("Invalid SMTP_TLS: {other}")),
        };

        let smtp = SmtpConfig {
            host: smtp_host,
            port: smtp_port,
            credentials,
            from: env.or("SMTP_FROM", "noreply@helpdesk.local"),
            tls,
        };

        let poll_interval_ms: u64 = env.parse("POLL_INTERVAL_MS", "5000")?;
        if poll_interval_ms == 0 {
            return Err("Invalid POLL_INTERVAL_MS: must be greater than zero".to_string());
        }

        let batch_size: i64 = env.parse("MAILER_BATCH_SIZE", "10")?;
        if batch_size < 1 {
            return Err("Invalid MAILER_BATCH_SIZE: must be at least 1".to_string());
        }

        let max_attempts: i32 = env.parse("MAILER_MAX_ATTEMPTS", "5")?;
        if max_attempts < 1 {
            return Err("Invalid MAILER_MAX_ATTEMPTS: must be at least 1".to_string());
        }

        let send_timeout_secs: u64 = env.parse("MAILER_SEND_TIMEOUT_SECS", "30")?;
        if send_timeout_secs == 0 {
            return Err("Invalid MAILER_SEND_TIMEOUT_SECS: must be greater than zero".to_string());
        }

        let max_error_len: usize = env.parse("MAILER_MAX_ERROR_LEN", "1000")?;
        if max_error_len == 0 {
            return Err("Invalid MAILER_MAX_ERROR_LEN: must be greater than zero".to_string());
        }

        let worker = WorkerSettings {
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size,
            max_attempts,
            send_timeout: Duration::from_secs(send_timeout_secs),
            max_error_len,
        };

        let health_addr = match env.optional("MAILER_HEALTH_ADDR") {
            Some(addr) => Some(parse_host_port(addr.trim())?),
            None => None,
        };

        Ok(Config {
            database_url,
            smtp,
            worker,
            frontend_base_url: env.or("FRONTEND_BASE_URL", "http://localhost:5173"),
            staff_notify_email: env.optional("STAFF_NOTIFY_EMAIL"),
            health_addr,
            log_level: env.or("MAILER_LOG_LEVEL", "info"),
        })
    }
}

fn parse_host_port(addr: &str) -> Result<String, String> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| format!("Invalid MAILER_HEALTH_ADDR '{addr}': expected host:port"))?;
    if host.is_empty() {
        return Err(format!("Invalid MAILER_HEALTH_ADDR '{addr}': missing host"));
    }
    port.parse::<u16>()
        .map_err(|e| format!("Invalid MAILER_HEALTH_ADDR port '{port}': {e}"))?;
    Ok(addr.to_string())
}

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, String> {
        self.optional(key)
            .ok_or_else(|| format!("Missing required environment variable: {key}"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: &str) -> Result<T, String>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or(key, default)
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {key}: {e}"))
    }
}
