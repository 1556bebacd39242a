/// Chat API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Shared HS256 secret used to verify access tokens issued by the user API.
    pub jwt_secret: String,
    /// Base URL of the notification API (e.g. `http://localhost:8082`).
    pub notification_service_url: String,
    /// Per-request timeout for notification delivery, in seconds.
    pub notification_timeout_secs: u64,
    /// Bound on queued hub commands before senders wait.
    pub hub_queue_capacity: usize,
    /// Port the HTTP server binds to.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_var("DATABASE_URL"),
            jwt_secret: required_var("JWT_SECRET"),
            notification_service_url: std::env::var("NOTIFICATION_SERVICE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://localhost:8082".to_string()),
            notification_timeout_secs: parsed_var("NOTIFICATION_TIMEOUT_SECS").unwrap_or(5),
            hub_queue_capacity: parsed_var("HUB_QUEUE_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(1024),
            port: parsed_var("PORT").unwrap_or(8081),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
