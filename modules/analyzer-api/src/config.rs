use std::env;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Abacus.ai deployment
    pub abacus_deployment_token: String,
    pub abacus_deployment_id: String,
    pub abacus_api_key: String,
    pub abacus_api_url: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            abacus_deployment_token: required_env("ABACUS_DEPLOYMENT_TOKEN"),
            abacus_deployment_id: required_env("ABACUS_DEPLOYMENT_ID"),
            abacus_api_key: required_env("ABACUS_API_KEY"),
            abacus_api_url: env::var("ABACUS_API_URL").ok(),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
