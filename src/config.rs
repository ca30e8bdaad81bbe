use std::env;
use std::time::Duration;

const BCCR_TABLE_URL: &str = "https://gee.bccr.fi.cr/indicadoreseconomicos/Cuadros/frmVerCatCuadro.aspx";

fn bccr_table(code: u32) -> String {
    format!(
        "{}?CodCuadro={}&Idioma=1&FecInicial={{from}}&FecFinal={{to}}&Filtro={{filter}}",
        BCCR_TABLE_URL, code
    )
}

/// Source URL templates; `{from}`, `{to}` and `{filter}` are substituted per request.
#[derive(Debug, Clone)]
pub struct SourceUrls {
    pub exchange_rate: String,
    pub basic_passive_rate: String,
    pub monetary_policy_rate: String,
    pub prime_rate: String,
    pub inflation_costa_rica: String,
    pub inflation_usa: Option<String>,
    pub treasury_rate_usa: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            exchange_rate: bccr_table(400),
            basic_passive_rate: bccr_table(17),
            monetary_policy_rate: bccr_table(779),
            prime_rate: bccr_table(60),
            inflation_costa_rica: bccr_table(2732),
            inflation_usa: None,
            treasury_rate_usa: bccr_table(677),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub urls: SourceUrls,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub request_timeout: Duration,
    pub request_interval: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 8081,
            allowed_origins: Vec::new(),
            urls: SourceUrls::default(),
            supabase_url: None,
            supabase_key: None,
            request_timeout: Duration::from_secs(30),
            request_interval: Duration::ZERO,
        }
    }

    /// Reads the environment (and a `.env` file when present) over the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::new();

        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Some(origins) = var("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        let urls = &mut config.urls;
        override_with(&mut urls.exchange_rate, "EXCHANGE_RATE_URL");
        override_with(&mut urls.basic_passive_rate, "TBP_URL");
        override_with(&mut urls.monetary_policy_rate, "MONETARY_POLICY_RATE_URL");
        override_with(&mut urls.prime_rate, "PRIME_RATE_URL");
        override_with(&mut urls.inflation_costa_rica, "INFLATION_COSTA_RICA_URL");
        override_with(&mut urls.treasury_rate_usa, "TREASURY_RATE_USA_URL");
        urls.inflation_usa = var("INFLATION_USA_URL");

        config.supabase_url = var("SUPABASE_URL");
        config.supabase_key = var("SUPABASE_KEY");

        if let Some(secs) = var("REQUEST_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = var("REQUEST_INTERVAL_MS").and_then(|s| s.parse().ok()) {
            config.request_interval = Duration::from_millis(ms);
        }

        config
    }

    /// Port the HTTP server binds on
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Origins (matched as substrings of the `Origin` header) echoed by CORS
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Minimum spacing between two outgoing scrape requests; zero disables it
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn override_with(target: &mut String, name: &str) {
    if let Some(value) = var(name) {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_templates_point_at_bccr_tables() {
        let urls = SourceUrls::default();
        assert!(urls.exchange_rate.contains("CodCuadro=400"));
        assert!(urls.basic_passive_rate.contains("CodCuadro=17&"));
        assert!(urls.treasury_rate_usa.contains("FecInicial={from}&FecFinal={to}&Filtro={filter}"));
        assert!(urls.inflation_usa.is_none());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::new()
            .with_port(9000)
            .with_allowed_origins(vec!["example.com".into()])
            .with_request_interval(Duration::from_millis(250));
        assert_eq!(config.port, 9000);
        assert_eq!(config.allowed_origins, vec!["example.com".to_string()]);
        assert_eq!(config.request_interval, Duration::from_millis(250));
        assert!(config.supabase_url.is_none());
    }
}
