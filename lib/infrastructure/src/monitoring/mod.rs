use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    pub service_name: String,
    pub logs: EnvFilterConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EnvFilterConfig {
    pub default_level: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

impl TryInto<EnvFilter> for EnvFilterConfig {
    type Error = tracing_subscriber::filter::ParseError;

    fn try_into(self) -> Result<EnvFilter, Self::Error> {
        EnvFilter::builder()
            .with_default_directive(self.default_level.parse()?)
            .parse(self.filters.join(","))
    }
}

impl MonitoringConfig {
    pub fn init(&self) -> anyhow::Result<()> {
        let filter: EnvFilter = self.logs.clone().try_into()?;
        let fmt_layer = tracing_subscriber::fmt::layer();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();

        tracing::debug!("Logging initialized for {}", self.service_name);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_config_parses_directives() {
        let config = EnvFilterConfig {
            default_level: "warn".to_owned(),
            filters: vec!["app=debug".to_owned(), "webasto=info".to_owned()],
        };

        let filter: EnvFilter = config.try_into().unwrap();
        assert!(format!("{}", filter).contains("app=debug"));
    }

    #[test]
    fn invalid_level_is_rejected() {
        let config = EnvFilterConfig {
            default_level: "noisy".to_owned(),
            filters: vec![],
        };

        let result: Result<EnvFilter, _> = config.try_into();
        assert!(result.is_err());
    }
}
