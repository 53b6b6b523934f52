pub const SENTIMENT_HISTORY: &str = "sentiment_history";
pub const CONFIG_VERSIONS: &str = "config_versions";
