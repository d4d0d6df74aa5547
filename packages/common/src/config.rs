use serde::Deserialize;

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. Default: true.
    /// When disabled, rank recalculation requests are logged and dropped.
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue carrying rank recalculation jobs. Default: "rank_jobs".
    #[serde(default = "default_rank_queue_name")]
    pub rank_queue_name: String,
    /// Whether this process also consumes the rank queue. Default: true.
    #[serde(default = "default_consume_ranks")]
    pub consume_ranks: bool,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_rank_queue_name() -> String {
    "rank_jobs".into()
}
fn default_consume_ranks() -> bool {
    true
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            rank_queue_name: default_rank_queue_name(),
            consume_ranks: default_consume_ranks(),
        }
    }
}
