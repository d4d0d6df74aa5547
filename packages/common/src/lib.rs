pub mod config;
pub mod mq;
pub mod rank_job;
pub mod storage;

pub use config::MqAppConfig;
pub use rank_job::RankJob;
