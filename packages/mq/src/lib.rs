pub mod error;
pub mod models;

pub use error::MqError;
pub use models::{BrokerMessage, BroccoliError, MqConfig, MqQueue, init_mq, publish};

pub type Mq = MqQueue;
