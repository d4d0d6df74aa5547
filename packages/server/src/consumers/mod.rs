pub mod rank;

pub use rank::consume_rank_jobs;
