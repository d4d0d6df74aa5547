use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::UploadStore;
use mq::{MqConfig, init_mq};
use tracing::info;
use tracing_subscriber::EnvFilter;

use podium::config::AppConfig;
use podium::consumers::consume_rank_jobs;
use podium::evaluation::queue::{DisabledQueue, MqTaskQueue, TaskQueue};
use podium::evaluation::signals::SignalDispatcher;
use podium::notify::{LogMailer, Mailer, SmtpMailer};
use podium::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = podium::database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database ready");

    let uploads = UploadStore::new(config.uploads.upload_root.clone())
        .await
        .context("Failed to prepare upload root")?;

    let queue: Arc<dyn TaskQueue> = if config.mq.enabled {
        let mq = Arc::new(
            init_mq(MqConfig {
                url: config.mq.url.clone(),
                pool_size: config.mq.pool_size,
            })
            .await
            .context("Failed to initialize MQ")?,
        );
        info!(queue_name = %config.mq.rank_queue_name, "MQ connected");

        if config.mq.consume_ranks {
            tokio::spawn(consume_rank_jobs(
                db.clone(),
                Arc::clone(&mq),
                config.mq.rank_queue_name.clone(),
            ));
        }
        Arc::new(MqTaskQueue::new(mq, config.mq.rank_queue_name.clone()))
    } else {
        info!("MQ disabled, rank recalculation requests will be dropped");
        Arc::new(DisabledQueue)
    };

    let mailer: Arc<dyn Mailer> = match &config.email {
        Some(email) => Arc::new(SmtpMailer::new(email).context("Failed to configure SMTP")?),
        None => {
            info!("No email section configured, notifications will only be logged");
            Arc::new(LogMailer)
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config,
        signals: Arc::new(SignalDispatcher::new(queue, mailer)),
        uploads: Arc::new(uploads),
    };

    let app = podium::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
