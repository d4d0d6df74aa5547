use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ::common::storage::UploadStore;
use reqwest::Client;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tempfile::TempDir;

use podium::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, MqAppConfig, ServerConfig, UploadConfig,
};
use podium::entity::user;
use podium::evaluation::queue::{QueueError, TaskQueue};
use podium::evaluation::signals::SignalDispatcher;
use podium::notify::{EmailError, Mailer, OutgoingEmail};
use podium::state::AppState;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const CHALLENGES: &str = "/api/v1/challenges";
    pub const EDITOR_UPLOAD: &str = "/editor/upload";
    pub const EDITOR_BROWSE: &str = "/editor/browse";
    pub const TEST_UPLOAD: &str = "/api/v1/debug/test-upload";

    pub fn config(id: i32) -> String {
        format!("/api/v1/challenges/{id}/config")
    }

    pub fn methods(id: i32) -> String {
        format!("/api/v1/challenges/{id}/methods")
    }

    pub fn submissions(id: i32) -> String {
        format!("/api/v1/challenges/{id}/submissions")
    }

    pub fn legacy_submissions(id: i32) -> String {
        format!("/api/v1/challenges/{id}/submissions/legacy")
    }

    pub fn jobs(id: i32) -> String {
        format!("/api/v1/challenges/{id}/jobs")
    }

    pub fn results(id: i32) -> String {
        format!("/api/v1/challenges/{id}/results")
    }

    pub fn result(id: i32, pk: &str) -> String {
        format!("/api/v1/challenges/{id}/results/{pk}")
    }

    pub fn project_upload(short_name: &str) -> String {
        format!("/editor/projects/{short_name}/upload")
    }

    pub fn project_browse(short_name: &str) -> String {
        format!("/editor/projects/{short_name}/browse")
    }
}

/// Records rank requests instead of publishing them.
#[derive(Default)]
pub struct RecordingQueue {
    requests: Mutex<Vec<i32>>,
}

impl RecordingQueue {
    pub fn requests(&self) -> Vec<i32> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue_rank(&self, challenge_id: i32) -> Result<(), QueueError> {
        self.requests.lock().unwrap().push(challenge_id);
        Ok(())
    }
}

/// Keeps every message handed to it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// A running test server backed by a throwaway SQLite file and media tree.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub queue: Arc<RecordingQueue>,
    pub mailer: Arc<RecordingMailer>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let media_root = dir.path().join("media");

        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let mut app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                debug: true,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 5,
                min_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
            },
            mq: MqAppConfig {
                enabled: false,
                ..Default::default()
            },
            uploads: UploadConfig {
                upload_root: media_root.join("uploads"),
                media_root: media_root.clone(),
                media_url: "/media/".to_string(),
                upload_prefix: None,
                restrict_by_user: false,
                projects_root: media_root.join("projects"),
                public_folder_name: "public_html".to_string(),
                site_prefix: "/site".to_string(),
                max_upload_size: 4 * 1024 * 1024,
            },
            email: None,
        };
        configure(&mut app_config);

        let db = podium::database::init_db(&app_config.database)
            .await
            .expect("Failed to initialize test database");

        let uploads = UploadStore::new(app_config.uploads.upload_root.clone())
            .await
            .expect("Failed to create upload root");

        let queue = Arc::new(RecordingQueue::default());
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState {
            db: db.clone(),
            config: app_config.clone(),
            signals: Arc::new(SignalDispatcher::new(queue.clone(), mailer.clone())),
            uploads: Arc::new(uploads),
        };

        let app = podium::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            config: app_config,
            queue,
            mailer,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Where a `/media/...` URL handed out by the server lives on disk.
    pub fn media_path(&self, url: &str) -> PathBuf {
        let relative = url
            .strip_prefix("/media/")
            .expect("URL should live under /media/");
        self.config.uploads.media_root.join(relative)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_bytes(&self, path: &str) -> (u16, Vec<u8>) {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        let status = res.status().as_u16();
        let bytes = res.bytes().await.expect("Failed to read body").to_vec();
        (status, bytes)
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn put_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    /// Send `file_bytes` as the multipart field `field`.
    pub async fn upload_with_token(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Upload through the editor endpoint the way CKEditor does.
    pub async fn editor_upload(
        &self,
        path: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        self.upload_with_token(
            &format!("{path}?CKEditorFuncNum=1"),
            "upload",
            file_name,
            file_bytes,
            token,
        )
        .await
    }

    /// Register a user and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "email": format!("{username}@example.org"),
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        self.login(username, password).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &serde_json::json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Register a user with a specific role, then log in and return the auth token.
    pub async fn create_user_with_role(
        &self,
        username: &str,
        password: &str,
        role: &str,
    ) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "email": format!("{username}@example.org"),
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let db_user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");

        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(role.to_string());
        user::Entity::update(active)
            .exec(&self.db)
            .await
            .expect("Failed to update user role");

        self.login(username, password).await
    }

    /// Create a challenge via the API and return its `id`.
    pub async fn create_challenge(&self, token: &str, short_name: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::CHALLENGES,
                &serde_json::json!({
                    "short_name": short_name,
                    "title": format!("Challenge {short_name}"),
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_challenge failed: {}", res.text);
        res.id()
    }

    /// Register an evaluation method and return its id.
    pub async fn create_method(&self, challenge_id: i32, token: &str, image: &str) -> String {
        let res = self
            .post_with_token(
                &routes::methods(challenge_id),
                &serde_json::json!({"image": image}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_method failed: {}", res.text);
        res.uuid()
    }

    /// Store a result via the API and return the response body.
    pub async fn create_result(&self, challenge_id: i32, token: &str, body: Value) -> Value {
        let res = self
            .post_with_token(&routes::results(challenge_id), &body, token)
            .await;
        assert_eq!(res.status, 201, "create_result failed: {}", res.text);
        res.body
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }

    pub fn uuid(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain a UUID 'id'")
            .to_string()
    }

    /// The value handed to `CKEDITOR.tools.callFunction` by an upload response.
    pub fn callback_value(&self) -> String {
        let start = self
            .text
            .find("callFunction(")
            .expect("response should call back into the editor");
        let rest = &self.text[start..];
        let open = rest.find('\'').expect("callback value should be quoted") + 1;
        let close = rest[open..].find('\'').expect("unterminated callback value") + open;
        rest[open..close].to_string()
    }
}
