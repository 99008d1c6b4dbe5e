use std::time::Duration;

use anyhow::{Result, anyhow};
use quill_dal::user::{CreateUser, User, UserRepository};
use quill_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::debug;
use url::Url;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "quill-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub struct TestEnv {
    pub base_url: Url,
    pub pool: quill_dal::Pool,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestEnv {
    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("valid test URL")
    }

    /// Client with a cookie jar and redirects disabled, so tests can assert
    /// on redirect responses directly.
    pub fn client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(client)
    }

    /// Creates a user directly through the dal and returns a logged-in
    /// client for it.
    pub async fn login_new_user(&self, username: &str, roles: Option<Vec<String>>) -> Result<reqwest::Client> {
        let password = format!("{username}-password");
        register_user(&self.pool, username, &password, roles).await?;
        let client = self.client()?;
        login(&client, &self.base_url, username, &password).await?;
        Ok(client)
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
        (&mut self.handle).await.ok();
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
    }
}

/// Boots the real server with the given config and waits until it answers
/// health checks.
pub async fn launch_env(args: ServerConfig) -> Result<TestEnv> {
    let state = quill_server::build_state(&args).await?;
    let pool = state.pool().clone();
    let base_url = args.base_url.clone();

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let shutdown = async move {
            rx.await.ok();
        };
        if let Err(e) = quill_server::run_graceful_with_state(args, state, shutdown).await {
            tracing::error!("Test server failed: {e:#}");
        }
    });

    let env = TestEnv {
        base_url,
        pool,
        shutdown: Some(tx),
        handle,
    };

    let client = env.client()?;
    let health_url = env.url("health");
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(env),
            _ => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    Err(anyhow!("Server did not become healthy"))
}

pub async fn register_user(
    pool: &quill_dal::Pool,
    username: &str,
    password: &str,
    roles: Option<Vec<String>>,
) -> Result<User> {
    let repo = UserRepository::new(pool.clone());
    let user = repo
        .create(CreateUser {
            username: username.to_string(),
            email: None,
            password: Some(password.to_string()),
            roles,
        })
        .await?;
    Ok(user)
}

/// Logs in through the session endpoint and trades the session for the API
/// token cookie.
pub async fn login(
    client: &reqwest::Client,
    base_url: &Url,
    username: &str,
    password: &str,
) -> Result<()> {
    let response = client
        .post(base_url.join("auth/login")?)
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await?;
    debug!("Login response: {:#?}", response);
    if !response.status().is_redirection() {
        return Err(anyhow!("Login failed with status {}", response.status()));
    }

    let response = client.get(base_url.join("auth/token")?).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("Token request failed with {}", response.status()));
    }
    Ok(())
}
