//! Shepherd HTTP server: configuration and application assembly.
//!
//! The binary in `main.rs` loads a [`ServerConfig`], opens the SQLite store,
//! and serves [`app`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use shepherd_core::{
  lifecycle::{FollowUpConfig, TransitionPolicy},
  store::VisitorStore,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Server configuration, read from `config.toml` and `SHEPHERD_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path: PathBuf,
  #[serde(default)]
  pub follow_up:  FollowUpConfig,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// `SHEPHERD_PORT`, `SHEPHERD_STORE_PATH`, ...; nested keys use `__`, as in
/// `SHEPHERD_FOLLOW_UP__FORWARD_ONLY`.
pub fn environment() -> Environment {
  Environment::with_prefix("SHEPHERD")
    .prefix_separator("_")
    .separator("__")
}

/// Layer the optional TOML file at `path` under `env`.
pub fn load_config(path: PathBuf, env: Environment) -> Result<ServerConfig, ConfigError> {
  Config::builder()
    .add_source(File::from(path).required(false))
    .add_source(env)
    .build()?
    .try_deserialize()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the visitor API under `/api`, with request tracing.
pub fn app<S>(store: Arc<S>, policy: TransitionPolicy) -> Router
where
  S: VisitorStore + Send + Sync + 'static,
{
  Router::new()
    .nest("/api", shepherd_api::api_router(store, policy))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{FileFormat, Map};
  use shepherd_core::visitor::FollowUpStatus::*;
  use shepherd_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn follow_up_table_is_optional() {
    let cfg = parse(
      r#"
      host = "127.0.0.1"
      port = 8080
      store_path = "shepherd.db"
      "#,
    );
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert!(cfg.follow_up.policy().is_unrestricted());
  }

  #[test]
  fn forward_only_flag_restricts_transitions() {
    let cfg = parse(
      r#"
      host = "0.0.0.0"
      port = 8080
      store_path = "shepherd.db"

      [follow_up]
      forward_only = true
      "#,
    );
    let policy = cfg.follow_up.policy();
    assert!(policy.allows(Pending, Contacted));
    assert!(!policy.allows(Completed, Pending));
  }

  #[test]
  fn explicit_transitions_are_read() {
    let cfg = parse(
      r#"
      host = "0.0.0.0"
      port = 8080
      store_path = "shepherd.db"

      [follow_up.transitions]
      pending = ["contacted"]
      contacted = ["pending", "scheduled"]
      "#,
    );
    let policy = cfg.follow_up.policy();
    assert!(policy.allows(Contacted, Pending));
    assert!(!policy.allows(Pending, Scheduled));
    assert!(!policy.allows(Scheduled, Completed));
  }

  fn env(vars: &[(&str, &str)]) -> Environment {
    let map: Map<String, String> =
      vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    environment().source(Some(map))
  }

  #[test]
  fn environment_alone_is_enough() {
    let cfg = load_config(
      PathBuf::from("does-not-exist.toml"),
      env(&[
        ("SHEPHERD_HOST", "0.0.0.0"),
        ("SHEPHERD_PORT", "9000"),
        ("SHEPHERD_STORE_PATH", "/var/lib/shepherd.db"),
        ("SHEPHERD_FOLLOW_UP__FORWARD_ONLY", "true"),
      ]),
    )
    .unwrap();
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/shepherd.db"));
    assert!(!cfg.follow_up.policy().allows(Completed, Pending));
  }

  #[test]
  fn environment_overrides_file() {
    let path = std::env::temp_dir().join(format!("shepherd-cfg-{}.toml", std::process::id()));
    std::fs::write(&path, "host = \"127.0.0.1\"\nport = 8080\nstore_path = \"a.db\"\n").unwrap();
    let cfg = load_config(path.clone(), env(&[("SHEPHERD_PORT", "9100")])).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(cfg.address(), "127.0.0.1:9100");
    assert_eq!(cfg.store_path, PathBuf::from("a.db"));
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/var/x.db")), PathBuf::from("/var/x.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = app(Arc::new(store), TransitionPolicy::default());

    let req = Request::builder().uri("/api/visitors").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["count"], 0);

    let req = Request::builder().uri("/visitors").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
