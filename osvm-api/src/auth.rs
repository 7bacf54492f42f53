//! Keystone authentication and the per-host token cache.
//!
//! Tokens are cached in a JSON store keyed by host so repeated commands reuse
//! a live token instead of re-authenticating. An expired cached token is
//! treated the same as a missing one.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use osvm_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http;

const TOKEN_FILE: &str = ".osvm.token";

/// A scoped identity token plus the service catalog extracted from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub host: String,
    pub expires_at: DateTime<Utc>,
    /// service type (`compute`, `volumev3`, `network`, `image`) -> public URL
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
    #[serde(default)]
    pub project: String,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Look up a service endpoint; a missing endpoint is a hard precondition
    /// failure before any call is attempted.
    pub fn endpoint(&self, service: &str) -> Result<String> {
        match self.endpoints.get(service) {
            Some(url) if !url.is_empty() => Ok(url.clone()),
            _ => Err(Error::Precondition(format!(
                "no '{service}' endpoint in token catalog; re-authenticate or check your catalog"
            ))),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenStore {
    tokens: HashMap<String, Token>,
}

fn token_file() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Precondition("could not determine home directory".into()))?;
    Ok(home.join(TOKEN_FILE))
}

fn load_store(path: &PathBuf) -> TokenStore {
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
        Err(_) => TokenStore::default(),
    }
}

/// Persist a token, replacing any previous token for the same host.
pub fn save_token(token: &Token) -> Result<()> {
    let path = token_file()?;
    save_token_at(token, &path)
}

fn save_token_at(token: &Token, path: &PathBuf) -> Result<()> {
    let mut store = load_store(path);
    store.tokens.insert(token.host.clone(), token.clone());

    let data = serde_json::to_string_pretty(&store)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Load the cached token for a host, rejecting expired entries.
pub fn load_token(host: &str) -> Result<Token> {
    let path = token_file()?;
    load_token_at(host, &path)
}

fn load_token_at(host: &str, path: &PathBuf) -> Result<Token> {
    let store = load_store(path);
    let token = store.tokens.get(host).ok_or_else(|| Error::TokenInvalid {
        host: host.to_string(),
    })?;
    if token.is_expired() {
        return Err(Error::TokenInvalid {
            host: host.to_string(),
        });
    }
    Ok(token.clone())
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: AuthResponseToken,
}

#[derive(Debug, Deserialize)]
struct AuthResponseToken {
    expires_at: DateTime<Utc>,
    #[serde(default)]
    catalog: Vec<CatalogService>,
}

#[derive(Debug, Deserialize)]
struct CatalogService {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    interface: String,
    url: String,
}

fn password_payload(domain: &str, project: &str, user: &str, password: &str) -> serde_json::Value {
    json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": user,
                        "domain": { "name": domain },
                        "password": password,
                    }
                }
            },
            "scope": {
                "project": {
                    "name": project,
                    "domain": { "name": domain },
                }
            }
        }
    })
}

/// Authenticate against the identity service and cache the resulting token.
///
/// A cached, unexpired token scoped to the same project is reused without a
/// network round trip.
pub fn authenticate(
    host: &str,
    domain: &str,
    project: &str,
    username: &str,
    password: &str,
) -> Result<Token> {
    if let Ok(existing) = load_token(host) {
        if existing.project == project {
            tracing::info!(host, project, "reusing cached token");
            return Ok(existing);
        }
    }

    let url = format!("https://{host}:5000/v3/auth/tokens");
    let payload = password_payload(domain, project, username, password);
    let resp = http::post(&url, "", &payload)?;

    if resp.status != 201 {
        return Err(resp.into_api_error());
    }
    let value = resp
        .subject_token
        .clone()
        .ok_or_else(|| Error::Precondition("no token in authentication response".into()))?;

    let parsed: AuthResponse = http::parse(&resp)?;

    // Keep only the public interface of each catalog service.
    let mut endpoints = HashMap::new();
    for svc in parsed.token.catalog {
        for ep in svc.endpoints {
            if ep.interface == "public" {
                endpoints.insert(svc.service_type.clone(), ep.url);
            }
        }
    }

    let token = Token {
        value,
        host: host.to_string(),
        expires_at: parsed.token.expires_at,
        endpoints,
        project: project.to_string(),
    };
    save_token(&token)?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_token(host: &str, expires_in: Duration) -> Token {
        let mut endpoints = HashMap::new();
        endpoints.insert("compute".into(), "https://c.example/v2.1".into());
        Token {
            value: "tok".into(),
            host: host.into(),
            expires_at: Utc::now() + expires_in,
            endpoints,
            project: "dev".into(),
        }
    }

    #[test]
    fn round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let token = sample_token("vhi1", Duration::hours(1));
        save_token_at(&token, &path).unwrap();
        let loaded = load_token_at("vhi1", &path).unwrap();
        assert_eq!(loaded.value, "tok");
        assert_eq!(loaded.project, "dev");
    }

    #[test]
    fn expired_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        save_token_at(&sample_token("vhi1", Duration::hours(-1)), &path).unwrap();
        assert!(matches!(
            load_token_at("vhi1", &path),
            Err(Error::TokenInvalid { .. })
        ));
    }

    #[test]
    fn unknown_host_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        assert!(matches!(
            load_token_at("other", &path),
            Err(Error::TokenInvalid { .. })
        ));
    }

    #[test]
    fn missing_endpoint_is_a_precondition_error() {
        let token = sample_token("vhi1", Duration::hours(1));
        assert!(token.endpoint("compute").is_ok());
        assert!(matches!(
            token.endpoint("volumev3"),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn payload_scopes_project_to_domain() {
        let p = password_payload("Default", "dev", "alice", "s3cret");
        assert_eq!(p["auth"]["identity"]["methods"][0], "password");
        assert_eq!(p["auth"]["scope"]["project"]["name"], "dev");
        assert_eq!(p["auth"]["scope"]["project"]["domain"]["name"], "Default");
    }

    #[test]
    fn parses_catalog_response() {
        let body = r#"{
            "token": {
                "expires_at": "2099-01-01T00:00:00Z",
                "catalog": [
                    {"type": "compute", "endpoints": [
                        {"interface": "internal", "url": "https://int/"},
                        {"interface": "public", "url": "https://pub/v2.1"}
                    ]}
                ]
            }
        }"#;
        let parsed: AuthResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.token.catalog[0].service_type, "compute");
        assert_eq!(parsed.token.catalog[0].endpoints[1].url, "https://pub/v2.1");
    }
}
