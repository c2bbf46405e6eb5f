// REST collaborator over blocking HTTP with explicit credentials

use super::{Collaborator, Patch};
use crate::record::{ID_FIELDS, Record};
use eyre::{Context, Result, eyre};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Credentials handed to a collaborator when it is built
///
/// Nothing is read from ambient state at request time.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.trim().is_empty()).then_some(token),
        }
    }

    /// Read the token once from `var`; missing or empty means anonymous
    pub fn from_env(var: &str) -> Self {
        std::env::var(var).map(Self::bearer).unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// JSON-over-HTTP backend
///
/// - `GET    {base}/{collection}`       -> list (bare array or `{"data": [...]}`)
/// - `PATCH  {base}/{collection}/{id}`  -> updated record
/// - `DELETE {base}/{collection}/{id}`
#[derive(Debug)]
pub struct RestCollaborator<R: Record> {
    client: Client,
    base_url: String,
    collection: String,
    auth: AuthContext,
    _record: PhantomData<R>,
}

impl<R: Record> RestCollaborator<R> {
    pub fn new(base_url: impl Into<String>, auth: AuthContext) -> Result<Self> {
        Self::with_timeout(base_url, auth, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, auth: AuthContext, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(eyre!("Base URL cannot be empty"));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            base_url = %base_url,
            collection = R::collection_name(),
            authenticated = auth.is_authenticated(),
            "REST collaborator ready"
        );

        Ok(Self {
            client,
            base_url,
            collection: R::collection_name().to_string(),
            auth,
            _record: PhantomData,
        })
    }

    /// Override the path segment (defaults to the record's collection name)
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }

    pub fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .auth
            .apply(request)
            .send()
            .with_context(|| format!("Request failed: {}", what))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(eyre!("{} returned {}: {}", what, status, body.trim()));
        }
        Ok(response)
    }
}

/// Accept a bare payload or one wrapped as `{"data": ...}`
///
/// An object carrying an id is a record, even if it has a `data` field.
fn unwrap_data<T: DeserializeOwned>(value: Value) -> Result<T> {
    let inner = match value {
        Value::Object(mut obj) if is_envelope(&obj) => obj.remove("data").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(inner).context("Unexpected response shape")
}

fn is_envelope(obj: &Map<String, Value>) -> bool {
    obj.contains_key("data") && !ID_FIELDS.iter().any(|key| obj.contains_key(*key))
}

impl<R: Record> Collaborator<R> for RestCollaborator<R> {
    fn load(&self) -> Result<Vec<R>> {
        let url = self.collection_url();
        let response = self.send(self.client.get(&url), &format!("GET {}", url))?;
        let body: Value = response.json().context("Failed to decode response body")?;
        let records: Vec<R> = unwrap_data(body)?;
        debug!(url = %url, count = records.len(), "Loaded records over HTTP");
        Ok(records)
    }

    fn mutate(&self, id: &str, patch: &Patch) -> Result<R> {
        let url = self.record_url(id);
        let response = self.send(self.client.patch(&url).json(patch), &format!("PATCH {}", url))?;
        let body: Value = response.json().context("Failed to decode response body")?;
        unwrap_data(body)
    }

    fn remove(&self, id: &str) -> Result<()> {
        let url = self.record_url(id);
        self.send(self.client.delete(&url), &format!("DELETE {}", url))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::JsonRecord;
    use serde_json::json;

    #[test]
    fn test_urls_trim_trailing_slash() {
        let backend = RestCollaborator::<JsonRecord>::new("https://api.club.test/v1/", AuthContext::anonymous()).unwrap();
        assert_eq!(backend.collection_url(), "https://api.club.test/v1/records");
        assert_eq!(backend.record_url("42"), "https://api.club.test/v1/records/42");

        let backend = backend.collection("sponsors");
        assert_eq!(backend.record_url("s1"), "https://api.club.test/v1/sponsors/s1");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(RestCollaborator::<JsonRecord>::new("/", AuthContext::anonymous()).is_err());
    }

    #[test]
    fn test_auth_context_redacts_token() {
        let auth = AuthContext::bearer("secret-token");
        assert!(auth.is_authenticated());
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("redacted"));

        assert!(!AuthContext::bearer("  ").is_authenticated());
        assert!(!AuthContext::from_env("CLUBVIEW_TEST_TOKEN_THAT_IS_NOT_SET").is_authenticated());
    }

    #[test]
    fn test_unwrap_data_accepts_both_shapes() {
        let bare: Vec<JsonRecord> = unwrap_data(json!([{"id": 1}])).unwrap();
        assert_eq!(bare.len(), 1);

        let wrapped: Vec<JsonRecord> = unwrap_data(json!({"data": [{"id": 1}, {"id": 2}]})).unwrap();
        assert_eq!(wrapped.len(), 2);

        let single: JsonRecord = unwrap_data(json!({"data": {"id": "x"}})).unwrap();
        assert_eq!(single.id(), "x");

        assert!(unwrap_data::<Vec<JsonRecord>>(json!({"items": []})).is_err());
    }

    #[test]
    fn test_unwrap_data_keeps_record_with_data_field() {
        let record: JsonRecord = unwrap_data(json!({"id": "m1", "data": {"note": "vip"}})).unwrap();
        assert_eq!(record.id(), "m1");
        assert_eq!(record.data()["data"], json!({"note": "vip"}));

        let legacy: JsonRecord = unwrap_data(json!({"_id": 4, "data": [1, 2]})).unwrap();
        assert_eq!(legacy.id(), "4");
    }
}
