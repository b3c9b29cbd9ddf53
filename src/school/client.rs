use crate::cache::Cacheable;
use crate::config::ApiConfig;
use color_eyre::{eyre::eyre, Result};
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use tracing::{debug, warn};
use url::Url;

use super::api_types::{message_from_body, ApiEnvelope, ApiMessage};
use super::error::{Operation, TransportError};

/// A record type served by a collection endpoint
pub trait Resource: Cacheable {
  /// Wire representation of one record
  type Api: DeserializeOwned + Into<Self> + Send;
  /// Input of create and update calls
  type Payload: Send + Sync + 'static;

  /// Collection segment of the endpoint paths (e.g., "enseignant")
  const COLLECTION: &'static str;
  /// Human label used in messages (e.g., "teacher")
  const LABEL: &'static str;

  /// Multipart body for a create or update call
  fn form(payload: &Self::Payload) -> Result<Form, TransportError>;
}

/// Record returned by a create or update call
#[derive(Debug, Clone)]
pub struct Saved<T> {
  pub entity: T,
  pub message: Option<String>,
}

/// Confirmation returned by a delete call
#[derive(Debug, Clone, Default)]
pub struct Notice {
  pub message: Option<String>,
}

/// The four remote operations on one collection.
///
/// Implementations never retry; read retries belong to the cache.
pub trait RemoteCollection<T: Resource>: Send + Sync + 'static {
  fn list(&self) -> impl Future<Output = Result<Vec<T>, TransportError>> + Send;

  fn create(
    &self,
    payload: &T::Payload,
  ) -> impl Future<Output = Result<Saved<T>, TransportError>> + Send;

  fn update(
    &self,
    id: &str,
    payload: &T::Payload,
  ) -> impl Future<Output = Result<Saved<T>, TransportError>> + Send;

  fn delete(&self, id: &str) -> impl Future<Output = Result<Notice, TransportError>> + Send;
}

/// HTTP client for one collection of the school service
pub struct HttpCollection<T> {
  http: reqwest::Client,
  base: Url,
  _resource: PhantomData<fn() -> T>,
}

impl<T: Resource> HttpCollection<T> {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;
    if base.cannot_be_a_base() {
      return Err(eyre!("Invalid API url {}: not a base url", config.url));
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("gradedesk/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      _resource: PhantomData,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  /// Build an endpoint URL below the base URL, one path segment per item.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn network_error(op: Operation, err: reqwest::Error) -> TransportError {
    warn!(operation = ?op, error = %err, "request failed to complete");
    TransportError::new(op.fallback_message(T::LABEL))
  }
}

impl<T> Clone for HttpCollection<T> {
  fn clone(&self) -> Self {
    Self {
      http: self.http.clone(),
      base: self.base.clone(),
      _resource: PhantomData,
    }
  }
}

/// Read a response body and decode it, mapping failures to a displayable
/// error.
async fn decode<D: DeserializeOwned>(
  response: reqwest::Response,
  op: Operation,
  label: &str,
) -> Result<D, TransportError> {
  let status = response.status();
  let body = response.bytes().await.map_err(|e| {
    warn!(operation = ?op, error = %e, "failed to read response body");
    TransportError::new(op.fallback_message(label)).with_status(status.as_u16())
  })?;

  if !status.is_success() {
    let message = message_from_body(&body).unwrap_or_else(|| op.fallback_message(label));
    warn!(operation = ?op, %status, %message, "request rejected");
    return Err(TransportError::new(message).with_status(status.as_u16()));
  }

  serde_json::from_slice(&body).map_err(|e| {
    warn!(operation = ?op, error = %e, "malformed response body");
    TransportError::new(op.fallback_message(label)).with_status(status.as_u16())
  })
}

impl<T: Resource> RemoteCollection<T> for HttpCollection<T> {
  async fn list(&self) -> Result<Vec<T>, TransportError> {
    let op = Operation::List;
    let plural = format!("{}s", T::COLLECTION);
    let url = self.endpoint(&["api", "read", plural.as_str()]);
    debug!(%url, "list");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| Self::network_error(op, e))?;
    let envelope: ApiEnvelope<Vec<T::Api>> = decode(response, op, T::LABEL).await?;

    Ok(envelope.data.into_iter().map(Into::into).collect())
  }

  async fn create(&self, payload: &T::Payload) -> Result<Saved<T>, TransportError> {
    let op = Operation::Create;
    let url = self.endpoint(&["api", "create", T::COLLECTION]);
    let form = T::form(payload)?;
    debug!(%url, "create");

    let response = self
      .http
      .post(url)
      .multipart(form)
      .send()
      .await
      .map_err(|e| Self::network_error(op, e))?;
    let envelope: ApiEnvelope<T::Api> = decode(response, op, T::LABEL).await?;

    Ok(Saved {
      entity: envelope.data.into(),
      message: envelope.message,
    })
  }

  async fn update(&self, id: &str, payload: &T::Payload) -> Result<Saved<T>, TransportError> {
    let op = Operation::Update;
    let url = self.endpoint(&["api", "update", T::COLLECTION, id]);
    let form = T::form(payload)?;
    debug!(%url, "update");

    let response = self
      .http
      .post(url)
      .multipart(form)
      .send()
      .await
      .map_err(|e| Self::network_error(op, e))?;
    let envelope: ApiEnvelope<T::Api> = decode(response, op, T::LABEL).await?;

    Ok(Saved {
      entity: envelope.data.into(),
      message: envelope.message,
    })
  }

  async fn delete(&self, id: &str) -> Result<Notice, TransportError> {
    let op = Operation::Delete;
    let url = self.endpoint(&["api", "delete", T::COLLECTION, id]);
    debug!(%url, "delete");

    let response = self
      .http
      .delete(url)
      .send()
      .await
      .map_err(|e| Self::network_error(op, e))?;
    let body: ApiMessage = decode(response, op, T::LABEL).await?;

    Ok(Notice {
      message: body.message,
    })
  }
}
