//! Axum extractors for API handlers
//!
//! Request bodies may arrive as JSON, urlencoded forms or multipart forms.
//! Multipart text parts are decoded with the same field names as the other
//! two formats; the `photo` file part is split off as a [`PhotoUpload`].

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use bytes::Bytes;
use inv_attachments::{PhotoUpload, Storage};
use inv_registry::{InventoryService, NewItem};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ApiError;

/// Multipart field carrying the photo file
pub const PHOTO_FIELD: &str = "photo";

/// Inventory service over any storage backend
pub type DynInventoryService = InventoryService<dyn Storage>;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<DynInventoryService>,
}

impl AppState {
    pub fn new(inventory: DynInventoryService) -> Self {
        Self {
            inventory: Arc::new(inventory),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Multipart,
    UrlEncoded,
    Json,
}

impl BodyKind {
    fn of(req: &Request) -> Self {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            BodyKind::Multipart
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            BodyKind::UrlEncoded
        } else {
            BodyKind::Json
        }
    }
}

/// Text fields and the optional photo of a multipart form
#[derive(Debug, Default)]
struct MultipartForm {
    fields: Map<String, Value>,
    photo: Option<PhotoUpload>,
}

impl MultipartForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::rejected(e.status(), e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::rejected(e.status(), e.body_text()))?;

            if name == PHOTO_FIELD {
                // Only file parts count. An empty file input still sends one,
                // with no name and no bytes.
                let is_file = file_name.is_some();
                let empty_input = data.is_empty() && file_name.as_deref().map_or(true, str::is_empty);
                if is_file && form.photo.is_none() && !empty_input {
                    form.photo = Some(PhotoUpload {
                        data,
                        filename: file_name.filter(|n| !n.is_empty()),
                        content_type,
                    });
                } else if !is_file {
                    debug!("Ignoring photo field sent as text");
                }
            } else if file_name.is_none() && !name.is_empty() {
                let text = String::from_utf8(data.to_vec()).map_err(|_| {
                    ApiError::bad_request(format!("Field {} is not valid UTF-8", name))
                })?;
                form.fields.insert(name, Value::String(text));
            } else {
                debug!(field = %name, "Ignoring unexpected file part");
            }
        }

        Ok(form)
    }

    fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(Value::Object(self.fields)).map_err(invalid_body)
    }
}

fn invalid_body(e: serde_json::Error) -> ApiError {
    ApiError::bad_request(format!("Invalid request body: {}", e))
}

fn decode_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        // A missing body reads as an empty object
        return serde_json::from_value(Value::Object(Map::new())).map_err(invalid_body);
    }
    serde_json::from_slice(bytes).map_err(invalid_body)
}

async fn read_fields<S, T>(req: Request, state: &S) -> Result<T, ApiError>
where
    S: Send + Sync,
    T: DeserializeOwned + Send + 'static,
{
    match BodyKind::of(&req) {
        BodyKind::Multipart => {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::rejected(e.status(), e.body_text()))?;
            MultipartForm::read(multipart).await?.decode()
        }
        BodyKind::UrlEncoded => {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::rejected(e.status(), e.body_text()))?;
            Ok(value)
        }
        BodyKind::Json => {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| ApiError::rejected(e.status(), e.body_text()))?;
            decode_json(&bytes)
        }
    }
}

/// Request fields decoded from JSON, urlencoded or multipart bodies
pub struct FormBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for FormBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send + 'static,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        read_fields(req, state).await.map(FormBody)
    }
}

/// Registration form: item fields plus an optional photo
pub struct RegisterPayload {
    pub item: NewItem,
    pub photo: Option<PhotoUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for RegisterPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if BodyKind::of(&req) == BodyKind::Multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::rejected(e.status(), e.body_text()))?;
            let mut form = MultipartForm::read(multipart).await?;
            let photo = form.photo.take();
            return Ok(RegisterPayload {
                item: form.decode()?,
                photo,
            });
        }

        Ok(RegisterPayload {
            item: read_fields(req, state).await?,
            photo: None,
        })
    }
}

/// Photo part of a multipart upload; `None` for any other body
pub struct PhotoPayload(pub Option<PhotoUpload>);

#[async_trait]
impl<S> FromRequest<S> for PhotoPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if BodyKind::of(&req) != BodyKind::Multipart {
            return Ok(PhotoPayload(None));
        }

        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::rejected(e.status(), e.body_text()))?;
        Ok(PhotoPayload(MultipartForm::read(multipart).await?.photo))
    }
}
