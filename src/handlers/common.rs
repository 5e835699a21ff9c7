use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::str::FromStr;

use crate::{errors::ServiceError, storage::Upload, ApiResponse};

/// JSON body extractor whose rejections use the API error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Fully buffered `multipart/form-data` body: text fields plus uploaded files.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<Upload>>,
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))?;
        Self::read(multipart).await
    }
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::InvalidInput(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ServiceError::InvalidInput(e.body_text()))?;

            match file_name {
                // Browsers send an empty part for an untouched file input
                Some(file_name) if file_name.is_empty() && data.is_empty() => {}
                Some(file_name) => form.files.entry(name).or_default().push(Upload {
                    file_name,
                    content_type,
                    data,
                }),
                None => {
                    let text = String::from_utf8(data.to_vec()).map_err(|_| {
                        ServiceError::InvalidInput(format!("Field {} must be UTF-8 text", name))
                    })?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|values| values.first()).cloned()
    }

    /// Every value of a repeated field. A single value holding a JSON array
    /// or a comma-separated list is expanded.
    pub fn list(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        for value in self.fields.get(name).into_iter().flatten() {
            let trimmed = value.trim();
            if trimmed.starts_with('[') {
                if let Ok(parsed) = serde_json::from_str::<Vec<String>>(trimmed) {
                    out.extend(parsed);
                    continue;
                }
            }
            out.extend(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        out
    }

    /// Parses an optional field. Blank counts as absent.
    pub fn parse<T: FromStr>(&self, name: &str, message: &str) -> Result<Option<T>, ServiceError> {
        match self.text(name).map(|v| v.trim().to_string()) {
            Some(value) if !value.is_empty() => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| ServiceError::InvalidInput(message.to_string())),
            _ => Ok(None),
        }
    }

    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        self.files.remove(name).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.take_files(name).into_iter().next()
    }
}

/// `201 Created` with the standard success envelope.
pub fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}
