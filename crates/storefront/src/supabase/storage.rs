//! Supabase Storage: cash photo objects.

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use tracing::instrument;

use canopy_core::UserId;
use canopy_core::checkout::ImageFormat;

use super::{SupabaseClient, SupabaseError, read_body};

/// Object path for a new cash photo: `<user>/<timestamp>-<uuid>.<ext>`.
#[must_use]
pub fn photo_path(user_id: &UserId, format: ImageFormat, at: DateTime<Utc>) -> String {
    let user: String = user_id
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    format!(
        "{user}/{}-{}.{}",
        at.format("%Y%m%dT%H%M%S"),
        uuid::Uuid::new_v4(),
        format.extension()
    )
}

impl SupabaseClient {
    fn object_url(&self, path: &str) -> Result<url::Url, SupabaseError> {
        let bucket = &self.config().photo_bucket;
        self.config()
            .endpoint(&format!("storage/v1/object/{bucket}/{path}"))
            .map_err(SupabaseError::from)
    }

    fn service_key(&self) -> &str {
        self.config().service_role_key.expose_secret()
    }

    /// Upload an object to the photo bucket. Existing objects are not replaced.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the upload fails or is rejected.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_object(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), SupabaseError> {
        let response = self
            .http()
            .post(self.object_url(path)?)
            .bearer_auth(self.service_key())
            .header("apikey", self.service_key())
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        read_body(response, "photo upload").await?;
        tracing::info!(path, "Cash photo stored");
        Ok(())
    }

    /// Delete an object from the photo bucket.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the request fails or is rejected.
    #[instrument(skip(self))]
    pub async fn delete_object(&self, path: &str) -> Result<(), SupabaseError> {
        let response = self
            .http()
            .delete(self.object_url(path)?)
            .bearer_auth(self.service_key())
            .header("apikey", self.service_key())
            .send()
            .await?;

        read_body(response, "photo delete").await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use chrono::TimeZone;

    use super::*;
    use crate::supabase::tests::client_for;

    type Stored = Arc<Mutex<Vec<(String, String, usize)>>>;

    fn storage(stored: Stored) -> Router {
        async fn upload(
            State(stored): State<Stored>,
            Path((bucket, path)): Path<(String, String)>,
            headers: HeaderMap,
            body: Bytes,
        ) -> StatusCode {
            assert_eq!(headers.get("authorization").unwrap(), "Bearer service-role");
            let content_type = headers
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap()
                .to_string();
            stored
                .lock()
                .unwrap()
                .push((format!("{bucket}/{path}"), content_type, body.len()));
            StatusCode::OK
        }

        async fn delete(Path((_bucket, path)): Path<(String, String)>) -> (StatusCode, String) {
            if path.ends_with("missing.jpg") {
                (
                    StatusCode::NOT_FOUND,
                    r#"{"statusCode":"404","message":"Object not found"}"#.to_string(),
                )
            } else {
                (StatusCode::OK, "{}".to_string())
            }
        }

        Router::new()
            .route("/storage/v1/object/{bucket}/{*path}", post(upload).delete(delete))
            .with_state(stored)
    }

    #[test]
    fn test_photo_path_shape() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap();
        let path = photo_path(&UserId::from("8d0c/../user"), ImageFormat::Jpeg, at);
        assert!(path.starts_with("8d0cuser/20260301T143000-"));
        assert!(path.ends_with(".jpg"));
        assert_ne!(
            photo_path(&UserId::from("u"), ImageFormat::Png, at),
            photo_path(&UserId::from("u"), ImageFormat::Png, at)
        );
    }

    #[tokio::test]
    async fn test_upload_and_delete() {
        let stored = Stored::default();
        let client = client_for(storage(Arc::clone(&stored))).await;

        client
            .upload_object("u1/photo.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF])
            .await
            .unwrap();
        assert_eq!(
            stored.lock().unwrap().as_slice(),
            &[("cash-photos/u1/photo.jpg".to_string(), "image/jpeg".to_string(), 3)]
        );

        client.delete_object("u1/photo.jpg").await.unwrap();
        let err = client.delete_object("u1/missing.jpg").await.unwrap_err();
        assert!(err.is_client_error());
    }
}
