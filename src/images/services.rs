use std::io::Cursor;

use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

pub struct UploadItem {
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub url: String,
    pub path: String,
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Storage keys are `<prefix>/<uuid>.<ext>` with a sanitized prefix.
pub(crate) fn object_key(prefix: &str, ext: &str) -> String {
    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
        .collect();
    let prefix = prefix.trim_matches('/');
    let name = format!("{}.{}", Uuid::new_v4().simple(), ext);
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

pub fn validate(item: &UploadItem) -> AppResult<&'static str> {
    if item.body.is_empty() {
        return Err(AppError::bad_request("Empty file"));
    }
    if item.body.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::bad_request("File too large (max 5MB)"));
    }
    if !ALLOWED_TYPES.contains(&item.content_type.as_str()) {
        return Err(AppError::bad_request(format!(
            "Unsupported file type: {}",
            item.content_type
        )));
    }
    ext_from_mime(&item.content_type).ok_or_else(|| AppError::bad_request("Unsupported file type"))
}

/// Collect every file part of a multipart body.
pub async fn read_files(mut mp: Multipart) -> AppResult<Vec<UploadItem>> {
    let mut files = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.to_string()))?;
        files.push(UploadItem {
            file_name,
            content_type,
            body,
        });
    }
    Ok(files)
}

pub async fn store(st: &AppState, prefix: &str, item: UploadItem) -> AppResult<StoredFile> {
    let ext = validate(&item)?;
    let key = object_key(prefix, ext);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    debug!(%key, file_name = ?item.file_name, "image stored");
    Ok(StoredFile {
        url: st.storage.public_url(&key),
        path: key,
    })
}

/// Validate, shrink to fit `max_w`x`max_h`, re-encode as JPEG and store.
pub async fn store_resized(
    st: &AppState,
    prefix: &str,
    item: UploadItem,
    max_w: u32,
    max_h: u32,
) -> AppResult<StoredFile> {
    validate(&item)?;
    let body = item.body;
    let jpeg = tokio::task::spawn_blocking(move || resize_to_jpeg(&body, max_w, max_h))
        .await
        .context("resize task")?
        .map_err(|e| {
            warn!(error = %e, "image decode failed");
            AppError::bad_request("Invalid image")
        })?;
    let key = object_key(prefix, "jpg");
    st.storage
        .put_object(&key, Bytes::from(jpeg), "image/jpeg")
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(StoredFile {
        url: st.storage.public_url(&key),
        path: key,
    })
}

pub fn resize_to_jpeg(bytes: &[u8], max_w: u32, max_h: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("decode image")?;
    let img = if img.width() > max_w || img.height() > max_h {
        img.resize(max_w, max_h, FilterType::Lanczos3)
    } else {
        img
    };
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, 85))
        .context("encode jpeg")?;
    Ok(out.into_inner())
}

pub async fn delete_by_path(st: &AppState, path: &str) -> anyhow::Result<()> {
    st.storage
        .delete_object(path)
        .await
        .with_context(|| format!("delete_object {}", path))
}

/// Best-effort removal of a previously stored image referenced by URL.
pub async fn delete_by_url(st: &AppState, url: Option<&str>) {
    let Some(key) = url.and_then(|u| st.storage.key_from_url(u)) else {
        return;
    };
    if let Err(e) = delete_by_path(st, &key).await {
        warn!(error = %e, %key, "failed to delete stored image");
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn item(ct: &str, body: Vec<u8>) -> UploadItem {
        UploadItem {
            file_name: Some("a".into()),
            content_type: ct.into(),
            body: Bytes::from(body),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn validate_rejects_bad_uploads() {
        assert!(validate(&item("image/png", vec![])).is_err());
        assert!(validate(&item("image/gif", vec![1])).is_err());
        assert!(validate(&item("image/png", vec![0; MAX_UPLOAD_BYTES + 1])).is_err());
        assert_eq!(validate(&item("image/png", vec![1])).unwrap(), "png");
    }

    #[test]
    fn object_key_sanitizes_prefix() {
        let key = object_key("../recipe-thumbs/", "jpg");
        assert!(key.starts_with("recipe-thumbs/"));
        assert!(key.ends_with(".jpg"));
        assert!(!key.contains(".."));
        assert!(!object_key("", "png").contains('/'));
    }

    #[test]
    fn resize_shrinks_and_outputs_jpeg() {
        let out = resize_to_jpeg(&png(600, 300), 256, 256).unwrap();
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.width(), 256);
        assert_eq!(decoded.height(), 128);
    }

    #[test]
    fn resize_keeps_small_images() {
        let out = resize_to_jpeg(&png(40, 20), 256, 256).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn resize_rejects_garbage() {
        assert!(resize_to_jpeg(b"not an image", 10, 10).is_err());
    }

    #[tokio::test]
    async fn store_returns_public_url() {
        let state = AppState::fake();
        let stored = store(&state, "uploads", item("image/png", png(4, 4)))
            .await
            .unwrap();
        assert!(stored.path.starts_with("uploads/"));
        assert_eq!(stored.url, format!("https://fake.local/{}", stored.path));
    }
}
