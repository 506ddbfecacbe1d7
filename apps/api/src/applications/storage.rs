//! CV objects in S3 (or MinIO).

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// `{prefix}/{application_id}/cv/{filename}` with path separators neutralized.
pub fn build_cv_key(prefix: &str, application_id: Uuid, filename: &str) -> String {
    format!(
        "{}/{}/cv/{}",
        prefix.trim_end_matches('/'),
        application_id,
        sanitize_filename(filename)
    )
}

pub fn sanitize_filename(filename: &str) -> String {
    let safe = filename.trim().replace(['/', '\\'], "_");
    if safe.is_empty() || safe.chars().all(|c| c == '.' || c == '_') {
        "cv".to_string()
    } else {
        safe
    }
}

pub async fn upload_cv(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Bytes,
    content_type: Option<&str>,
) -> Result<(), AppError> {
    let mut request = s3
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body));
    if let Some(content_type) = content_type {
        request = request.content_type(content_type);
    }
    request
        .send()
        .await
        .map_err(|e| AppError::S3(format!("CV upload failed: {e}")))?;

    info!("Uploaded CV to s3://{}/{}", bucket, key);
    Ok(())
}

pub async fn delete_cv(s3: &aws_sdk_s3::Client, bucket: &str, key: &str) -> Result<(), AppError> {
    s3.delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("CV delete failed: {e}")))?;

    info!("Deleted CV s3://{}/{}", bucket, key);
    Ok(())
}

/// Short-lived GET URL. When `download_name` is given the browser saves under that name.
pub async fn presign_cv_url(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    download_name: Option<&str>,
    expires_in: Duration,
) -> Result<String, AppError> {
    let config = PresigningConfig::expires_in(expires_in)
        .map_err(|e| AppError::S3(format!("Invalid presign expiry: {e}")))?;

    let mut request = s3.get_object().bucket(bucket).key(key);
    if let Some(name) = download_name {
        request = request.response_content_disposition(content_disposition(name));
    }

    let presigned = request
        .presigned(config)
        .await
        .map_err(|e| AppError::S3(format!("Presigning failed: {e}")))?;
    Ok(presigned.uri().to_string())
}

fn content_disposition(download_name: &str) -> String {
    format!("attachment; filename=\"{}\"", download_name.replace('"', ""))
}
