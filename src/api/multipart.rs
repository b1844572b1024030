// src/api/multipart.rs

//! `multipart/form-data` handling for single-file upload forms.

use std::convert::Infallible;

use futures::stream;

use crate::error::{AppError, Result};
use crate::models::MediaFile;

/// Extract the boundary from a `Content-Type` header value.
pub fn boundary(content_type: &str) -> Result<String> {
    multer::parse_boundary(content_type)
        .map_err(|e| AppError::validation(format!("Invalid multipart Content-Type: {e}")))
}

/// Read the first part named `field` out of a buffered multipart body.
///
/// Returns `None` when the form has no such field.
pub async fn read_file(body: Vec<u8>, boundary: String, field: &str) -> Result<Option<MediaFile>> {
    let body = stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(body, boundary);

    while let Some(part) = multipart.next_field().await.map_err(malformed)? {
        if part.name() != Some(field) {
            continue;
        }

        let filename = part.file_name().unwrap_or("blob").to_string();
        let content_type = part
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = part.bytes().await.map_err(malformed)?;

        return Ok(Some(MediaFile::new(filename, content_type, bytes.to_vec())));
    }

    Ok(None)
}

fn malformed(err: multer::Error) -> AppError {
    AppError::validation(format!("Malformed multipart body: {err}"))
}

/// Encode a single file field as a multipart body.
#[cfg(test)]
pub(crate) fn encode_file(
    boundary: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary() {
        assert_eq!(
            boundary("multipart/form-data; boundary=----abc123").unwrap(),
            "----abc123"
        );
        assert!(boundary("application/json").is_err());
        assert!(boundary("multipart/form-data").is_err());
    }

    #[tokio::test]
    async fn test_read_encoded_file() {
        let data = b"t,ch1\r\n0,1\r\n";
        let body = encode_file("XyZ", "file", "data.csv", "text/csv", data);

        let file = read_file(body, "XyZ".into(), "file").await.unwrap().unwrap();
        assert_eq!(file.filename, "data.csv");
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.bytes, data);
    }

    #[tokio::test]
    async fn test_read_skips_other_fields() {
        let body = b"--b\r\n\
Content-Disposition: form-data; name=\"note\"\r\n\r\n\
hello\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"a.jpg\"\r\n\
Content-Type: image/jpeg\r\n\r\n\
\xff\xd8\xff\r\n\
--b--\r\n"
            .to_vec();

        let file = read_file(body, "b".into(), "file").await.unwrap().unwrap();
        assert_eq!(file.filename, "a.jpg");
        assert_eq!(file.bytes, [0xff, 0xd8, 0xff]);
    }

    #[tokio::test]
    async fn test_filename_with_semicolon() {
        let body = encode_file("b", "file", "run;1.csv", "text/csv", b"t,c\n");

        let file = read_file(body, "b".into(), "file").await.unwrap().unwrap();
        assert_eq!(file.filename, "run;1.csv");
    }

    #[tokio::test]
    async fn test_missing_field() {
        let body = encode_file("b", "other", "a.csv", "text/csv", b"1,2");
        assert!(read_file(body, "b".into(), "file").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let mut body = encode_file("b", "file", "a.csv", "text/csv", b"1,2");
        body.truncate(body.len() - 10);
        assert!(read_file(body, "b".into(), "file").await.is_err());
    }
}
