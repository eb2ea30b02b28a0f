//! Object storage for uploaded images and documents
//!
//! Blobs live in named buckets (`applications`, `restaurants`, `dishes`).
//! [`ObjectStorage`] abstracts the hosted bucket API; [`SupabaseStorage`]
//! speaks its REST interface and [`MemoryStorage`] keeps objects in process.

mod memory;
mod supabase;

pub use memory::MemoryStorage;
pub use supabase::SupabaseStorage;

use async_trait::async_trait;

use crate::error::Result;

/// Bucket names used by the dashboard.
pub mod buckets {
    pub const APPLICATIONS: &str = "applications";
    pub const RESTAURANTS: &str = "restaurants";
    pub const DISHES: &str = "dishes";
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Public URL of an object. Does not check that the object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Store `bytes` at `bucket/path`, replacing any existing object.
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<()>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;
}

/// Object path inside `bucket` for a stored reference.
///
/// Accepts either a bare path or a URL containing `/{bucket}/`; the part
/// after the bucket segment is returned.
pub fn relative_path(reference: &str, bucket: &str) -> Option<String> {
    let marker = format!("/{}/", bucket);
    let path = match reference.find(&marker) {
        Some(pos) => &reference[pos + marker.len()..],
        None if reference.contains("://") => return None,
        None => reference,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Content type for an object path, from its extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Encode each segment of an object path for use in a URL.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_from_public_url() {
        let url = "https://x.supabase.co/storage/v1/object/public/applications/u1/cover.jpg?t=1";
        assert_eq!(
            relative_path(url, "applications").as_deref(),
            Some("u1/cover.jpg")
        );
    }

    #[test]
    fn test_relative_path_bare_and_foreign() {
        assert_eq!(
            relative_path("u1/selfie.png", "applications").as_deref(),
            Some("u1/selfie.png")
        );
        assert_eq!(relative_path("https://cdn.example.com/a.png", "applications"), None);
        assert_eq!(relative_path("", "applications"), None);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("u1/cover.JPG"), "image/jpeg");
        assert_eq!(content_type_for("r1/proof0"), "application/octet-stream");
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("r1/proof 1.pdf"), "r1/proof%201.pdf");
    }
}
