use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One object ready to go to storage, key already decided.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub destination: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileRes {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct FileRef {
    pub destination: String,
}
