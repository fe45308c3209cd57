use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Names a single file in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub file_name: String,
}

/// Renames a remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub old_name: String,
    pub new_name: String,
}

/// First message of every call.
///
/// `Upload` carries no parameters: the target name follows in the
/// stream's [`UploadHeader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    Upload,
    Download(FileRequest),
    Delete(FileRequest),
    Rename(RenameRequest),
    List,
}

impl Request {
    /// Method name used in logs.
    pub fn method(&self) -> &'static str {
        match self {
            Request::Upload => "upload",
            Request::Download(_) => "download",
            Request::Delete(_) => "delete",
            Request::Rename(_) => "rename",
            Request::List => "list",
        }
    }
}

/// Opening message of an upload stream; names the remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHeader {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Acknowledges a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub name: String,
    /// Bytes written to the remote file.
    pub bytes: u64,
}

/// Human-readable outcome of a delete or rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

/// One remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    /// Last modification time, unix seconds.
    pub modification_time: i64,
}

/// Contents of the remote store, in directory enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

impl FileList {
    /// Returns `true` if an entry with `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.file_name == name)
    }
}

/// Successful reply to a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Ack(Ack),
    Response(Response),
    FileList(FileList),
}
