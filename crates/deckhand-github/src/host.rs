//! Repository hosting abstraction.

use async_trait::async_trait;

use crate::Result;

/// A file fetched from a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded file content.
    pub content: Vec<u8>,
    /// Blob sha, required to update or delete the file.
    pub sha: String,
}

impl RemoteFile {
    /// Content as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Repository and file operations on a hosting service.
///
/// `repo` is always `owner/name`. Every call carries its own token so one
/// client can serve several users.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Fetch a file and its blob sha.
    async fn get_file(&self, token: &str, repo: &str, path: &str) -> Result<RemoteFile>;

    /// Create a file (`sha = None`) or replace it (`sha` of the current
    /// blob). Returns the sha of the new blob.
    async fn put_file(
        &self,
        token: &str,
        repo: &str,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<String>;

    /// Delete a file at the given blob sha.
    async fn delete_file(
        &self,
        token: &str,
        repo: &str,
        path: &str,
        sha: &str,
        message: &str,
    ) -> Result<()>;

    /// Full names of repositories visible to the token owner.
    async fn list_repositories(&self, token: &str) -> Result<Vec<String>>;

    /// Create a repository under the token owner. Returns its full name.
    async fn create_repository(&self, token: &str, name: &str) -> Result<String>;
}
