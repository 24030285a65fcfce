//! Files copied into the container before it starts.

use bytes::Bytes;
use std::path::Path;

use crate::errors::JumpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl StagedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a host file, staging it under its own file name.
    pub async fn read(path: &Path) -> Result<Self, JumpError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| JumpError::Config(format!("{} is not a file", path.display())))?;
        let content = tokio::fs::read(path)
            .await
            .map_err(JumpError::io(format!("Failed to read {}", path.display())))?;
        Ok(Self { name, content })
    }

    /// Pack the file into a single-entry tar archive.
    pub fn to_archive(&self) -> Result<Bytes, JumpError> {
        let context = format!("Failed to build archive for {}", self.name);
        let mut builder = tar::Builder::new(Vec::new());

        let mut header = tar::Header::new_gnu();
        header.set_size(self.content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);

        builder
            .append_data(&mut header, &self.name, self.content.as_slice())
            .map_err(JumpError::io(context.clone()))?;
        let archive = builder.into_inner().map_err(JumpError::io(context))?;
        Ok(Bytes::from(archive))
    }
}
