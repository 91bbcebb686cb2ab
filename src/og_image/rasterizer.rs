use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::domain::DomainError;

/// Turns an HTML document into JPEG bytes at a fixed pixel size.
#[async_trait]
pub trait HtmlRasterizer: Send + Sync {
    async fn rasterize(&self, html: &str, width: u32, height: u32) -> Result<Vec<u8>, DomainError>;
}

/// Production rasterizer shelling out to `wkhtmltoimage`, HTML on
/// stdin, JPEG on stdout.
pub struct WkhtmltoimageRasterizer {
    binary: String,
}

impl WkhtmltoimageRasterizer {
    pub fn new() -> Self {
        Self {
            binary: std::env::var("WKHTMLTOIMAGE_BIN")
                .unwrap_or_else(|_| "wkhtmltoimage".to_string()),
        }
    }
}

impl Default for WkhtmltoimageRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HtmlRasterizer for WkhtmltoimageRasterizer {
    async fn rasterize(&self, html: &str, width: u32, height: u32) -> Result<Vec<u8>, DomainError> {
        let mut child = Command::new(&self.binary)
            .arg("--format")
            .arg("jpg")
            .arg("--width")
            .arg(width.to_string())
            .arg("--height")
            .arg(height.to_string())
            .arg("--encoding")
            .arg("UTF-8")
            .arg("--quiet")
            .arg("-")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DomainError::Internal(format!("Failed to spawn {}: {}", self.binary, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DomainError::Internal("Rasterizer stdin unavailable".to_string()))?;
        stdin
            .write_all(html.as_bytes())
            .await
            .map_err(|e| DomainError::Internal(format!("Failed to write rasterizer input: {}", e)))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DomainError::Internal(format!("Rasterizer did not finish: {}", e)))?;

        if !output.status.success() {
            return Err(DomainError::Internal(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(output.stdout)
    }
}
