use crate::config::GoogleDriveConfig;
use crate::constants;
use crate::error::{MagpieError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::ProbeResult;

/// Google Drive 同步客户端
///
/// 先用 refresh token 换取访问令牌，再以 multipart/related 方式
/// 把打包好的归档上传到配置的文件夹。请求整体受超时约束。
pub struct DriveReplicator {
    http: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

impl DriveReplicator {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(constants::replication::TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }

    /// 校验必填字段，凭证内容本身不做校验
    fn validate(cfg: &GoogleDriveConfig) -> Result<()> {
        if cfg.client_id.trim().is_empty()
            || cfg.client_secret.trim().is_empty()
            || cfg.refresh_token.trim().is_empty()
        {
            return Err(MagpieError::config(
                "googleDrive 配置不完整: clientId、clientSecret、refreshToken 均为必填",
            ));
        }
        Ok(())
    }

    /// 用 refresh token 换取访问令牌
    async fn fetch_access_token(&self, cfg: &GoogleDriveConfig) -> Result<String> {
        let params = [
            ("client_id", cfg.client_id.as_str()),
            ("client_secret", cfg.client_secret.as_str()),
            ("refresh_token", cfg.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(constants::replication::DRIVE_TOKEN_URL)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::drive(format!(
                "获取访问令牌失败 ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// 上传归档文件，返回云端文件ID
    pub async fn replicate(
        &self,
        cfg: &GoogleDriveConfig,
        archive_path: &Path,
    ) -> Result<String> {
        Self::validate(cfg)?;

        let file_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| MagpieError::drive("归档路径无效，缺少文件名"))?;

        let access_token = self.fetch_access_token(cfg).await?;
        let content = tokio::fs::read(archive_path).await?;
        debug!("上传归档 {file_name}（{} 字节）", content.len());

        let boundary = format!("magpie-{}", Uuid::new_v4());
        let body = build_multipart_body(&file_name, &cfg.folder_id, &boundary, content);

        let response = self
            .http
            .post(constants::replication::DRIVE_UPLOAD_URL)
            .bearer_auth(access_token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::drive(format!("上传失败 ({status}): {body}")));
        }

        let uploaded: UploadResponse = response.json().await?;
        info!("归档已上传到 Google Drive，文件ID: {}", uploaded.id);
        Ok(uploaded.id)
    }

    /// 云盘连通性检查：配置完整 → 令牌换取成功
    pub async fn probe(&self, cfg: &GoogleDriveConfig) -> ProbeResult {
        if !cfg.enabled {
            return ProbeResult::fail("Google Drive 同步未启用");
        }
        if let Err(e) = Self::validate(cfg) {
            return ProbeResult::fail(e.to_string());
        }
        match self.fetch_access_token(cfg).await {
            Ok(_) => ProbeResult::ok("访问令牌获取成功，云盘配置可用"),
            Err(e) => ProbeResult::fail(format!("访问令牌获取失败: {e}")),
        }
    }
}

/// 手工构造 multipart/related 请求体：JSON 元数据段 + 文件内容段
fn build_multipart_body(
    file_name: &str,
    folder_id: &str,
    boundary: &str,
    content: Vec<u8>,
) -> Vec<u8> {
    let metadata = if folder_id.trim().is_empty() {
        json!({ "name": file_name })
    } else {
        json!({ "name": file_name, "parents": [folder_id.trim()] })
    };

    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/gzip\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(&content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
