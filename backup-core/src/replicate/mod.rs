// 远程同步模块
//
// 快照落盘之后的尽力而为复制：git 分支推送与 Google Drive 上传。
// 同步失败不改变备份运行的主结果，由引擎以警告形式记入历史记录。

pub mod drive;
pub mod git;

pub use drive::DriveReplicator;
pub use git::{GitClient, GitReplicator, SystemGitClient};

use serde::{Deserialize, Serialize};

/// 连通性探测结果
///
/// 探测永不抛错，失败通过 success=false 与消息描述表达。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
}

impl ProbeResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
