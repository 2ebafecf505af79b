// 备份历史数据库模块
//
// 通过Actor模式满足DuckDB的单线程访问要求，对外提供异步接口。
// 历史表仅追加：记录以 in_progress 状态插入，恰好一次转移到
// completed 或 failed，之后不再变化，系统不做删除。
//
// 主要组件：
// - MagpieDbManager: 可克隆的异步句柄，供引擎使用
// - MagpieDbActor: 内部Actor，独占数据库连接
// - 行模型与消息定义

mod actor;
mod manager;
mod messages;
mod models;

// 公开核心接口
pub use manager::MagpieDbManager;
pub use models::BackupRecordRow;
