mod backup;
mod config;
mod schedule;
mod status;
mod test;

// Status commands
pub use status::run_status;

// Backup commands
pub use backup::{run_backup, run_download, run_list_backups};

// Config commands
pub use config::run_config_show;

// Schedule commands
pub use schedule::{run_schedule_foreground, set_schedule_enabled, show_schedule_status};

// Test commands
pub use test::{run_test_drive, run_test_github};
