pub mod context;
pub mod driver;
pub mod frontend;
pub mod r#loop;
pub mod mode;
pub mod notify;
pub mod poller;
pub mod update;

pub use update::{PermissionRequest, UiUpdate};
