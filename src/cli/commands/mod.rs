#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod expiring;
pub mod init;
pub mod reseal;
pub mod reseal_all;
pub mod rotate;
pub mod store_cmd;
pub mod validate;
