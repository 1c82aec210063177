pub mod build;
pub mod dev;
pub mod init;
pub mod plan;
pub mod serve;
