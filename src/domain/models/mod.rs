pub mod code;
pub mod plan;
pub mod subscription;
pub mod tenant;
pub mod user;
