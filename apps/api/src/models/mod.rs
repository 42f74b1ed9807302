pub mod portfolio;
pub mod resume;
pub mod subscription;
