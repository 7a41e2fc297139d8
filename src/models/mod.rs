pub mod directive;
pub mod file;
pub mod metadata;
pub mod request;
pub mod response;
