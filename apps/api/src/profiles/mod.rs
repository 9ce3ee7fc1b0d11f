pub mod handlers;
pub mod resume;
