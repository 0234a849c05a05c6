pub mod highlights;
pub mod logger;
