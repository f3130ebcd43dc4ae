pub mod advisor;
pub mod client;
pub mod prompt;
