pub mod app;
pub mod images;
