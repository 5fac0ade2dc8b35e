pub mod geometry;
pub mod import;
