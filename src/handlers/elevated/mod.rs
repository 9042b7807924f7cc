// handlers/elevated/mod.rs - administrative maintenance (admin by default)
pub mod thumbnails;
