pub mod registry_file;
pub mod render;
pub mod settings;
