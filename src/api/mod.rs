pub mod files;

pub use files::handle_file;
