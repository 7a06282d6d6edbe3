mod archive;
pub use archive::{archive_file_name, read_archive, write_archive, Archive};
