pub mod file;

pub use file::open_buf_reader;
