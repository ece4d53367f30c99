mod file_finder;

pub use file_finder::{ApkFile, FileFinder, FileType};
