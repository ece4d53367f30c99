pub mod native;
pub mod xml;

pub use native::NativeLibScanner;
