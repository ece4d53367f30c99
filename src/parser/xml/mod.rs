mod layout;
mod manifest;

pub use layout::{LayoutData, LayoutParser, ONCLICK_ATTRIBUTE};
pub use manifest::{ComponentKind, ComponentTagInfo, ManifestClassInfo, ManifestParser};
