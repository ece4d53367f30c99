use crate::resources::ResourceError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Attribute naming a click handler method on the hosting context
pub const ONCLICK_ATTRIBUTE: &str = "android:onClick";

/// Class names and selected attribute values collected from layouts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutData {
    /// Dotted Java class names referenced by the layouts
    pub classes: HashSet<String>,
    /// Attribute name to every value it takes across the layouts
    pub attribute_values: HashMap<String, Vec<String>>,
}

impl LayoutData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: LayoutData) {
        self.classes.extend(other.classes);
        for (name, values) in other.attribute_values {
            self.attribute_values.entry(name).or_default().extend(values);
        }
    }

    pub fn values(&self, attribute: &str) -> &[String] {
        self.attribute_values
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Parser for Android layout XML files
pub struct LayoutParser;

impl LayoutParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a layout and collect referenced classes plus the values of the
    /// attributes in `attributes`. A malformed layout yields what was read
    /// before the error.
    pub fn parse(
        &self,
        path: &Path,
        contents: &str,
        attributes: &HashSet<String>,
    ) -> Result<LayoutData, ResourceError> {
        let mut result = LayoutData::new();
        let mut reader = Reader::from_str(contents);
        reader.trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    // Custom views are written by class name
                    if tag_name.contains('.') {
                        result.classes.insert(tag_name.clone());
                    }

                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                        let value = String::from_utf8_lossy(&attr.value).to_string();

                        let names_class = match tag_name.as_str() {
                            "view" => key == "class",
                            "fragment" => key == "android:name" || key == "class",
                            _ => false,
                        };
                        if names_class && value.contains('.') {
                            result.classes.insert(value.clone());
                        }

                        if attributes.contains(&key) && !value.starts_with('@') && !value.is_empty() {
                            result.attribute_values.entry(key).or_default().push(value);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    debug!("Error parsing layout {}: {:?}", path.display(), e);
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        debug!(
            "Parsed layout {}: {} class references",
            path.display(),
            result.classes.len()
        );

        Ok(result)
    }
}

impl Default for LayoutParser {
    fn default() -> Self {
        Self::new()
    }
}
