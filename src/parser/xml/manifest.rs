use crate::graph::java_name_to_internal;
use crate::resources::ResourceError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Kind of a component declared in AndroidManifest.xml
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Activity,
    ActivityAlias,
    Receiver,
    Service,
    Provider,
}

impl ComponentKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "activity" => Some(ComponentKind::Activity),
            "activity-alias" => Some(ComponentKind::ActivityAlias),
            "receiver" => Some(ComponentKind::Receiver),
            "service" => Some(ComponentKind::Service),
            "provider" => Some(ComponentKind::Provider),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Activity => "activity",
            ComponentKind::ActivityAlias => "activity-alias",
            ComponentKind::Receiver => "receiver",
            ComponentKind::Service => "service",
            ComponentKind::Provider => "provider",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `<activity>`, `<service>`, ... entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTagInfo {
    pub tag: ComponentKind,
    /// Type descriptor of the component class
    pub classname: String,
    #[serde(default)]
    pub is_exported: bool,
    #[serde(default)]
    pub has_intent_filters: bool,
    /// Providers only
    #[serde(default)]
    pub authority_classes: BTreeSet<String>,
}

impl ComponentTagInfo {
    pub fn new(tag: ComponentKind, classname: impl Into<String>) -> Self {
        Self {
            tag,
            classname: classname.into(),
            is_exported: false,
            has_intent_filters: false,
            authority_classes: BTreeSet::new(),
        }
    }

    pub fn exported(mut self, is_exported: bool) -> Self {
        self.is_exported = is_exported;
        self
    }

    pub fn with_intent_filters(mut self, has_intent_filters: bool) -> Self {
        self.has_intent_filters = has_intent_filters;
        self
    }

    pub fn with_authority(mut self, classname: impl Into<String>) -> Self {
        self.authority_classes.insert(classname.into());
        self
    }
}

/// Class references declared by a manifest. All names are type descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestClassInfo {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub application_classes: BTreeSet<String>,
    #[serde(default)]
    pub instrumentation_classes: BTreeSet<String>,
    #[serde(default)]
    pub component_tags: Vec<ComponentTagInfo>,
}

/// Parser for AndroidManifest.xml files
pub struct ManifestParser;

impl ManifestParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a manifest into its component declarations
    pub fn parse(&self, path: &Path, contents: &str) -> Result<ManifestClassInfo, ResourceError> {
        let mut info = ManifestClassInfo::default();
        let mut reader = Reader::from_str(contents);
        reader.trim_text(true);

        let mut buf = Vec::new();
        // Index into component_tags of the component whose children we are in
        let mut open_component: Option<usize> = None;
        let mut depth = 0usize;
        let mut component_depth = 0usize;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| ResourceError::Xml {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;

            match event {
                Event::Start(ref e) => {
                    depth += 1;
                    if let Some(idx) = self.handle_element(e, &mut info, open_component) {
                        open_component = Some(idx);
                        component_depth = depth;
                    }
                }
                Event::Empty(ref e) => {
                    self.handle_element(e, &mut info, open_component);
                }
                Event::End(_) => {
                    if open_component.is_some() && depth == component_depth {
                        open_component = None;
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        debug!(
            "Parsed manifest {}: {} components, {} application classes",
            path.display(),
            info.component_tags.len(),
            info.application_classes.len()
        );

        Ok(info)
    }

    /// Record one element. Returns the index of a newly declared component.
    fn handle_element(
        &self,
        e: &BytesStart,
        info: &mut ManifestClassInfo,
        open_component: Option<usize>,
    ) -> Option<usize> {
        let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

        match tag_name.as_str() {
            "manifest" => {
                info.package = attribute(e, "package");
                None
            }
            "application" => {
                if let Some(name) = attribute(e, "android:name") {
                    let class = self.resolve_class_name(&name, &info.package);
                    info.application_classes.insert(java_name_to_internal(&class));
                }
                None
            }
            "instrumentation" => {
                if let Some(name) = attribute(e, "android:name") {
                    let class = self.resolve_class_name(&name, &info.package);
                    info.instrumentation_classes.insert(java_name_to_internal(&class));
                }
                None
            }
            "intent-filter" => {
                if let Some(component) = open_component.and_then(|idx| info.component_tags.get_mut(idx)) {
                    component.has_intent_filters = true;
                }
                None
            }
            tag => {
                let kind = ComponentKind::from_tag(tag)?;
                let name_attr = if kind == ComponentKind::ActivityAlias {
                    "android:targetActivity"
                } else {
                    "android:name"
                };
                let Some(name) = attribute(e, name_attr) else {
                    debug!("Skipping <{}> without {}", tag, name_attr);
                    return None;
                };

                let class = self.resolve_class_name(&name, &info.package);
                let mut component = ComponentTagInfo::new(kind, java_name_to_internal(&class))
                    .exported(attribute(e, "android:exported").as_deref() == Some("true"));

                if kind == ComponentKind::Provider {
                    if let Some(authorities) = attribute(e, "android:authorities") {
                        component.authority_classes = authorities
                            .split(';')
                            .map(str::trim)
                            .filter(|a| !a.is_empty())
                            .map(java_name_to_internal)
                            .collect();
                    }
                }

                info.component_tags.push(component);
                Some(info.component_tags.len() - 1)
            }
        }
    }

    /// Resolve a class name, handling relative names like ".MainActivity"
    fn resolve_class_name(&self, name: &str, package: &Option<String>) -> String {
        if let Some(relative) = name.strip_prefix('.') {
            match package {
                Some(pkg) => format!("{}.{}", pkg, relative),
                None => relative.to_string(),
            }
        } else if !name.contains('.') {
            match package {
                Some(pkg) => format!("{}.{}", pkg, name),
                None => name.to_string(),
            }
        } else {
            name.to_string()
        }
    }
}

impl Default for ManifestParser {
    fn default() -> Self {
        Self::new()
    }
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}
