use crate::parser::xml::ComponentKind;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for a reachability run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Unpacked apk holding the manifest, layouts and native libraries.
    /// Empty disables every resource-driven oracle.
    pub apk_dir: PathBuf,

    /// Package prefixes (descriptor form) whose classes are kept by name
    pub keep_packages: Vec<String>,

    /// Annotation types that keep whatever carries them
    pub keep_annotations: Vec<String>,

    /// `Lcls;` descriptor followed by the static field names to keep
    pub keep_class_members: Vec<String>,

    /// Method names kept in every class
    pub keep_methods: Vec<String>,

    pub compute_xml_reachability: bool,

    /// Component kinds that are only pinned when neither exported nor
    /// reachable through an intent filter
    pub prune_unexported_components: BTreeSet<ComponentKind>,

    pub analyze_native_lib_reachability: bool,

    /// Base classes of JSON serializers and deserializers
    pub json_serde_supercls: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apk_dir: PathBuf::new(),
            keep_packages: vec![],
            keep_annotations: vec![],
            keep_class_members: vec![],
            keep_methods: vec![],
            compute_xml_reachability: true,
            prune_unexported_components: BTreeSet::new(),
            analyze_native_lib_reachability: true,
            json_serde_supercls: vec![],
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML, TOML or JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            "json" => serde_json::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse JSON config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(dir: &Path) -> Result<Self> {
        let default_names = [
            ".keepgraph.yml",
            ".keepgraph.yaml",
            ".keepgraph.toml",
            ".keepgraph.json",
            "keepgraph.yml",
            "keepgraph.yaml",
            "keepgraph.toml",
            "keepgraph.json",
        ];

        for name in &default_names {
            let path = dir.join(name);
            if path.exists() {
                debug!("Using config file {}", path.display());
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    /// Whether resource-driven oracles have anything to read
    pub fn has_apk_dir(&self) -> bool {
        !self.apk_dir.as_os_str().is_empty()
    }

    pub fn prunes(&self, kind: ComponentKind) -> bool {
        self.prune_unexported_components.contains(&kind)
    }
}
