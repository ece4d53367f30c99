//! Providers of the non-bytecode inputs: manifest, layouts and native
//! libraries.

use crate::discovery::{ApkFile, FileFinder};
use crate::parser::xml::{LayoutData, LayoutParser, ManifestClassInfo, ManifestParser};
use crate::parser::NativeLibScanner;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in {path}: {message}")]
    Xml { path: PathBuf, message: String },
}

impl ResourceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ResourceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Source of manifest, layout and native-library data
pub trait ResourceSource: Send + Sync {
    /// Component declarations, or `None` when there is no manifest
    fn manifest(&self) -> Result<Option<ManifestClassInfo>, ResourceError>;

    /// Classes referenced from layouts, plus the values of `attributes`
    fn layouts(&self, attributes: &HashSet<String>) -> Result<LayoutData, ResourceError>;

    /// Type descriptors named by native libraries
    fn native_classes(&self) -> Result<BTreeSet<String>, ResourceError>;

    /// Directory the data is read from, if any
    fn root(&self) -> Option<&Path> {
        None
    }
}

/// Resources of an unpacked apk on disk
pub struct ApkDirectory {
    finder: FileFinder,
    manifest_parser: ManifestParser,
    layout_parser: LayoutParser,
    scanner: NativeLibScanner,
}

impl ApkDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            finder: FileFinder::new(root),
            manifest_parser: ManifestParser::new(),
            layout_parser: LayoutParser::new(),
            scanner: NativeLibScanner::new(),
        }
    }

    fn read_to_string(file: &ApkFile) -> Result<String, ResourceError> {
        std::fs::read_to_string(&file.path).map_err(|e| ResourceError::io(&file.path, e))
    }
}

impl ResourceSource for ApkDirectory {
    fn manifest(&self) -> Result<Option<ManifestClassInfo>, ResourceError> {
        let Some(file) = self.finder.find_manifests().into_iter().next() else {
            debug!("No AndroidManifest.xml under {}", self.finder.root().display());
            return Ok(None);
        };

        let contents = Self::read_to_string(&file)?;
        self.manifest_parser.parse(&file.path, &contents).map(Some)
    }

    fn layouts(&self, attributes: &HashSet<String>) -> Result<LayoutData, ResourceError> {
        let files = self.finder.find_layouts();

        let parsed: Vec<LayoutData> = files
            .par_iter()
            .map(|file| {
                let contents = Self::read_to_string(file)?;
                self.layout_parser.parse(&file.path, &contents, attributes)
            })
            .collect::<Result<_, _>>()?;

        let mut data = LayoutData::new();
        for layout in parsed {
            data.merge(layout);
        }

        info!(
            "Read {} layouts: {} referenced classes",
            files.len(),
            data.classes.len()
        );
        Ok(data)
    }

    fn native_classes(&self) -> Result<BTreeSet<String>, ResourceError> {
        let files = self.finder.find_native_libs();

        let mut classes = BTreeSet::new();
        for file in &files {
            let bytes = std::fs::read(&file.path).map_err(|e| ResourceError::io(&file.path, e))?;
            let found = self.scanner.scan(&bytes);
            debug!("{}: {} class names", file.path.display(), found.len());
            classes.extend(found);
        }

        info!(
            "Scanned {} native libraries: {} class names",
            files.len(),
            classes.len()
        );
        Ok(classes)
    }

    fn root(&self) -> Option<&Path> {
        Some(self.finder.root())
    }
}

/// Resource data held in memory, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    manifest: Option<ManifestClassInfo>,
    layouts: LayoutData,
    native_classes: BTreeSet<String>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(mut self, manifest: ManifestClassInfo) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn with_layouts(mut self, layouts: LayoutData) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn with_native_class(mut self, descriptor: impl Into<String>) -> Self {
        self.native_classes.insert(descriptor.into());
        self
    }
}

impl ResourceSource for InMemoryResources {
    fn manifest(&self) -> Result<Option<ManifestClassInfo>, ResourceError> {
        Ok(self.manifest.clone())
    }

    fn layouts(&self, attributes: &HashSet<String>) -> Result<LayoutData, ResourceError> {
        let mut data = self.layouts.clone();
        data.attribute_values.retain(|name, _| attributes.contains(name));
        Ok(data)
    }

    fn native_classes(&self) -> Result<BTreeSet<String>, ResourceError> {
        Ok(self.native_classes.clone())
    }
}
