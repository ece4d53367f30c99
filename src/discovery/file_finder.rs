use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Kind of resource file inside an unpacked apk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Manifest,
    Layout,
    NativeLib,
}

impl FileType {
    /// Determine file type from a path relative to the apk root
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        let file_name = path.file_name()?.to_str()?;

        match extension {
            "xml" if file_name == "AndroidManifest.xml" => Some(FileType::Manifest),
            "xml" => {
                // res/layout/, res/layout-land/, res/layout-v21/ ...
                let parent = path.parent()?;
                let dir = parent.file_name()?.to_str()?;
                let grandparent = parent.parent()?.file_name()?.to_str()?;
                (grandparent == "res" && (dir == "layout" || dir.starts_with("layout-")))
                    .then_some(FileType::Layout)
            }
            "so" => {
                let in_lib = path
                    .components()
                    .any(|c| c.as_os_str().to_str() == Some("lib"));
                in_lib.then_some(FileType::NativeLib)
            }
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FileType::Manifest => "manifest",
            FileType::Layout => "layout",
            FileType::NativeLib => "native library",
        }
    }
}

/// A discovered resource file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkFile {
    pub path: PathBuf,
    pub file_type: FileType,
}

impl ApkFile {
    pub fn new(path: PathBuf, file_type: FileType) -> Self {
        Self { path, file_type }
    }
}

/// File finder for the resource files of an unpacked apk
pub struct FileFinder {
    root: PathBuf,
}

impl FileFinder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find every manifest, layout and native library under the root, sorted
    /// by path
    pub fn find_files(&self) -> Vec<ApkFile> {
        debug!("Scanning for resource files in: {}", self.root.display());

        if !self.root.exists() {
            trace!("Directory does not exist: {}", self.root.display());
            return Vec::new();
        }

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        let files: Vec<ApkFile> = walker
            .flatten()
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.root).ok()?;
                let file_type = FileType::from_path(relative)?;
                trace!("Found {}: {}", file_type.display_name(), entry.path().display());
                Some(ApkFile::new(entry.path().to_path_buf(), file_type))
            })
            .collect();

        debug!("Found {} resource files", files.len());
        files
    }

    fn find_of_type(&self, file_type: FileType) -> Vec<ApkFile> {
        self.find_files()
            .into_iter()
            .filter(|f| f.file_type == file_type)
            .collect()
    }

    /// Manifests, the top-level one first
    pub fn find_manifests(&self) -> Vec<ApkFile> {
        let mut manifests = self.find_of_type(FileType::Manifest);
        manifests.sort_by_key(|f| f.path.components().count());
        manifests
    }

    pub fn find_layouts(&self) -> Vec<ApkFile> {
        self.find_of_type(FileType::Layout)
    }

    pub fn find_native_libs(&self) -> Vec<ApkFile> {
        self.find_of_type(FileType::NativeLib)
    }
}
