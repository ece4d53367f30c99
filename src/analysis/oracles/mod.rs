//! Root oracles.
//!
//! Each oracle reads the program plus one external input and marks the
//! reachability state of the entities that input keeps alive. Oracles only
//! ever add marks; they can run in any order.

mod annotations;
mod json_serde;
mod keep_list;
mod layout;
mod manifest;
mod native_libs;
mod native_methods;
mod reflected_packages;
mod reflection;
mod serializable;

pub use annotations::AnnotationOracle;
pub use json_serde::JsonSerdeOracle;
pub use keep_list::KeepListOracle;
pub use layout::{LayoutOracle, CONTEXT_TYPE, VIEW_TYPE};
pub use manifest::ManifestOracle;
pub use native_libs::NativeLibOracle;
pub use native_methods::NativeMethodOracle;
pub use reflected_packages::ReflectedPackagesOracle;
pub use reflection::{ReflectionOracle, ReflectionType};
pub use serializable::{SerializableOracle, SERIALIZABLE_TYPE};

use super::ReachabilityError;
use crate::graph::{Program, TypeHierarchy};

/// What an oracle gets to look at
pub struct MarkingContext<'a> {
    pub program: &'a Program,
    pub hierarchy: &'a TypeHierarchy,
}

impl<'a> MarkingContext<'a> {
    pub fn new(program: &'a Program, hierarchy: &'a TypeHierarchy) -> Self {
        Self { program, hierarchy }
    }
}

/// A source of roots
pub trait Oracle {
    fn name(&self) -> &'static str;

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError>;
}
