//! Liveness computation: the reflection analysis, the root oracles, and the
//! engine that sequences them.

mod engine;
pub mod marking;
pub mod oracles;
pub mod reflection;

pub use engine::ReachabilityEngine;
pub use oracles::{MarkingContext, Oracle};
pub use reflection::{AbstractObject, ReflectionAnalysis};

use crate::resources::ResourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReachabilityError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A type the analysis cannot do without is absent from the program
    #[error("required type {name} is not defined or referenced by the program")]
    MissingType { name: String },
}
