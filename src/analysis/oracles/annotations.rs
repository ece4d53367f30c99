use super::{MarkingContext, Oracle};
use crate::analysis::ReachabilityError;
use crate::graph::{KeepReason, KeepReasonKind, ReachabilityState};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Keeps every class, method and field carrying a keep annotation
pub struct AnnotationOracle {
    keep_annotations: Vec<String>,
    no_optimizations: HashSet<String>,
}

impl AnnotationOracle {
    pub fn new(keep_annotations: Vec<String>) -> Self {
        Self {
            keep_annotations,
            no_optimizations: HashSet::new(),
        }
    }

    /// Annotations supplied by the caller rather than configuration. These
    /// are trusted to exist.
    pub fn with_no_optimizations(mut self, annotations: HashSet<String>) -> Self {
        self.no_optimizations = annotations;
        self
    }

    fn resolve(&self, cx: &MarkingContext<'_>) -> HashSet<String> {
        let mut types = self.no_optimizations.clone();
        for name in &self.keep_annotations {
            if cx.program.has_type(name) {
                types.insert(name.clone());
            } else {
                warn!("Keep annotation {} not found", name);
            }
        }
        types
    }
}

fn keep(rstate: &ReachabilityState) {
    rstate.ref_by_type();
    rstate.set_root(KeepReason::new(KeepReasonKind::AnnotationKeep));
}

fn carries_any(annotations: &[String], keep: &HashSet<String>) -> bool {
    annotations.iter().any(|a| keep.contains(a))
}

impl Oracle for AnnotationOracle {
    fn name(&self) -> &'static str {
        "annotations"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let types = self.resolve(cx);
        if types.is_empty() {
            return Ok(());
        }
        let program = cx.program;

        program.par_scope().for_each(|cls| {
            if carries_any(&cls.annotations, &types) {
                debug!("Annotated class kept: {}", cls);
                keep(&cls.rstate);
            }
            for method in program.methods_of(cls) {
                if carries_any(&method.annotations, &types) {
                    keep(&method.rstate);
                }
            }
            for field in program.fields_of(cls) {
                if carries_any(&field.annotations, &types) {
                    keep(&field.rstate);
                }
            }
        });

        Ok(())
    }
}
