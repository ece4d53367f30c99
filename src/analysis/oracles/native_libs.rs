use super::{MarkingContext, Oracle};
use crate::analysis::marking::{mark_classname_with_reason, maybe_class_from_string};
use crate::analysis::ReachabilityError;
use crate::graph::KeepReasonKind;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Keeps classes that native libraries look up by name
pub struct NativeLibOracle {
    classes: BTreeSet<String>,
}

impl NativeLibOracle {
    /// `classes` are type descriptors
    pub fn new(classes: BTreeSet<String>) -> Self {
        Self { classes }
    }
}

impl Oracle for NativeLibOracle {
    fn name(&self) -> &'static str {
        "native libraries"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let mut marked = 0;
        for classname in &self.classes {
            let Some(cls) = maybe_class_from_string(cx.program, classname) else {
                continue;
            };
            if cls.is_external {
                continue;
            }
            debug!("native_lib: {}", classname);
            mark_classname_with_reason(cx.program, cls, KeepReasonKind::NativeLib);
            marked += 1;
        }

        info!("Native libraries reference {} classes", marked);
        Ok(())
    }
}
