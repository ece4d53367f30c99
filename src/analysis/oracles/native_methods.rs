use super::{MarkingContext, Oracle};
use crate::analysis::marking::mark_method_reachable_by_string;
use crate::analysis::ReachabilityError;
use rayon::prelude::*;
use tracing::{debug, info};

/// Keeps `native` methods, which only native code can call.
///
/// This reads the current code, so it goes stale as methods are removed and
/// has to be re-run after every optimization pass.
pub struct NativeMethodOracle;

impl Oracle for NativeMethodOracle {
    fn name(&self) -> &'static str {
        "native methods"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let program = cx.program;
        let count = program
            .par_scope_methods()
            .filter(|method| method.is_native())
            .inspect(|method| {
                debug!("native_method: {}", method.class_name);
                mark_method_reachable_by_string(program, method);
            })
            .count();

        info!("Marked {} native methods", count);
        Ok(())
    }
}
