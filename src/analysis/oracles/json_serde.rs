use super::{MarkingContext, Oracle};
use crate::analysis::ReachabilityError;
use tracing::{info, warn};

/// Flags every subclass of the configured JSON serializer and deserializer
/// bases with `is_serde`. A classification, not a root.
pub struct JsonSerdeOracle {
    supercls: Vec<String>,
}

impl JsonSerdeOracle {
    pub fn new(supercls: Vec<String>) -> Self {
        Self { supercls }
    }
}

impl Oracle for JsonSerdeOracle {
    fn name(&self) -> &'static str {
        "json serde"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let mut flagged = 0;
        for name in &self.supercls {
            if !cx.program.has_type(name) {
                warn!("JSON serde supertype {} not found", name);
                continue;
            }
            for child in cx.hierarchy.children(name) {
                if let Some(cls) = cx.program.type_class(&child) {
                    cls.rstate.set_is_serde();
                    flagged += 1;
                }
            }
        }

        if flagged > 0 {
            info!("Flagged {} JSON serde classes", flagged);
        }
        Ok(())
    }
}
