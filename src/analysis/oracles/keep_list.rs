use super::{MarkingContext, Oracle};
use crate::analysis::ReachabilityError;
use crate::graph::{KeepReason, KeepReasonKind};
use std::collections::HashSet;
use tracing::debug;

/// Members kept because configuration lists them
pub struct KeepListOracle {
    /// `Lcls;` followed by the static field names to keep
    keep_class_members: Vec<String>,
    /// Method names kept in every class
    keep_methods: HashSet<String>,
}

impl KeepListOracle {
    pub fn new(keep_class_members: Vec<String>, keep_methods: Vec<String>) -> Self {
        Self {
            keep_class_members,
            keep_methods: keep_methods.into_iter().collect(),
        }
    }

    fn keep_class_members(&self, cx: &MarkingContext<'_>) {
        let reason = KeepReason::new(KeepReasonKind::ExplicitList);

        for cls in cx.program.scope() {
            // First entry naming the class wins
            let Some(rest) = self.keep_class_members.iter().find_map(|entry| {
                let pos = entry.find(cls.name.as_str())?;
                Some(&entry[pos + cls.name.len()..])
            }) else {
                continue;
            };

            for field in cx.program.sfields(cls) {
                if rest.contains(field.name.as_str()) {
                    debug!("Keeping listed member {}", field);
                    field.rstate.ref_by_type();
                    field.rstate.set_root(reason);
                    cls.rstate.ref_by_type();
                    cls.rstate.set_root(reason);
                }
            }
        }
    }

    fn keep_methods(&self, cx: &MarkingContext<'_>) {
        if self.keep_methods.is_empty() {
            return;
        }
        let reason = KeepReason::new(KeepReasonKind::ExplicitList);

        // Names match in every class, whatever its type
        for cls in cx.program.scope() {
            for method in cx.program.methods_of(cls) {
                if self.keep_methods.contains(&method.name) {
                    method.rstate.ref_by_string();
                    method.rstate.set_root(reason);
                }
            }
        }
    }
}

impl Oracle for KeepListOracle {
    fn name(&self) -> &'static str {
        "keep lists"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        self.keep_class_members(cx);
        self.keep_methods(cx);
        Ok(())
    }
}
