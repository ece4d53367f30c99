use super::{MarkingContext, Oracle};
use crate::analysis::marking::maybe_class_from_string;
use crate::analysis::ReachabilityError;
use crate::graph::{java_name_to_internal, Method, Program};
use crate::parser::xml::{LayoutData, ONCLICK_ATTRIBUTE};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Base type of everything that can host an inflated layout
pub const CONTEXT_TYPE: &str = "Landroid/content/Context;";

/// Sole argument type of an `android:onClick` handler
pub const VIEW_TYPE: &str = "Landroid/view/View;";

/// Keeps views and fragments inflated from layouts, plus the methods their
/// `android:onClick` attributes name.
///
/// Every mark it makes is a resource-xml mark, so the whole result can be
/// cleared and recomputed when layouts change.
pub struct LayoutOracle {
    layouts: LayoutData,
}

impl LayoutOracle {
    pub fn new(layouts: LayoutData) -> Self {
        Self { layouts }
    }

    /// Attributes whose values the oracle needs collected
    pub fn attributes() -> HashSet<String> {
        HashSet::from([ONCLICK_ATTRIBUTE.to_string()])
    }

    fn mark_layout_classes(&self, program: &Program) {
        for classname in &self.layouts.classes {
            let descriptor = java_name_to_internal(classname);
            let Some(cls) = maybe_class_from_string(program, &descriptor) else {
                trace!("Dangling reference from layout: {}", classname);
                continue;
            };
            debug!("xml_layout: {}", descriptor);
            cls.rstate.set_referenced_by_resource_xml();
            // Inflation goes through the constructors
            for ctor in program.ctors(cls) {
                ctor.rstate.set_referenced_by_resource_xml();
            }
        }
    }

    /// Mark handler candidates: virtual methods of internal `Context`
    /// subclasses taking a single `View`, with a name some onClick uses.
    fn mark_onclick_methods(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let names: HashSet<&str> = self
            .layouts
            .values(ONCLICK_ATTRIBUTE)
            .iter()
            .map(String::as_str)
            .collect();
        if names.is_empty() {
            return Ok(());
        }

        if !cx.program.has_type(CONTEXT_TYPE) {
            return Err(ReachabilityError::MissingType {
                name: CONTEXT_TYPE.to_string(),
            });
        }

        for child in cx.hierarchy.children(CONTEXT_TYPE) {
            let Some(cls) = cx.program.type_class(&child) else {
                continue;
            };
            if cls.is_external {
                continue;
            }
            for method in cx.program.vmethods(cls) {
                if is_onclick_handler(method, &names) {
                    debug!("Keeping {} for an onClick attribute", method);
                    method.rstate.set_referenced_by_resource_xml();
                }
            }
        }
        Ok(())
    }
}

fn is_onclick_handler(method: &Method, names: &HashSet<&str>) -> bool {
    matches!(method.proto.args.as_slice(), [arg] if arg == VIEW_TYPE)
        && names.contains(method.name.as_str())
}

impl Oracle for LayoutOracle {
    fn name(&self) -> &'static str {
        "layouts"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        self.mark_layout_classes(cx.program);
        self.mark_onclick_methods(cx)
    }
}
