use super::{MarkingContext, Oracle};
use crate::analysis::ReachabilityError;
use crate::graph::{KeepReason, KeepReasonKind};
use tracing::{debug, trace};

/// Marker interface of Java serialization
pub const SERIALIZABLE_TYPE: &str = "Ljava/io/Serializable;";

/// Keeps the no-argument constructor of the first non-serializable superclass
/// of every serializable class. Deserialization calls it reflectively.
pub struct SerializableOracle;

impl Oracle for SerializableOracle {
    fn name(&self) -> &'static str {
        "serializable"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let program = cx.program;
        if !program.has_type(SERIALIZABLE_TYPE) {
            trace!("{} unknown; nothing to do", SERIALIZABLE_TYPE);
            return Ok(());
        }

        let implementors = cx.hierarchy.implementors(program, SERIALIZABLE_TYPE);
        for child in &implementors {
            let Some(child_cls) = program.type_class_internal(child) else {
                continue;
            };
            let Some(super_type) = child_cls.super_class.as_deref() else {
                continue;
            };
            let Some(super_cls) = program.type_class(super_type) else {
                continue;
            };
            if super_cls.is_external || implementors.contains(super_type) {
                continue;
            }

            for ctor in program.ctors(super_cls) {
                if ctor.proto.args.is_empty() {
                    debug!("Keeping {} for serializable {}", ctor, child);
                    ctor.rstate.set_root(KeepReason::new(KeepReasonKind::Serializable));
                }
            }
        }
        Ok(())
    }
}
