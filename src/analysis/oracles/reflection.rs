use super::{MarkingContext, Oracle};
use crate::analysis::marking::{keep_reflected_field, keep_reflected_method};
use crate::analysis::reflection::ReflectionAnalysis;
use crate::analysis::ReachabilityError;
use crate::graph::code::{MethodCode, MethodRef, Reg};
use crate::graph::{Method, INIT};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

const JAVA_LANG_CLASS: &str = "Ljava/lang/Class;";
const ATOMIC_INT_FIELD_UPDATER: &str = "Ljava/util/concurrent/atomic/AtomicIntegerFieldUpdater;";
const ATOMIC_LONG_FIELD_UPDATER: &str = "Ljava/util/concurrent/atomic/AtomicLongFieldUpdater;";
const ATOMIC_REF_FIELD_UPDATER: &str =
    "Ljava/util/concurrent/atomic/AtomicReferenceFieldUpdater;";

/// Reflective member lookups the oracle understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflectionType {
    GetField,
    GetDeclaredField,
    GetMethod,
    GetDeclaredMethod,
    GetConstructor,
    GetConstructors,
    GetDeclaredConstructor,
    GetDeclaredConstructors,
    IntUpdater,
    LongUpdater,
    RefUpdater,
}

impl ReflectionType {
    pub fn from_method_ref(method: &MethodRef) -> Option<Self> {
        let kind = match (method.class.as_str(), method.name.as_str()) {
            (JAVA_LANG_CLASS, "getField") => ReflectionType::GetField,
            (JAVA_LANG_CLASS, "getDeclaredField") => ReflectionType::GetDeclaredField,
            (JAVA_LANG_CLASS, "getMethod") => ReflectionType::GetMethod,
            (JAVA_LANG_CLASS, "getDeclaredMethod") => ReflectionType::GetDeclaredMethod,
            (JAVA_LANG_CLASS, "getConstructor") => ReflectionType::GetConstructor,
            (JAVA_LANG_CLASS, "getConstructors") => ReflectionType::GetConstructors,
            (JAVA_LANG_CLASS, "getDeclaredConstructor") => ReflectionType::GetDeclaredConstructor,
            (JAVA_LANG_CLASS, "getDeclaredConstructors") => {
                ReflectionType::GetDeclaredConstructors
            }
            (ATOMIC_INT_FIELD_UPDATER, "newUpdater") => ReflectionType::IntUpdater,
            (ATOMIC_LONG_FIELD_UPDATER, "newUpdater") => ReflectionType::LongUpdater,
            (ATOMIC_REF_FIELD_UPDATER, "newUpdater") => ReflectionType::RefUpdater,
            _ => return None,
        };
        Some(kind)
    }

    fn is_constructor_lookup(&self) -> bool {
        matches!(
            self,
            ReflectionType::GetConstructor
                | ReflectionType::GetConstructors
                | ReflectionType::GetDeclaredConstructor
                | ReflectionType::GetDeclaredConstructors
        )
    }

    /// Argument position of the member name, `None` for constructors
    fn name_arg(&self) -> Option<usize> {
        match self {
            _ if self.is_constructor_lookup() => None,
            ReflectionType::RefUpdater => Some(2),
            _ => Some(1),
        }
    }

    /// Argument position of the `Class[]` parameter types
    fn params_arg(&self) -> Option<usize> {
        match self {
            ReflectionType::GetMethod | ReflectionType::GetDeclaredMethod => Some(2),
            ReflectionType::GetConstructor | ReflectionType::GetDeclaredConstructor => Some(1),
            _ => None,
        }
    }
}

/// A resolved reflective lookup
enum ReflectedMember {
    Field {
        ty: String,
        name: String,
        declared: bool,
    },
    Method {
        ty: String,
        name: String,
        params: Option<Vec<String>>,
        declared: bool,
    },
}

/// Keeps fields and methods looked up reflectively with constant arguments
pub struct ReflectionOracle;

impl ReflectionOracle {
    /// Resolve every reflective call site of `code` whose class and member
    /// name are constants. The analysis only runs once a candidate site is
    /// found.
    fn resolve_sites(code: &MethodCode) -> Vec<ReflectedMember> {
        let mut analysis: Option<ReflectionAnalysis> = None;
        let mut members = Vec::new();

        for (idx, method_ref, args) in code.invokes() {
            let Some(refl_type) = ReflectionType::from_method_ref(method_ref) else {
                continue;
            };
            let analysis = analysis.get_or_insert_with(|| ReflectionAnalysis::new(code));

            if let Some(member) = Self::resolve_site(analysis, refl_type, idx, args) {
                members.push(member);
            }
        }
        members
    }

    fn resolve_site(
        analysis: &ReflectionAnalysis,
        refl_type: ReflectionType,
        idx: usize,
        args: &[Reg],
    ) -> Option<ReflectedMember> {
        let receiver = *args.first()?;
        let ty = analysis.get_abstract_object(receiver, idx)?.as_class()?.to_string();

        let name = match refl_type.name_arg() {
            None => INIT.to_string(),
            Some(pos) => analysis
                .get_abstract_object(*args.get(pos)?, idx)?
                .as_string()?
                .to_string(),
        };

        let params = refl_type
            .params_arg()
            .and_then(|pos| args.get(pos))
            .and_then(|&reg| analysis.get_method_params(reg, idx));

        let member = match refl_type {
            ReflectionType::GetField => ReflectedMember::Field {
                ty,
                name,
                declared: false,
            },
            ReflectionType::GetDeclaredField
            | ReflectionType::IntUpdater
            | ReflectionType::LongUpdater
            | ReflectionType::RefUpdater => ReflectedMember::Field {
                ty,
                name,
                declared: true,
            },
            ReflectionType::GetMethod
            | ReflectionType::GetConstructor
            | ReflectionType::GetConstructors => ReflectedMember::Method {
                ty,
                name,
                params,
                declared: false,
            },
            ReflectionType::GetDeclaredMethod
            | ReflectionType::GetDeclaredConstructor
            | ReflectionType::GetDeclaredConstructors => ReflectedMember::Method {
                ty,
                name,
                params,
                declared: true,
            },
        };
        Some(member)
    }

    fn mark_method(cx: &MarkingContext<'_>, method: &Method, code: &MethodCode) -> usize {
        let members = Self::resolve_sites(code);
        for member in &members {
            match member {
                ReflectedMember::Field { ty, name, declared } => {
                    debug!("{} reflects field {}.{}", method, ty, name);
                    keep_reflected_field(cx.program, cx.hierarchy, method.id, ty, name, *declared);
                }
                ReflectedMember::Method {
                    ty,
                    name,
                    params,
                    declared,
                } => {
                    debug!("{} reflects method {}.{}", method, ty, name);
                    keep_reflected_method(
                        cx.program,
                        cx.hierarchy,
                        method.id,
                        ty,
                        name,
                        params.as_deref(),
                        *declared,
                    );
                }
            }
        }
        members.len()
    }
}

impl Oracle for ReflectionOracle {
    fn name(&self) -> &'static str {
        "reflection"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let resolved = AtomicUsize::new(0);

        cx.program.par_scope_methods().for_each(|method| {
            if let Some(code) = &method.code {
                let count = Self::mark_method(cx, method, code);
                resolved.fetch_add(count, Ordering::Relaxed);
            }
        });

        info!(
            "Resolved {} reflective call sites",
            resolved.load(Ordering::Relaxed)
        );
        Ok(())
    }
}
