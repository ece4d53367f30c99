//! Marking helpers shared by the oracles.

use crate::graph::{
    Class, KeepReason, KeepReasonKind, Method, MethodId, Program, TypeHierarchy,
};
use tracing::trace;

/// Resolve a type name to a class, provided the program knows the type at all
pub fn maybe_class_from_string<'a>(program: &'a Program, classname: &str) -> Option<&'a Class> {
    if !program.has_type(classname) {
        return None;
    }
    program.type_class(classname)
}

/// Mark a class and every one of its members reachable by string.
///
/// Classes used through their name (`Class.forName`, layouts, native code)
/// may have any member looked up afterwards.
pub fn mark_reachable_by_classname(program: &Program, cls: &Class) {
    cls.rstate.ref_by_string();
    for method in program.methods_of(cls) {
        method.rstate.ref_by_string();
    }
    for field in program.fields_of(cls) {
        field.rstate.ref_by_string();
    }
}

/// Like [`mark_reachable_by_classname`], recording `kind` as a keep reason on
/// the class
pub fn mark_classname_with_reason(program: &Program, cls: &Class, kind: KeepReasonKind) {
    mark_reachable_by_classname(program, cls);
    cls.rstate.set_root(KeepReason::new(kind));
}

/// Mark a method reachable by string together with its internal owner
pub fn mark_method_reachable_by_string(program: &Program, method: &Method) {
    if let Some(cls) = program.type_class_internal(&method.class_name) {
        cls.rstate.ref_by_string();
    }
    method.rstate.ref_by_string();
}

/// Keep the field `name` looked up reflectively on `ty`.
///
/// A declared lookup only sees `ty` itself but may reach non-public fields;
/// otherwise public fields of `ty` and its superclasses match.
pub fn keep_reflected_field(
    program: &Program,
    hierarchy: &TypeHierarchy,
    reflecting_method: MethodId,
    ty: &str,
    name: &str,
    declared: bool,
) {
    let reason = KeepReason::triggered_by(KeepReasonKind::Reflection, reflecting_method);

    for cls in lookup_chain(program, hierarchy, ty, declared) {
        if cls.is_external {
            continue;
        }
        for field in program.fields_of(cls) {
            if field.name != name || (!field.is_public() && !declared) {
                continue;
            }
            trace!("Reflected field kept: {}", field);
            field.rstate.set_root(reason);
        }
    }
}

/// Keep methods named `name` looked up reflectively on `ty`. With `params`
/// only methods with exactly those argument types match.
pub fn keep_reflected_method(
    program: &Program,
    hierarchy: &TypeHierarchy,
    reflecting_method: MethodId,
    ty: &str,
    name: &str,
    params: Option<&[String]>,
    declared: bool,
) {
    let reason = KeepReason::triggered_by(KeepReasonKind::Reflection, reflecting_method);

    for cls in lookup_chain(program, hierarchy, ty, declared) {
        if cls.is_external {
            continue;
        }
        for method in program.methods_of(cls) {
            if method.name != name {
                continue;
            }
            if params.is_some_and(|params| method.proto.args != params) {
                continue;
            }
            if !method.is_public() && !declared {
                continue;
            }
            trace!("Reflected method kept: {}", method);
            method.rstate.set_root(reason);
        }
    }
}

fn lookup_chain<'a>(
    program: &'a Program,
    hierarchy: &'a TypeHierarchy,
    ty: &'a str,
    declared: bool,
) -> impl Iterator<Item = &'a Class> + 'a {
    let limit = if declared { 1 } else { usize::MAX };
    hierarchy.ancestor_classes(program, ty).take(limit)
}
