mod builder;
pub mod code;
mod entity;
mod hierarchy;
mod state;

pub use builder::{ClassDef, FieldDef, MethodDef, ProgramBuilder, ProgramDump};
pub use entity::{
    internal_to_java_name, java_name_to_internal, AccessFlags, Class, ClassId, EntityId,
    EntityKind, Field, FieldId, Method, MethodId, Proto, CLINIT, INIT,
};
pub use hierarchy::{Ancestors, TypeHierarchy};
pub use state::{KeepReason, KeepReasonKind, ReachabilityState};

use miette::{IntoDiagnostic, Result, WrapErr};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// The whole-program entity graph.
///
/// Structure is immutable once built; only the per-entity
/// [`ReachabilityState`] changes, through its `&self` marking methods.
#[derive(Debug)]
pub struct Program {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,

    /// Map from type descriptor to class
    class_index: HashMap<String, ClassId>,

    /// Every type descriptor defined or referenced by the program
    known_types: HashSet<String>,

    /// Internal (non-external) classes in load order
    scope: Vec<ClassId>,
}

impl Program {
    /// Load a program from a JSON dump
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let dump: ProgramDump = serde_json::from_str(contents)
            .into_diagnostic()
            .wrap_err("Failed to parse program dump")?;
        Ok(ProgramBuilder::from_dump(dump).build())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read program dump: {}", path.display()))?;
        Self::from_json_str(&contents)
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    /// All classes, external ones included
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    pub fn par_classes(&self) -> impl ParallelIterator<Item = &Class> {
        self.classes.par_iter()
    }

    /// Internal classes
    pub fn scope(&self) -> impl Iterator<Item = &Class> {
        self.scope.iter().map(move |&id| self.class(id))
    }

    pub fn par_scope(&self) -> impl ParallelIterator<Item = &Class> {
        self.scope.par_iter().map(move |&id| self.class(id))
    }

    /// Methods of internal classes
    pub fn par_scope_methods(&self) -> impl ParallelIterator<Item = &Method> {
        self.par_scope().flat_map_iter(move |cls| self.methods_of(cls))
    }

    /// Resolve a type descriptor to its class definition, if any
    pub fn type_class(&self, name: &str) -> Option<&Class> {
        self.class_index.get(name).map(|&id| self.class(id))
    }

    /// Like [`type_class`](Self::type_class) but ignores external classes
    pub fn type_class_internal(&self, name: &str) -> Option<&Class> {
        self.type_class(name).filter(|cls| !cls.is_external)
    }

    /// Whether the type is known to the program at all, defined or referenced
    pub fn has_type(&self, name: &str) -> bool {
        self.known_types.contains(name)
    }

    /// Direct then virtual methods
    pub fn methods_of<'a>(&'a self, cls: &'a Class) -> impl Iterator<Item = &'a Method> + 'a {
        cls.dmethods
            .iter()
            .chain(cls.vmethods.iter())
            .map(move |&id| self.method(id))
    }

    pub fn dmethods<'a>(&'a self, cls: &'a Class) -> impl Iterator<Item = &'a Method> + 'a {
        cls.dmethods.iter().map(move |&id| self.method(id))
    }

    pub fn vmethods<'a>(&'a self, cls: &'a Class) -> impl Iterator<Item = &'a Method> + 'a {
        cls.vmethods.iter().map(move |&id| self.method(id))
    }

    /// Static then instance fields
    pub fn fields_of<'a>(&'a self, cls: &'a Class) -> impl Iterator<Item = &'a Field> + 'a {
        cls.sfields
            .iter()
            .chain(cls.ifields.iter())
            .map(move |&id| self.field(id))
    }

    pub fn sfields<'a>(&'a self, cls: &'a Class) -> impl Iterator<Item = &'a Field> + 'a {
        cls.sfields.iter().map(move |&id| self.field(id))
    }

    /// Instance constructors
    pub fn ctors<'a>(&'a self, cls: &'a Class) -> impl Iterator<Item = &'a Method> + 'a {
        self.dmethods(cls).filter(|m| m.is_init())
    }

    /// Every entity, classes first then each class's methods and fields
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.classes.iter().flat_map(move |cls| {
            std::iter::once(EntityId::Class(cls.id))
                .chain(self.methods_of(cls).map(|m| EntityId::Method(m.id)))
                .chain(self.fields_of(cls).map(|f| EntityId::Field(f.id)))
        })
    }

    pub fn rstate(&self, id: EntityId) -> &ReachabilityState {
        match id {
            EntityId::Class(id) => &self.class(id).rstate,
            EntityId::Method(id) => &self.method(id).rstate,
            EntityId::Field(id) => &self.field(id).rstate,
        }
    }

    pub fn display(&self, id: EntityId) -> String {
        match id {
            EntityId::Class(id) => self.class(id).to_string(),
            EntityId::Method(id) => self.method(id).to_string(),
            EntityId::Field(id) => self.field(id).to_string(),
        }
    }

    /// Find a method by its display form (`Lcls;.name:(args)ret`)
    pub fn find_method(&self, signature: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.to_string() == signature)
    }

    /// Find a field by its display form (`Lcls;.name:type`)
    pub fn find_field(&self, signature: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.to_string() == signature)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
