use super::code::MethodCode;
use super::entity::{AccessFlags, Class, ClassId, Field, FieldId, Method, MethodId, Proto, CLINIT, INIT};
use super::state::ReachabilityState;
use super::Program;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Serialized form of a whole program, as produced by the bytecode loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramDump {
    pub classes: Vec<ClassDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default, rename = "super")]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub access: AccessFlags,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "void_type")]
    pub ret: String,
    #[serde(default)]
    pub access: AccessFlags,
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Overrides the direct/virtual classification derived from flags
    #[serde(default)]
    pub direct: Option<bool>,
    #[serde(default)]
    pub code: Option<MethodCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub access: AccessFlags,
    #[serde(default)]
    pub annotations: Vec<String>,
}

fn void_type() -> String {
    "V".to_string()
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_class: Some("Ljava/lang/Object;".to_string()),
            interfaces: Vec::new(),
            access: AccessFlags::PUBLIC,
            annotations: Vec::new(),
            external: false,
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_super(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn without_super(mut self) -> Self {
        self.super_class = None;
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            ret: void_type(),
            access: AccessFlags::PUBLIC,
            annotations: Vec::new(),
            direct: None,
            code: None,
        }
    }

    /// Public no-argument constructor
    pub fn constructor() -> Self {
        Self::new(INIT).with_access(AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_ret(mut self, ret: impl Into<String>) -> Self {
        self.ret = ret.into();
        self
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn with_code(mut self, code: MethodCode) -> Self {
        self.code = Some(code);
        self
    }

    fn is_direct(&self) -> bool {
        self.direct.unwrap_or_else(|| {
            self.name == INIT
                || self.name == CLINIT
                || self
                    .access
                    .intersects(AccessFlags::STATIC | AccessFlags::PRIVATE | AccessFlags::CONSTRUCTOR)
        })
    }
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            access: AccessFlags::PUBLIC,
            annotations: Vec::new(),
        }
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

/// Builder for constructing a [`Program`]
#[derive(Default)]
pub struct ProgramBuilder {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    class_index: HashMap<String, ClassId>,
    known_types: HashSet<String>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dump(dump: ProgramDump) -> Self {
        let mut builder = Self::new();
        for class in dump.classes {
            builder.add_class(class);
        }
        builder
    }

    pub fn class(mut self, class: ClassDef) -> Self {
        self.add_class(class);
        self
    }

    /// Add a class and its members. A second definition of the same
    /// descriptor is ignored.
    pub fn add_class(&mut self, def: ClassDef) -> Option<ClassId> {
        if self.class_index.contains_key(&def.name) {
            warn!("Duplicate class definition ignored: {}", def.name);
            return None;
        }

        let id = ClassId(self.classes.len() as u32);

        self.known_types.insert(def.name.clone());
        self.known_types.extend(def.super_class.iter().cloned());
        self.known_types.extend(def.interfaces.iter().cloned());
        self.known_types.extend(def.annotations.iter().cloned());

        let mut dmethods = Vec::new();
        let mut vmethods = Vec::new();
        for method in def.methods {
            let direct = method.is_direct();
            let method_id = self.add_method(id, &def.name, method);
            if direct {
                dmethods.push(method_id);
            } else {
                vmethods.push(method_id);
            }
        }

        let mut sfields = Vec::new();
        let mut ifields = Vec::new();
        for field in def.fields {
            let is_static = field.access.contains(AccessFlags::STATIC);
            let field_id = self.add_field(id, &def.name, field);
            if is_static {
                sfields.push(field_id);
            } else {
                ifields.push(field_id);
            }
        }

        self.class_index.insert(def.name.clone(), id);
        self.classes.push(Class {
            id,
            name: def.name,
            super_class: def.super_class,
            interfaces: def.interfaces,
            access: def.access,
            annotations: def.annotations,
            is_external: def.external,
            dmethods,
            vmethods,
            sfields,
            ifields,
            rstate: ReachabilityState::new(),
        });

        Some(id)
    }

    fn add_method(&mut self, class: ClassId, class_name: &str, def: MethodDef) -> MethodId {
        let id = MethodId(self.methods.len() as u32);

        self.known_types.extend(def.args.iter().cloned());
        self.known_types.insert(def.ret.clone());
        self.known_types.extend(def.annotations.iter().cloned());
        if let Some(code) = &def.code {
            self.known_types
                .extend(code.referenced_types().map(str::to_string));
        }

        self.methods.push(Method {
            id,
            class,
            class_name: class_name.to_string(),
            name: def.name,
            proto: Proto::new(def.args, def.ret),
            access: def.access,
            annotations: def.annotations,
            code: def.code,
            rstate: ReachabilityState::new(),
        });
        id
    }

    fn add_field(&mut self, class: ClassId, class_name: &str, def: FieldDef) -> FieldId {
        let id = FieldId(self.fields.len() as u32);

        self.known_types.insert(def.ty.clone());
        self.known_types.extend(def.annotations.iter().cloned());

        self.fields.push(Field {
            id,
            class,
            class_name: class_name.to_string(),
            name: def.name,
            ty: def.ty,
            access: def.access,
            annotations: def.annotations,
            rstate: ReachabilityState::new(),
        });
        id
    }

    pub fn build(self) -> Program {
        let scope: Vec<ClassId> = self
            .classes
            .iter()
            .filter(|c| !c.is_external)
            .map(|c| c.id)
            .collect();

        debug!(
            "Built program: {} classes ({} internal), {} methods, {} fields",
            self.classes.len(),
            scope.len(),
            self.methods.len(),
            self.fields.len()
        );

        Program {
            classes: self.classes,
            methods: self.methods,
            fields: self.fields,
            class_index: self.class_index,
            known_types: self.known_types,
            scope,
        }
    }
}
