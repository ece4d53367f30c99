use super::code::MethodCode;
use super::state::ReachabilityState;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Index of a class in the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub(crate) u32);

/// Index of a method in the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub(crate) u32);

/// Index of a field in the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub(crate) u32);

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl MethodId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl FieldId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Any program entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Class(ClassId),
    Method(MethodId),
    Field(FieldId),
}

/// Kind of entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Class,
    Method,
    Field,
}

impl EntityKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Class => "class",
            EntityKind::Method => "method",
            EntityKind::Field => "field",
        }
    }
}

impl EntityId {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityId::Class(_) => EntityKind::Class,
            EntityId::Method(_) => EntityKind::Method,
            EntityId::Field(_) => EntityKind::Field,
        }
    }
}

bitflags! {
    /// Dex access flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x0001_0000;
    }
}

/// Name of instance constructors
pub const INIT: &str = "<init>";
/// Name of static initializers
pub const CLINIT: &str = "<clinit>";

/// Convert a dotted Java class name (`com.example.Foo`) to a type descriptor
/// (`Lcom/example/Foo;`). Descriptors are returned unchanged.
pub fn java_name_to_internal(name: &str) -> String {
    if name.starts_with('L') && name.ends_with(';') && !name.contains('.') {
        return name.to_string();
    }
    format!("L{};", name.replace('.', "/"))
}

/// Convert a type descriptor back to a dotted Java class name
pub fn internal_to_java_name(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .unwrap_or(descriptor)
        .replace('/', ".")
}

/// Method prototype
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proto {
    pub args: Vec<String>,
    pub ret: String,
}

impl Proto {
    pub fn new(args: Vec<String>, ret: impl Into<String>) -> Self {
        Self {
            args,
            ret: ret.into(),
        }
    }
}

impl std::fmt::Display for Proto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}){}", self.args.concat(), self.ret)
    }
}

/// A class definition. External classes come from the platform or from
/// libraries that are not part of the optimized program; they only
/// contribute to the type hierarchy.
#[derive(Debug)]
pub struct Class {
    pub id: ClassId,

    /// Type descriptor (e.g., "Lcom/example/MainActivity;")
    pub name: String,

    pub super_class: Option<String>,

    pub interfaces: Vec<String>,

    pub access: AccessFlags,

    /// Annotation type descriptors
    pub annotations: Vec<String>,

    pub is_external: bool,

    /// Static, private and constructor methods
    pub dmethods: Vec<MethodId>,

    /// Overridable methods
    pub vmethods: Vec<MethodId>,

    pub sfields: Vec<FieldId>,

    pub ifields: Vec<FieldId>,

    pub rstate: ReachabilityState,
}

impl Class {
    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE)
    }

    pub fn is_public(&self) -> bool {
        self.access.contains(AccessFlags::PUBLIC)
    }
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A method definition
#[derive(Debug)]
pub struct Method {
    pub id: MethodId,
    pub class: ClassId,
    /// Descriptor of the declaring class
    pub class_name: String,
    pub name: String,
    pub proto: Proto,
    pub access: AccessFlags,
    pub annotations: Vec<String>,
    pub code: Option<MethodCode>,
    pub rstate: ReachabilityState,
}

impl Method {
    pub fn is_public(&self) -> bool {
        self.access.contains(AccessFlags::PUBLIC)
    }

    pub fn is_native(&self) -> bool {
        self.access.contains(AccessFlags::NATIVE)
    }

    pub fn is_init(&self) -> bool {
        self.name == INIT
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}:{}", self.class_name, self.name, self.proto)
    }
}

/// A field definition
#[derive(Debug)]
pub struct Field {
    pub id: FieldId,
    pub class: ClassId,
    pub class_name: String,
    pub name: String,
    pub ty: String,
    pub access: AccessFlags,
    pub annotations: Vec<String>,
    pub rstate: ReachabilityState,
}

impl Field {
    pub fn is_public(&self) -> bool {
        self.access.contains(AccessFlags::PUBLIC)
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}:{}", self.class_name, self.name, self.ty)
    }
}
