//! Register-based instruction model of method bodies.
//!
//! This is the slice of the optimizer's IR the reflection analysis looks at.
//! Branch targets are instruction indices within the same body.

use serde::{Deserialize, Serialize};

pub type Reg = u32;

/// Reference to a method from an invoke instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    /// Descriptor of the class the call names
    pub class: String,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "void_type")]
    pub ret: String,
}

fn void_type() -> String {
    "V".to_string()
}

impl MethodRef {
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            args: Vec::new(),
            ret: void_type(),
        }
    }

    pub fn with_signature(mut self, args: &[&str], ret: &str) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self.ret = ret.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokeKind {
    Static,
    Virtual,
    Direct,
    Interface,
    Super,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Instruction {
    Const {
        dest: Reg,
        value: i64,
    },
    ConstString {
        dest: Reg,
        value: String,
    },
    ConstClass {
        dest: Reg,
        #[serde(rename = "type")]
        ty: String,
    },
    Move {
        dest: Reg,
        src: Reg,
    },
    /// Reads the result of the preceding invoke
    MoveResult {
        dest: Reg,
    },
    NewArray {
        dest: Reg,
        size: Reg,
        #[serde(rename = "type")]
        ty: String,
    },
    /// Array element store: `array[index] = value`
    Aput {
        array: Reg,
        index: Reg,
        value: Reg,
    },
    Invoke {
        kind: InvokeKind,
        method: MethodRef,
        #[serde(default)]
        args: Vec<Reg>,
    },
    Goto {
        target: usize,
    },
    If {
        #[serde(default)]
        srcs: Vec<Reg>,
        target: usize,
    },
    Switch {
        src: Reg,
        targets: Vec<usize>,
    },
    Return {
        #[serde(default)]
        src: Option<Reg>,
    },
    Throw {
        src: Reg,
    },
    /// Any instruction the analysis does not model
    Other {
        #[serde(default)]
        dest: Option<Reg>,
        #[serde(default)]
        srcs: Vec<Reg>,
    },
}

impl Instruction {
    pub fn is_invoke(&self) -> bool {
        matches!(self, Instruction::Invoke { .. })
    }

    /// Indices of the instructions control may flow to next
    pub fn successors(&self, index: usize, len: usize) -> Vec<usize> {
        let next = index + 1;
        let mut succs = match self {
            Instruction::Goto { target } => vec![*target],
            Instruction::If { target, .. } => vec![next, *target],
            Instruction::Switch { targets, .. } => {
                let mut succs = vec![next];
                succs.extend(targets.iter().copied());
                succs
            }
            Instruction::Return { .. } | Instruction::Throw { .. } => vec![],
            _ => vec![next],
        };
        succs.retain(|&s| s < len);
        succs.dedup();
        succs
    }
}

/// Body of a method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodCode {
    pub instructions: Vec<Instruction>,
}

impl MethodCode {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Invoke instructions with their indices
    pub fn invokes(&self) -> impl Iterator<Item = (usize, &MethodRef, &[Reg])> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, insn)| match insn {
                Instruction::Invoke { method, args, .. } => Some((idx, method, args.as_slice())),
                _ => None,
            })
    }

    /// Every type descriptor named by the body
    pub fn referenced_types(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().flat_map(|insn| {
            let types: Vec<&str> = match insn {
                Instruction::ConstClass { ty, .. } | Instruction::NewArray { ty, .. } => {
                    vec![ty.as_str()]
                }
                Instruction::Invoke { method, .. } => std::iter::once(method.class.as_str())
                    .chain(method.args.iter().map(String::as_str))
                    .chain(std::iter::once(method.ret.as_str()))
                    .collect(),
                _ => vec![],
            };
            types
        })
    }
}
