//! Constant tracking for reflective call sites.
//!
//! A forward must-constant dataflow over a method body. For every
//! instruction it records which registers hold a statically known integer,
//! string, class or class array on *every* path reaching it. Anything not
//! recorded is unknown.

use crate::graph::code::{Instruction, MethodCode, MethodRef, Reg};
use crate::graph::java_name_to_internal;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::trace;

const JAVA_LANG_CLASS: &str = "Ljava/lang/Class;";

/// Statically known value of a register
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractObject {
    Int(i64),
    String(String),
    /// A `java.lang.Class` instance for the given descriptor
    Class(String),
    /// A `Class[]` allocated by the `new-array` at this instruction index
    ClassArray(usize),
}

impl AbstractObject {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AbstractObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&str> {
        match self {
            AbstractObject::Class(ty) => Some(ty),
            _ => None,
        }
    }
}

/// Pseudo register holding the result of the last invoke
const RESULT_REG: Reg = Reg::MAX;

#[derive(Debug, Clone, Default, PartialEq)]
struct Environment {
    registers: HashMap<Reg, AbstractObject>,
    /// Elements of abstract arrays, keyed by allocation site. `None` elements
    /// are unknown.
    arrays: HashMap<usize, Vec<Option<String>>>,
    /// Allocation sites reachable through something other than a tracked
    /// register. Any call may write them.
    escaped: HashSet<usize>,
}

impl Environment {
    /// Keep only what both environments agree on
    fn join(&self, other: &Environment) -> Environment {
        let registers = self
            .registers
            .iter()
            .filter(|(reg, value)| other.registers.get(reg) == Some(value))
            .map(|(reg, value)| (*reg, value.clone()))
            .collect();

        let arrays = self
            .arrays
            .iter()
            .filter_map(|(site, elements)| {
                let theirs = other.arrays.get(site)?;
                if theirs.len() != elements.len() {
                    return None;
                }
                let joined = elements
                    .iter()
                    .zip(theirs)
                    .map(|(a, b)| if a == b { a.clone() } else { None })
                    .collect();
                Some((*site, joined))
            })
            .collect();

        let escaped = self.escaped.union(&other.escaped).copied().collect();

        Environment {
            registers,
            arrays,
            escaped,
        }
    }

    fn get(&self, reg: Reg) -> Option<&AbstractObject> {
        self.registers.get(&reg)
    }

    fn set(&mut self, reg: Reg, value: Option<AbstractObject>) {
        match value {
            Some(value) => {
                self.registers.insert(reg, value);
            }
            None => {
                self.registers.remove(&reg);
            }
        }
    }

    fn int(&self, reg: Reg) -> Option<i64> {
        match self.get(reg) {
            Some(AbstractObject::Int(n)) => Some(*n),
            _ => None,
        }
    }

    fn array_site(&self, reg: Reg) -> Option<usize> {
        match self.get(reg) {
            Some(AbstractObject::ClassArray(site)) => Some(*site),
            _ => None,
        }
    }

    /// Forget the contents of an allocation site
    fn clobber_site(&mut self, site: usize) {
        if let Some(elements) = self.arrays.get_mut(&site) {
            elements.iter_mut().for_each(|e| *e = None);
        }
    }

    /// Forget the array held by `reg` and treat it as escaped from here on
    fn escape_array(&mut self, reg: Reg) {
        if let Some(site) = self.array_site(reg) {
            self.clobber_site(site);
            self.escaped.insert(site);
        }
    }

    fn clobber_escaped(&mut self) {
        let sites: Vec<usize> = self.escaped.iter().copied().collect();
        for site in sites {
            self.clobber_site(site);
        }
    }

    fn clobber_all_arrays(&mut self) {
        self.arrays
            .values_mut()
            .for_each(|elements| elements.iter_mut().for_each(|e| *e = None));
    }
}

/// Per-method result of the constant analysis. Read-only once built.
#[derive(Debug)]
pub struct ReflectionAnalysis {
    /// Environment on entry to each instruction; `None` if unreachable
    entry_states: Vec<Option<Environment>>,
}

impl ReflectionAnalysis {
    /// Run the analysis to a fixpoint
    pub fn new(code: &MethodCode) -> Self {
        let instructions = &code.instructions;
        let len = instructions.len();
        let mut entry_states: Vec<Option<Environment>> = vec![None; len];
        if len == 0 {
            return Self { entry_states };
        }

        entry_states[0] = Some(Environment::default());
        let mut worklist = VecDeque::from([0usize]);
        let mut queued = vec![false; len];
        queued[0] = true;

        while let Some(idx) = worklist.pop_front() {
            queued[idx] = false;
            let Some(state) = entry_states[idx].clone() else {
                continue;
            };
            let out = transfer(idx, &instructions[idx], state);

            for succ in instructions[idx].successors(idx, len) {
                let updated = match &entry_states[succ] {
                    None => out.clone(),
                    Some(existing) => existing.join(&out),
                };
                if entry_states[succ].as_ref() != Some(&updated) {
                    entry_states[succ] = Some(updated);
                    if !queued[succ] {
                        queued[succ] = true;
                        worklist.push_back(succ);
                    }
                }
            }
        }

        Self { entry_states }
    }

    /// Value held by `reg` just before instruction `insn` executes
    pub fn get_abstract_object(&self, reg: Reg, insn: usize) -> Option<&AbstractObject> {
        self.entry_states.get(insn)?.as_ref()?.get(reg)
    }

    /// Element types of the class array held by `reg` at `insn`, when every
    /// element is known
    pub fn get_method_params(&self, reg: Reg, insn: usize) -> Option<Vec<String>> {
        let state = self.entry_states.get(insn)?.as_ref()?;
        let AbstractObject::ClassArray(site) = state.get(reg)? else {
            return None;
        };
        state.arrays.get(site)?.iter().cloned().collect()
    }

    pub fn is_reachable(&self, insn: usize) -> bool {
        matches!(self.entry_states.get(insn), Some(Some(_)))
    }
}

fn transfer(idx: usize, insn: &Instruction, mut env: Environment) -> Environment {
    match insn {
        Instruction::Const { dest, value } => {
            env.set(*dest, Some(AbstractObject::Int(*value)));
        }
        Instruction::ConstString { dest, value } => {
            env.set(*dest, Some(AbstractObject::String(value.clone())));
        }
        Instruction::ConstClass { dest, ty } => {
            env.set(*dest, Some(AbstractObject::Class(ty.clone())));
        }
        Instruction::Move { dest, src } => {
            let value = env.get(*src).cloned();
            env.set(*dest, value);
        }
        Instruction::MoveResult { dest } => {
            let value = env.get(RESULT_REG).cloned();
            env.set(*dest, value);
        }
        Instruction::NewArray { dest, size, .. } => match env.int(*size) {
            Some(n) if (0..=255).contains(&n) => {
                env.arrays.insert(idx, vec![None; n as usize]);
                env.set(*dest, Some(AbstractObject::ClassArray(idx)));
            }
            _ => env.set(*dest, None),
        },
        Instruction::Aput { array, index, value } => {
            // Storing an array into another object aliases it
            env.escape_array(*value);
            let Some(site) = env.array_site(*array) else {
                // Unknown target may alias any tracked array
                env.clobber_all_arrays();
                return env;
            };
            let element = env.get(*value).and_then(|v| v.as_class()).map(str::to_string);
            let index = env.int(*index);
            if let Some(elements) = env.arrays.get_mut(&site) {
                match index {
                    Some(i) if i >= 0 && (i as usize) < elements.len() => {
                        elements[i as usize] = element;
                    }
                    _ => elements.iter_mut().for_each(|e| *e = None),
                }
            }
        }
        Instruction::Invoke { method, args, .. } => {
            let result = invoke_result(method, args, &env);
            if !is_reflective_lookup(method) {
                for arg in args {
                    env.escape_array(*arg);
                }
                env.clobber_escaped();
            }
            env.set(RESULT_REG, result);
        }
        Instruction::Other { dest, srcs } => {
            for src in srcs {
                env.escape_array(*src);
            }
            if let Some(dest) = dest {
                env.set(*dest, None);
            }
        }
        Instruction::Goto { .. }
        | Instruction::If { .. }
        | Instruction::Switch { .. }
        | Instruction::Return { .. }
        | Instruction::Throw { .. } => {}
    }
    env
}

/// Value produced by an invoke, as far as the analysis can tell
fn invoke_result(method: &MethodRef, args: &[Reg], env: &Environment) -> Option<AbstractObject> {
    if method.class == JAVA_LANG_CLASS && method.name == "forName" {
        let name = env.get(*args.first()?)?.as_string()?;
        trace!("Class.forName resolved to {}", name);
        return Some(AbstractObject::Class(java_name_to_internal(name)));
    }
    None
}

/// `Class` member lookups only read their parameter arrays
fn is_reflective_lookup(method: &MethodRef) -> bool {
    method.class == JAVA_LANG_CLASS && method.name.starts_with("get")
}
