use super::{Class, Program};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Edge from a supertype to a type that derives from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Derivation {
    Extends,
    Implements,
}

/// Super/subtype relations over every class of a program.
///
/// Nodes are type descriptors, so types that are referenced as supertypes
/// but never defined still take part in the hierarchy.
#[derive(Debug)]
pub struct TypeHierarchy {
    inner: DiGraph<String, Derivation>,
    node_map: HashMap<String, NodeIndex>,
    super_classes: HashMap<String, String>,
}

impl TypeHierarchy {
    pub fn build(program: &Program) -> Self {
        let mut hierarchy = Self {
            inner: DiGraph::new(),
            node_map: HashMap::new(),
            super_classes: HashMap::new(),
        };

        for cls in program.classes() {
            let child = hierarchy.node(&cls.name);
            if let Some(super_class) = &cls.super_class {
                let parent = hierarchy.node(super_class);
                hierarchy.inner.add_edge(parent, child, Derivation::Extends);
                hierarchy
                    .super_classes
                    .insert(cls.name.clone(), super_class.clone());
            }
            for interface in &cls.interfaces {
                let parent = hierarchy.node(interface);
                hierarchy.inner.add_edge(parent, child, Derivation::Implements);
            }
        }

        hierarchy
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            return idx;
        }
        let idx = self.inner.add_node(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        idx
    }

    /// Transitive subclasses of `ty`, not including `ty` itself
    pub fn children(&self, ty: &str) -> HashSet<String> {
        self.descendants(ty, |kind| kind == Derivation::Extends)
    }

    /// Types that implement `interface` directly, through a superclass or
    /// through a subinterface. Interfaces themselves are not included.
    pub fn implementors(&self, program: &Program, interface: &str) -> HashSet<String> {
        self.descendants(interface, |_| true)
            .into_iter()
            .filter(|name| {
                program
                    .type_class(name)
                    .map(|cls| !cls.is_interface())
                    .unwrap_or(true)
            })
            .collect()
    }

    fn descendants(&self, ty: &str, follow: impl Fn(Derivation) -> bool) -> HashSet<String> {
        let mut found = HashSet::new();
        let Some(&start) = self.node_map.get(ty) else {
            return found;
        };

        let mut visited = HashSet::from([start]);
        let mut worklist = VecDeque::from([start]);
        while let Some(node) = worklist.pop_front() {
            for edge in self.inner.edges_directed(node, Direction::Outgoing) {
                if !follow(*edge.weight()) {
                    continue;
                }
                let target = edge.target();
                if visited.insert(target) {
                    found.insert(self.inner[target].clone());
                    worklist.push_back(target);
                }
            }
        }
        found
    }

    pub fn super_class(&self, ty: &str) -> Option<&str> {
        self.super_classes.get(ty).map(String::as_str)
    }

    /// `ty` followed by its superclass chain
    pub fn ancestors<'a>(&'a self, ty: &'a str) -> Ancestors<'a> {
        Ancestors {
            hierarchy: self,
            next: Some(ty),
            seen: HashSet::new(),
        }
    }

    /// Like [`ancestors`](Self::ancestors), resolved to class definitions and
    /// stopping at the first type the program does not define
    pub fn ancestor_classes<'a>(
        &'a self,
        program: &'a Program,
        ty: &'a str,
    ) -> impl Iterator<Item = &'a Class> + 'a {
        self.ancestors(ty).map_while(move |name| program.type_class(name))
    }
}

/// Iterator over a superclass chain. Stops on a cycle.
pub struct Ancestors<'a> {
    hierarchy: &'a TypeHierarchy,
    next: Option<&'a str>,
    seen: HashSet<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if !self.seen.insert(current) {
            return None;
        }
        self.next = self.hierarchy.super_class(current);
        Some(current)
    }
}
