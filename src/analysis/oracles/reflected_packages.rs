use super::{MarkingContext, Oracle};
use crate::analysis::marking::mark_reachable_by_classname;
use crate::analysis::ReachabilityError;
use crate::graph::{Class, Program};
use std::collections::HashSet;
use tracing::{debug, info};

/// Keeps packages used through reflection too dynamic to analyze, along with
/// every class extending one of their classes.
pub struct ReflectedPackagesOracle {
    /// Descriptor prefixes, such as `Lcom/example/plugins/`
    packages: Vec<String>,
}

impl ReflectedPackagesOracle {
    pub fn new(packages: Vec<String>) -> Self {
        Self { packages }
    }
}

/// Whether `cls` or one of its internal superclasses is in `reflected`
fn in_reflected_pkg(program: &Program, cls: &Class, reflected: &HashSet<&str>) -> bool {
    let mut current = Some(cls);
    let mut seen = HashSet::new();
    while let Some(cls) = current {
        if !seen.insert(cls.name.as_str()) {
            return false;
        }
        if reflected.contains(cls.name.as_str()) {
            return true;
        }
        current = cls
            .super_class
            .as_deref()
            .and_then(|sup| program.type_class_internal(sup));
    }
    false
}

impl Oracle for ReflectedPackagesOracle {
    fn name(&self) -> &'static str {
        "reflected packages"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        if self.packages.is_empty() {
            return Ok(());
        }
        let program = cx.program;

        let reflected: HashSet<&str> = program
            .scope()
            .filter(|cls| self.packages.iter().any(|pkg| cls.name.starts_with(pkg.as_str())))
            .map(|cls| cls.name.as_str())
            .collect();

        let mut marked = 0;
        for cls in program.scope() {
            if in_reflected_pkg(program, cls, &reflected) {
                debug!("reflected_package: {}", cls);
                mark_reachable_by_classname(program, cls);
                marked += 1;
            }
        }

        info!("Reflected packages keep {} classes", marked);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ClassDef, MethodDef, ProgramBuilder, TypeHierarchy};

    #[test]
    fn test_package_classes_and_subclasses() {
        let program = ProgramBuilder::new()
            .class(ClassDef::new("Lcom/app/plugins/Plugin;").with_method(MethodDef::new("load")))
            .class(ClassDef::new("Lcom/app/feature/Chart;").with_super("Lcom/app/plugins/Plugin;"))
            .class(ClassDef::new("Lcom/app/feature/Leaf;").with_super("Lcom/app/feature/Chart;"))
            .class(ClassDef::new("Lcom/app/feature/Other;"))
            .build();
        let hierarchy = TypeHierarchy::build(&program);
        let cx = MarkingContext::new(&program, &hierarchy);

        ReflectedPackagesOracle::new(vec!["Lcom/app/plugins/".to_string()])
            .mark(&cx)
            .unwrap();

        for name in ["Lcom/app/plugins/Plugin;", "Lcom/app/feature/Chart;", "Lcom/app/feature/Leaf;"] {
            let cls = program.type_class(name).unwrap();
            assert!(cls.rstate.is_referenced_by_string(), "{}", name);
            assert!(!cls.rstate.is_root(), "{}", name);
        }
        assert!(program
            .find_method("Lcom/app/plugins/Plugin;.load:()V")
            .unwrap()
            .rstate
            .is_referenced_by_string());
        assert!(!program.type_class("Lcom/app/feature/Other;").unwrap().rstate.is_reachable());
    }
}
