use super::oracles::{
    AnnotationOracle, JsonSerdeOracle, KeepListOracle, LayoutOracle, ManifestOracle,
    MarkingContext, NativeLibOracle, NativeMethodOracle, Oracle, ReflectedPackagesOracle,
    ReflectionOracle, SerializableOracle,
};
use super::ReachabilityError;
use crate::config::Config;
use crate::graph::{Program, TypeHierarchy};
use crate::resources::{ApkDirectory, ResourceSource};
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

/// Computes which entities of a program must be kept.
///
/// Liveness comes in three layers:
/// - permanent marks ([`init_permanently_reachable_classes`]) that no
///   optimization can invalidate,
/// - code marks ([`recompute_classes_reachable_from_code`]) to refresh after
///   every pass that changes code,
/// - resource-xml marks ([`recompute_reachable_from_xml_layouts`]), the only
///   ones that are ever cleared.
///
/// [`init_permanently_reachable_classes`]: Self::init_permanently_reachable_classes
/// [`recompute_classes_reachable_from_code`]: Self::recompute_classes_reachable_from_code
/// [`recompute_reachable_from_xml_layouts`]: Self::recompute_reachable_from_xml_layouts
pub struct ReachabilityEngine<'a> {
    program: &'a Program,
    config: Config,
    hierarchy: TypeHierarchy,
    resources: Option<Box<dyn ResourceSource>>,
    no_optimizations_annotations: HashSet<String>,
}

impl<'a> ReachabilityEngine<'a> {
    /// Resources are read from `config.apk_dir` when it is set
    pub fn new(program: &'a Program, config: Config) -> Self {
        let resources: Option<Box<dyn ResourceSource>> = if config.has_apk_dir() {
            Some(Box::new(ApkDirectory::new(&config.apk_dir)))
        } else {
            None
        };

        Self {
            program,
            hierarchy: TypeHierarchy::build(program),
            config,
            resources,
            no_optimizations_annotations: HashSet::new(),
        }
    }

    /// Read manifest, layout and native-library data from `resources`
    /// instead of the configured apk directory
    pub fn with_resources(mut self, resources: impl ResourceSource + 'static) -> Self {
        self.resources = Some(Box::new(resources));
        self
    }

    pub fn with_no_optimizations_annotations(mut self, annotations: HashSet<String>) -> Self {
        self.no_optimizations_annotations = annotations;
        self
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    pub fn resources(&self) -> Option<&dyn ResourceSource> {
        self.resources.as_deref()
    }

    fn run(&self, oracle: &dyn Oracle) -> Result<(), ReachabilityError> {
        let start = Instant::now();
        let cx = MarkingContext::new(self.program, &self.hierarchy);
        oracle.mark(&cx)?;
        debug!("Oracle '{}' finished in {:?}", oracle.name(), start.elapsed());
        Ok(())
    }

    /// Full initial computation: permanent marks, code marks, then the serde
    /// classification
    pub fn init_reachable_classes(&self) -> Result<(), ReachabilityError> {
        let start = Instant::now();

        self.init_permanently_reachable_classes()?;
        self.recompute_classes_reachable_from_code()?;
        self.initialize_reachable_for_json_serde()?;

        info!("Reachability computed in {:?}", start.elapsed());
        Ok(())
    }

    /// Marks no optimization pass can invalidate: annotations, keep lists,
    /// manifest, layouts, native libraries, reflection, reflected packages and
    /// serialization constructors
    pub fn init_permanently_reachable_classes(&self) -> Result<(), ReachabilityError> {
        let config = &self.config;

        self.run(
            &AnnotationOracle::new(config.keep_annotations.clone())
                .with_no_optimizations(self.no_optimizations_annotations.clone()),
        )?;
        self.run(&KeepListOracle::new(
            config.keep_class_members.clone(),
            config.keep_methods.clone(),
        ))?;

        if let Some(resources) = self.resources() {
            if config.compute_xml_reachability {
                if let Some(manifest) = resources.manifest()? {
                    self.run(
                        &ManifestOracle::new(manifest)
                            .with_prune_unexported(config.prune_unexported_components.clone()),
                    )?;
                }
                self.analyze_reachable_from_xml_layouts(resources)?;
            }

            if config.analyze_native_lib_reachability {
                self.run(&NativeLibOracle::new(resources.native_classes()?))?;
            }
        }

        self.run(&ReflectionOracle)?;
        self.run(&ReflectedPackagesOracle::new(config.keep_packages.clone()))?;
        self.run(&SerializableOracle)?;

        Ok(())
    }

    /// Marks derived from the current code. They go stale as code changes, so
    /// call this again after every optimization pass.
    pub fn recompute_classes_reachable_from_code(&self) -> Result<(), ReachabilityError> {
        self.run(&NativeMethodOracle)
    }

    /// Clear every resource-xml mark in the program, then mark again from the
    /// current layouts
    pub fn recompute_reachable_from_xml_layouts(&self) -> Result<(), ReachabilityError> {
        let program = self.program;

        // The clear completes on every entity before any layout mark is made
        program.par_classes().for_each(|cls| {
            cls.rstate.unset_referenced_by_resource_xml();
            for method in program.methods_of(cls) {
                method.rstate.unset_referenced_by_resource_xml();
            }
            for field in program.fields_of(cls) {
                field.rstate.unset_referenced_by_resource_xml();
            }
        });
        debug!("Cleared resource-xml reachability");

        match self.resources() {
            Some(resources) => self.analyze_reachable_from_xml_layouts(resources),
            None => Ok(()),
        }
    }

    /// Flag subclasses of the configured JSON serde bases
    pub fn initialize_reachable_for_json_serde(&self) -> Result<(), ReachabilityError> {
        self.run(&JsonSerdeOracle::new(self.config.json_serde_supercls.clone()))
    }

    fn analyze_reachable_from_xml_layouts(
        &self,
        resources: &dyn ResourceSource,
    ) -> Result<(), ReachabilityError> {
        let layouts = resources.layouts(&LayoutOracle::attributes())?;
        self.run(&LayoutOracle::new(layouts))
    }
}
