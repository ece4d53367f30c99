use super::{MarkingContext, Oracle};
use crate::analysis::marking::maybe_class_from_string;
use crate::analysis::ReachabilityError;
use crate::graph::{KeepReason, KeepReasonKind, Program};
use crate::parser::xml::{ComponentKind, ManifestClassInfo};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Keeps the entry points declared in AndroidManifest.xml.
///
/// Components may be started from outside the app, so static call analysis
/// can never prove them dead. Activities that are neither exported nor
/// targeted by an intent filter can only be started by the app itself; when
/// their kind is pruned they are pinned against renaming but not rooted.
pub struct ManifestOracle {
    manifest: ManifestClassInfo,
    prune_unexported: BTreeSet<ComponentKind>,
}

impl ManifestOracle {
    pub fn new(manifest: ManifestClassInfo) -> Self {
        Self {
            manifest,
            prune_unexported: BTreeSet::new(),
        }
    }

    pub fn with_prune_unexported(mut self, kinds: BTreeSet<ComponentKind>) -> Self {
        for kind in &kinds {
            if !matches!(kind, ComponentKind::Activity | ComponentKind::ActivityAlias) {
                warn!("Pruning unexported {} components is not supported; they stay rooted", kind);
            }
        }
        self.prune_unexported = kinds;
        self
    }
}

fn mark_manifest_root(program: &Program, classname: &str) {
    let Some(cls) = maybe_class_from_string(program, classname) else {
        debug!("Dangling reference from manifest: {}", classname);
        return;
    };
    debug!("manifest: {}", classname);
    cls.rstate.set_root(KeepReason::new(KeepReasonKind::Manifest));
    // Manifest names cannot be rewritten
    cls.rstate.increment_keep_count();
    for ctor in program.ctors(cls) {
        ctor.rstate.set_root(KeepReason::new(KeepReasonKind::Manifest));
    }
}

impl Oracle for ManifestOracle {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn mark(&self, cx: &MarkingContext<'_>) -> Result<(), ReachabilityError> {
        let program = cx.program;

        for classname in &self.manifest.application_classes {
            mark_manifest_root(program, classname);
        }
        for classname in &self.manifest.instrumentation_classes {
            mark_manifest_root(program, classname);
        }

        for component in &self.manifest.component_tags {
            match component.tag {
                ComponentKind::Activity | ComponentKind::ActivityAlias => {
                    if component.is_exported
                        || component.has_intent_filters
                        || !self.prune_unexported.contains(&component.tag)
                    {
                        mark_manifest_root(program, &component.classname);
                    } else {
                        debug!("{} not exported", component.classname);
                        if let Some(cls) = maybe_class_from_string(program, &component.classname) {
                            cls.rstate.increment_keep_count();
                            cls.rstate.unset_allow_obfuscation();
                        }
                    }
                }
                ComponentKind::Receiver | ComponentKind::Service => {
                    mark_manifest_root(program, &component.classname);
                }
                ComponentKind::Provider => {
                    mark_manifest_root(program, &component.classname);
                    for classname in &component.authority_classes {
                        mark_manifest_root(program, classname);
                    }
                }
            }
        }

        info!(
            "Manifest declares {} components",
            self.manifest.component_tags.len()
        );
        Ok(())
    }
}
