use super::MethodId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Why an entity is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeepReasonKind {
    Manifest,
    Reflection,
    Serializable,
    AnnotationKeep,
    ExplicitList,
    NativeLib,
    ResourceXml,
}

impl KeepReasonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeepReasonKind::Manifest => "manifest",
            KeepReasonKind::Reflection => "reflection",
            KeepReasonKind::Serializable => "serializable",
            KeepReasonKind::AnnotationKeep => "annotation",
            KeepReasonKind::ExplicitList => "explicit list",
            KeepReasonKind::NativeLib => "native library",
            KeepReasonKind::ResourceXml => "resource xml",
        }
    }
}

impl std::fmt::Display for KeepReasonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A keep reason, optionally naming the method whose code caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeepReason {
    pub kind: KeepReasonKind,
    pub method: Option<MethodId>,
}

impl KeepReason {
    pub fn new(kind: KeepReasonKind) -> Self {
        Self { kind, method: None }
    }

    pub fn triggered_by(kind: KeepReasonKind, method: MethodId) -> Self {
        Self {
            kind,
            method: Some(method),
        }
    }
}

/// Liveness provenance of a single class, method or field.
///
/// Every mark is monotonic for the lifetime of a run. The only exception is
/// the resource-xml provenance, which [`unset_referenced_by_resource_xml`]
/// clears together with its `ResourceXml` keep reasons so that layout
/// reachability can be recomputed.
///
/// All operations take `&self` so that oracles running on different threads
/// can mark the same entity without a global lock.
///
/// [`unset_referenced_by_resource_xml`]: ReachabilityState::unset_referenced_by_resource_xml
#[derive(Debug)]
pub struct ReachabilityState {
    by_type: AtomicBool,
    by_string: AtomicBool,
    by_resources: AtomicBool,
    is_serde: AtomicBool,
    allow_shrinking: AtomicBool,
    allow_obfuscation: AtomicBool,
    keep_count: AtomicU32,
    keep_reasons: Mutex<BTreeSet<KeepReason>>,
}

impl ReachabilityState {
    pub fn new() -> Self {
        Self {
            by_type: AtomicBool::new(false),
            by_string: AtomicBool::new(false),
            by_resources: AtomicBool::new(false),
            is_serde: AtomicBool::new(false),
            allow_shrinking: AtomicBool::new(true),
            allow_obfuscation: AtomicBool::new(true),
            keep_count: AtomicU32::new(0),
            keep_reasons: Mutex::new(BTreeSet::new()),
        }
    }

    fn reasons(&self) -> MutexGuard<'_, BTreeSet<KeepReason>> {
        self.keep_reasons.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- marking ----

    /// Reachable through an exact static type reference
    pub fn ref_by_type(&self) {
        self.by_type.store(true, Ordering::Relaxed);
    }

    /// Reachable through a name the optimizer cannot resolve statically
    pub fn ref_by_string(&self) {
        self.by_string.store(true, Ordering::Relaxed);
    }

    /// Make this entity a root
    pub fn set_root(&self, reason: KeepReason) {
        self.reasons().insert(reason);
    }

    pub fn set_referenced_by_resource_xml(&self) {
        self.by_resources.store(true, Ordering::Relaxed);
        self.reasons().insert(KeepReason::new(KeepReasonKind::ResourceXml));
    }

    /// Drop the resource-xml provenance. Other marks are untouched.
    pub fn unset_referenced_by_resource_xml(&self) {
        self.by_resources.store(false, Ordering::Relaxed);
        self.reasons()
            .retain(|reason| reason.kind != KeepReasonKind::ResourceXml);
    }

    pub fn set_is_serde(&self) {
        self.is_serde.store(true, Ordering::Relaxed);
    }

    pub fn increment_keep_count(&self) {
        self.keep_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unset_allow_shrinking(&self) {
        self.allow_shrinking.store(false, Ordering::Relaxed);
    }

    pub fn unset_allow_obfuscation(&self) {
        self.allow_obfuscation.store(false, Ordering::Relaxed);
    }

    // ---- queries ----

    pub fn is_referenced_by_type(&self) -> bool {
        self.by_type.load(Ordering::Relaxed)
    }

    pub fn is_referenced_by_string(&self) -> bool {
        self.by_string.load(Ordering::Relaxed)
    }

    pub fn is_referenced_by_resource_xml(&self) -> bool {
        self.by_resources.load(Ordering::Relaxed)
    }

    pub fn is_serde(&self) -> bool {
        self.is_serde.load(Ordering::Relaxed)
    }

    pub fn keep_count(&self) -> u32 {
        self.keep_count.load(Ordering::Relaxed)
    }

    /// True when at least one keep reason is recorded
    pub fn is_root(&self) -> bool {
        !self.reasons().is_empty()
    }

    pub fn has_keep_reason(&self, kind: KeepReasonKind) -> bool {
        self.reasons().iter().any(|reason| reason.kind == kind)
    }

    /// Snapshot of the keep reasons, ordered by kind
    pub fn keep_reasons(&self) -> Vec<KeepReason> {
        self.reasons().iter().copied().collect()
    }

    /// Reachable through any provenance
    pub fn is_reachable(&self) -> bool {
        self.is_referenced_by_type()
            || self.is_referenced_by_string()
            || self.is_referenced_by_resource_xml()
            || self.keep_count() > 0
            || self.is_root()
    }

    pub fn can_delete(&self) -> bool {
        !self.is_reachable()
    }

    pub fn allow_shrinking(&self) -> bool {
        self.allow_shrinking.load(Ordering::Relaxed) && self.keep_count() == 0
    }

    pub fn allow_obfuscation(&self) -> bool {
        self.allow_obfuscation.load(Ordering::Relaxed) && self.keep_count() == 0
    }

    /// Renaming is only safe when nothing refers to this entity by name
    pub fn can_rename(&self) -> bool {
        self.allow_obfuscation()
            && !self.is_root()
            && !self.is_referenced_by_string()
            && !self.is_referenced_by_resource_xml()
    }
}

impl Default for ReachabilityState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReachabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit = |b: bool| if b { '1' } else { '0' };
        write!(
            f,
            "{}{}{}{}{}{}{} {}",
            bit(self.is_referenced_by_type()),
            bit(self.is_referenced_by_string()),
            bit(self.is_referenced_by_resource_xml()),
            bit(self.is_serde()),
            bit(self.is_root()),
            bit(self.allow_shrinking()),
            bit(self.allow_obfuscation()),
            self.keep_count()
        )
    }
}
