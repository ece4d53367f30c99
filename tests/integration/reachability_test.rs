//! End-to-end reachability tests
//!
//! These tests drive the engine through its public entry points, both on
//! programs built in code and on the fixture apk.

use keepgraph::graph::code::{Instruction, InvokeKind, MethodCode, MethodRef};
use keepgraph::graph::{AccessFlags, ClassDef, FieldDef, MethodDef, ProgramBuilder};
use keepgraph::parser::xml::{ComponentKind, ComponentTagInfo, LayoutData, ManifestClassInfo};
use keepgraph::{
    Config, InMemoryResources, KeepReasonKind, Program, ReachabilityEngine, ReachabilityError,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_program() -> Program {
    Program::from_json_file(&fixtures_path().join("program.json")).expect("fixture program loads")
}

fn fixture_config() -> Config {
    Config {
        apk_dir: fixtures_path().join("apk"),
        ..Config::default()
    }
}

fn reachable_names(program: &Program) -> BTreeSet<String> {
    program
        .entities()
        .filter(|&id| program.rstate(id).is_reachable())
        .map(|id| program.display(id))
        .collect()
}

fn reflective_lookup(name: &str, args: Vec<u32>) -> Instruction {
    Instruction::Invoke {
        kind: InvokeKind::Virtual,
        method: MethodRef::new("Ljava/lang/Class;", name),
        args,
    }
}

// ============================================================================
// Serializable supertypes
// ============================================================================

#[test]
fn test_serializable_superclass_constructor_is_rooted() {
    let program = ProgramBuilder::new()
        .class(ClassDef::new("Ljava/lang/Object;").without_super().external())
        .class(
            ClassDef::new("Ljava/io/Serializable;")
                .with_access(AccessFlags::PUBLIC | AccessFlags::INTERFACE)
                .external(),
        )
        .class(
            ClassDef::new("LBase;")
                .with_method(MethodDef::constructor())
                .with_method(MethodDef::constructor().with_args(&["I"])),
        )
        .class(
            ClassDef::new("LFoo;")
                .with_super("LBase;")
                .with_interface("Ljava/io/Serializable;")
                .with_method(MethodDef::constructor()),
        )
        .build();

    let engine = ReachabilityEngine::new(&program, Config::default());
    engine.init_permanently_reachable_classes().unwrap();

    let base_ctor = program.find_method("LBase;.<init>:()V").unwrap();
    assert!(base_ctor.rstate.is_reachable());
    assert!(base_ctor.rstate.has_keep_reason(KeepReasonKind::Serializable));

    let base_int_ctor = program.find_method("LBase;.<init>:(I)V").unwrap();
    assert!(!base_int_ctor.rstate.is_reachable());

    let foo = program.type_class("LFoo;").unwrap();
    assert!(!foo.rstate.is_root());
    assert!(!program.find_method("LFoo;.<init>:()V").unwrap().rstate.is_root());
}

// ============================================================================
// Reflection
// ============================================================================

fn reflection_program(code: Vec<Instruction>) -> Program {
    ProgramBuilder::new()
        .class(ClassDef::new("Ljava/lang/Object;").without_super().external())
        .class(
            ClassDef::new("LParent;")
                .with_field(FieldDef::new("inherited", "I"))
                .with_field(FieldDef::new("hidden", "I").with_access(AccessFlags::PRIVATE)),
        )
        .class(
            ClassDef::new("LTarget;")
                .with_super("LParent;")
                .with_field(FieldDef::new("secret", "I").with_access(AccessFlags::PRIVATE)),
        )
        .class(
            ClassDef::new("LCaller;")
                .with_method(MethodDef::new("reflect").with_code(MethodCode::new(code))),
        )
        .build()
}

#[test]
fn test_declared_lookup_stays_on_the_named_class() {
    let program = reflection_program(vec![
        Instruction::ConstClass { dest: 0, ty: "LTarget;".to_string() },
        Instruction::ConstString { dest: 1, value: "secret".to_string() },
        reflective_lookup("getDeclaredField", vec![0, 1]),
        Instruction::ConstString { dest: 2, value: "hidden".to_string() },
        reflective_lookup("getDeclaredField", vec![0, 2]),
        Instruction::Return { src: None },
    ]);

    let engine = ReachabilityEngine::new(&program, Config::default());
    engine.init_reachable_classes().unwrap();

    let secret = program.find_field("LTarget;.secret:I").unwrap();
    assert!(secret.rstate.has_keep_reason(KeepReasonKind::Reflection));
    let reflect = program.find_method("LCaller;.reflect:()V").unwrap();
    assert_eq!(secret.rstate.keep_reasons()[0].method, Some(reflect.id));

    // Declared on the superclass, so a declared lookup on LTarget; misses it
    assert!(!program.find_field("LParent;.hidden:I").unwrap().rstate.is_reachable());
}

#[test]
fn test_inherited_lookup_walks_superclasses_for_public_members() {
    let program = reflection_program(vec![
        Instruction::ConstClass { dest: 0, ty: "LTarget;".to_string() },
        Instruction::ConstString { dest: 1, value: "inherited".to_string() },
        reflective_lookup("getField", vec![0, 1]),
        Instruction::ConstString { dest: 2, value: "secret".to_string() },
        reflective_lookup("getField", vec![0, 2]),
        Instruction::Return { src: None },
    ]);

    let engine = ReachabilityEngine::new(&program, Config::default());
    engine.init_reachable_classes().unwrap();

    assert!(program.find_field("LParent;.inherited:I").unwrap().rstate.is_root());
    // Private members are invisible to getField
    assert!(!program.find_field("LTarget;.secret:I").unwrap().rstate.is_reachable());
}

#[test]
fn test_unknown_member_name_marks_nothing() {
    let program = reflection_program(vec![
        Instruction::ConstClass { dest: 0, ty: "LTarget;".to_string() },
        Instruction::Other { dest: Some(1), srcs: vec![] },
        reflective_lookup("getDeclaredField", vec![0, 1]),
        reflective_lookup("getField", vec![0, 1]),
        Instruction::Return { src: None },
    ]);

    let before = reachable_names(&program);
    let engine = ReachabilityEngine::new(&program, Config::default());
    engine.init_reachable_classes().unwrap();

    assert_eq!(reachable_names(&program), before);
    for field in ["LTarget;.secret:I", "LParent;.inherited:I", "LParent;.hidden:I"] {
        assert!(!program.find_field(field).unwrap().rstate.is_reachable(), "{}", field);
    }
}

// ============================================================================
// Manifest policy
// ============================================================================

fn activity_program() -> Program {
    ProgramBuilder::new()
        .class(ClassDef::new("Ljava/lang/Object;").without_super().external())
        .class(ClassDef::new("Lcom/app/Exported;").with_method(MethodDef::constructor()))
        .class(ClassDef::new("Lcom/app/Internal;").with_method(MethodDef::constructor()))
        .class(ClassDef::new("Lcom/app/Worker;").with_method(MethodDef::constructor()))
        .build()
}

fn activity_manifest() -> ManifestClassInfo {
    ManifestClassInfo {
        component_tags: vec![
            ComponentTagInfo::new(ComponentKind::Activity, "Lcom/app/Exported;").exported(true),
            ComponentTagInfo::new(ComponentKind::Activity, "Lcom/app/Internal;"),
            ComponentTagInfo::new(ComponentKind::Service, "Lcom/app/Worker;"),
        ],
        ..Default::default()
    }
}

#[test]
fn test_pruned_unexported_activity_is_pinned_not_rooted() {
    let program = activity_program();
    let config = Config {
        prune_unexported_components: BTreeSet::from([ComponentKind::Activity, ComponentKind::Service]),
        ..Config::default()
    };
    let engine = ReachabilityEngine::new(&program, config)
        .with_resources(InMemoryResources::new().with_manifest(activity_manifest()));
    engine.init_reachable_classes().unwrap();

    let internal = program.type_class("Lcom/app/Internal;").unwrap();
    assert!(internal.rstate.keep_reasons().is_empty());
    assert_eq!(internal.rstate.keep_count(), 1);
    assert!(!internal.rstate.allow_obfuscation());
    assert!(internal.rstate.is_reachable());

    let exported = program.type_class("Lcom/app/Exported;").unwrap();
    assert!(exported.rstate.has_keep_reason(KeepReasonKind::Manifest));

    // Services cannot be pruned
    let worker = program.type_class("Lcom/app/Worker;").unwrap();
    assert!(worker.rstate.has_keep_reason(KeepReasonKind::Manifest));
}

#[test]
fn test_unexported_activity_is_rooted_without_pruning() {
    let program = activity_program();
    let engine = ReachabilityEngine::new(&program, Config::default())
        .with_resources(InMemoryResources::new().with_manifest(activity_manifest()));
    engine.init_reachable_classes().unwrap();

    let internal = program.type_class("Lcom/app/Internal;").unwrap();
    assert!(internal.rstate.has_keep_reason(KeepReasonKind::Manifest));
    assert!(program
        .find_method("Lcom/app/Internal;.<init>:()V")
        .unwrap()
        .rstate
        .has_keep_reason(KeepReasonKind::Manifest));
}

// ============================================================================
// Layout recomputation
// ============================================================================

fn layout_program() -> Program {
    ProgramBuilder::new()
        .class(ClassDef::new("Ljava/lang/Object;").without_super().external())
        .class(ClassDef::new("Landroid/content/Context;").external())
        .class(ClassDef::new("Landroid/view/View;").external())
        .class(
            ClassDef::new("Lcom/app/Screen;")
                .with_super("Landroid/content/Context;")
                .with_method(MethodDef::new("onTap").with_args(&["Landroid/view/View;"])),
        )
        .class(
            ClassDef::new("Lcom/app/Gauge;")
                .with_super("Landroid/view/View;")
                .with_method(MethodDef::constructor().with_args(&["Landroid/content/Context;"])),
        )
        .build()
}

fn layouts() -> LayoutData {
    let mut data = LayoutData::new();
    data.classes.insert("com.app.Gauge".to_string());
    data.attribute_values
        .insert("android:onClick".to_string(), vec!["onTap".to_string()]);
    data
}

#[test]
fn test_layout_recompute_is_idempotent() {
    let program = layout_program();
    let engine = ReachabilityEngine::new(&program, Config::default())
        .with_resources(InMemoryResources::new().with_layouts(layouts()));
    engine.init_reachable_classes().unwrap();
    let initial = reachable_names(&program);
    assert!(initial.contains("Lcom/app/Gauge;"));
    assert!(initial.contains("Lcom/app/Gauge;.<init>:(Landroid/content/Context;)V"));
    assert!(initial.contains("Lcom/app/Screen;.onTap:(Landroid/view/View;)V"));

    engine.recompute_reachable_from_xml_layouts().unwrap();
    let once = reachable_names(&program);
    engine.recompute_reachable_from_xml_layouts().unwrap();
    let twice = reachable_names(&program);

    assert_eq!(initial, once);
    assert_eq!(once, twice);
}

#[test]
fn test_layout_recompute_drops_stale_marks_only() {
    let program = layout_program();
    let gauge = program.type_class("Lcom/app/Gauge;").unwrap();
    gauge.rstate.set_referenced_by_resource_xml();
    gauge.rstate.increment_keep_count();

    // No layouts reference anything any more
    let engine = ReachabilityEngine::new(&program, Config::default())
        .with_resources(InMemoryResources::new());
    engine.recompute_reachable_from_xml_layouts().unwrap();

    assert!(!gauge.rstate.is_referenced_by_resource_xml());
    assert!(!gauge.rstate.has_keep_reason(KeepReasonKind::ResourceXml));
    assert_eq!(gauge.rstate.keep_count(), 1);
}

#[test]
fn test_onclick_without_context_is_fatal() {
    let program = ProgramBuilder::new()
        .class(ClassDef::new("Ljava/lang/Object;").without_super().external())
        .build();
    let engine = ReachabilityEngine::new(&program, Config::default())
        .with_resources(InMemoryResources::new().with_layouts(layouts()));

    let err = engine.init_reachable_classes().unwrap_err();
    assert!(matches!(err, ReachabilityError::MissingType { ref name } if name == "Landroid/content/Context;"));
}

// ============================================================================
// Fixture apk
// ============================================================================

#[test]
fn test_fixture_apk_end_to_end() {
    let program = fixture_program();
    let engine = ReachabilityEngine::new(&program, fixture_config());
    engine.init_reachable_classes().unwrap();

    let has = |name: &str, kind: KeepReasonKind| {
        program
            .type_class(name)
            .map(|c| c.rstate.has_keep_reason(kind))
            .unwrap_or(false)
    };

    assert!(has("Lcom/example/app/App;", KeepReasonKind::Manifest));
    assert!(has("Lcom/example/app/MainActivity;", KeepReasonKind::Manifest));
    assert!(has("Lcom/example/app/SettingsActivity;", KeepReasonKind::Manifest));
    assert!(has("Lcom/example/app/sync/SyncService;", KeepReasonKind::Manifest));
    assert!(has("Lcom/example/app/widget/ChartView;", KeepReasonKind::ResourceXml));
    assert!(has("Lcom/example/app/NativeBridge;", KeepReasonKind::NativeLib));

    let method = |sig: &str| program.find_method(sig).unwrap();
    assert!(method("Lcom/example/app/MainActivity;.onSendClicked:(Landroid/view/View;)V")
        .rstate
        .is_referenced_by_resource_xml());
    assert!(!method("Lcom/example/app/MainActivity;.onCancelClicked:(Landroid/view/View;)V")
        .rstate
        .is_reachable());
    assert!(method("Lcom/example/app/NativeBridge;.callback:(Ljava/lang/String;)V")
        .rstate
        .is_referenced_by_string());
    assert!(method("Lcom/example/app/Codec;.decode:([B)Ljava/lang/String;")
        .rstate
        .is_referenced_by_string());
    assert!(!method("Lcom/example/app/Codec;.encode:()V").rstate.is_reachable());
    assert!(method("Lcom/example/app/model/Base;.<init>:()V")
        .rstate
        .has_keep_reason(KeepReasonKind::Serializable));
    assert!(!method("Lcom/example/app/model/Base;.<init>:(I)V").rstate.is_reachable());
    assert!(method("Lcom/example/app/plugin/Plugin;.create:()V")
        .rstate
        .has_keep_reason(KeepReasonKind::Reflection));
    assert!(!method("Lcom/example/app/plugin/Plugin;.create:(I)V").rstate.is_reachable());

    let field = |sig: &str| program.find_field(sig).unwrap();
    assert!(field("Lcom/example/app/model/User;.secret:Ljava/lang/String;")
        .rstate
        .has_keep_reason(KeepReasonKind::Reflection));
    assert!(!field("Lcom/example/app/model/User;.id:J").rstate.is_reachable());

    assert!(program.type_class("Lcom/example/app/Dead;").unwrap().rstate.can_delete());
}

#[test]
fn test_fixture_apk_with_switches_off() {
    let program = fixture_program();
    let config = Config {
        compute_xml_reachability: false,
        analyze_native_lib_reachability: false,
        ..fixture_config()
    };
    let engine = ReachabilityEngine::new(&program, config);
    engine.init_reachable_classes().unwrap();

    for name in [
        "Lcom/example/app/MainActivity;",
        "Lcom/example/app/widget/ChartView;",
        "Lcom/example/app/NativeBridge;",
    ] {
        assert!(!program.type_class(name).unwrap().rstate.is_reachable(), "{}", name);
    }
}

#[test]
fn test_keep_lists_and_packages() {
    let program = fixture_program();
    let config = Config {
        keep_packages: vec!["Lcom/example/app/model/".to_string()],
        keep_methods: vec!["helper".to_string()],
        ..Config::default()
    };
    let engine = ReachabilityEngine::new(&program, config);
    engine.init_reachable_classes().unwrap();

    let user = program.type_class("Lcom/example/app/model/User;").unwrap();
    assert!(user.rstate.is_referenced_by_string());
    assert!(program
        .find_field("Lcom/example/app/model/User;.id:J")
        .unwrap()
        .rstate
        .is_referenced_by_string());

    let helper = program.find_method("Lcom/example/app/Dead;.helper:()V").unwrap();
    assert!(helper.rstate.has_keep_reason(KeepReasonKind::ExplicitList));
}
