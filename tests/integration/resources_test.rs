//! Resource reading tests
//!
//! These tests verify manifest, layout and native-library extraction against
//! the fixture files.

use keepgraph::discovery::{FileFinder, FileType};
use keepgraph::parser::xml::{ComponentKind, LayoutParser, ManifestParser, ONCLICK_ATTRIBUTE};
use keepgraph::{ApkDirectory, ResourceError, ResourceSource};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn onclick() -> HashSet<String> {
    HashSet::from([ONCLICK_ATTRIBUTE.to_string()])
}

#[test]
fn test_manifest_fixture_components() {
    let path = fixtures_path().join("AndroidManifest.xml");
    let contents = fs::read_to_string(&path).unwrap();
    let info = ManifestParser::new().parse(&path, &contents).unwrap();

    let tags = &info.component_tags;
    assert_eq!(tags.len(), 5);

    let expected = [
        ("Ltest1;", true, false),
        ("Ltest2;", false, false),
        ("Ltest3;", false, true),
        ("Ltest4;", true, false),
    ];
    for (tag, (classname, exported, filters)) in tags.iter().zip(expected) {
        assert_eq!(tag.tag, ComponentKind::Activity);
        assert_eq!(tag.classname, classname);
        assert_eq!(tag.is_exported, exported, "{}", classname);
        assert_eq!(tag.has_intent_filters, filters, "{}", classname);
        assert!(tag.authority_classes.is_empty());
    }

    let provider = &tags[4];
    assert_eq!(provider.tag, ComponentKind::Provider);
    assert_eq!(provider.classname, "Lcom/example/x/Foo;");
    assert!(!provider.is_exported);
    let authorities: Vec<&str> = provider.authority_classes.iter().map(String::as_str).collect();
    assert_eq!(authorities, vec!["Lcom/example/x/Foo;", "Lcom/example/y/Bar;"]);
}

#[test]
fn test_apk_fixture_discovery() {
    let finder = FileFinder::new(fixtures_path().join("apk"));
    let files = finder.find_files();

    let kinds: Vec<FileType> = files.iter().map(|f| f.file_type).collect();
    assert!(kinds.contains(&FileType::Manifest));
    assert!(kinds.contains(&FileType::Layout));
    assert!(kinds.contains(&FileType::NativeLib));
    assert_eq!(files.len(), 3);
}

#[test]
fn test_apk_fixture_resources() {
    let apk = ApkDirectory::new(fixtures_path().join("apk"));
    assert_eq!(apk.root(), Some(fixtures_path().join("apk").as_path()));

    let manifest = apk.manifest().unwrap().expect("fixture has a manifest");
    assert_eq!(manifest.package.as_deref(), Some("com.example.app"));
    assert!(manifest.application_classes.contains("Lcom/example/app/App;"));
    assert_eq!(manifest.component_tags.len(), 3);
    assert_eq!(manifest.component_tags[2].tag, ComponentKind::Service);
    assert_eq!(manifest.component_tags[2].classname, "Lcom/example/app/sync/SyncService;");

    let layouts = apk.layouts(&onclick()).unwrap();
    assert!(layouts.classes.contains("com.example.app.widget.ChartView"));
    assert!(!layouts.classes.contains("Button"));
    assert_eq!(layouts.values(ONCLICK_ATTRIBUTE), &["onSendClicked".to_string()]);

    let native = apk.native_classes().unwrap();
    assert!(native.contains("Lcom/example/app/NativeBridge;"));
}

#[test]
fn test_missing_manifest_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let apk = ApkDirectory::new(dir.path());

    assert!(apk.manifest().unwrap().is_none());
    assert!(apk.layouts(&onclick()).unwrap().classes.is_empty());
    assert!(apk.native_classes().unwrap().is_empty());
}

#[test]
fn test_malformed_manifest_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("AndroidManifest.xml"),
        "<manifest><application></activity></manifest>",
    )
    .unwrap();

    let err = ApkDirectory::new(dir.path()).manifest().unwrap_err();
    assert!(matches!(err, ResourceError::Xml { .. }));
}

#[test]
fn test_layout_parser_fragments_and_views() {
    let layout = r#"
        <FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
            <fragment android:name="com.example.app.ui.ListFragment" />
            <view class="com.example.app.widget.Dial" android:onClick="onDial" />
        </FrameLayout>
    "#;

    let data = LayoutParser::new()
        .parse(&PathBuf::from("main.xml"), layout, &onclick())
        .unwrap();

    assert!(data.classes.contains("com.example.app.ui.ListFragment"));
    assert!(data.classes.contains("com.example.app.widget.Dial"));
    assert_eq!(data.values(ONCLICK_ATTRIBUTE), &["onDial".to_string()]);
}
