//! Name routing: longest-prefix rules, one area file per context.

use crate::common::*;
use rand::seq::SliceRandom;
use std::fs;
use std::os::unix::fs::PermissionsExt;

const NESTED: &str = "\
a.      u:object_r:a_prop:s0
a.b.    u:object_r:ab_prop:s0
*       u:object_r:default_prop:s0
";

fn label_of(store: &sysprops::SystemProperties, name: &str) -> String {
    store
        .registry()
        .context_for_name(name)
        .map(|c| c.label().to_string())
        .unwrap_or_default()
}

#[test]
fn test_longest_prefix_wins() {
    let store = TestStore::with_contexts(NESTED);
    let writer = store.writer();

    assert_eq!(label_of(&writer, "a.b.c"), "u:object_r:ab_prop:s0");
    assert_eq!(label_of(&writer, "a.c"), "u:object_r:a_prop:s0");
    // "a.b" lacks the trailing dot of "a.b."
    assert_eq!(label_of(&writer, "a.b"), "u:object_r:a_prop:s0");
    assert_eq!(label_of(&writer, "zzz"), "u:object_r:default_prop:s0");
}

#[test]
fn test_values_land_in_their_context_area() {
    let store = TestStore::with_contexts(NESTED);
    let writer = store.writer();
    for name in ["a.b.c", "a.c", "zzz"] {
        writer.add(name, name).unwrap();
    }

    let registry = writer.registry();
    for name in ["a.b.c", "a.c", "zzz"] {
        let owner = registry.context_for_name(name).unwrap();
        for context in registry.contexts() {
            let area = context.area().unwrap();
            let found = area.find(name).unwrap().is_some();
            assert_eq!(found, context.label() == owner.label(), "{} in {}", name, context.label());
        }
    }
}

#[test]
fn test_one_read_only_file_per_context() {
    let store = TestStore::new();
    let _writer = store.writer();

    let mut files: Vec<String> = fs::read_dir(store.property_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "properties_serial",
            "u:object_r:build_prop:s0",
            "u:object_r:debug_prop:s0",
            "u:object_r:default_prop:s0",
            "u:object_r:system_prop:s0",
        ]
    );
    for name in &files {
        let mode = fs::metadata(store.property_dir().join(name))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o444, "{}", name);
    }
}

#[test]
fn test_control_rules_are_not_routed() {
    let store = TestStore::new();
    let writer = store.writer();

    assert_eq!(label_of(&writer, "ctl.start"), "u:object_r:default_prop:s0");
    assert!(!store
        .property_dir()
        .join("u:object_r:ctl_default_prop:s0")
        .exists());
}

#[test]
fn test_enumeration_independent_of_insertion_order() {
    let mut names: Vec<String> = Vec::new();
    for prefix in ["ro.", "persist.sys.", "sys.", "debug.", "vendor."] {
        for i in 0..20 {
            names.push(format!("{}item{}", prefix, i));
        }
    }
    let expected: Vec<(String, String)> = {
        let mut v: Vec<_> = names.iter().map(|n| (n.clone(), n.len().to_string())).collect();
        v.sort();
        v
    };

    let mut rng = rand::thread_rng();
    for _ in 0..3 {
        let store = TestStore::new();
        let writer = store.writer();
        let mut shuffled = names.clone();
        shuffled.shuffle(&mut rng);
        for name in &shuffled {
            writer.add(name, &name.len().to_string()).unwrap();
        }
        assert_eq!(snapshot(&store.reader()), expected);
    }
}

#[test]
fn test_find_nth_walks_every_property_once() {
    let store = TestStore::new();
    let writer = store.writer();
    for name in ["ro.a", "sys.b", "debug.c", "other.d"] {
        writer.add(name, "1").unwrap();
    }

    let reader = store.reader();
    let mut seen = Vec::new();
    let mut n = 0;
    while let Some(info) = reader.find_nth(n) {
        seen.push(reader.read(&info).unwrap().0);
        n += 1;
    }
    seen.sort();
    assert_eq!(seen, vec!["debug.c", "other.d", "ro.a", "sys.b"]);
}
