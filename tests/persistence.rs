use std::collections::BTreeMap;
use std::fs;

use bdd_manager::persist::dump_paths;
use bdd_manager::{Assignment, Error, Function, Manager};
use test_log::test;

fn build(mgr: &Manager) -> Function {
    mgr.declare(&["a", "b", "c", "d"]).unwrap();
    let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| mgr.var(n).unwrap());
    &(&(&a & &!&b) | &(&c ^ &d)) | &(&b & &d)
}

#[test]
fn test_round_trip_into_fresh_manager() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("f");

    let src = Manager::new();
    let f = build(&src);
    let order: BTreeMap<String, u32> = [("d", 0), ("b", 1), ("a", 2), ("c", 3)]
        .into_iter()
        .map(|(n, l)| (n.to_string(), l))
        .collect();
    src.reorder(Some(&order)).unwrap();
    src.dump(&f, &base).unwrap();

    let dst = Manager::new();
    let g = dst.load(&base, false).unwrap();

    assert_eq!(dst.levels(), order);
    assert_eq!(g.node_count(), f.node_count());
    assert_eq!(dst.count(&g, 4).unwrap(), src.count(&f, 4).unwrap());
    for name in ["a", "b", "c", "d"] {
        for value in [false, true] {
            let a: Assignment = [(name.to_string(), value)].into();
            let fa = src.cofactor(&f, &a).unwrap();
            let ga = dst.cofactor(&g, &a).unwrap();
            assert_eq!(src.count(&fa, 4).unwrap(), dst.count(&ga, 4).unwrap());
        }
    }
    dst.check_consistency().unwrap();
}

#[test]
fn test_load_into_manager_with_other_variables() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("f");

    let src = Manager::new();
    let f = build(&src);
    src.dump(&f, &base).unwrap();

    // Same names at different indices, plus an unrelated variable on top
    let dst = Manager::new();
    dst.declare(&["zz", "d", "c"]).unwrap();
    let g = dst.load(&base, false).unwrap();

    assert_eq!(dst.num_vars(), 5);
    let expected = {
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| dst.var(n).unwrap());
        &(&(&a & &!&b) | &(&c ^ &d)) | &(&b & &d)
    };
    assert_eq!(g, expected);
    assert!(!dst.support(&g).unwrap().contains("zz"));
}

#[test]
fn test_round_trip_of_constants() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = Manager::new();
    mgr.declare(&["x"]).unwrap();

    for (file, f) in [("one", mgr.one()), ("zero", mgr.zero())] {
        let base = dir.path().join(file);
        mgr.dump(&f, &base).unwrap();
        assert_eq!(Manager::new().load(&base, false).unwrap().is_one(), f.is_one());
    }
}

#[test]
fn test_missing_file_is_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = Manager::new();
    let err = mgr.load(dir.path().join("absent"), false).unwrap_err();
    assert!(matches!(err, Error::LoadFailure { .. }));
}

#[test]
fn test_malformed_dump_registers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("broken");

    let src = Manager::new();
    let f = build(&src);
    src.dump(&f, &base).unwrap();

    let (dump_path, _) = dump_paths(&base);
    let text = fs::read_to_string(&dump_path).unwrap();
    fs::write(&dump_path, text.replace(".nodes", ".nodez")).unwrap();

    let dst = Manager::new();
    let err = dst.load(&base, false).unwrap_err();
    assert!(matches!(err, Error::LoadFailure { ref path, .. } if *path == dump_path));
    assert_eq!(dst.num_vars(), 0);
    assert_eq!(dst.bdd().num_vars(), 0);
}

#[test]
fn test_levels_missing_support_variable() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("partial");

    let src = Manager::new();
    let f = build(&src);
    src.dump(&f, &base).unwrap();

    let (_, levels_path) = dump_paths(&base);
    fs::write(&levels_path, r#"{"a": 0, "b": 1, "c": 2}"#).unwrap();

    let dst = Manager::new();
    assert!(matches!(dst.load(&base, false), Err(Error::LoadFailure { .. })));
    assert_eq!(dst.num_vars(), 0);
}

#[test]
fn test_levels_not_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("garbled");

    let src = Manager::new();
    let f = build(&src);
    src.dump(&f, &base).unwrap();

    let (_, levels_path) = dump_paths(&base);
    fs::write(&levels_path, "a = 0").unwrap();
    assert!(matches!(Manager::new().load(&base, false), Err(Error::LoadFailure { .. })));
}

#[test]
fn test_huge_node_count_is_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("huge");

    let src = Manager::new();
    src.declare(&["a", "b"]).unwrap();
    let f = &src.var("a").unwrap() & &src.var("b").unwrap();
    src.dump(&f, &base).unwrap();

    let (dump_path, _) = dump_paths(&base);
    let text: Vec<String> = fs::read_to_string(&dump_path)
        .unwrap()
        .lines()
        .map(|l| if l.starts_with(".nnodes") { ".nnodes 18446744073709551615".to_string() } else { l.to_string() })
        .collect();
    fs::write(&dump_path, text.join("\n") + "\n").unwrap();

    let dst = Manager::new();
    assert!(matches!(dst.load(&base, false), Err(Error::LoadFailure { .. })));
    assert_eq!(dst.num_vars(), 0);
}
