use std::collections::BTreeMap;

use bdd_manager::{Assignment, Error, Function, Manager};
use test_log::test;

fn manager_with(names: &[&str]) -> Manager {
    let mgr = Manager::new();
    mgr.declare(names).unwrap();
    mgr
}

fn vars<const N: usize>(mgr: &Manager, names: [&str; N]) -> [Function; N] {
    names.map(|n| mgr.var(n).unwrap())
}

fn assignment(pairs: &[(&str, bool)]) -> Assignment {
    pairs.iter().map(|&(n, v)| (n.to_string(), v)).collect()
}

/// A handful of functions over `a, b, c` to check algebraic laws against.
fn samples(mgr: &Manager) -> Vec<Function> {
    let [a, b, c] = vars(mgr, ["a", "b", "c"]);
    vec![
        mgr.one(),
        mgr.zero(),
        a.clone(),
        !&b,
        &a & &b,
        &a | &!&c,
        &(&a ^ &b) ^ &c,
        mgr.ite(&a, &b, &c).unwrap(),
    ]
}

#[test]
fn test_registry_maps_are_inverse() {
    let mgr = Manager::new();
    mgr.add_var("p", Some(4)).unwrap();
    mgr.declare(&["q", "r", "s"]).unwrap();
    mgr.insert_var_at_level("t", 0).unwrap();

    for (name, level) in mgr.levels() {
        let index = mgr.index_of(&name).unwrap();
        assert_eq!(mgr.name_of(index).as_deref(), Some(name.as_str()));
        assert_eq!(mgr.var_at_level(level).unwrap(), name);
    }
    assert_eq!(mgr.var_at_level(0).unwrap(), "t");
    assert_eq!(mgr.num_vars(), 5);
    mgr.check_consistency().unwrap();
}

#[test]
fn test_add_var_idempotent_and_conflicts() {
    let mgr = Manager::new();
    let i = mgr.add_var("x", None).unwrap();
    assert_eq!(mgr.add_var("x", None).unwrap(), i);
    assert_eq!(mgr.add_var("x", Some(i)).unwrap(), i);
    assert_eq!(mgr.num_vars(), 1);

    assert!(matches!(mgr.add_var("x", Some(i + 1)), Err(Error::NameConflict { .. })));
    assert!(matches!(mgr.add_var("y", Some(i)), Err(Error::DuplicateIndex { .. })));
    assert_eq!(mgr.num_vars(), 1);
    assert!(!mgr.contains("y"));
}

#[test]
fn test_double_negation() {
    let mgr = manager_with(&["a", "b", "c"]);
    for f in samples(&mgr) {
        let nn = mgr.apply("not", &mgr.apply("not", &f, None).unwrap(), None).unwrap();
        assert_eq!(nn, f);
    }
}

#[test]
fn test_and_commutes_and_implies_is_or_not() {
    let mgr = manager_with(&["a", "b", "c"]);
    let fs = samples(&mgr);
    for f in &fs {
        for g in &fs {
            assert_eq!(mgr.apply("and", f, Some(g)).unwrap(), mgr.apply("and", g, Some(f)).unwrap());
            let not_f = mgr.apply("not", f, None).unwrap();
            assert_eq!(
                mgr.apply("implies", f, Some(g)).unwrap(),
                mgr.apply("or", &not_f, Some(g)).unwrap()
            );
        }
    }
}

#[test]
fn test_cube_round_trip() {
    let mgr = manager_with(&["a", "b", "c", "d"]);
    for pairs in [
        &[][..],
        &[("c", false)][..],
        &[("a", true), ("d", false)][..],
        &[("a", false), ("b", false), ("c", true), ("d", true)][..],
    ] {
        let a = assignment(pairs);
        assert_eq!(mgr.decode(&mgr.encode(&a).unwrap()).unwrap(), a);
    }
}

#[test]
fn test_scenario() {
    let mgr = Manager::new();
    mgr.add_var("x", Some(0)).unwrap();
    mgr.add_var("y", Some(1)).unwrap();
    let [x, y] = vars(&mgr, ["x", "y"]);
    let f = mgr.apply("and", &x, Some(&y)).unwrap();

    let support: Vec<String> = mgr.support(&f).unwrap().into_iter().collect();
    assert_eq!(support, vec!["x", "y"]);
    assert_eq!(mgr.cofactor(&f, &assignment(&[("x", true)])).unwrap(), y);
    assert_eq!(mgr.quantify(&f, &["x"], false).unwrap(), y);

    mgr.add_var("z", None).unwrap();
    let renaming: BTreeMap<String, String> = [("x".to_string(), "z".to_string())].into();
    let g = mgr.rename(&f, &renaming).unwrap();
    let support: Vec<String> = mgr.support(&g).unwrap().into_iter().collect();
    assert_eq!(support, vec!["y", "z"]);
}

#[test]
fn test_transfer_failure_and_success() {
    let src = manager_with(&["x", "y"]);
    let [x, y] = vars(&src, ["x", "y"]);
    let f = &x | &!&y;

    let partial = manager_with(&["x"]);
    assert!(matches!(
        src.transfer(&f, &partial),
        Err(Error::MissingVariables(names)) if names == vec!["y".to_string()]
    ));
    assert_eq!(partial.num_vars(), 1);

    let full = manager_with(&["x", "y"]);
    let g = src.transfer(&f, &full).unwrap();
    assert_eq!(g, &full.var("x").unwrap() | &!full.var("y").unwrap());
    assert_eq!(src.count(&f, 2).unwrap(), full.count(&g, 2).unwrap());
}

#[test]
fn test_reference_discipline() {
    let mgr = manager_with(&["a", "b", "c"]);
    {
        let [a, b, c] = vars(&mgr, ["a", "b", "c"]);
        let f = &(&a & &b) | &c;
        let rc = f.ref_count();
        let g = f.clone();
        assert_eq!(f.ref_count(), rc + 1);
        drop(g);
        assert_eq!(f.ref_count(), rc);
        assert!(mgr.statistics(true).live_nodes > 0);
    }

    mgr.collect_garbage();
    assert_eq!(mgr.bdd().check_zero_ref(), 0);
    assert_eq!(mgr.statistics(true).live_nodes, 0);
    assert_eq!(mgr.bdd().allocated_nodes(), 0);
    mgr.close().unwrap();
}

#[test]
fn test_close_with_live_function_fails() {
    let mgr = manager_with(&["a"]);
    let a = mgr.var("a").unwrap();
    assert!(matches!(mgr.clone().close(), Err(Error::OwnershipViolation(_))));
    drop(a);
    mgr.close().unwrap();
}

#[test]
fn test_mixing_managers_is_an_error() {
    let m1 = manager_with(&["a"]);
    let m2 = manager_with(&["a"]);
    let a1 = m1.var("a").unwrap();
    let a2 = m2.var("a").unwrap();
    assert!(matches!(m1.apply("or", &a1, Some(&a2)), Err(Error::ManagerMismatch)));
    assert!(matches!(m1.support(&a2), Err(Error::ManagerMismatch)));
    assert!(matches!(a1.try_eq(&a2), Err(Error::ManagerMismatch)));
}

#[test]
fn test_reordering_preserves_functions() {
    let mgr = Manager::new();
    let names = ["x0", "x1", "x2", "y0", "y1", "y2"];
    mgr.declare(&names).unwrap();
    let [x0, x1, x2, y0, y1, y2] = vars(&mgr, names);
    let f = &(&(&x0 & &y0) | &(&x1 & &y1)) | &(&x2 & &y2);
    let count = mgr.count(&f, 6).unwrap();
    let before = f.node_count();

    let stats = mgr.reorder(None).unwrap().unwrap();
    assert!(stats.final_size <= stats.initial_size);
    assert_eq!(mgr.count(&f, 6).unwrap(), count);

    let order: BTreeMap<String, u32> = names.iter().enumerate().map(|(i, n)| (n.to_string(), i as u32)).collect();
    mgr.reorder(Some(&order)).unwrap();
    assert_eq!(mgr.levels(), order);
    assert_eq!(f.node_count(), before);
    mgr.check_consistency().unwrap();
}
