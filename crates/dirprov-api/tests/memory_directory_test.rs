//! Integration tests for `MemoryDirectory` through the `DirectoryClient`
//! trait object, the way the provisioning core consumes it.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;

use dirprov_api::{
    Attributes, DirectoryClient, Dn, Error, Filter, MemoryDirectory, Modification, Routing, Scope,
    SearchRequest, Snapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn dn(s: &str) -> Dn {
    Dn::parse(s).unwrap()
}

/// Two domains with a people container each and a couple of accounts.
fn seeded() -> Arc<dyn DirectoryClient> {
    let dir = MemoryDirectory::new();
    for entry in [
        "dc=com",
        "dc=a,dc=com",
        "ou=people,dc=a,dc=com",
        "dc=b,dc=com",
        "ou=people,dc=b,dc=com",
    ] {
        dir.create(&dn(entry), Attributes::new().with("objectClass", "container"))
            .unwrap();
    }
    dir.create(
        &dn("uid=alice,ou=people,dc=a,dc=com"),
        Attributes::new()
            .with("objectClass", "dirAccount")
            .with("mail", "alice@a.com"),
    )
    .unwrap();
    dir.create(
        &dn("uid=bob,ou=people,dc=a,dc=com"),
        Attributes::new()
            .with("objectClass", "dirAccount")
            .with("mail", "bob@a.com"),
    )
    .unwrap();
    Arc::new(dir)
}

// ── Structure ───────────────────────────────────────────────────────

#[test]
fn duplicate_create_collides() {
    let dir = seeded();
    let err = dir
        .create(&dn("uid=ALICE,ou=people,dc=a,dc=com"), Attributes::new())
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[test]
fn delete_only_removes_leaves() {
    let dir = seeded();
    let err = dir.delete(&dn("ou=people,dc=a,dc=com")).unwrap_err();
    assert_eq!(
        err,
        Error::NotLeaf {
            dn: "ou=people,dc=a,dc=com".into()
        }
    );

    dir.delete(&dn("uid=bob,ou=people,dc=a,dc=com")).unwrap();
    assert!(
        !dir.exists(&dn("uid=bob,ou=people,dc=a,dc=com"), Routing::PreferMaster)
            .unwrap()
    );
    assert!(dir.delete(&dn("uid=bob,ou=people,dc=a,dc=com")).unwrap_err().is_not_found());
}

#[test]
fn rename_moves_the_whole_subtree() {
    let dir = seeded();
    dir.create(&dn("dc=org"), Attributes::new()).unwrap();
    dir.rename(&dn("dc=a,dc=com"), &dn("dc=c,dc=org")).unwrap();

    assert!(!dir.exists(&dn("dc=a,dc=com"), Routing::PreferMaster).unwrap());
    let moved = dir
        .get(&dn("uid=alice,ou=people,dc=c,dc=org"), Routing::PreferMaster)
        .unwrap()
        .unwrap();
    assert_eq!(moved.get_one("mail"), Some("alice@a.com"));

    let top = dir.get(&dn("dc=c,dc=org"), Routing::PreferMaster).unwrap().unwrap();
    assert_eq!(top.get_all("dc"), ["c"]);
}

#[test]
fn rename_refuses_occupied_target() {
    let dir = seeded();
    let err = dir
        .rename(
            &dn("uid=alice,ou=people,dc=a,dc=com"),
            &dn("uid=bob,ou=people,dc=a,dc=com"),
        )
        .unwrap_err();
    assert!(err.is_already_exists());
}

// ── Search ──────────────────────────────────────────────────────────

#[test]
fn search_respects_scope_and_filter() {
    let dir = seeded();

    let accounts = dir
        .search_all(&SearchRequest::subtree(
            dn("dc=com"),
            Filter::eq("objectClass", "dirAccount"),
        ))
        .unwrap();
    assert_eq!(accounts.len(), 2);

    let children = dir
        .search_all(
            &SearchRequest::subtree(dn("dc=com"), Filter::and([])).with_scope(Scope::One),
        )
        .unwrap();
    let names: Vec<String> = children.iter().map(|h| h.dn.to_string()).collect();
    assert_eq!(names, ["dc=a,dc=com", "dc=b,dc=com"]);

    let projected = dir
        .search_all(
            &SearchRequest::subtree(dn("dc=a,dc=com"), Filter::eq("mail", "BOB@a.com"))
                .with_attrs(["uid"]),
        )
        .unwrap();
    assert_eq!(projected.len(), 1);
    assert!(projected[0].attrs.get_one("mail").is_none());
    assert_eq!(projected[0].attrs.get_one("uid"), Some("bob"));
}

#[test]
fn search_under_missing_base_fails() {
    let dir = seeded();
    let err = dir
        .search_all(&SearchRequest::subtree(dn("dc=zzz"), Filter::and([])))
        .unwrap_err();
    assert!(err.is_not_found());
}

// ── Snapshots ───────────────────────────────────────────────────────

#[test]
fn snapshot_survives_a_file_round_trip() {
    let dir = MemoryDirectory::new();
    dir.create(&dn("dc=com"), Attributes::new()).unwrap();
    dir.create(&dn("dc=a,dc=com"), Attributes::new().with("o", "A")).unwrap();
    dir.modify(
        &dn("dc=a,dc=com"),
        &[Modification::add("description", ["first", "second"])],
    )
    .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("state.json");
    std::fs::write(&path, serde_json::to_string(&dir.snapshot()).unwrap()).unwrap();

    let loaded: Snapshot = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let restored = MemoryDirectory::from_snapshot(loaded);
    assert_eq!(restored.len(), 2);
    let attrs = restored
        .get(&dn("dc=a,dc=com"), Routing::PreferReplica)
        .unwrap()
        .unwrap();
    assert_eq!(attrs.get_all("description"), ["first", "second"]);
}
