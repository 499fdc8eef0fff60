// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn put_then_get_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(dir.path()).unwrap();

    store.put("runs/w1/research.json", b"big payload").unwrap();
    assert_eq!(store.get("runs/w1/research.json").unwrap(), b"big payload");
}

#[test]
fn put_is_an_idempotent_replace() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(dir.path()).unwrap();

    store.put("callbacks/t1.json", b"v1").unwrap();
    store.put("callbacks/t1.json", b"v1").unwrap();
    assert_eq!(store.get("callbacks/t1.json").unwrap(), b"v1");
}

#[test]
fn missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(dir.path()).unwrap();
    assert!(matches!(
        store.get("runs/w1/missing.json"),
        Err(StorageError::ArtifactNotFound(_))
    ));
}

#[test]
fn traversal_segments_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(dir.path()).unwrap();

    for key in ["../escape", "runs/../../etc", "runs//double", ""] {
        assert!(
            matches!(store.put(key, b"x"), Err(StorageError::InvalidName(_))),
            "key {:?} should be rejected",
            key
        );
    }
}
