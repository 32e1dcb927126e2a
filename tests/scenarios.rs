use std::path::PathBuf;

use prekey_store::{BundleContainer, Bundle, Identity, PersistenceService, PrivateBundleEntry, SignedPreKey, SqlitePersistence};
use std::collections::BTreeMap;
use uuid::Uuid;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("prekey-store-scenario-{name}-{}.db", Uuid::new_v4()))
}

async fn open(name: &str) -> (SqlitePersistence, PathBuf) {
    let path = scratch_path(name);
    let _ = std::fs::remove_file(&path);
    let store = SqlitePersistence::open(&path, "scenario passphrase")
        .await
        .expect("store opens");
    (store, path)
}

fn cleanup(path: &PathBuf) {
    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
}

fn identity(byte: u8) -> Identity {
    Identity::from_public_key(&[byte; 32]).unwrap()
}

#[tokio::test]
async fn fresh_open_is_idempotent() {
    let (_store, path) = open("fresh-open").await;
    let second = SqlitePersistence::open(&path, "scenario passphrase").await;
    assert!(second.is_ok(), "re-opening an existing store must succeed");
    cleanup(&path);
}

#[tokio::test]
async fn private_and_public_bundles_round_trip_independently() {
    let (store, path) = open("private-public-symmetry").await;
    let id = identity(1);

    let container = BundleContainer {
        identity: id.clone(),
        identity_sig: b"identity-sig".to_vec(),
        entries: vec![PrivateBundleEntry {
            installation_id: "inst-a".to_string(),
            signed_pre_key: b"spk-a".to_vec(),
            private_signed_pre_key: b"private-half-a".to_vec(),
            signature: b"spk-sig-a".to_vec(),
            timestamp: 1_000,
        }],
    };

    store.add_private_bundle(&container).await.unwrap();

    let private = store
        .get_private_key_bundle(b"spk-a")
        .await
        .unwrap()
        .expect("private half must be retrievable by bundle id");
    assert_eq!(private, b"private-half-a");

    let public = store
        .get_public_bundle(&id, &["inst-a".to_string()])
        .await
        .unwrap()
        .expect("a public row is derived as a side effect of AddPrivateBundle");
    let record = &public.signed_pre_keys["inst-a"];
    assert_eq!(record.signed_pre_key, b"spk-a");
    assert_eq!(record.version, 0);

    cleanup(&path);
}

#[tokio::test]
async fn public_bundle_lookup_prefers_highest_version_regardless_of_insertion_order() {
    let (store, path) = open("out-of-order-versions").await;
    let id = identity(2);

    let mut v1 = BTreeMap::new();
    v1.insert(
        "inst-a".to_string(),
        SignedPreKey {
            signed_pre_key: b"spk-v1".to_vec(),
            version: 1,
            signature: b"sig-v1".to_vec(),
        },
    );
    store
        .add_public_bundle(&Bundle {
            identity: id.clone(),
            identity_sig: b"sig".to_vec(),
            signed_pre_keys: v1,
        })
        .await
        .unwrap();

    let mut v0 = BTreeMap::new();
    v0.insert(
        "inst-a".to_string(),
        SignedPreKey {
            signed_pre_key: b"spk-v0".to_vec(),
            version: 0,
            signature: b"sig-v0".to_vec(),
        },
    );
    store
        .add_public_bundle(&Bundle {
            identity: id.clone(),
            identity_sig: b"sig".to_vec(),
            signed_pre_keys: v0,
        })
        .await
        .unwrap();

    let bundle = store
        .get_public_bundle(&id, &["inst-a".to_string()])
        .await
        .unwrap()
        .unwrap();
    let record = &bundle.signed_pre_keys["inst-a"];
    assert_eq!(record.version, 1, "the higher version must win even though it was inserted first");
    assert_eq!(record.signed_pre_key, b"spk-v1");

    cleanup(&path);
}

#[tokio::test]
async fn multi_device_fan_in_collects_one_record_per_installation() {
    let (store, path) = open("multi-device-fan-in").await;
    let id = identity(3);

    for (installation, key) in [("inst-a", b"spk-a" as &[u8]), ("inst-b", b"spk-b")] {
        let mut keys = BTreeMap::new();
        keys.insert(
            installation.to_string(),
            SignedPreKey {
                signed_pre_key: key.to_vec(),
                version: 0,
                signature: b"sig".to_vec(),
            },
        );
        store
            .add_public_bundle(&Bundle {
                identity: id.clone(),
                identity_sig: b"sig".to_vec(),
                signed_pre_keys: keys,
            })
            .await
            .unwrap();
    }

    let bundle = store
        .get_public_bundle(&id, &["inst-a".to_string(), "inst-b".to_string()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bundle.signed_pre_keys.len(), 2);
    assert_eq!(bundle.signed_pre_keys["inst-a"].signed_pre_key, b"spk-a");
    assert_eq!(bundle.signed_pre_keys["inst-b"].signed_pre_key, b"spk-b");

    cleanup(&path);
}

#[tokio::test]
async fn ratchet_info_against_missing_bundle_fails() {
    let (store, path) = open("ratchet-missing-bundle").await;
    let id = identity(4);

    let result = store
        .add_ratchet_info(b"symmetric-key", &id, b"no-such-bundle", b"ephemeral-pub", "inst-a")
        .await;
    assert!(result.is_err(), "a ratchet cannot be seeded from an unknown bundle_id");

    cleanup(&path);
}

#[tokio::test]
async fn ratchet_info_is_idempotent_and_retrievable() {
    let (store, path) = open("ratchet-roundtrip").await;
    let id = identity(5);

    let mut keys = BTreeMap::new();
    keys.insert(
        "inst-a".to_string(),
        SignedPreKey {
            signed_pre_key: b"spk-peer".to_vec(),
            version: 0,
            signature: b"sig".to_vec(),
        },
    );
    store
        .add_public_bundle(&Bundle {
            identity: id.clone(),
            identity_sig: b"sig".to_vec(),
            signed_pre_keys: keys,
        })
        .await
        .unwrap();

    store
        .add_ratchet_info(b"symmetric-key-1", &id, b"spk-peer", b"ephemeral-1", "inst-a")
        .await
        .unwrap();
    // Re-running with updated key material must update the same row, not
    // create a second one.
    store
        .add_ratchet_info(b"symmetric-key-2", &id, b"spk-peer", b"ephemeral-2", "inst-a")
        .await
        .unwrap();

    let info = store
        .get_ratchet_info(b"spk-peer", &id, "inst-a")
        .await
        .unwrap()
        .expect("ratchet info must be retrievable by its bundle_id");
    assert_eq!(info.symmetric_key, b"symmetric-key-2");
    assert_eq!(info.ephemeral_public_key, b"ephemeral-2");
    assert!(info.private_key.is_none(), "this was seeded from a peer's public bundle");

    let any = store
        .get_any_ratchet_info(&id, "inst-a")
        .await
        .unwrap()
        .expect("get_any_ratchet_info must find the same row");
    assert_eq!(any.id, info.id);

    cleanup(&path);
}

#[tokio::test]
async fn installation_windowing_picks_the_newest_and_respects_disabled_state() {
    let (store, path) = open("installation-windowing").await;
    let id = identity(6);

    store
        .add_installations(
            &id,
            100,
            &["inst-old".to_string()],
            true,
        )
        .await
        .unwrap();
    store
        .add_installations(
            &id,
            200,
            &["inst-new".to_string()],
            true,
        )
        .await
        .unwrap();
    store
        .add_installations(
            &id,
            150,
            &["inst-mid".to_string()],
            true,
        )
        .await
        .unwrap();

    store.disable_installation(&id, "inst-mid").await.unwrap();

    let active = store.get_active_installations(10, &id).await.unwrap();
    assert_eq!(active, vec!["inst-new".to_string(), "inst-old".to_string()]);

    store.enable_installation(&id, "inst-mid").await.unwrap();
    let active = store.get_active_installations(10, &id).await.unwrap();
    assert_eq!(active.len(), 3);

    cleanup(&path);
}

#[tokio::test]
async fn re_adding_a_disabled_installation_does_not_re_enable_it() {
    let (store, path) = open("disable-then-readd").await;
    let id = identity(7);

    store
        .add_installations(&id, 10, &["inst-a".to_string()], true)
        .await
        .unwrap();
    store.disable_installation(&id, "inst-a").await.unwrap();

    // Re-announcing the same installation (e.g. re-seen in a bundle) must
    // not flip it back on — only an explicit EnableInstallation may.
    store
        .add_installations(&id, 20, &["inst-a".to_string()], true)
        .await
        .unwrap();

    let active = store.get_active_installations(10, &id).await.unwrap();
    assert!(active.is_empty(), "a disabled installation must stay disabled across re-add");

    store.enable_installation(&id, "inst-a").await.unwrap();
    let active = store.get_active_installations(10, &id).await.unwrap();
    assert_eq!(active, vec!["inst-a".to_string()]);

    cleanup(&path);
}

#[tokio::test]
async fn active_installation_cap_is_applied_at_read_time_not_write_time() {
    let (store, path) = open("installation-cap-window").await;
    let id = identity(8);

    store
        .add_installations(
            &id,
            1,
            &["alice-1".to_string(), "alice-2".to_string()],
            true,
        )
        .await
        .unwrap();
    store
        .add_installations(
            &id,
            2,
            &["alice-2".to_string(), "alice-3".to_string()],
            true,
        )
        .await
        .unwrap();
    store
        .add_installations(
            &id,
            3,
            &["alice-2".to_string(), "alice-3".to_string(), "alice-4".to_string()],
            true,
        )
        .await
        .unwrap();

    // Writes never delete rows; the cap only bites the read-time window,
    // so the late-arriving, higher-timestamp ids naturally evict alice-1.
    let active = store.get_active_installations(3, &id).await.unwrap();
    assert_eq!(
        active,
        vec!["alice-2".to_string(), "alice-3".to_string(), "alice-4".to_string()]
    );

    cleanup(&path);
}

#[tokio::test]
async fn get_any_private_bundle_returns_the_callers_own_published_material() {
    let (store, path) = open("get-any-private-bundle").await;
    let id = identity(9);

    let container = BundleContainer {
        identity: id.clone(),
        identity_sig: b"identity-sig".to_vec(),
        entries: vec![PrivateBundleEntry {
            installation_id: "inst-a".to_string(),
            signed_pre_key: b"spk-own".to_vec(),
            private_signed_pre_key: b"private-half-own".to_vec(),
            signature: b"spk-sig".to_vec(),
            timestamp: 500,
        }],
    };
    store.add_private_bundle(&container).await.unwrap();

    let bundle = store
        .get_any_private_bundle(&id, &["inst-a".to_string(), "inst-missing".to_string()])
        .await
        .unwrap()
        .expect("one of our own bundles matches the filter set");
    let record = &bundle.signed_pre_keys["inst-a"];
    assert_eq!(record.signed_pre_key, b"spk-own".to_vec());
    assert_eq!(record.version, 0, "first bundle for a fresh installation is version 0");
    assert_eq!(record.signature, b"spk-sig".to_vec());
    assert_eq!(bundle.identity_sig, b"identity-sig".to_vec());

    let none = store
        .get_any_private_bundle(&id, &["inst-missing".to_string()])
        .await
        .unwrap();
    assert!(none.is_none(), "no private bundle matches an unknown installation filter");

    cleanup(&path);
}
