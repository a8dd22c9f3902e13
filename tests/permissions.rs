mod common;

use common::{create_user, open_store, upload_root};

use mememaker::error::Error;
use mememaker::permissions::{check_modify_permission, check_view_permission};
use mememaker::provenance;
use mememaker::types::Visibility;

#[test]
fn public_and_unlisted_images_are_viewable_by_anyone() {
    let store = open_store();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    for visibility in [Visibility::Public, Visibility::Unlisted] {
        let image = upload_root(&store, &alice, visibility);

        for requester in [None, Some(&bob), Some(&alice)] {
            let view = check_view_permission(&store, &image.id, requester).unwrap();
            assert_eq!(view.record.id, image.id);
            assert_eq!(
                view.is_owner,
                requester.map(|u| u.id.as_str()) == Some(alice.id.as_str())
            );
        }
    }
}

#[test]
fn private_images_are_only_viewable_by_their_owner() {
    let store = open_store();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    let image = upload_root(&store, &alice, Visibility::Private);

    let view = check_view_permission(&store, &image.id, Some(&alice)).unwrap();
    assert!(view.is_owner);

    // Anonymous and non-owner denials are the same error as a missing
    // image, so existence never leaks.
    assert!(matches!(
        check_view_permission(&store, &image.id, None),
        Err(Error::NotFound)
    ));
    assert!(matches!(
        check_view_permission(&store, &image.id, Some(&bob)),
        Err(Error::NotFound)
    ));
    assert!(matches!(
        check_view_permission(&store, "missing", Some(&bob)),
        Err(Error::NotFound)
    ));
}

#[test]
fn view_check_fails_closed_on_missing_records() {
    let store = open_store();
    let alice = create_user(&store, "alice");

    assert!(matches!(
        check_view_permission(&store, "missing", None),
        Err(Error::NotFound)
    ));
    assert!(matches!(
        check_view_permission(&store, "missing", Some(&alice)),
        Err(Error::NotFound)
    ));
}

#[test]
fn modify_distinguishes_unauthorized_forbidden_and_missing() {
    let store = open_store();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    let image = upload_root(&store, &alice, Visibility::Public);

    let record = check_modify_permission(&store, &image.id, Some(&alice)).unwrap();
    assert_eq!(record.id, image.id);

    assert!(matches!(
        check_modify_permission(&store, &image.id, None),
        Err(Error::Unauthorized)
    ));
    assert!(matches!(
        check_modify_permission(&store, &image.id, Some(&bob)),
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        check_modify_permission(&store, "missing", Some(&alice)),
        Err(Error::NotFound)
    ));
    assert!(matches!(
        check_modify_permission(&store, "missing", Some(&bob)),
        Err(Error::NotFound)
    ));
}

#[test]
fn ownerless_records_are_modifiable_by_nobody() {
    let store = open_store();
    let alice = create_user(&store, "alice");

    // Reconciled legacy object: a root record with no owner.
    let legacy =
        provenance::create_root_image(&store, "legacy-1", "legacy-1.png", None, Visibility::Public)
            .unwrap();

    let view = check_view_permission(&store, &legacy.id, Some(&alice)).unwrap();
    assert!(!view.is_owner);

    assert!(matches!(
        check_modify_permission(&store, &legacy.id, Some(&alice)),
        Err(Error::Forbidden)
    ));
}
