mod common;

use chrono::Utc;
use common::{create_user, open_store, upload_root};
use uuid::Uuid;

use mememaker::store::Store;
use mememaker::types::{CommentRecord, LikeRecord, Visibility};

#[test]
fn like_toggle_keeps_counter_in_step() {
    let store = open_store();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    let image = upload_root(&store, &alice, Visibility::Public);

    // Bob likes the image.
    let like = LikeRecord {
        id: Uuid::new_v4().to_string(),
        image_id: image.id.clone(),
        user_id: bob.id.clone(),
        created_at: Utc::now(),
    };
    store.create_like(&like).unwrap();
    store.adjust_likes_count(&image.id, 1).unwrap();

    assert!(store.get_like(&image.id, &bob.id).unwrap().is_some());
    assert_eq!(store.get_image(&image.id).unwrap().unwrap().likes_count, 1);

    // And un-likes it again.
    assert!(store.delete_like(&image.id, &bob.id).unwrap());
    store.adjust_likes_count(&image.id, -1).unwrap();

    assert!(store.get_like(&image.id, &bob.id).unwrap().is_none());
    assert_eq!(store.get_image(&image.id).unwrap().unwrap().likes_count, 0);

    // Removing a like that is already gone reports false.
    assert!(!store.delete_like(&image.id, &bob.id).unwrap());
}

#[test]
fn liked_image_ids_are_filtered_per_user() {
    let store = open_store();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    let first = upload_root(&store, &alice, Visibility::Public);
    let second = upload_root(&store, &alice, Visibility::Public);

    store
        .create_like(&LikeRecord {
            id: Uuid::new_v4().to_string(),
            image_id: first.id.clone(),
            user_id: bob.id.clone(),
            created_at: Utc::now(),
        })
        .unwrap();

    let image_ids = vec![first.id.clone(), second.id.clone()];
    let liked = store.list_user_liked_image_ids(&bob.id, &image_ids).unwrap();
    assert_eq!(liked, vec![first.id.clone()]);

    let liked = store.list_user_liked_image_ids(&alice.id, &image_ids).unwrap();
    assert!(liked.is_empty());

    let liked = store.list_user_liked_image_ids(&bob.id, &[]).unwrap();
    assert!(liked.is_empty());
}

#[test]
fn comments_snapshot_the_author_name() {
    let store = open_store();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    let image = upload_root(&store, &alice, Visibility::Public);

    let comment = CommentRecord {
        id: Uuid::new_v4().to_string(),
        image_id: image.id.clone(),
        user_id: bob.id.clone(),
        username: bob.username.clone(),
        text: "nice hat".to_string(),
        created_at: Utc::now(),
    };
    store.create_comment(&comment).unwrap();
    store.adjust_comments_count(&image.id, 1).unwrap();

    let comments = store.list_comments(&image.id).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].username, "bob");
    assert_eq!(comments[0].text, "nice hat");
    assert_eq!(
        store.get_image(&image.id).unwrap().unwrap().comments_count,
        1
    );

    assert!(store.delete_comment(&comment.id).unwrap());
    store.adjust_comments_count(&image.id, -1).unwrap();
    assert!(store.list_comments(&image.id).unwrap().is_empty());
    assert_eq!(
        store.get_image(&image.id).unwrap().unwrap().comments_count,
        0
    );
}

#[test]
fn deleting_an_image_cascades_to_engagement_rows() {
    let store = open_store();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    let image = upload_root(&store, &alice, Visibility::Public);

    store
        .create_like(&LikeRecord {
            id: Uuid::new_v4().to_string(),
            image_id: image.id.clone(),
            user_id: bob.id.clone(),
            created_at: Utc::now(),
        })
        .unwrap();
    store
        .create_comment(&CommentRecord {
            id: "comment-1".to_string(),
            image_id: image.id.clone(),
            user_id: bob.id.clone(),
            username: bob.username.clone(),
            text: "gone soon".to_string(),
            created_at: Utc::now(),
        })
        .unwrap();

    assert!(store.delete_image(&image.id).unwrap());

    assert!(store.get_like(&image.id, &bob.id).unwrap().is_none());
    assert!(store.list_comments(&image.id).unwrap().is_empty());
}
