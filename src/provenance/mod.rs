//! The derivation forest: creating derivative records and reconstructing
//! lineages.
//!
//! Images form a forest linked by `source_image_id`. Roots are original
//! uploads; every transformation inserts a new leaf one generation deeper,
//! stamped with the prompt that produced it and its tree's root id. Nothing
//! here caches: every query recomputes from the store.

pub mod tree;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::permissions;
use crate::store::Store;
use crate::types::{ImageRecord, User, Visibility};

/// A full derivation tree as a flat list, ordered so that a parent always
/// sorts before its children (generation depth ascending, then creation
/// time ascending).
#[derive(Debug)]
pub struct TreeQuery {
    pub root_image_id: String,
    pub tree: Vec<ImageRecord>,
}

/// Inserts a root record for a freshly uploaded image.
///
/// `owner` is `None` only for reconciled legacy objects.
pub fn create_root_image(
    store: &dyn Store,
    id: &str,
    name: &str,
    owner: Option<&User>,
    visibility: Visibility,
) -> Result<ImageRecord> {
    let record = ImageRecord {
        id: id.to_string(),
        owner_id: owner.map(|user| user.id.clone()),
        name: name.to_string(),
        visibility,
        likes_count: 0,
        comments_count: 0,
        created_at: Utc::now(),
        source_image_id: None,
        transformation_prompt: None,
        root_image_id: id.to_string(),
        generation_depth: 0,
    };

    store.create_image(&record)?;
    Ok(record)
}

/// Inserts the record for a transformed image derived from `source_id`.
///
/// The source must be viewable by the acting owner (owners can always read
/// their own images regardless of visibility). The derivative inherits the
/// source's `root_image_id` and sits one generation deeper; all four
/// provenance fields go into a single insert. A concurrent deletion of the
/// source between the read and the insert leaves a dangling pointer later
/// but never a malformed record: the snapshot already read supplies the
/// root id and depth.
///
/// `new_image_id` is freshly minted by storage before this call, so cycles
/// are structurally impossible as long as ids are never reused.
pub fn record_transformation(
    store: &dyn Store,
    source_id: &str,
    new_image_id: &str,
    name: &str,
    prompt: &str,
    owner: &User,
    visibility: Visibility,
) -> Result<ImageRecord> {
    let source = permissions::check_view_permission(store, source_id, Some(owner))?.record;

    let record = ImageRecord {
        id: new_image_id.to_string(),
        owner_id: Some(owner.id.clone()),
        name: name.to_string(),
        visibility,
        likes_count: 0,
        comments_count: 0,
        created_at: Utc::now(),
        source_image_id: Some(source.id.clone()),
        transformation_prompt: Some(prompt.to_string()),
        root_image_id: source.root_image_id.clone(),
        generation_depth: source.generation_depth + 1,
    };

    store.create_image(&record)?;
    Ok(record)
}

/// Returns the ancestry chain of `image_id`, root first, the queried image
/// last.
///
/// Uses the store's recursive traversal, bounded by the queried record's
/// `generation_depth + 1` hops. A chain longer than that bound means the
/// forest contains a cycle and is reported as a data-integrity failure
/// rather than walked forever. A source pointer that no longer resolves
/// (deleted ancestor) simply ends the chain there.
pub fn get_ancestry(store: &dyn Store, image_id: &str) -> Result<Vec<ImageRecord>> {
    let start = store.get_image(image_id)?.ok_or(Error::NotFound)?;
    let max_hops = start.generation_depth + 1;

    let chain = store.list_ancestry(image_id, max_hops)?;
    if chain.len() as i64 > max_hops {
        return Err(Error::DataIntegrity(format!(
            "ancestry of image {image_id} exceeds {max_hops} hops"
        )));
    }

    Ok(chain)
}

/// Iterative ancestry walk following `source_image_id` pointers one lookup
/// at a time. Portable reference for stores without recursive queries;
/// produces output identical to [`get_ancestry`] and shares its hop bound
/// and dangling-pointer behavior.
pub fn walk_ancestry(store: &dyn Store, image_id: &str) -> Result<Vec<ImageRecord>> {
    let start = store.get_image(image_id)?.ok_or(Error::NotFound)?;
    let max_hops = start.generation_depth + 1;

    let mut chain = vec![start];
    loop {
        let Some(source_id) = chain
            .last()
            .and_then(|record| record.source_image_id.clone())
        else {
            break;
        };

        if chain.len() as i64 >= max_hops {
            return Err(Error::DataIntegrity(format!(
                "ancestry of image {image_id} exceeds {max_hops} hops"
            )));
        }

        match store.get_image(&source_id)? {
            Some(parent) => chain.push(parent),
            // Source was deleted; the chain ends at the deepest survivor.
            None => break,
        }
    }

    chain.reverse();
    Ok(chain)
}

/// Returns every record in the tree containing `image_id`.
///
/// A failed member lookup is a `NotFound`, never an empty tree; a record is
/// always a member of its own tree, so an empty result cannot occur.
pub fn get_tree(store: &dyn Store, image_id: &str) -> Result<TreeQuery> {
    let member = store.get_image(image_id)?.ok_or(Error::NotFound)?;
    let tree = store.list_lineage(&member.root_image_id)?;

    Ok(TreeQuery {
        root_image_id: member.root_image_id,
        tree,
    })
}

/// Direct children of `image_id`, newest first. Cheaper than [`get_tree`]
/// when a caller only expands one level.
pub fn get_derivatives(store: &dyn Store, image_id: &str) -> Result<Vec<ImageRecord>> {
    if store.get_image(image_id)?.is_none() {
        return Err(Error::NotFound);
    }
    store.list_derivatives(image_id)
}
