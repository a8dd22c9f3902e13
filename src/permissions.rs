//! Visibility-aware access decisions for image records.
//!
//! Every read and write path goes through one of these checks; handlers do
//! not branch on visibility themselves.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{ImageRecord, User, Visibility};

/// Outcome of a successful view check.
#[derive(Debug)]
pub struct ViewPermission {
    pub record: ImageRecord,
    pub is_owner: bool,
}

/// Decides whether `requester` may view the image.
///
/// Public and unlisted images are viewable by anyone, including anonymous
/// requesters. Private images are viewable only by their owner, and a denied
/// private image is reported as `NotFound` so its existence never leaks.
pub fn check_view_permission(
    store: &dyn Store,
    image_id: &str,
    requester: Option<&User>,
) -> Result<ViewPermission> {
    let record = store.get_image(image_id)?.ok_or(Error::NotFound)?;
    let is_owner = requester.is_some_and(|user| record.is_owned_by(&user.id));

    match record.visibility {
        Visibility::Public | Visibility::Unlisted => Ok(ViewPermission { record, is_owner }),
        Visibility::Private if is_owner => Ok(ViewPermission {
            record,
            is_owner: true,
        }),
        Visibility::Private => Err(Error::NotFound),
    }
}

/// Decides whether `requester` may modify (or delete) the image.
///
/// Unlike the view check this distinguishes its failures: no identity is
/// `Unauthorized`, a missing record is `NotFound`, and a non-owner identity
/// is `Forbidden`. Ownerless legacy records are modifiable by nobody.
pub fn check_modify_permission(
    store: &dyn Store,
    image_id: &str,
    requester: Option<&User>,
) -> Result<ImageRecord> {
    let user = requester.ok_or(Error::Unauthorized)?;
    let record = store.get_image(image_id)?.ok_or(Error::NotFound)?;

    if !record.is_owned_by(&user.id) {
        return Err(Error::Forbidden);
    }

    Ok(record)
}
