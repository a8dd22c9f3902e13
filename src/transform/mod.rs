//! Coordinates the transformation pipeline: source bytes in, stored
//! derivative record out.

mod client;

pub use client::{DEFAULT_API_URL, GenerativeImageClient, TransformedImage};

use chrono::{Datelike, TimeZone, Utc};
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::media::{MediaStorage, mime_for_name};
use crate::provenance;
use crate::store::Store;
use crate::types::{ImageRecord, User, Visibility};

/// Stores image bytes and inserts the matching record.
///
/// With a `source` the new record is a derivative created through the
/// provenance engine; without one it is a root upload. The record is only
/// inserted after the bytes are durably stored, and a failed insert rolls
/// the stored object back so no half-created image survives.
pub async fn persist_image(
    store: &dyn Store,
    media: &MediaStorage,
    data: &[u8],
    mime_type: &str,
    owner: &User,
    source: Option<(&str, &str)>,
    visibility: Visibility,
) -> Result<ImageRecord> {
    let object = media.put(data, mime_type).await?;

    let result = match source {
        Some((source_id, prompt)) => provenance::record_transformation(
            store,
            source_id,
            &object.id,
            &object.name,
            prompt,
            owner,
            visibility,
        ),
        None => provenance::create_root_image(store, &object.id, &object.name, Some(owner), visibility),
    };

    match result {
        Ok(record) => Ok(record),
        Err(err) => {
            if let Err(cleanup_err) = media.delete(&object.name).await {
                tracing::warn!("Failed to remove orphaned object {}: {cleanup_err}", object.name);
            }
            Err(err)
        }
    }
}

/// Full pipeline for transforming an already-stored image: load the source
/// bytes, call the generative service, persist the result with provenance.
///
/// The source must be viewable by `owner`. Cancelling the returned future
/// before the persist step leaves no partial record behind.
pub async fn transform_stored_image(
    store: &dyn Store,
    media: &MediaStorage,
    client: &GenerativeImageClient,
    source_id: &str,
    prompt: &str,
    owner: &User,
    visibility: Visibility,
) -> Result<(ImageRecord, TransformedImage)> {
    let source = crate::permissions::check_view_permission(store, source_id, Some(owner))?.record;

    let (mut reader, size) = media.get(&source.name).await?;
    let mut data = Vec::with_capacity(size.max(0) as usize);
    reader.read_to_end(&mut data).await.map_err(Error::Io)?;

    let transformed = client
        .transform(&data, mime_for_name(&source.name), prompt)
        .await?;

    let record = persist_image(
        store,
        media,
        &transformed.data,
        &transformed.mime_type,
        owner,
        Some((source_id, prompt)),
        visibility,
    )
    .await?;

    Ok((record, transformed))
}

/// Enforces the calendar-month cap on transformations. `None` disables the
/// cap. The count is taken over derivative records created this month.
pub fn check_monthly_limit(store: &dyn Store, limit: Option<i64>) -> Result<()> {
    let Some(limit) = limit else {
        return Ok(());
    };

    let now = Utc::now();
    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);

    let used = store.count_derived_since(month_start)?;
    if used >= limit {
        return Err(Error::RateLimited);
    }

    Ok(())
}
