//! Incremental Updater Module
//!
//! Folds change events into a copy of a cached payload so an entry can absorb
//! a handful of known writes without a full recompute.

use serde::Deserialize;

use crate::cache::events::{ChangeEvent, ChangeKind, LoggedEvent};
use crate::cache::payload::{CachePayload, ItemSummary, ListingsPayload, SearchPayload};
use crate::error::{CacheError, Result};

// == Fold ==
/// Applies `events` in order to a clone of `payload`.
///
/// The input is never modified. Any error aborts the whole fold, leaving the
/// caller free to keep serving the unpatched payload.
pub fn fold(payload: &CachePayload, events: &[LoggedEvent]) -> Result<CachePayload> {
    let mut patched = payload.clone();
    for logged in events {
        apply(&mut patched, &logged.event)?;
    }
    Ok(patched)
}

fn apply(payload: &mut CachePayload, event: &ChangeEvent) -> Result<()> {
    match payload {
        CachePayload::Listings(listings) => apply_to_listings(listings, event),
        CachePayload::Search(search) => apply_to_search(search, event),
        CachePayload::Other(_) => Ok(()),
    }
}

fn apply_to_listings(listings: &mut ListingsPayload, event: &ChangeEvent) -> Result<()> {
    match event.kind {
        ChangeKind::ItemCreated => {
            let created = ItemSummary::from_created(
                require_item_id(event)?,
                event.data.as_ref(),
                event.username.as_deref(),
                event.timestamp,
            )?;
            for (list, capacity) in listings.lists_mut() {
                list.retain(|item| item.id != created.id);
                list.insert(0, created.clone());
                list.truncate(capacity);
            }
        }
        ChangeKind::ItemUpdated => {
            for (list, _) in listings.lists_mut() {
                update_item(list, event)?;
            }
        }
        ChangeKind::ItemDeleted => {
            let id = require_item_id(event)?;
            for (list, _) in listings.lists_mut() {
                remove_item(list, id);
            }
        }
        ChangeKind::UserUpdated | ChangeKind::VerificationChanged => {
            for (list, _) in listings.lists_mut() {
                apply_owner_patch(list, event)?;
            }
        }
    }
    Ok(())
}

fn apply_to_search(search: &mut SearchPayload, event: &ChangeEvent) -> Result<()> {
    match event.kind {
        // Whether a new item matches the query is unknown here
        ChangeKind::ItemCreated => {}
        ChangeKind::ItemUpdated => update_item(&mut search.scripts, event)?,
        ChangeKind::ItemDeleted => {
            let removed = remove_item(&mut search.scripts, require_item_id(event)?);
            search.total = search.total.saturating_sub(removed as u64);
        }
        ChangeKind::UserUpdated | ChangeKind::VerificationChanged => {
            apply_owner_patch(&mut search.scripts, event)?
        }
    }
    Ok(())
}

fn require_item_id(event: &ChangeEvent) -> Result<&str> {
    event
        .item_id()
        .ok_or_else(|| CacheError::MalformedEvent(format!("{:?} without an item id", event.kind)))
}

// == Item Updated ==
/// Shallow-merges `event.data` over the first item with the event's id.
fn update_item(items: &mut [ItemSummary], event: &ChangeEvent) -> Result<()> {
    let id = require_item_id(event)?;
    if let Some(item) = items.iter_mut().find(|item| item.id == id) {
        let mut merged = match &event.data {
            Some(data) => item.merged(data)?,
            None => item.clone(),
        };
        merged.id = id.to_string();
        merged.updated_at = Some(event.timestamp);
        *item = merged;
    }
    Ok(())
}

// == Item Deleted ==
fn remove_item(items: &mut Vec<ItemSummary>, id: &str) -> usize {
    let before = items.len();
    items.retain(|item| item.id != id);
    before - items.len()
}

// == Owner Patch ==
/// Owner-scoped fields carried by user events.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerPatch {
    /// New username, for renames
    username: Option<String>,
    #[serde(alias = "verified", alias = "authorVerified")]
    is_verified: Option<bool>,
}

impl OwnerPatch {
    fn from_event(event: &ChangeEvent) -> Result<Self> {
        match &event.data {
            Some(data) => Ok(serde_json::from_value(data.clone())?),
            None => Ok(Self::default()),
        }
    }
}

/// Updates every item owned by `event.username`.
///
/// Both user event kinds carry the verification flag; only `user_updated`
/// may also rename the owner.
fn apply_owner_patch(items: &mut [ItemSummary], event: &ChangeEvent) -> Result<()> {
    let Some(username) = event.username.as_deref() else {
        return Ok(());
    };
    let patch = OwnerPatch::from_event(event)?;
    let rename = match event.kind {
        ChangeKind::UserUpdated => patch.username.as_deref(),
        _ => None,
    };

    for item in items.iter_mut().filter(|item| item.is_owned_by(username)) {
        if let Some(verified) = patch.is_verified {
            item.author_verified = Some(verified);
        }
        if let Some(new_name) = rename {
            item.author = Some(new_name.to_string());
        }
    }
    Ok(())
}
