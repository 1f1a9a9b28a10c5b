//! Flag toggle requests and how their results land in local state.
//!
//! A toggle is a request/response pair. [`begin`] registers the request (and
//! flips the flag right away in optimistic mode), the backend call runs
//! without holding the store, and [`settle`] applies the confirmed value or
//! rolls back. [`toggle_flag`] chains the three for callers that do not need
//! to interleave other work.

use tracing::{debug, warn};

use crate::api::{ApiError, ListingsApi};
use crate::models::Flag;
use crate::notify::{Notification, Notifier};
use crate::store::{ListingStore, ToggleTicket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleMode {
    /// Patch local state only once the backend confirms.
    #[default]
    Confirmed,
    /// Flip immediately, revert if the request fails.
    Optimistic,
}

/// What a successful discard does to the displayed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscardPolicy {
    /// Favorites-style screens keep discarded items visible.
    #[default]
    Keep,
    /// List screens drop the item once it is discarded.
    RemoveFromList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleOptions {
    pub mode: ToggleMode,
    pub discard: DiscardPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The backend confirmed `value` and local state now matches it.
    Applied { value: bool },
    /// The request failed; local state is as it was before the toggle.
    Failed { reason: String },
    /// A newer toggle on the same listing and flag owns the local state.
    Superseded,
    /// The id is not in the store.
    NotLoaded,
}

/// Register a toggle and, in optimistic mode, flip the flag locally.
pub fn begin(
    store: &mut ListingStore,
    id: &str,
    flag: Flag,
    mode: ToggleMode,
) -> Option<ToggleTicket> {
    let ticket = store.begin_toggle(id, flag)?;
    if mode == ToggleMode::Optimistic {
        store.set_flag(id, flag, !ticket.previous);
    }
    Some(ticket)
}

/// Apply the backend's answer for `ticket`.
pub fn settle(
    store: &mut ListingStore,
    ticket: &ToggleTicket,
    result: Result<bool, ApiError>,
    options: ToggleOptions,
    notifier: &dyn Notifier,
) -> ToggleOutcome {
    match result {
        Ok(value) => {
            if !store.finish_toggle(ticket, value) {
                debug!(id = %ticket.id, flag = %ticket.flag, "Toggle response superseded");
                return ToggleOutcome::Superseded;
            }
            if ticket.flag == Flag::Discarded
                && value
                && options.discard == DiscardPolicy::RemoveFromList
            {
                store.remove(&ticket.id);
            }
            debug!(id = %ticket.id, flag = %ticket.flag, value, "Toggle applied");
            ToggleOutcome::Applied { value }
        }
        Err(err) => {
            warn!(id = %ticket.id, flag = %ticket.flag, error = %err, "Toggle failed");
            notifier.notify(Notification::error(format!(
                "Could not update {}: {err}",
                ticket.flag
            )));

            // Restores the optimistic flip; a no-op in confirmed mode.
            if !store.finish_toggle(ticket, ticket.previous) {
                return ToggleOutcome::Superseded;
            }
            ToggleOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

/// Toggle `flag` on listing `id` end to end.
pub async fn toggle_flag(
    api: &dyn ListingsApi,
    store: &mut ListingStore,
    id: &str,
    flag: Flag,
    options: ToggleOptions,
    notifier: &dyn Notifier,
) -> ToggleOutcome {
    let Some(ticket) = begin(store, id, flag, options.mode) else {
        return ToggleOutcome::NotLoaded;
    };
    let result = api.toggle(id, flag).await;
    settle(store, &ticket, result, options, notifier)
}
