//! Subscription bookkeeping for the Noren feed.
//!
//! A key is pending from the moment its subscribe frame is queued until the matching
//! acknowledgement arrives, then confirmed. Unsubscribing removes it. On reconnect every key
//! goes back to pending and is replayed.

use std::{fmt, sync::Arc};

use dashmap::{mapref::entry::Entry, DashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NorenChannel {
    /// Touchline (`t`), acknowledged by `tk`.
    Touchline,
    /// Market depth (`d`), acknowledged by `dk`.
    Depth,
    /// Order updates (`o`) for an account, acknowledged by `ok`.
    Orders,
}

impl fmt::Display for NorenChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NorenChannel::Touchline => write!(f, "touchline"),
            NorenChannel::Depth => write!(f, "depth"),
            NorenChannel::Orders => write!(f, "orders"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Pending,
    Confirmed,
}

/// Shared subscription table, cloned into the feed task.
#[derive(Debug, Clone, Default)]
pub struct NorenSubscriptions {
    inner: Arc<DashMap<(NorenChannel, String), SubscriptionState>>,
}

impl NorenSubscriptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` pending. Returns `false` if it was already tracked.
    pub fn mark_subscribe(&self, channel: NorenChannel, key: &str) -> bool {
        match self.inner.entry((channel, key.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(SubscriptionState::Pending);
                true
            }
        }
    }

    /// Confirms a pending key. Acks for keys that are no longer tracked are ignored.
    pub fn confirm(&self, channel: NorenChannel, key: &str) {
        if let Some(mut state) = self.inner.get_mut(&(channel, key.to_string())) {
            *state = SubscriptionState::Confirmed;
        }
    }

    /// Confirms every key on `channel`. Used for acks that do not echo the key.
    pub fn confirm_channel(&self, channel: NorenChannel) {
        for mut entry in self.inner.iter_mut() {
            if entry.key().0 == channel {
                *entry.value_mut() = SubscriptionState::Confirmed;
            }
        }
    }

    /// Keys currently tracked on `channel`, sorted.
    #[must_use]
    pub fn keys(&self, channel: NorenChannel) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .iter()
            .filter(|entry| entry.key().0 == channel)
            .map(|entry| entry.key().1.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Removes `key`. Returns `false` if it was not tracked.
    pub fn mark_unsubscribe(&self, channel: NorenChannel, key: &str) -> bool {
        self.inner.remove(&(channel, key.to_string())).is_some()
    }

    #[must_use]
    pub fn state(&self, channel: NorenChannel, key: &str) -> Option<SubscriptionState> {
        self.inner
            .get(&(channel, key.to_string()))
            .map(|state| *state)
    }

    /// Moves every key back to pending and returns them grouped by channel, sorted.
    pub fn mark_all_pending(&self) -> Vec<(NorenChannel, Vec<String>)> {
        let mut keys: Vec<(NorenChannel, String)> = Vec::with_capacity(self.inner.len());
        for mut entry in self.inner.iter_mut() {
            *entry.value_mut() = SubscriptionState::Pending;
            keys.push(entry.key().clone());
        }
        keys.sort();

        let mut grouped: Vec<(NorenChannel, Vec<String>)> = Vec::new();
        for (channel, key) in keys {
            if let Some((last, group)) = grouped.last_mut() {
                if *last == channel {
                    group.push(key);
                    continue;
                }
            }
            grouped.push((channel, vec![key]));
        }
        grouped
    }

    #[must_use]
    pub fn confirmed_count(&self) -> usize {
        self.count(SubscriptionState::Confirmed)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.count(SubscriptionState::Pending)
    }

    fn count(&self, wanted: SubscriptionState) -> usize {
        self.inner.iter().filter(|entry| *entry.value() == wanted).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_subscription_lifecycle() {
        let subs = NorenSubscriptions::new();

        assert!(subs.mark_subscribe(NorenChannel::Touchline, "NSE|22"));
        assert_eq!(
            subs.state(NorenChannel::Touchline, "NSE|22"),
            Some(SubscriptionState::Pending)
        );
        assert_eq!(subs.confirmed_count(), 0);

        subs.confirm(NorenChannel::Touchline, "NSE|22");
        assert_eq!(
            subs.state(NorenChannel::Touchline, "NSE|22"),
            Some(SubscriptionState::Confirmed)
        );
        assert_eq!(subs.confirmed_count(), 1);

        assert!(subs.mark_unsubscribe(NorenChannel::Touchline, "NSE|22"));
        assert_eq!(subs.state(NorenChannel::Touchline, "NSE|22"), None);
        assert!(subs.is_empty());
    }

    #[rstest]
    fn test_duplicate_subscribe_is_idempotent() {
        let subs = NorenSubscriptions::new();
        assert!(subs.mark_subscribe(NorenChannel::Depth, "NSE|22"));
        subs.confirm(NorenChannel::Depth, "NSE|22");
        assert!(!subs.mark_subscribe(NorenChannel::Depth, "NSE|22"));
        assert_eq!(
            subs.state(NorenChannel::Depth, "NSE|22"),
            Some(SubscriptionState::Confirmed)
        );
    }

    #[rstest]
    fn test_late_ack_after_unsubscribe_is_ignored() {
        let subs = NorenSubscriptions::new();
        subs.mark_subscribe(NorenChannel::Touchline, "NSE|22");
        subs.mark_unsubscribe(NorenChannel::Touchline, "NSE|22");
        subs.confirm(NorenChannel::Touchline, "NSE|22");
        assert!(subs.is_empty());
    }

    #[rstest]
    fn test_same_key_on_different_channels() {
        let subs = NorenSubscriptions::new();
        subs.mark_subscribe(NorenChannel::Touchline, "NSE|22");
        subs.mark_subscribe(NorenChannel::Depth, "NSE|22");
        subs.confirm(NorenChannel::Depth, "NSE|22");

        assert_eq!(subs.len(), 2);
        assert_eq!(subs.pending_count(), 1);
        assert_eq!(subs.confirmed_count(), 1);
    }

    #[rstest]
    fn test_confirm_channel_only_touches_that_channel() {
        let subs = NorenSubscriptions::new();
        subs.mark_subscribe(NorenChannel::Orders, "ACC1");
        subs.mark_subscribe(NorenChannel::Touchline, "NSE|22");
        subs.confirm_channel(NorenChannel::Orders);

        assert_eq!(
            subs.state(NorenChannel::Orders, "ACC1"),
            Some(SubscriptionState::Confirmed)
        );
        assert_eq!(
            subs.state(NorenChannel::Touchline, "NSE|22"),
            Some(SubscriptionState::Pending)
        );
        assert_eq!(subs.keys(NorenChannel::Orders), vec!["ACC1".to_string()]);
    }

    #[rstest]
    fn test_mark_all_pending_groups_by_channel() {
        let subs = NorenSubscriptions::new();
        subs.mark_subscribe(NorenChannel::Touchline, "NSE|22");
        subs.mark_subscribe(NorenChannel::Touchline, "NSE|2885");
        subs.mark_subscribe(NorenChannel::Orders, "ACC1");
        subs.confirm(NorenChannel::Touchline, "NSE|22");
        subs.confirm(NorenChannel::Orders, "ACC1");

        let grouped = subs.mark_all_pending();
        assert_eq!(
            grouped,
            vec![
                (
                    NorenChannel::Touchline,
                    vec!["NSE|22".to_string(), "NSE|2885".to_string()]
                ),
                (NorenChannel::Orders, vec!["ACC1".to_string()]),
            ]
        );
        assert_eq!(subs.confirmed_count(), 0);
        assert_eq!(subs.pending_count(), 3);
    }
}
