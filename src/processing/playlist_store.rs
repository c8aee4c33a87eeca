use crate::model::{ChannelRecord, PlaylistState};
use std::sync::Arc;

/// A channel that passed the filter, with its 1-based position in the loaded playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleChannel {
    pub position: usize,
    pub record: Arc<ChannelRecord>,
}

/// Holds the loaded playlist and the search filter.
#[derive(Debug, Default)]
pub struct PlaylistStore {
    state: PlaylistState,
    filter: String,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the playlist. The filter is kept.
    pub fn set_playlist(&mut self, state: PlaylistState) {
        self.state = state;
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.trim().to_lowercase();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn billed_message(&self) -> Option<&str> {
        self.state.billed_message.as_deref()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Channels matching the filter in playlist order.
    ///
    /// Only the real name is matched, channels without a name never pass a
    /// non empty filter.
    pub fn visible_items(&self) -> Vec<VisibleChannel> {
        self.state.items.iter()
            .enumerate()
            .filter(|(_, record)| self.filter.is_empty()
                || record.name.as_ref().is_some_and(|name| name.to_lowercase().contains(&self.filter)))
            .map(|(index, record)| VisibleChannel { position: index + 1, record: Arc::clone(record) })
            .collect()
    }
}
