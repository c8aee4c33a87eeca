use crate::model::ChannelRecord;
use crate::processing::playlist_store::VisibleChannel;
use std::io::Write;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// 1-based number in the rendered list, used to pick the entry.
    pub number: usize,
    pub label: String,
    pub logo: Option<String>,
    pub record: Arc<ChannelRecord>,
}

/// Keeps the entries of the last render. Every render starts from an empty list.
#[derive(Debug, Default)]
pub struct ListRenderer {
    entries: Vec<ListEntry>,
}

impl ListRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, visible: Vec<VisibleChannel>) {
        self.entries.clear();
        self.entries.extend(visible.into_iter().enumerate().map(|(index, channel)| ListEntry {
            number: index + 1,
            label: channel.record.label(channel.position),
            logo: channel.record.logo.clone(),
            record: channel.record,
        }));
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    /// The record behind entry `number`, handed to the playback controller.
    pub fn activate(&self, number: usize) -> Option<Arc<ChannelRecord>> {
        number.checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .map(|entry| Arc::clone(&entry.record))
    }

    pub fn write_to<W: Write>(&self, out: &mut W, show_logos: bool) -> std::io::Result<()> {
        let width = self.entries.len().to_string().len();
        for entry in &self.entries {
            match (&entry.logo, show_logos) {
                (Some(logo), true) => writeln!(out, "{:>width$}. {}  [{logo}]", entry.number, entry.label)?,
                _ => writeln!(out, "{:>width$}. {}", entry.number, entry.label)?,
            }
        }
        Ok(())
    }
}
