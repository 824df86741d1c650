use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::{DownloadEvent, SlotId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSlot {
    pub id: SlotId,
    pub name: Option<String>,
    pub percent: u8,
}

/// Progress rows keyed by the slot id handed out at request time.
///
/// Owned by the single consumer of the event channel, so no lock is needed.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    slots: BTreeMap<SlotId, ProgressSlot>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_name_resolved(&mut self, slot: SlotId, name: String) {
        self.slots
            .entry(slot)
            .and_modify(|row| row.name = Some(name.clone()))
            .or_insert_with(|| ProgressSlot {
                id: slot,
                name: Some(name),
                percent: 0,
            });
    }

    /// Returns false when the slot has no row yet; the update is dropped.
    pub fn on_progress(&mut self, slot: SlotId, percent: u8) -> bool {
        match self.slots.get_mut(&slot) {
            Some(row) => {
                row.percent = percent.min(100);
                true
            }
            None => {
                warn!(%slot, percent, "progress for unknown slot ignored");
                false
            }
        }
    }

    /// Applies one event. Returns the name to add to the library, if any.
    pub fn apply(&mut self, event: DownloadEvent) -> Option<String> {
        match event {
            DownloadEvent::NameResolved { slot, name } => {
                self.on_name_resolved(slot, name);
                None
            }
            DownloadEvent::Progress { slot, percent } => {
                self.on_progress(slot, percent);
                None
            }
            DownloadEvent::Finished { name, .. } => (!name.is_empty()).then_some(name),
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&ProgressSlot> {
        self.slots.get(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = &ProgressSlot> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_keyed_by_slot_not_arrival_order() {
        let mut board = ProgressBoard::new();
        board.on_name_resolved(SlotId(3), "Third".to_string());
        board.on_name_resolved(SlotId(1), "First".to_string());

        assert!(board.on_progress(SlotId(1), 40));
        assert_eq!(board.get(SlotId(1)).unwrap().percent, 40);
        assert_eq!(board.get(SlotId(3)).unwrap().percent, 0);

        let ids: Vec<SlotId> = board.slots().map(|s| s.id).collect();
        assert_eq!(ids, vec![SlotId(1), SlotId(3)]);
    }

    #[test]
    fn test_progress_before_name_is_dropped() {
        let mut board = ProgressBoard::new();
        assert!(!board.on_progress(SlotId(0), 50));
        assert!(board.is_empty());
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut board = ProgressBoard::new();
        board.on_name_resolved(SlotId(0), "Song A".to_string());
        board.on_progress(SlotId(0), 250);
        assert_eq!(board.get(SlotId(0)).unwrap().percent, 100);
    }

    #[test]
    fn test_apply_reports_finished_names() {
        let mut board = ProgressBoard::new();
        let slot = SlotId(0);

        let named = DownloadEvent::NameResolved {
            slot,
            name: "Song A".to_string(),
        };
        let done = DownloadEvent::Finished {
            slot,
            name: "Song A".to_string(),
        };
        let failed = DownloadEvent::Finished {
            slot: SlotId(1),
            name: String::new(),
        };

        assert_eq!(board.apply(named), None);
        assert_eq!(board.apply(DownloadEvent::Progress { slot, percent: 100 }), None);
        assert_eq!(board.apply(done), Some("Song A".to_string()));
        assert_eq!(board.apply(failed), None);
        assert_eq!(board.len(), 1);
        assert_eq!(board.get(slot).unwrap().percent, 100);
    }
}
