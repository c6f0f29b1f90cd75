//! Session-scoped field value store for one in-flight message build.
//!
//! Holds the current value per field, tracks which fields were set
//! manually (manual fields are never overwritten by default generation),
//! and keeps the derived presence bitmaps in step with the value set.
//! One session owns one message; independent trials get a fresh session
//! or an explicit [`MessageSession::clear`]. Bitmaps cannot be assigned
//! through this store at all — [`crate::schema::FieldId`] has no bitmap
//! variant, so they stay derived by construction.

use crate::bitmap::Bitmaps;
use crate::schema::FieldId;
use std::collections::{BTreeMap, HashSet};

/// Sparse per-message state: values, manual-set tracking, bitmaps.
#[derive(Debug, Clone, Default)]
pub struct MessageSession {
    values: BTreeMap<FieldId, String>,
    manual: HashSet<FieldId>,
    bitmaps: Bitmaps,
}

impl MessageSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value for a field. `manual` marks the field as explicitly
    /// assigned, shielding it from default generation. The MTI is stored
    /// as an opaque string and never touches the bitmaps.
    pub fn set(&mut self, id: FieldId, value: impl Into<String>, manual: bool) {
        self.values.insert(id, value.into());
        if let FieldId::De(n) = id {
            self.bitmaps.mark_present(n);
        }
        if manual {
            self.manual.insert(id);
        }
    }

    pub fn get(&self, id: FieldId) -> Option<&str> {
        self.values.get(&id).map(String::as_str)
    }

    pub fn is_manual(&self, id: FieldId) -> bool {
        self.manual.contains(&id)
    }

    /// Drop a field's value and its manual marking, then re-derive the
    /// bitmaps from what is still populated.
    pub fn remove(&mut self, id: FieldId) {
        self.values.remove(&id);
        self.manual.remove(&id);
        self.rebuild_bitmaps();
    }

    /// All populated slots in ascending order, MTI first.
    pub fn populated(&self) -> impl Iterator<Item = (FieldId, &str)> {
        self.values.iter().map(|(id, v)| (*id, v.as_str()))
    }

    /// Populated data elements in ascending number order (MTI excluded).
    pub fn data_elements(&self) -> impl Iterator<Item = (u8, &str)> {
        self.values.iter().filter_map(|(id, v)| match id {
            FieldId::De(n) => Some((*n, v.as_str())),
            FieldId::Mti => None,
        })
    }

    pub fn bitmaps(&self) -> &Bitmaps {
        &self.bitmaps
    }

    /// Empty the session: values, bitmaps, and manual-set tracking. Used
    /// between independent trials so nothing leaks across.
    pub fn clear(&mut self) {
        self.values.clear();
        self.manual.clear();
        self.bitmaps.clear();
    }

    fn rebuild_bitmaps(&mut self) {
        self.bitmaps.clear();
        for id in self.values.keys() {
            if let FieldId::De(n) = id {
                self.bitmaps.mark_present(*n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_tracking_and_clear() {
        let mut session = MessageSession::new();
        session.set(FieldId::De(2), "4111111111111111", true);
        session.set(FieldId::De(3), "000000", false);
        assert!(session.is_manual(FieldId::De(2)));
        assert!(!session.is_manual(FieldId::De(3)));
        assert!(session.bitmaps().primary[1]);

        session.clear();
        assert_eq!(session.get(FieldId::De(2)), None);
        assert!(!session.is_manual(FieldId::De(2)));
        assert!(!session.bitmaps().primary[1]);
    }

    #[test]
    fn mti_is_opaque_and_ordered_first() {
        let mut session = MessageSession::new();
        session.set(FieldId::De(2), "123", false);
        session.set(FieldId::Mti, "0800", true);
        let order: Vec<FieldId> = session.populated().map(|(id, _)| id).collect();
        assert_eq!(order, vec![FieldId::Mti, FieldId::De(2)]);
        // MTI never shows up in the bitmaps.
        assert_eq!(session.bitmaps().primary.iter().filter(|b| **b).count(), 1);
    }

    #[test]
    fn remove_rederives_bitmaps() {
        let mut session = MessageSession::new();
        session.set(FieldId::De(1), "x", true);
        session.set(FieldId::De(70), "y", true);
        assert!(session.bitmaps().secondary[5]);

        session.remove(FieldId::De(70));
        assert!(!session.bitmaps().secondary[5]);
        // Field 1 is independently set, so primary bit 0 survives.
        assert!(session.bitmaps().primary[0]);

        session.remove(FieldId::De(1));
        assert!(!session.bitmaps().primary[0]);
    }
}
