//! The active selection: nothing, one object, or several.

use cv_core::ObjectId;
use smallvec::SmallVec;

pub type SelectedIds = SmallVec<[ObjectId; 4]>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Single(ObjectId),
    /// Two or more objects, in the order they were picked.
    Multi(SelectedIds),
}

impl Selection {
    /// Build a selection from ids, dropping duplicates.
    pub fn from_ids(ids: impl IntoIterator<Item = ObjectId>) -> Self {
        let mut unique = SelectedIds::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        match unique.len() {
            0 => Selection::None,
            1 => Selection::Single(unique[0]),
            _ => Selection::Multi(unique),
        }
    }

    pub fn ids(&self) -> SelectedIds {
        match self {
            Selection::None => SelectedIds::new(),
            Selection::Single(id) => smallvec::smallvec![*id],
            Selection::Multi(ids) => ids.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Selection::None => 0,
            Selection::Single(_) => 1,
            Selection::Multi(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        match self {
            Selection::None => false,
            Selection::Single(s) => *s == id,
            Selection::Multi(ids) => ids.contains(&id),
        }
    }

    pub fn single(&self) -> Option<ObjectId> {
        match self {
            Selection::Single(id) => Some(*id),
            _ => None,
        }
    }

    /// Add `id` if absent, remove it if present (shift-click).
    #[must_use]
    pub fn toggled(&self, id: ObjectId) -> Self {
        let mut ids = self.ids();
        if let Some(pos) = ids.iter().position(|s| *s == id) {
            ids.remove(pos);
        } else {
            ids.push(id);
        }
        Self::from_ids(ids)
    }

    #[must_use]
    pub fn retained(&self, keep: impl Fn(ObjectId) -> bool) -> Self {
        Self::from_ids(self.ids().into_iter().filter(|id| keep(*id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ids_picks_variant() {
        let a = ObjectId::intern("sel_a");
        let b = ObjectId::intern("sel_b");
        assert_eq!(Selection::from_ids([]), Selection::None);
        assert_eq!(Selection::from_ids([a, a]), Selection::Single(a));
        assert_eq!(Selection::from_ids([a, b]).len(), 2);
    }

    #[test]
    fn toggling_collapses_back_to_single() {
        let a = ObjectId::intern("sel_c");
        let b = ObjectId::intern("sel_d");
        let both = Selection::Single(a).toggled(b);
        assert!(both.contains(a) && both.contains(b));
        assert_eq!(both.toggled(a), Selection::Single(b));
    }
}
