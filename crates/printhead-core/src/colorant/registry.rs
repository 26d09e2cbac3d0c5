//! Ordered colorant chain with name and position lookup.
//!
//! Storage is a slot arena. Each occupied slot carries `prev`/`next` links
//! so the chain can be repaired in O(1) when a colorant is removed, while
//! the cached length keeps [`ColorantRegistry::len`] constant-time.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use super::names::{PROCESS_COLORANTS, lookup_colorant};
use super::{Colorant, ColorantId};
use crate::error::ColorantError;

#[derive(Debug, Clone)]
struct Node {
    colorant: Colorant,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Owner of an ordered, doubly linked list of colorants.
///
/// Iteration order is insertion order. Duplicate names are permitted; name
/// lookups resolve to the first match from the head.
#[derive(Debug, Clone, Default)]
pub struct ColorantRegistry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl ColorantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding Cyan, Magenta, Yellow and Black in that order.
    pub fn with_process_colorants() -> Self {
        let mut registry = Self::new();
        for name in PROCESS_COLORANTS {
            if let Err(e) = registry.add_named(name) {
                tracing::warn!("process colorant skipped: {e}");
            }
        }
        registry
    }

    /// Append a colorant with an explicit swatch. Never fails and does not
    /// check for an existing colorant of the same name.
    pub fn add(&mut self, name: impl Into<String>, red: u8, green: u8, blue: u8) -> ColorantId {
        self.push(Colorant::new(name.into(), red, green, blue))
    }

    /// Append a colorant whose swatch comes from the built-in name table.
    pub fn add_named(&mut self, name: &str) -> Result<ColorantId, ColorantError> {
        let [red, green, blue] =
            lookup_colorant(name).ok_or_else(|| ColorantError::NameNotRecognized(name.to_string()))?;
        Ok(self.add(name, red, green, blue))
    }

    /// Unlink a colorant and hand it back. Returns `None` for a stale handle.
    pub fn remove(&mut self, id: ColorantId) -> Option<Colorant> {
        let node = self.slot_mut(id)?.node.take()?;

        match node.prev {
            Some(prev) => self.link_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.link_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        let slot = &mut self.slots[id.slot];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot);
        self.len -= 1;

        tracing::trace!("removed colorant {}", node.colorant.name());
        Some(node.colorant)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the first colorant named exactly `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.iter().position(|colorant| colorant.name() == name)
    }

    pub fn first(&self) -> Option<ColorantId> {
        self.head.map(|slot| self.id_of(slot))
    }

    pub fn last(&self) -> Option<ColorantId> {
        self.tail.map(|slot| self.id_of(slot))
    }

    /// The colorant after `id`, or `None` at the end of the chain.
    pub fn next(&self, id: ColorantId) -> Option<ColorantId> {
        let next = self.node(id)?.next?;
        Some(self.id_of(next))
    }

    /// The colorant before `id`, or `None` at the head of the chain.
    pub fn prev(&self, id: ColorantId) -> Option<ColorantId> {
        let prev = self.node(id)?.prev?;
        Some(self.id_of(prev))
    }

    pub fn get(&self, id: ColorantId) -> Option<&Colorant> {
        self.node(id).map(|node| &node.colorant)
    }

    pub fn get_mut(&mut self, id: ColorantId) -> Option<&mut Colorant> {
        self.slot_mut(id)?
            .node
            .as_mut()
            .map(|node| &mut node.colorant)
    }

    /// Handle of the colorant at `index`, counting from the head.
    pub fn id_at(&self, index: usize) -> Option<ColorantId> {
        let mut cursor = self.head;
        for _ in 0..index {
            cursor = self.link(cursor?).next;
        }
        cursor.map(|slot| self.id_of(slot))
    }

    /// Colorant at `index`, counting from the head.
    pub fn colorant_at(&self, index: usize) -> Result<&Colorant, ColorantError> {
        self.iter()
            .nth(index)
            .ok_or(ColorantError::IndexOutOfRange {
                index,
                len: self.len,
            })
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            registry: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(Colorant::name).collect()
    }

    pub fn to_json(&self) -> Result<String, ColorantError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ColorantError> {
        Ok(serde_json::from_str(json)?)
    }

    fn push(&mut self, colorant: Colorant) -> ColorantId {
        let node = Node {
            colorant,
            prev: self.tail,
            next: None,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.link_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;

        self.id_of(slot)
    }

    fn id_of(&self, slot: usize) -> ColorantId {
        ColorantId {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn node(&self, id: ColorantId) -> Option<&Node> {
        let slot = self.slots.get(id.slot)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn slot_mut(&mut self, id: ColorantId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.slot)
            .filter(|slot| slot.generation == id.generation)
    }

    // Linked slots are always occupied.
    fn link(&self, slot: usize) -> &Node {
        match &self.slots[slot].node {
            Some(node) => node,
            None => unreachable!("colorant chain links to an empty slot"),
        }
    }

    fn link_mut(&mut self, slot: usize) -> &mut Node {
        match &mut self.slots[slot].node {
            Some(node) => node,
            None => unreachable!("colorant chain links to an empty slot"),
        }
    }
}

/// Head-to-tail iterator over a registry's colorants.
pub struct Iter<'a> {
    registry: &'a ColorantRegistry,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Colorant;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.registry.link(slot);
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.colorant)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a ColorantRegistry {
    type Item = &'a Colorant;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for ColorantRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ColorantRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let colorants = Vec::<Colorant>::deserialize(deserializer)?;
        let mut registry = Self::new();
        for colorant in colorants {
            registry.push(colorant);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> (ColorantRegistry, [ColorantId; 3]) {
        let mut registry = ColorantRegistry::new();
        let a = registry.add("A", 1, 2, 3);
        let b = registry.add("B", 4, 5, 6);
        let c = registry.add("C", 7, 8, 9);
        (registry, [a, b, c])
    }

    #[test]
    fn explicit_rgb_is_stored_verbatim() {
        let mut registry = ColorantRegistry::new();
        let id = registry.add("Spot 1", 12, 200, 255);
        let colorant = registry.get(id).unwrap();
        assert_eq!(colorant.name(), "Spot 1");
        assert_eq!(colorant.rgb(), [12, 200, 255]);
    }

    #[test]
    fn boundary_names_and_channels_are_stored_verbatim() {
        let names = ["", "Ünïcödé Grün", "Spot"];
        let channels = [[0, 0, 0], [255, 255, 255], [0, 255, 0], [255, 0, 255]];

        let mut registry = ColorantRegistry::new();
        let mut added = Vec::new();
        for name in names {
            for rgb in channels {
                added.push((registry.add(name, rgb[0], rgb[1], rgb[2]), name, rgb));
            }
        }

        assert_eq!(registry.len(), names.len() * channels.len());
        for (id, name, rgb) in added {
            let colorant = registry.get(id).unwrap();
            assert_eq!(colorant.name(), name);
            assert_eq!(colorant.rgb(), rgb);
        }
        assert_eq!(registry.index_of("ünïcödé grün"), None);
        assert_eq!(registry.index_of("Ünïcödé Grün"), Some(channels.len()));
    }

    #[test]
    fn named_colorant_takes_table_swatch() {
        let mut registry = ColorantRegistry::new();
        let id = registry.add_named("Magenta").unwrap();
        assert_eq!(registry.get(id).unwrap().rgb(), [255, 0, 255]);
    }

    #[test]
    fn named_colorant_keeps_caller_spelling() {
        let mut registry = ColorantRegistry::new();
        let id = registry.add_named("yellow").unwrap();
        assert_eq!(registry.get(id).unwrap().name(), "yellow");
        assert_eq!(registry.get(id).unwrap().rgb(), [255, 255, 0]);
    }

    #[test]
    fn unknown_name_is_rejected_and_not_linked() {
        let mut registry = ColorantRegistry::new();
        match registry.add_named("Unobtainium") {
            Err(ColorantError::NameNotRecognized(name)) => assert_eq!(name, "Unobtainium"),
            other => panic!("expected NameNotRecognized, got {other:?}"),
        }
        assert!(registry.is_empty());
        assert!(registry.first().is_none());
    }

    #[test]
    fn index_of_reports_insertion_position() {
        let (registry, _) = abc();
        assert_eq!(registry.index_of("A"), Some(0));
        assert_eq!(registry.index_of("B"), Some(1));
        assert_eq!(registry.index_of("C"), Some(2));
        assert_eq!(registry.index_of("D"), None);
    }

    #[test]
    fn duplicate_names_resolve_to_first_match() {
        let mut registry = ColorantRegistry::new();
        registry.add("Spot", 1, 1, 1);
        registry.add("Other", 2, 2, 2);
        registry.add("Spot", 3, 3, 3);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.index_of("Spot"), Some(0));
    }

    #[test]
    fn index_of_is_case_sensitive() {
        let mut registry = ColorantRegistry::new();
        registry.add_named("Cyan").unwrap();
        assert_eq!(registry.index_of("cyan"), None);
    }

    #[test]
    fn walking_forward_visits_insertion_order() {
        let (registry, ids) = abc();
        let mut visited = Vec::new();
        let mut cursor = registry.first();
        while let Some(id) = cursor {
            visited.push(id);
            cursor = registry.next(id);
        }
        assert_eq!(visited, ids);
    }

    #[test]
    fn walking_backward_stops_at_head() {
        let (registry, [a, b, c]) = abc();
        assert_eq!(registry.prev(c), Some(b));
        assert_eq!(registry.prev(b), Some(a));
        assert_eq!(registry.prev(a), None);
        assert_eq!(registry.next(c), None);
    }

    #[test]
    fn removing_middle_repairs_links() {
        let (mut registry, [a, b, c]) = abc();
        let removed = registry.remove(b).unwrap();
        assert_eq!(removed.name(), "B");
        assert_eq!(registry.names(), ["A", "C"]);
        assert_eq!(registry.next(a), Some(c));
        assert_eq!(registry.prev(c), Some(a));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn removing_head_and_tail_moves_ends() {
        let (mut registry, [a, b, c]) = abc();
        registry.remove(a);
        assert_eq!(registry.first(), Some(b));
        assert_eq!(registry.prev(b), None);

        registry.remove(c);
        assert_eq!(registry.last(), Some(b));
        assert_eq!(registry.next(b), None);

        registry.remove(b);
        assert!(registry.is_empty());
        assert_eq!(registry.first(), None);
        assert_eq!(registry.last(), None);
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let (mut registry, [_, b, _]) = abc();
        registry.remove(b);
        let d = registry.add("D", 0, 0, 0);
        assert_eq!(d.slot, b.slot);
        assert!(registry.get(b).is_none());
        assert!(registry.next(b).is_none());
        assert!(registry.remove(b).is_none());
        assert_eq!(registry.names(), ["A", "C", "D"]);
    }

    #[test]
    fn colorant_at_out_of_range_is_an_error() {
        let (registry, _) = abc();
        assert_eq!(registry.colorant_at(2).unwrap().name(), "C");
        match registry.colorant_at(3) {
            Err(ColorantError::IndexOutOfRange { index, len }) => {
                assert_eq!((index, len), (3, 3));
            }
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn id_at_matches_walk() {
        let (registry, [a, _, c]) = abc();
        assert_eq!(registry.id_at(0), Some(a));
        assert_eq!(registry.id_at(2), Some(c));
        assert_eq!(registry.id_at(3), None);
    }

    #[test]
    fn get_mut_edits_swatch() {
        let (mut registry, [a, ..]) = abc();
        registry.get_mut(a).unwrap().green = 99;
        assert_eq!(registry.colorant_at(0).unwrap().rgb(), [1, 99, 3]);
    }

    #[test]
    fn process_registry_is_cmyk() {
        let registry = ColorantRegistry::with_process_colorants();
        assert_eq!(registry.names(), PROCESS_COLORANTS);
        assert_eq!(registry.iter().len(), 4);
    }
}
