use bitflags::bitflags;
use fnv::{FnvHashMap, FnvHashSet};
use num_traits::FromPrimitive;
use spirv_headers as spv;

use crate::*;

// Structs may declare at most 16383 members.
const MAX_MEMBERS: u32 = 0x3fff;

/// A set of small integers, optimized for values below 64.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bitset {
    lower: u64,
    higher: FnvHashSet<u32>,
}

impl Bitset {
    pub fn get(&self, bit: u32) -> bool {
        if bit < 64 {
            self.lower & (1 << bit) != 0
        } else {
            self.higher.contains(&bit)
        }
    }

    pub fn set(&mut self, bit: u32) {
        if bit < 64 {
            self.lower |= 1 << bit;
        } else {
            self.higher.insert(bit);
        }
    }

    pub fn clear(&mut self, bit: u32) {
        if bit < 64 {
            self.lower &= !(1 << bit);
        } else {
            self.higher.remove(&bit);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lower == 0 && self.higher.is_empty()
    }

    /// Set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let lower = self.lower;
        let mut higher: Vec<u32> = self.higher.iter().copied().collect();
        higher.sort_unstable();
        (0..64).filter(move |&bit| lower & (1 << bit) != 0).chain(higher)
    }
}

/// Decorations applied to an id or a struct member. Keys are raw
/// `spv::Decoration` values so that unknown enumerants can be copied
/// through groups unchanged.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Decorations {
    flags: Bitset,
    values: FnvHashMap<u32, u32>,
    strings: FnvHashMap<u32, String>,
    word_offsets: FnvHashMap<u32, usize>,
}

impl Decorations {
    pub fn has(&self, decoration: spv::Decoration) -> bool {
        self.flags.get(decoration as u32)
    }

    pub fn flags(&self) -> &Bitset {
        &self.flags
    }

    /// Decorations present, in enumerant order.
    pub fn iter(&self) -> impl Iterator<Item = spv::Decoration> + '_ {
        self.flags.iter().filter_map(spv::Decoration::from_u32)
    }

    pub fn value(&self, decoration: spv::Decoration) -> Option<u32> {
        self.values.get(&(decoration as u32)).copied()
    }

    pub fn string(&self, decoration: spv::Decoration) -> Option<&str> {
        Some(self.strings.get(&(decoration as u32))?.as_str())
    }

    /// Word offset, in the module's buffer, of the decoration's literal.
    pub fn word_offset(&self, decoration: spv::Decoration) -> Option<usize> {
        self.word_offsets.get(&(decoration as u32)).copied()
    }

    pub fn set_flag(&mut self, decoration: spv::Decoration) {
        self.flags.set(decoration as u32);
    }

    pub fn set_value(&mut self, decoration: spv::Decoration, value: u32) {
        self.set_flag(decoration);
        self.values.insert(decoration as u32, value);
    }

    pub fn set_string(&mut self, decoration: spv::Decoration, value: String) {
        self.set_flag(decoration);
        self.strings.insert(decoration as u32, value);
    }

    pub fn set_word_offset(&mut self, decoration: spv::Decoration, offset: usize)
    {
        self.word_offsets.insert(decoration as u32, offset);
    }

    pub fn unset(&mut self, decoration: spv::Decoration) {
        let key = decoration as u32;
        self.flags.clear(key);
        self.values.remove(&key);
        self.strings.remove(&key);
        self.word_offsets.remove(&key);
    }

    /// Applies every decoration in `other`, and nothing else, to `self`.
    pub fn copy_from(&mut self, other: &Decorations) {
        for key in other.flags.iter() {
            self.flags.set(key);
            if let Some(string) = other.strings.get(&key) {
                self.strings.insert(key, string.clone());
            } else if let Some(&value) = other.values.get(&key) {
                self.values.insert(key, value);
            }
            if let Some(&offset) = other.word_offsets.get(&key) {
                self.word_offsets.insert(key, offset);
            }
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemberMeta {
    pub name: String,
    pub decoration: Decorations,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Meta {
    /// `OpName`; empty if the module carries no debug name.
    pub name: String,
    pub decoration: Decorations,
    pub members: Vec<MemberMeta>,
}

impl Meta {
    pub fn member(&self, index: u32) -> Option<&MemberMeta> {
        self.members.get(index as usize)
    }

    pub fn member_mut(&mut self, index: u32) -> Result<&mut MemberMeta> {
        if index > MAX_MEMBERS {
            return Err(ErrorKind::MemberOutOfRange(index).into());
        }
        let index = index as usize;
        if index >= self.members.len() {
            self.members.resize_with(index + 1, Default::default);
        }
        Ok(&mut self.members[index])
    }
}

/// Names and decorations, indexed by id alongside the `IdTable`. Entries
/// are allocated on first write.
#[derive(Clone, Debug, Default)]
pub struct MetaTable {
    bound: u32,
    entries: Vec<Option<Box<Meta>>>,
}

impl MetaTable {
    pub fn with_bound(bound: u32) -> Self {
        MetaTable { bound, entries: Vec::new() }
    }

    pub(crate) fn grow(&mut self, bound: u32) {
        self.bound = self.bound.max(bound);
    }

    pub fn get(&self, id: Id) -> Option<&Meta> {
        if id == 0 { return None; }
        self.entries.get(id as usize)?.as_deref()
    }

    pub fn get_mut(&mut self, id: Id) -> Result<&mut Meta> {
        if id == 0 || id >= self.bound {
            return Err(ErrorKind::UnknownId(id).into());
        }
        let index = id as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        let meta = self.entries[index].get_or_insert_with(Default::default);
        Ok(&mut **meta)
    }

    /// The debug name of `id`, or `""`.
    pub fn name(&self, id: Id) -> &str {
        self.get(id).map_or("", |meta| &meta.name)
    }

    pub fn member_name(&self, id: Id, index: u32) -> &str {
        self.get(id).and_then(|meta| meta.member(index))
            .map_or("", |member| &member.name)
    }

    pub fn decoration(&self, id: Id) -> Option<&Decorations> {
        Some(&self.get(id)?.decoration)
    }

    pub fn member_decoration(&self, id: Id, index: u32) -> Option<&Decorations> {
        Some(&self.get(id)?.member(index)?.decoration)
    }
}

bitflags! {
    /// Structured control flow roles of a block, set by merge instructions.
    #[derive(Default)]
    pub struct BlockMeta: u32 {
        const LOOP_HEADER = 0x1;
        const CONTINUE = 0x2;
        const LOOP_MERGE = 0x4;
        const SELECTION_MERGE = 0x8;
        const MULTISELECT_MERGE = 0x10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitset() {
        let mut bits = Bitset::default();
        assert!(bits.is_empty());
        bits.set(3);
        bits.set(5000);
        bits.set(70);
        bits.set(0);
        assert!(bits.get(3) && bits.get(5000) && bits.get(70));
        assert!(!bits.get(4));
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 3, 70, 5000]);
        bits.clear(5000);
        bits.clear(3);
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 70]);
    }

    #[test]
    fn copy_only_present_decorations() {
        let mut group = Decorations::default();
        group.set_value(spv::Decoration::Binding, 3);
        group.set_word_offset(spv::Decoration::Binding, 42);
        group.set_flag(spv::Decoration::NonWritable);

        let mut target = Decorations::default();
        target.set_value(spv::Decoration::Location, 1);
        target.copy_from(&group);

        assert_eq!(target.iter().collect::<Vec<_>>(), vec![
            spv::Decoration::NonWritable,
            spv::Decoration::Location,
            spv::Decoration::Binding,
        ]);
        assert_eq!(target.value(spv::Decoration::Binding), Some(3));
        assert_eq!(target.word_offset(spv::Decoration::Binding), Some(42));
        assert_eq!(target.word_offset(spv::Decoration::NonWritable), None);

        target.unset(spv::Decoration::Binding);
        assert!(!target.has(spv::Decoration::Binding));
        assert_eq!(target.value(spv::Decoration::Binding), None);
    }

    #[test]
    fn table() {
        let mut table = MetaTable::with_bound(4);
        table.get_mut(2).unwrap().name = "main".to_owned();
        table.get_mut(3).unwrap().member_mut(2).unwrap().name = "z".to_owned();
        assert_eq!(table.name(2), "main");
        assert_eq!(table.name(1), "");
        assert_eq!(table.member_name(3, 2), "z");
        assert_eq!(table.get(3).unwrap().members.len(), 3);

        assert_eq!(table.get_mut(4).unwrap_err().kind(), ErrorKind::UnknownId(4));
        assert_eq!(table.get_mut(0).unwrap_err().kind(), ErrorKind::UnknownId(0));
        let err = table.get_mut(1).unwrap().member_mut(u32::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MemberOutOfRange(u32::MAX));

        table.grow(6);
        assert!(table.get_mut(5).is_ok());
    }

    #[test]
    fn entries_are_allocated_on_write() {
        let mut table = MetaTable::with_bound(crate::DEFAULT_MAX_BOUND);
        assert!(table.entries.is_empty());
        assert!(table.get(1000).is_none());
        assert_eq!(table.name(1000), "");
        table.get_mut(9).unwrap().name = "light".to_owned();
        assert_eq!(table.entries.len(), 10);
        assert_eq!(table.name(9), "light");
    }
}
