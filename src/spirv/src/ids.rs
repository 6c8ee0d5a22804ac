use enum_map::{Enum, EnumMap};

use crate::*;

pub type Id = u32;

/// An object that can live in an `IdTable` slot.
pub trait IdObject: Into<IdEntry> + Sized {
    const KIND: IdKind;
    fn downcast(entry: &IdEntry) -> Option<&Self>;
    fn downcast_mut(entry: &mut IdEntry) -> Option<&mut Self>;
}

macro_rules! impl_id_entries {
    ($($kind:ident($type:ty),)*) => {
        #[derive(Clone, Copy, Debug, Enum, Eq, Hash, PartialEq)]
        pub enum IdKind {
            $($kind,)*
        }

        #[derive(Clone, Debug, PartialEq)]
        pub enum IdEntry {
            $($kind($type),)*
        }

        impl IdEntry {
            pub fn kind(&self) -> IdKind {
                match self {
                    $(Self::$kind(_) => IdKind::$kind,)*
                }
            }
        }

        $(impl From<$type> for IdEntry {
            fn from(val: $type) -> Self {
                Self::$kind(val)
            }
        })*

        $(impl IdObject for $type {
            const KIND: IdKind = IdKind::$kind;

            fn downcast(entry: &IdEntry) -> Option<&Self> {
                match entry {
                    IdEntry::$kind(ref val) => Some(val),
                    _ => None,
                }
            }

            fn downcast_mut(entry: &mut IdEntry) -> Option<&mut Self> {
                match entry {
                    IdEntry::$kind(ref mut val) => Some(val),
                    _ => None,
                }
            }
        })*
    }
}

impl_id_entries! {
    Type(Type),
    Constant(Constant),
    ConstantOp(SpecConstantOp),
    Variable(Variable),
    Undef(Undef),
    Function(Function),
    FunctionPrototype(FunctionPrototype),
    Block(Block),
    ExtensionImport(ExtensionImport),
    String(DebugString),
}

/// Storage of one object per id in `1..bound`. Id 0 is never valid.
/// Slots are boxed and only allocated up to the highest id declared, so a
/// large declared bound costs nothing until ids are used.
#[derive(Clone, Debug, Default)]
pub struct IdTable {
    bound: u32,
    entries: Vec<Option<Box<IdEntry>>>,
    // Declaration order per kind.
    ids_for_kind: EnumMap<IdKind, Vec<Id>>,
}

impl IdTable {
    pub fn with_bound(bound: u32) -> Self {
        IdTable { bound, ..Default::default() }
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    fn index(&self, id: Id) -> Result<usize> {
        if id == 0 || id >= self.bound {
            return Err(ErrorKind::UnknownId(id).into());
        }
        Ok(id as usize)
    }

    /// Stores `value` at `id`, replacing any previous object (such as a
    /// forward declaration), and returns a reference to it.
    pub fn declare<T: IdObject>(&mut self, id: Id, value: T) -> Result<&mut T> {
        let index = self.index(id)?;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        let old_kind = self.entries[index].as_ref().map(|entry| entry.kind());
        if old_kind != Some(T::KIND) {
            if let Some(old_kind) = old_kind {
                self.ids_for_kind[old_kind].retain(|&other| other != id);
            }
            self.ids_for_kind[T::KIND].push(id);
        }
        let slot = &mut self.entries[index];
        *slot = Some(Box::new(value.into()));
        slot.as_mut()
            .and_then(|entry| T::downcast_mut(entry))
            .ok_or_else(|| ErrorKind::TypeMismatch(id).into())
    }

    pub fn entry(&self, id: Id) -> Option<&IdEntry> {
        if id == 0 { return None; }
        self.entries.get(id as usize)?.as_deref()
    }

    pub fn kind(&self, id: Id) -> Option<IdKind> {
        Some(self.entry(id)?.kind())
    }

    pub fn get<T: IdObject>(&self, id: Id) -> Result<&T> {
        let entry = self.entry(id).ok_or(ErrorKind::UnknownId(id))?;
        Ok(T::downcast(entry).ok_or(ErrorKind::TypeMismatch(id))?)
    }

    pub fn get_mut<T: IdObject>(&mut self, id: Id) -> Result<&mut T> {
        let index = self.index(id)?;
        let entry = self.entries.get_mut(index)
            .and_then(|slot| slot.as_deref_mut())
            .ok_or(ErrorKind::UnknownId(id))?;
        Ok(T::downcast_mut(entry).ok_or(ErrorKind::TypeMismatch(id))?)
    }

    /// Like `get` but returns `None` on an empty slot or a different kind.
    pub fn maybe_get<T: IdObject>(&self, id: Id) -> Option<&T> {
        T::downcast(self.entry(id)?)
    }

    /// Ids of one kind in the order they were first declared.
    pub fn ids_of(&self, kind: IdKind) -> &[Id] {
        &self.ids_for_kind[kind]
    }

    pub fn iter<'a, T: IdObject + 'a>(&'a self) ->
        impl Iterator<Item = (Id, &'a T)> + 'a
    {
        self.ids_of(T::KIND).iter()
            .filter_map(move |&id| Some((id, self.maybe_get::<T>(id)?)))
    }

    /// Reserves `count` fresh ids and returns the first one.
    pub fn increase_bound_by(&mut self, count: u32) -> Id {
        let first = self.bound;
        self.bound += count;
        first
    }
}

#[cfg(test)]
mod tests {
    use spirv_headers as spv;

    use super::*;

    #[test]
    fn declare_and_get() {
        let mut ids = IdTable::with_bound(4);
        ids.declare(1, Type::new(1, BaseType::Float, 32)).unwrap();
        assert_eq!(ids.get::<Type>(1).unwrap().width, 32);
        assert_eq!(ids.kind(1), Some(IdKind::Type));

        assert_eq!(ids.get::<Constant>(1).unwrap_err().kind(),
            ErrorKind::TypeMismatch(1));
        assert_eq!(ids.get::<Type>(2).unwrap_err().kind(),
            ErrorKind::UnknownId(2));
        assert_eq!(ids.get::<Type>(0).unwrap_err().kind(),
            ErrorKind::UnknownId(0));
        assert_eq!(ids.declare(4, Undef { ty: 1 }).unwrap_err().kind(),
            ErrorKind::UnknownId(4));
        assert!(ids.maybe_get::<Undef>(1).is_none());
    }

    #[test]
    fn overwrite_keeps_kind_lists() {
        let mut ids = IdTable::with_bound(4);
        ids.declare(2, Type::forward_pointer(2, spv::StorageClass::Uniform))
            .unwrap();
        ids.declare(1, Type::new(1, BaseType::Int, 32)).unwrap();
        ids.declare(2, Type::new(2, BaseType::Float, 32)).unwrap();
        assert_eq!(ids.ids_of(IdKind::Type), &[2, 1]);
        assert!(!ids.get::<Type>(2).unwrap().forward_pointer);

        ids.declare(2, Undef { ty: 1 }).unwrap();
        assert_eq!(ids.ids_of(IdKind::Type), &[1]);
        assert_eq!(ids.ids_of(IdKind::Undef), &[2]);
        assert_eq!(ids.iter::<Type>().count(), 1);
    }

    #[test]
    fn grow() {
        let mut ids = IdTable::with_bound(3);
        let first = ids.increase_bound_by(2);
        assert_eq!(first, 3);
        assert_eq!(ids.bound(), 5);
        ids.declare(4, Undef { ty: 1 }).unwrap().ty = 2;
        assert_eq!(ids.get::<Undef>(4).unwrap().ty, 2);
    }

    #[test]
    fn large_bound_is_lazy() {
        let mut ids = IdTable::with_bound(crate::DEFAULT_MAX_BOUND);
        assert_eq!(ids.bound(), crate::DEFAULT_MAX_BOUND);
        assert!(ids.entries.is_empty());
        assert!(ids.entry(1000).is_none());
        assert_eq!(ids.get_mut::<Undef>(1000).unwrap_err().kind(),
            ErrorKind::UnknownId(1000));

        ids.declare(7, Undef { ty: 1 }).unwrap();
        assert_eq!(ids.entries.len(), 8);
        assert_eq!(ids.get::<Undef>(7).unwrap().ty, 1);
    }
}
