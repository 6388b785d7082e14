use itertools::Itertools;
use std::fmt::{Debug, Error, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

pub trait Ref: Into<usize> + From<usize> + Copy + PartialEq {}

impl<X> Ref for X where X: Into<usize> + From<usize> + Copy + PartialEq {}

/// Declares an identifier type usable as a key of a [`RefVec`].
///
/// The identifier wraps a `NonZeroU32` holding the index plus one, so that an `Option` of an
/// identifier is not larger than the identifier itself.
#[macro_export]
macro_rules! create_ref_type {
    ($type_name:ident) => {
        #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
        pub struct $type_name(std::num::NonZeroU32);

        impl $type_name {
            /// Position of the identifier, starting from zero.
            pub const fn index(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }
        impl From<usize> for $type_name {
            fn from(index: usize) -> Self {
                $type_name(std::num::NonZeroU32::MIN.saturating_add(index as u32))
            }
        }
        impl From<$type_name> for usize {
            fn from(id: $type_name) -> Self {
                id.index()
            }
        }
        impl std::fmt::Display for $type_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", stringify!($type_name), self.index())
            }
        }
    };
}

/// Dense storage of values, indexed by a ref type `K` rather than by `usize`.
///
/// Keys are attributed in insertion order, starting from zero.
#[derive(Clone)]
pub struct RefVec<K, V> {
    values: Vec<V>,
    key: PhantomData<fn(K)>,
}

impl<K, V> Default for RefVec<K, V> {
    fn default() -> Self {
        RefVec {
            values: Vec::new(),
            key: PhantomData,
        }
    }
}

impl<K, V: Debug> Debug for RefVec<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "[{}]", self.values.iter().map(|v| format!("{v:?}")).format(", "))
    }
}

impl<K: Ref, V> RefVec<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends `value` and returns its key.
    pub fn push(&mut self, value: V) -> K {
        let key = self.next_key();
        self.values.push(value);
        key
    }

    /// Key of the next value to be pushed.
    pub fn next_key(&self) -> K {
        K::from(self.len())
    }

    pub fn contains(&self, key: K) -> bool {
        key.into() < self.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.len()).map(K::from)
    }
}

impl<K: Ref, V> Index<K> for RefVec<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.values[key.into()]
    }
}

impl<K: Ref, V> IndexMut<K> for RefVec<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.values[key.into()]
    }
}
