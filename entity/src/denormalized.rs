//! Sets of scalar keys stored in a single delimited text column.
//!
//! The element type and the separator are type parameters, so both are fixed
//! where the column is declared on the model. Reading a row decodes the text
//! into a [`DenormalizedSet`]; writing it back encodes the set again.

use std::{
    collections::{HashSet, hash_set},
    fmt,
    hash::Hash,
    marker::PhantomData,
};

use sea_orm::{
    ColIdx, DbErr, QueryResult, TryGetError, TryGetable, Value,
    sea_query::{ArrayType, ColumnType, Nullable, ValueType, ValueTypeErr},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A stored token could not be coerced into the set's element type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("malformed denormalized set token {token:?}: {reason}")]
pub struct CodecDecodeError {
    pub token: String,
    pub reason: String,
}

/// Parser/formatter pair for the elements of a [`DenormalizedSet`].
///
/// `render` must never produce the separator of the column it is stored in.
pub trait SetElement: Clone + Eq + Hash {
    fn coerce(token: &str) -> Result<Self, String>;
    fn render(&self) -> String;
}

macro_rules! integer_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SetElement for $ty {
                fn coerce(token: &str) -> Result<Self, String> {
                    token.trim().parse::<$ty>().map_err(|err| err.to_string())
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_element!(i16, i32, i64, u16, u32, u64);

impl SetElement for String {
    fn coerce(token: &str) -> Result<Self, String> {
        Ok(token.to_owned())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

/// Separator placed between encoded elements.
pub trait Separator {
    const VALUE: &'static str;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Space;

impl Separator for Space {
    const VALUE: &'static str = " ";
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Comma;

impl Separator for Comma {
    const VALUE: &'static str = ",";
}

/// Integer primary keys joined by single spaces, the layout of the follow columns.
pub type IdSet = DenormalizedSet<i32, Space>;

/// In-memory set backed by one text column.
///
/// Values have value semantics: cloning a model clones its sets, so mutating
/// one copy never leaks into another.
pub struct DenormalizedSet<T = i32, S = Space> {
    items: HashSet<T>,
    separator: PhantomData<fn() -> S>,
}

impl<T: SetElement, S: Separator> DenormalizedSet<T, S> {
    pub fn new() -> Self {
        Self::from(HashSet::new())
    }

    /// Encodes a possibly absent set. `None` stays `None` so the column is
    /// written as SQL `NULL`.
    pub fn encode(value: Option<&Self>) -> Option<String> {
        value.map(Self::encode_items)
    }

    /// Decodes stored text. `NULL` and the empty string both yield an empty set.
    pub fn decode(raw: Option<&str>) -> Result<Self, CodecDecodeError> {
        let raw = match raw {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Self::new()),
        };
        raw.split(S::VALUE)
            .map(|token| {
                T::coerce(token).map_err(|reason| CodecDecodeError {
                    token: token.to_owned(),
                    reason,
                })
            })
            .collect()
    }

    /// Independent shallow copy.
    pub fn copy(&self) -> Self {
        Self::from(self.items.clone())
    }

    /// The column text for a present set.
    pub fn encode_items(&self) -> String {
        self.items
            .iter()
            .map(|item| item.render().trim().to_owned())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(S::VALUE)
    }

    /// Returns `true` when the value was not present yet.
    pub fn insert(&mut self, value: T) -> bool {
        self.items.insert(value)
    }

    /// Returns `true` when the value was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.items.remove(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_set(&self) -> &HashSet<T> {
        &self.items
    }

    pub fn into_inner(self) -> HashSet<T> {
        self.items
    }
}

impl<T: SetElement, S: Separator> Default for DenormalizedSet<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, S> Clone for DenormalizedSet<T, S> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            separator: PhantomData,
        }
    }
}

impl<T: Eq + Hash, S> PartialEq for DenormalizedSet<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq + Hash, S> Eq for DenormalizedSet<T, S> {}

impl<T: fmt::Debug, S> fmt::Debug for DenormalizedSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

impl<T, S> From<HashSet<T>> for DenormalizedSet<T, S> {
    fn from(items: HashSet<T>) -> Self {
        Self {
            items,
            separator: PhantomData,
        }
    }
}

impl<T: SetElement, S: Separator> FromIterator<T> for DenormalizedSet<T, S> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<HashSet<_>>())
    }
}

impl<T: SetElement, S: Separator> Extend<T> for DenormalizedSet<T, S> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<'a, T, S> IntoIterator for &'a DenormalizedSet<T, S> {
    type Item = &'a T;
    type IntoIter = hash_set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize, S> Serialize for DenormalizedSet<T, S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

impl<'de, T, S> Deserialize<'de> for DenormalizedSet<T, S>
where
    T: Deserialize<'de> + Eq + Hash,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        HashSet::<T>::deserialize(deserializer).map(Self::from)
    }
}

impl<T: SetElement, S: Separator> From<DenormalizedSet<T, S>> for Value {
    fn from(set: DenormalizedSet<T, S>) -> Self {
        Value::String(Some(Box::new(set.encode_items())))
    }
}

impl<T: SetElement, S: Separator> TryGetable for DenormalizedSet<T, S> {
    fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
        let raw = <Option<String> as TryGetable>::try_get_by(res, index)?;
        Self::decode(raw.as_deref())
            .map_err(|err| TryGetError::DbErr(DbErr::Type(err.to_string())))
    }
}

impl<T: SetElement, S: Separator> ValueType for DenormalizedSet<T, S> {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(raw) => {
                Self::decode(raw.as_deref().map(String::as_str)).map_err(|err| {
                    tracing::debug!(error = %err, "stored set rejected by value conversion");
                    ValueTypeErr
                })
            }
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "DenormalizedSet".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Text
    }
}

impl<T: SetElement, S: Separator> Nullable for DenormalizedSet<T, S> {
    fn null() -> Value {
        Value::String(None)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ids(values: &[i32]) -> IdSet {
        values.iter().copied().collect()
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(items in prop::collection::hash_set(any::<i32>(), 0..48)) {
            let set = IdSet::from(items);
            let encoded = IdSet::encode(Some(&set));
            prop_assert_eq!(IdSet::decode(encoded.as_deref()).unwrap(), set);
        }

        #[test]
        fn comma_sets_round_trip(items in prop::collection::hash_set(any::<u64>(), 0..48)) {
            let set: DenormalizedSet<u64, Comma> = items.into_iter().collect();
            let encoded = set.encode_items();
            prop_assert_eq!(DenormalizedSet::<u64, Comma>::decode(Some(&encoded)).unwrap(), set);
        }
    }

    #[test]
    fn absent_values_follow_the_null_contract() {
        assert_eq!(IdSet::encode(None), None);
        assert!(IdSet::decode(None).unwrap().is_empty());
        assert!(IdSet::decode(Some("")).unwrap().is_empty());
    }

    #[test]
    fn repeated_tokens_collapse() {
        let decoded = IdSet::decode(Some("1 1 2")).unwrap();
        assert_eq!(decoded, ids(&[1, 2]));
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn malformed_token_is_reported() {
        let err = IdSet::decode(Some("12 x 7")).unwrap_err();
        assert_eq!(err.token, "x");
        assert!(err.to_string().contains("\"x\""));
    }

    #[test]
    fn empty_set_encodes_to_empty_text() {
        assert_eq!(IdSet::encode(Some(&IdSet::new())).as_deref(), Some(""));
    }

    #[test]
    fn encoded_elements_are_trimmed_and_blank_ones_dropped() {
        let set: DenormalizedSet<String, Comma> =
            [" alpha ".to_owned(), String::new(), "  ".to_owned(), "beta".to_owned()]
                .into_iter()
                .collect();
        let encoded = set.encode_items();
        let mut parts: Vec<_> = encoded.split(',').collect();
        parts.sort_unstable();
        assert_eq!(parts, ["alpha", "beta"]);
    }

    #[test]
    fn separator_is_part_of_the_type() {
        let set: DenormalizedSet<u64, Comma> = [5, 9].into_iter().collect();
        let encoded = set.encode_items();
        assert!(encoded == "5,9" || encoded == "9,5");
        let decoded = DenormalizedSet::<u64, Comma>::decode(Some(&encoded)).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn copies_are_independent() {
        let original = ids(&[1, 2]);
        let mut copy = original.copy();
        copy.insert(3);
        copy.remove(&1);
        assert_eq!(original, ids(&[1, 2]));
        assert_eq!(copy, ids(&[2, 3]));
    }

    #[test]
    fn value_conversion_round_trips_through_sea_query() {
        let set = ids(&[4, 8]);
        let value: Value = set.clone().into();
        assert_eq!(<IdSet as ValueType>::try_from(value).unwrap(), set);
        assert!(<IdSet as ValueType>::try_from(<IdSet as Nullable>::null())
            .unwrap()
            .is_empty());
        assert!(<IdSet as ValueType>::try_from(Value::Int(Some(1))).is_err());
        assert!(
            <IdSet as ValueType>::try_from(Value::String(Some(Box::new("3 three".into()))))
                .is_err()
        );
    }
}
