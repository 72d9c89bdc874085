use std::collections::BTreeMap;
use std::ops::Index;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::{SHIFT_ATOL, SHIFT_RTOL};

/// A single plot option value.
///
/// Options travel through the crate as string-keyed maps so that defaults can
/// be layered generically before a plot call parses the keys it understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Floats(Vec<f64>),
    Map(OptionMap),
}

/// String-keyed option mapping used by every plotting entry point.
pub type OptionMap = BTreeMap<String, OptValue>;

impl From<bool> for OptValue {
    fn from(v: bool) -> Self {
        OptValue::Bool(v)
    }
}

impl From<i64> for OptValue {
    fn from(v: i64) -> Self {
        OptValue::Int(v)
    }
}

impl From<i32> for OptValue {
    fn from(v: i32) -> Self {
        OptValue::Int(v as i64)
    }
}

impl From<f64> for OptValue {
    fn from(v: f64) -> Self {
        OptValue::Float(v)
    }
}

impl From<&str> for OptValue {
    fn from(v: &str) -> Self {
        OptValue::Str(v.to_string())
    }
}

impl From<String> for OptValue {
    fn from(v: String) -> Self {
        OptValue::Str(v)
    }
}

impl From<Vec<f64>> for OptValue {
    fn from(v: Vec<f64>) -> Self {
        OptValue::Floats(v)
    }
}

impl From<Vector3<f64>> for OptValue {
    fn from(v: Vector3<f64>) -> Self {
        OptValue::Floats(vec![v.x, v.y, v.z])
    }
}

impl From<OptionMap> for OptValue {
    fn from(v: OptionMap) -> Self {
        OptValue::Map(v)
    }
}

/// Build an [`OptionMap`] from `key => value` pairs.
///
/// ```
/// use latviz::options;
/// let opts = options! { "radius" => 0.2, "cmap" => "viridis" };
/// assert_eq!(opts.len(), 2);
/// ```
#[macro_export]
macro_rules! options {
    () => { $crate::utils::OptionMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::utils::OptionMap::new();
        $( map.insert(String::from($key), $crate::utils::OptValue::from($value)); )+
        map
    }};
}

/// Typed read access used by the option parsers in the plot modules.
pub trait OptionExt {
    fn get_f64(&self, key: &str) -> Option<f64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_str(&self, key: &str) -> Option<&str>;
    fn get_floats(&self, key: &str) -> Option<&[f64]>;
    fn get_vector3(&self, key: &str) -> Option<Vector3<f64>>;
    fn get_map(&self, key: &str) -> Option<&OptionMap>;
}

impl OptionExt for OptionMap {
    fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(OptValue::Float(v)) => Some(*v),
            Some(OptValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(OptValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(OptValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    fn get_floats(&self, key: &str) -> Option<&[f64]> {
        match self.get(key) {
            Some(OptValue::Floats(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    fn get_vector3(&self, key: &str) -> Option<Vector3<f64>> {
        let v = self.get_floats(key)?;
        if v.len() == 3 {
            Some(Vector3::new(v[0], v[1], v[2]))
        } else {
            None
        }
    }

    fn get_map(&self, key: &str) -> Option<&OptionMap> {
        match self.get(key) {
            Some(OptValue::Map(v)) => Some(v),
            _ => None,
        }
    }
}

/// Return a map where missing keys are filled in by defaults.
///
/// Precedence, highest first: the caller-supplied `options`, then the
/// `layers` in the order given (the first layer that defines a key wins),
/// then the trailing `kw_defaults`. No input map is mutated.
///
/// ```
/// use latviz::{options, utils::with_defaults};
/// let opts = options! { "hello" => 0 };
/// let defaults = options! { "hello" => 4, "world" => 5 };
/// let merged = with_defaults(Some(&opts), &[&defaults], options! { "world" => 7, "yes" => 3 });
/// assert_eq!(merged, options! { "hello" => 0, "world" => 5, "yes" => 3 });
/// ```
pub fn with_defaults(
    options: Option<&OptionMap>,
    layers: &[&OptionMap],
    kw_defaults: OptionMap,
) -> OptionMap {
    let mut result = kw_defaults;
    for layer in layers.iter().rev() {
        for (key, value) in layer.iter() {
            result.insert(key.clone(), value.clone());
        }
    }
    if let Some(options) = options {
        for (key, value) in options.iter() {
            result.insert(key.clone(), value.clone());
        }
    }
    result
}

/// Like a regular set, but the items are vectors and membership is decided by
/// an approximate comparison with a relative and absolute tolerance.
///
/// Periodic shift vectors computed along different paths can differ by
/// rounding error while describing the same physical boundary, so exact
/// equality would keep spurious duplicates. Insertion keeps the first of any
/// group of near-equal vectors as the canonical representative; later
/// near-duplicates are discarded, never merged or averaged.
///
/// Storage is a plain growable array with a linear membership scan. The
/// expected size is the number of distinct periodic directions, so no
/// indexing structure is warranted.
#[derive(Debug, Clone)]
pub struct FuzzySet {
    data: Vec<Vector3<f64>>,
    rtol: f64,
    atol: f64,
}

impl Default for FuzzySet {
    fn default() -> Self {
        FuzzySet::new(SHIFT_RTOL, SHIFT_ATOL)
    }
}

impl FuzzySet {
    pub fn new(rtol: f64, atol: f64) -> Self {
        FuzzySet {
            data: Vec::new(),
            rtol,
            atol,
        }
    }

    /// Construct from an iterator, applying the deduplication rule per item.
    pub fn from_iter<I>(items: I, rtol: f64, atol: f64) -> Self
    where
        I: IntoIterator<Item = Vector3<f64>>,
    {
        let mut set = FuzzySet::new(rtol, atol);
        for item in items {
            set.add(item);
        }
        set
    }

    /// True iff some stored item is element-wise close to `item`:
    /// `|item_i - s_i| <= atol + rtol * |s_i|` for every component.
    pub fn contains(&self, item: &Vector3<f64>) -> bool {
        self.data.iter().any(|stored| {
            (0..3).all(|i| (item[i] - stored[i]).abs() <= self.atol + self.rtol * stored[i].abs())
        })
    }

    /// Append `item` unless a near-equal entry already exists.
    /// Returns true if the item was inserted.
    pub fn add(&mut self, item: Vector3<f64>) -> bool {
        if self.contains(&item) {
            false
        } else {
            self.data.push(item);
            true
        }
    }

    /// Add every item of `other` in insertion order, each checked against the
    /// growing set.
    pub fn merge(&mut self, other: &FuzzySet) {
        for item in other.iter() {
            self.add(*item);
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Item at `index` in insertion order.
    pub fn get(&self, index: usize) -> Option<&Vector3<f64>> {
        self.data.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vector3<f64>> {
        self.data.iter()
    }
}

impl Index<usize> for FuzzySet {
    type Output = Vector3<f64>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

/// Convert values from centimeter to inch.
pub fn cm2inch<const N: usize>(values: [f64; N]) -> [f64; N] {
    values.map(|v| v / 2.54)
}
