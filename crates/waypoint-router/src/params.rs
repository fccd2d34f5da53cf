//! Route parameters and typed extraction.
//!
//! [`RouteParams`] maps dynamic segment names to their decoded values and
//! keeps the order in which they appear in the pattern, so tuple extraction
//! works by position.
//!
//! # Example
//!
//! ```ignore
//! use waypoint_router::{FromParams, RouteParams};
//!
//! let params = RouteParams::from_iter([("roomId", "42")]);
//! let room: u64 = params.parse("roomId")?;
//! let (room_again,): (u64,) = FromParams::from_params(&params)?;
//! ```

use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ParamError;

/// Ordered mapping from parameter name to decoded value.
///
/// Equality ignores insertion order: two maps are equal when they hold the
/// same names with the same values.
#[derive(Debug, Clone, Default, Eq)]
pub struct RouteParams {
	entries: Vec<(String, String)>,
}

impl RouteParams {
	/// Creates an empty parameter map.
	pub const fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	/// Inserts a value, replacing any previous value under the same name.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();
		match self.entries.iter_mut().find(|(k, _)| *k == name) {
			Some((_, existing)) => *existing = value,
			None => self.entries.push((name, value)),
		}
	}

	/// Returns the value for `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(k, _)| k == name)
			.map(|(_, v)| v.as_str())
	}

	/// Returns whether `name` has a value.
	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Parses the value for `name` into `T`.
	///
	/// # Errors
	///
	/// Returns [`ParamError::Missing`] when the parameter is absent and
	/// [`ParamError::Parse`] when the value does not parse.
	pub fn parse<T>(&self, name: &str) -> Result<T, ParamError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		let raw = self
			.get(name)
			.ok_or_else(|| ParamError::Missing(name.to_string()))?;
		raw.parse::<T>().map_err(|e| ParamError::Parse {
			name: name.to_string(),
			param_type: std::any::type_name::<T>(),
			raw_value: raw.to_string(),
			reason: e.to_string(),
		})
	}

	/// Iterates over `(name, value)` pairs in pattern order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Returns the values in pattern order.
	pub fn values(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(_, v)| v.as_str())
	}

	/// Returns the number of parameters.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns whether there are no parameters.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Extracts a typed value from these parameters.
	pub fn extract<T: FromParams>(&self) -> Result<T, ParamError> {
		T::from_params(self)
	}
}

impl PartialEq for RouteParams {
	fn eq(&self, other: &Self) -> bool {
		self.entries.len() == other.entries.len()
			&& self.iter().all(|(k, v)| other.get(k) == Some(v))
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut params = Self::new();
		for (k, v) in iter {
			params.insert(k, v);
		}
		params
	}
}

impl<K: Into<String>, V: Into<String>> From<std::collections::HashMap<K, V>> for RouteParams {
	fn from(map: std::collections::HashMap<K, V>) -> Self {
		map.into_iter().collect()
	}
}

impl Serialize for RouteParams {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;
		for (k, v) in &self.entries {
			map.serialize_entry(k, v)?;
		}
		map.end()
	}
}

/// Conversion from route parameters into a typed value.
///
/// Scalars require exactly one parameter; tuples take parameters by
/// position in the pattern.
pub trait FromParams: Sized {
	/// Extracts `Self` from the parameters.
	///
	/// # Errors
	///
	/// Returns [`ParamError::CountMismatch`] if the number of parameters
	/// doesn't fit and [`ParamError::Parse`] if a value fails to parse.
	fn from_params(params: &RouteParams) -> Result<Self, ParamError>;
}

fn parse_at<T>(params: &RouteParams, index: usize) -> Result<T, ParamError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	let (name, raw) = params
		.entries
		.get(index)
		.ok_or(ParamError::CountMismatch {
			expected: index + 1,
			actual: params.len(),
		})?;
	raw.parse::<T>().map_err(|e| ParamError::Parse {
		name: name.clone(),
		param_type: std::any::type_name::<T>(),
		raw_value: raw.clone(),
		reason: e.to_string(),
	})
}

macro_rules! impl_from_params_for_scalar {
	($($ty:ty),* $(,)?) => {
		$(
			impl FromParams for $ty {
				fn from_params(params: &RouteParams) -> Result<Self, ParamError> {
					if params.len() != 1 {
						return Err(ParamError::CountMismatch {
							expected: 1,
							actual: params.len(),
						});
					}
					parse_at(params, 0)
				}
			}
		)*
	};
}

impl_from_params_for_scalar!(String, i32, i64, u32, u64, usize, bool);

macro_rules! impl_from_params_for_tuple {
	($count:expr; $($idx:tt => $ty:ident),+) => {
		impl<$($ty),+> FromParams for ($($ty,)+)
		where
			$($ty: FromStr, <$ty as FromStr>::Err: std::fmt::Display,)+
		{
			fn from_params(params: &RouteParams) -> Result<Self, ParamError> {
				if params.len() != $count {
					return Err(ParamError::CountMismatch {
						expected: $count,
						actual: params.len(),
					});
				}
				Ok(($(parse_at::<$ty>(params, $idx)?,)+))
			}
		}
	};
}

impl_from_params_for_tuple!(1; 0 => A);
impl_from_params_for_tuple!(2; 0 => A, 1 => B);
impl_from_params_for_tuple!(3; 0 => A, 1 => B, 2 => C);
impl_from_params_for_tuple!(4; 0 => A, 1 => B, 2 => C, 3 => D);
