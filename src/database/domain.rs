use std::str::FromStr;

use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{Condition, Value};
use thiserror::Error;

pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	In,
	NotIn,
	Like,
	ILike,
}

#[derive(Error, Debug)]
#[error("unknown domain operator {0:?}")]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
	type Err = UnknownOperator;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"=" => Ok(Self::Eq),
			"!=" => Ok(Self::Ne),
			"<" => Ok(Self::Lt),
			"<=" => Ok(Self::Le),
			">" => Ok(Self::Gt),
			">=" => Ok(Self::Ge),
			"in" => Ok(Self::In),
			"not in" => Ok(Self::NotIn),
			"like" => Ok(Self::Like),
			"ilike" => Ok(Self::ILike),
			other => Err(UnknownOperator(other.to_owned())),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Ints(Vec<i64>),
	Texts(Vec<String>),
}

impl From<bool> for DomainValue {
	fn from(value: bool) -> Self { Self::Bool(value) }
}

impl From<i32> for DomainValue {
	fn from(value: i32) -> Self { Self::Int(value.into()) }
}

impl From<i64> for DomainValue {
	fn from(value: i64) -> Self { Self::Int(value) }
}

impl From<f64> for DomainValue {
	fn from(value: f64) -> Self { Self::Float(value) }
}

impl From<&str> for DomainValue {
	fn from(value: &str) -> Self { Self::Text(value.to_owned()) }
}

impl From<String> for DomainValue {
	fn from(value: String) -> Self { Self::Text(value) }
}

impl From<Vec<i64>> for DomainValue {
	fn from(value: Vec<i64>) -> Self { Self::Ints(value) }
}

impl From<Vec<String>> for DomainValue {
	fn from(value: Vec<String>) -> Self { Self::Texts(value) }
}

impl DomainValue {
	fn values(&self) -> Vec<Value> {
		match self {
			Self::Null => vec![Value::BigInt(None)],
			Self::Bool(value) => vec![Value::from(*value)],
			Self::Int(value) => vec![Value::from(*value)],
			Self::Float(value) => vec![Value::from(*value)],
			Self::Text(value) => vec![Value::from(value.clone())],
			Self::Ints(values) => values.iter().copied().map(Value::from).collect(),
			Self::Texts(values) => values.iter().cloned().map(Value::from).collect(),
		}
	}

	fn value(&self) -> Value {
		self.values()
			.into_iter()
			.next()
			.unwrap_or(Value::BigInt(None))
	}

	fn text(&self) -> String {
		match self {
			Self::Text(text) => text.clone(),
			Self::Int(value) => value.to_string(),
			Self::Float(value) => value.to_string(),
			Self::Bool(value) => value.to_string(),
			Self::Texts(values) => values.join(""),
			Self::Ints(_) | Self::Null => String::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
	pub field: String,
	pub operator: Operator,
	pub value: DomainValue,
}

impl Clause {
	fn expression(&self) -> SimpleExpr {
		let column = || Expr::col(Alias::new(self.field.as_str()));

		match (self.operator, &self.value) {
			(Operator::Eq, DomainValue::Null) => column().is_null(),
			(Operator::Ne, DomainValue::Null) => column().is_not_null(),
			(Operator::Eq, value) => column().eq(value.value()),
			(Operator::Ne, value) => column().ne(value.value()),
			(Operator::Lt, value) => column().lt(value.value()),
			(Operator::Le, value) => column().lte(value.value()),
			(Operator::Gt, value) => column().gt(value.value()),
			(Operator::Ge, value) => column().gte(value.value()),
			(Operator::In, value) => column().is_in(value.values()),
			(Operator::NotIn, value) => column().is_not_in(value.values()),
			(Operator::Like, value) => column().like(value.text()),
			(Operator::ILike, value) => {
				Expr::expr(Func::lower(column())).like(value.text().to_lowercase())
			},
		}
	}
}

/// A search filter: every clause must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain(Vec<Clause>);

impl Domain {
	pub fn new() -> Self {
		Self::default()
	}

	/// A domain that matches exactly the given ids.
	pub fn ids(ids: Vec<i64>) -> Self {
		Self::new().and(ID_FIELD, Operator::In, ids)
	}

	pub fn and<V: Into<DomainValue>>(
		mut self,
		field: &str,
		operator: Operator,
		value: V,
	) -> Self {
		self.0.push(Clause {
			field: field.to_owned(),
			operator,
			value: value.into(),
		});
		self
	}

	/// Clauses of `self` followed by those of `other`.
	pub fn extend(mut self, other: &Domain) -> Self {
		self.0.extend(other.0.iter().cloned());
		self
	}

	pub fn clauses(&self) -> &[Clause] {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The ids of a domain that is a single `id in [...]` clause.
	pub fn id_list(&self) -> Option<&[i64]> {
		match self.0.as_slice() {
			[Clause { field, operator: Operator::In, value: DomainValue::Ints(ids) }]
				if field == ID_FIELD => Some(ids.as_slice()),
			_ => None,
		}
	}

	pub fn condition(&self) -> Condition {
		self.0.iter()
			.fold(Condition::all(), |condition, clause| condition.add(clause.expression()))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Ascending,
	Descending,
}

impl From<Direction> for sea_orm::Order {
	fn from(direction: Direction) -> Self {
		match direction {
			Direction::Ascending => sea_orm::Order::Asc,
			Direction::Descending => sea_orm::Order::Desc,
		}
	}
}

/// Sort order for a search, most significant field first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order(Vec<(String, Direction)>);

impl Order {
	pub fn by(field: &str, direction: Direction) -> Self {
		Self(vec![(field.to_owned(), direction)])
	}

	pub fn then(mut self, field: &str, direction: Direction) -> Self {
		self.0.push((field.to_owned(), direction));
		self
	}

	pub fn fields(&self) -> impl Iterator<Item = (&str, Direction)> {
		self.0.iter().map(|(field, direction)| (field.as_str(), *direction))
	}
}
