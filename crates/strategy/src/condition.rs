//! Boolean rules over named, row-aligned series.
//!
//! A rule like `macdhist[1] < 0` compares two operands row by row. Operands
//! read a column (optionally lagged and scaled) or a constant. A row only
//! counts as `true` when every operand it touches is defined.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use common::{CandleSeries, Error, Result};

use crate::indicators::Values;

/// Raw candle columns every rule may reference.
pub const RAW_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Named columns of equal length: raw candle fields plus derived series.
#[derive(Debug, Clone, PartialEq)]
pub struct Columns {
    len: usize,
    data: BTreeMap<String, Values>,
}

impl Columns {
    pub fn from_candles(candles: &CandleSeries) -> Self {
        let rows = candles.candles();
        let mut data = BTreeMap::new();
        data.insert("open".to_string(), rows.iter().map(|c| Some(c.open)).collect());
        data.insert("high".to_string(), rows.iter().map(|c| Some(c.high)).collect());
        data.insert("low".to_string(), rows.iter().map(|c| Some(c.low)).collect());
        data.insert("close".to_string(), rows.iter().map(|c| Some(c.close)).collect());
        data.insert("volume".to_string(), rows.iter().map(|c| Some(c.volume)).collect());
        Self { len: rows.len(), data }
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Values) -> Result<()> {
        let name = name.into();
        if values.len() != self.len {
            return Err(Error::invalid_config(format!(
                "column '{name}' has {} rows, expected {}",
                values.len(),
                self.len
            )));
        }
        if self.data.contains_key(&name) {
            return Err(Error::invalid_config(format!("column '{name}' defined twice")));
        }
        self.data.insert(name, values);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[Option<f64>]> {
        self.data.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_map(self) -> BTreeMap<String, Values> {
        self.data
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `factor · column[row - shift]`
    Column { name: String, shift: usize, factor: f64 },
    Const(f64),
}

impl Operand {
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column { name: name.into(), shift: 0, factor: 1.0 }
    }

    /// Lag the operand by `rows`. Constants are unaffected.
    pub fn shifted(self, rows: usize) -> Self {
        match self {
            Operand::Column { name, factor, .. } => Operand::Column { name, shift: rows, factor },
            other => other,
        }
    }

    pub fn times(self, by: f64) -> Self {
        match self {
            Operand::Column { name, shift, factor } => {
                Operand::Column { name, shift, factor: factor * by }
            }
            Operand::Const(v) => Operand::Const(v * by),
        }
    }

    pub fn column_name(&self) -> Option<&str> {
        match self {
            Operand::Column { name, .. } => Some(name),
            Operand::Const(_) => None,
        }
    }

    /// Value at `row`, or `None` when undefined or missing.
    pub fn value_at(&self, columns: &Columns, row: usize) -> Option<f64> {
        match self {
            Operand::Const(v) => Some(*v),
            Operand::Column { name, shift, factor } => {
                let source_row = row.checked_sub(*shift)?;
                let value = (*columns.get(name)?.get(source_row)?)?;
                Some(value * factor)
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(v) => write!(f, "{v}"),
            Operand::Column { name, shift, factor } => {
                write!(f, "{name}")?;
                if *shift > 0 {
                    write!(f, "[{shift}]")?;
                }
                if *factor != 1.0 {
                    write!(f, "*{factor}")?;
                }
                Ok(())
            }
        }
    }
}

/// Parses `close`, `macdhist[1]`, `sma5*1.1`, `macdhist[1]*2` or a number.
impl FromStr for Operand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |why: &str| Error::invalid_config(format!("bad operand '{s}': {why}"));

        // A leading letter means a column, so `nan` and `inf` stay usable as names.
        let starts_numeric = s.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
        if starts_numeric {
            if let Ok(v) = s.parse::<f64>() {
                if !v.is_finite() {
                    return Err(invalid("constant must be finite"));
                }
                return Ok(Operand::Const(v));
            }
        }

        let (base, factor) = match s.split_once('*') {
            Some((base, factor)) => {
                let factor: f64 = factor.trim().parse().map_err(|_| invalid("factor is not a number"))?;
                if !factor.is_finite() {
                    return Err(invalid("factor must be finite"));
                }
                (base.trim(), factor)
            }
            None => (s, 1.0),
        };

        let (name, shift) = match base.split_once('[') {
            Some((name, rest)) => {
                let digits = rest.strip_suffix(']').ok_or_else(|| invalid("missing ']'"))?;
                let shift: usize = digits.trim().parse().map_err(|_| invalid("lag is not a row count"))?;
                (name.trim(), shift)
            }
            None => (base, 0),
        };

        if !is_column_name(name) {
            return Err(invalid("column names are letters, digits and '_'"));
        }

        Ok(Operand::Column { name: name.to_string(), shift, factor })
    }
}

/// Column names are ASCII letters, digits and `_`, not starting with a digit.
pub fn is_column_name(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn apply(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// A node of a rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    Compare { left: Operand, op: Comparison, right: Operand },
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn compare(left: Operand, op: Comparison, right: Operand) -> Self {
        Condition::Compare { left, op, right }
    }

    pub fn lt(left: Operand, right: Operand) -> Self {
        Self::compare(left, Comparison::Lt, right)
    }

    pub fn gt(left: Operand, right: Operand) -> Self {
        Self::compare(left, Comparison::Gt, right)
    }

    /// `Some(result)` when every operand in the tree is defined at `row`.
    ///
    /// All children are evaluated; there is no short-circuit.
    pub fn evaluate_row(&self, columns: &Columns, row: usize) -> Option<bool> {
        match self {
            Condition::Compare { left, op, right } => {
                let l = left.value_at(columns, row);
                let r = right.value_at(columns, row);
                Some(op.apply(l?, r?))
            }
            Condition::All(children) => {
                let results: Vec<Option<bool>> =
                    children.iter().map(|c| c.evaluate_row(columns, row)).collect();
                let results: Option<Vec<bool>> = results.into_iter().collect();
                Some(results?.into_iter().all(|b| b))
            }
            Condition::Any(children) => {
                let results: Vec<Option<bool>> =
                    children.iter().map(|c| c.evaluate_row(columns, row)).collect();
                let results: Option<Vec<bool>> = results.into_iter().collect();
                Some(results?.into_iter().any(|b| b))
            }
        }
    }

    pub fn for_each_column<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Condition::Compare { left, right, .. } => {
                left.column_name().into_iter().chain(right.column_name()).for_each(|n| f(n));
            }
            Condition::All(children) | Condition::Any(children) => {
                children.iter().for_each(|c| c.for_each_column(f));
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Condition::All(children) | Condition::Any(children) => {
                let joiner = if matches!(self, Condition::All(_)) { " & " } else { " | " };
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(joiner))
            }
        }
    }
}

/// Parses `left op right`, e.g. `close < bb_lowerband20`.
impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Two-character operators first so `<=` is not read as `<`.
        for (symbol, op) in [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
        ] {
            if let Some((left, right)) = s.split_once(symbol) {
                return Ok(Condition::Compare { left: left.parse()?, op, right: right.parse()? });
            }
        }
        Err(Error::invalid_config(format!("rule '{s}' has no comparison operator")))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Expr(String),
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
}

impl TryFrom<RawCondition> for Condition {
    type Error = Error;

    fn try_from(raw: RawCondition) -> Result<Self> {
        match raw {
            RawCondition::Expr(s) => s.parse(),
            RawCondition::All { all } => Ok(Condition::All(all)),
            RawCondition::Any { any } => Ok(Condition::Any(any)),
        }
    }
}

impl From<Condition> for RawCondition {
    fn from(c: Condition) -> Self {
        match c {
            Condition::All(all) => RawCondition::All { all },
            Condition::Any(any) => RawCondition::Any { any },
            compare => RawCondition::Expr(compare.to_string()),
        }
    }
}

/// Ordered conditions combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for c in &self.conditions {
            c.for_each_column(&mut |n| names.push(n));
        }
        names.sort_unstable();
        names.dedup();
        names
    }

    /// `true` where every condition is defined and true. An empty set never fires.
    pub fn evaluate(&self, columns: &Columns) -> SignalColumn {
        let rows = (0..columns.len())
            .map(|row| {
                if self.conditions.is_empty() {
                    return false;
                }
                let results: Vec<Option<bool>> = self
                    .conditions
                    .iter()
                    .map(|c| c.evaluate_row(columns, row))
                    .collect();
                results.into_iter().all(|r| r == Some(true))
            })
            .collect();
        SignalColumn(rows)
    }
}

/// Boolean column aligned with a candle series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalColumn(Vec<bool>);

impl SignalColumn {
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn get(&self, row: usize) -> bool {
        self.0.get(row).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }

    /// Row indices where the signal fires.
    pub fn rows(&self) -> Vec<usize> {
        self.0.iter().enumerate().filter(|(_, b)| **b).map(|(i, _)| i).collect()
    }
}

impl Serialize for SignalColumn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SignalColumn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<bool>::deserialize(deserializer).map(SignalColumn)
    }
}
