//! Variables and dimensions as exposed by a netCDF reader.
//!
//! Dimensions are shared by reference between the variables that use them: two
//! dimensions are equal only if they are the same object, even if they have the same
//! name and length.

use crate::listeners::{DecoderEvent, Listeners};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct DimensionInner {
    name: String,
    length: usize,
}

/// A named dimension, compared by identity.
#[derive(Clone)]
pub struct Dimension(Arc<DimensionInner>);

impl Dimension {
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self(Arc::new(DimensionInner {
            name: name.into(),
            length,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn length(&self) -> usize {
        self.0.length
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Dimension {}

impl Hash for Dimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.0.name, self.0.length)
    }
}

/// Value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Numbers(Vec<f64>),
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Numbers(vec![v])
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(v: Vec<f64>) -> Self {
        AttributeValue::Numbers(v)
    }
}

/// Data of a variable, flattened in row-major order (last dimension varying fastest).
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

/// A variable with its dimensions, attributes and data.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    dimensions: Vec<Dimension>,
    attributes: Vec<(String, AttributeValue)>,
    data: VariableData,
}

impl Variable {
    /// Create a variable without attributes or data.
    pub fn new(name: impl Into<String>, dimensions: Vec<Dimension>) -> Self {
        Self {
            name: name.into(),
            dimensions,
            attributes: Vec::new(),
            data: VariableData::Numeric(Vec::new()),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Add all `(name, value)` text attributes.
    pub fn with_attributes(mut self, attributes: &[(&str, &str)]) -> Self {
        for (name, value) in attributes {
            self.set_attribute(*name, *value);
        }
        self
    }

    pub fn with_values(mut self, values: Vec<f64>) -> Self {
        self.data = VariableData::Numeric(values);
        self
    }

    pub fn with_text(mut self, values: Vec<String>) -> Self {
        self.data = VariableData::Text(values);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimensions in netCDF order (slowest varying first).
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of elements implied by the dimensions.
    pub fn element_count(&self) -> usize {
        self.dimensions.iter().map(|d| d.length()).product()
    }

    /// Whether this variable is a coordinate variable: one dimension of the same name.
    pub fn is_coordinate_variable(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0].name() == self.name
    }

    pub fn is_string(&self) -> bool {
        matches!(self.data, VariableData::Text(_))
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Attribute value as trimmed non-empty text. Numbers are formatted.
    pub fn attribute_as_string(&self, name: &str) -> Option<String> {
        match self.attribute(name)? {
            AttributeValue::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            AttributeValue::Numbers(v) if v.len() == 1 => Some(v[0].to_string()),
            AttributeValue::Numbers(_) => None,
        }
    }

    /// Attribute value as a number.
    ///
    /// Text that cannot be parsed is reported as an illegal attribute value and the
    /// attribute is treated as absent.
    pub fn attribute_as_number(&self, name: &str, listeners: &Listeners) -> Option<f64> {
        match self.attribute(name)? {
            AttributeValue::Numbers(v) => v.first().copied(),
            AttributeValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) => Some(v),
                Err(e) => {
                    listeners.report(DecoderEvent::IllegalAttributeValue {
                        variable: self.name.clone(),
                        attribute: name.to_string(),
                        value: s.clone(),
                        cause: e.to_string(),
                    });
                    None
                }
            },
        }
    }

    /// Attribute values as a vector of numbers, parsing whitespace- or comma-separated text.
    pub fn attribute_as_numbers(&self, name: &str, listeners: &Listeners) -> Option<Vec<f64>> {
        match self.attribute(name)? {
            AttributeValue::Numbers(v) => Some(v.clone()),
            AttributeValue::Text(s) => {
                let parsed: Result<Vec<f64>, _> = s
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                    .map(str::parse::<f64>)
                    .collect();
                match parsed {
                    Ok(v) => Some(v),
                    Err(e) => {
                        listeners.report(DecoderEvent::IllegalAttributeValue {
                            variable: self.name.clone(),
                            attribute: name.to_string(),
                            value: s.clone(),
                            cause: e.to_string(),
                        });
                        None
                    }
                }
            }
        }
    }

    /// The `units` attribute, if present and not blank.
    pub fn units(&self) -> Option<String> {
        self.attribute_as_string("units")
    }

    pub fn set_units(&mut self, units: impl Into<String>) {
        self.set_attribute("units", units.into());
    }

    pub fn data(&self) -> &VariableData {
        &self.data
    }

    /// Numeric values, or `None` if this variable contains text.
    pub fn values(&self) -> Option<&[f64]> {
        match &self.data {
            VariableData::Numeric(v) => Some(v),
            VariableData::Text(_) => None,
        }
    }

    /// Text values, or `None` if this variable contains numbers.
    pub fn text_values(&self) -> Option<&[String]> {
        match &self.data {
            VariableData::Text(v) => Some(v),
            VariableData::Numeric(_) => None,
        }
    }

    /// Replace the data by numeric values.
    pub fn set_values(&mut self, values: Vec<f64>) {
        self.data = VariableData::Numeric(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::CollectingListener;

    #[test]
    fn test_dimension_identity() {
        let a = Dimension::new("x", 10);
        let b = Dimension::new("x", 10);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_coordinate_variable() {
        let time = Dimension::new("time", 3);
        let var = Variable::new("time", vec![time.clone()]);
        assert!(var.is_coordinate_variable());
        let other = Variable::new("t", vec![time]);
        assert!(!other.is_coordinate_variable());
    }

    #[test]
    fn test_illegal_number_is_reported() {
        let collector = CollectingListener::new();
        let mut listeners = Listeners::new();
        listeners.add(collector.clone());
        let var = Variable::new("lon", Vec::new())
            .with_attribute("resampling_interval", "two")
            .with_attribute("scale", 2.5);
        assert_eq!(var.attribute_as_number("resampling_interval", &listeners), None);
        assert_eq!(var.attribute_as_number("scale", &listeners), Some(2.5));
        assert_eq!(var.attribute_as_number("missing", &listeners), None);
        let events = collector.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            DecoderEvent::IllegalAttributeValue { attribute, value, .. }
                if attribute == "resampling_interval" && value == "two"
        ));
    }

    #[test]
    fn test_blank_units_are_absent() {
        let mut var = Variable::new("v", Vec::new()).with_attribute("units", "  ");
        assert_eq!(var.units(), None);
        var.set_units("days since 1970-01-01");
        assert_eq!(var.units().as_deref(), Some("days since 1970-01-01"));
    }
}
