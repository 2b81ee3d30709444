// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! RDF term model
//!
//! Values are immutable and compared by content:
//! - IRIs
//! - Blank nodes
//! - Literals (lexical label, datatype IRI, optional language tag)

use super::vocab;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    label: String,
    datatype: String,
    language: Option<String>,
}

impl Literal {
    /// Create a plain `xsd:string` literal
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            datatype: vocab::XSD_STRING.to_string(),
            language: None,
        }
    }

    /// Create a literal with an explicit datatype
    pub fn typed(label: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// Create a language-tagged string
    pub fn lang(label: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            datatype: vocab::RDF_LANG_STRING.to_string(),
            language: Some(language.into().to_ascii_lowercase()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// True for `xsd:string` and language-tagged strings
    pub fn is_string(&self) -> bool {
        self.datatype == vocab::XSD_STRING || self.datatype == vocab::RDF_LANG_STRING
    }

    /// Numeric interpretation, if the datatype is numeric and the label parses
    pub fn numeric(&self) -> Option<Numeric> {
        let label = self.label.trim();
        match vocab::numeric_kind(&self.datatype)? {
            NumericKind::Integer => label.parse::<i64>().ok().map(Numeric::Integer),
            NumericKind::Decimal => label.parse::<f64>().ok().map(Numeric::Decimal),
            NumericKind::Double => parse_double(label).map(Numeric::Double),
        }
    }

    /// Boolean interpretation of an `xsd:boolean` literal
    pub fn boolean(&self) -> Option<bool> {
        if self.datatype != vocab::XSD_BOOLEAN {
            return None;
        }
        match self.label.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Timestamp interpretation of an `xsd:dateTime` literal
    pub fn date_time(&self) -> Option<DateTime<FixedOffset>> {
        if self.datatype != vocab::XSD_DATE_TIME {
            return None;
        }
        let label = self.label.trim();
        DateTime::parse_from_rfc3339(label)
            .ok()
            // Timezone-less values are read as UTC
            .or_else(|| DateTime::parse_from_rfc3339(&format!("{}Z", label)).ok())
    }
}

fn parse_double(label: &str) -> Option<f64> {
    match label {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

/// Numeric type class, used for arithmetic type promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericKind {
    Integer,
    Decimal,
    Double,
}

/// Numeric literal value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Decimal(f64),
    Double(f64),
}

impl Numeric {
    pub fn kind(&self) -> NumericKind {
        match self {
            Numeric::Integer(_) => NumericKind::Integer,
            Numeric::Decimal(_) => NumericKind::Decimal,
            Numeric::Double(_) => NumericKind::Double,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Numeric::Integer(i) => *i as f64,
            Numeric::Decimal(d) | Numeric::Double(d) => *d,
        }
    }

    /// Widen to the given kind (never narrows)
    pub fn promote(&self, kind: NumericKind) -> Numeric {
        match (kind.max(self.kind()), self) {
            (NumericKind::Integer, Numeric::Integer(i)) => Numeric::Integer(*i),
            (NumericKind::Decimal, n) => Numeric::Decimal(n.as_f64()),
            (_, n) => Numeric::Double(n.as_f64()),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Numeric::Integer(i) => *i == 0,
            Numeric::Decimal(d) | Numeric::Double(d) => *d == 0.0,
        }
    }

    /// Convert back into a literal value
    pub fn into_value(self) -> Value {
        match self {
            Numeric::Integer(i) => Value::integer(i),
            Numeric::Decimal(d) => Value::typed_literal(format_decimal(d), vocab::XSD_DECIMAL),
            Numeric::Double(d) => Value::double(d),
        }
    }
}

fn format_decimal(d: f64) -> String {
    if d.fract() == 0.0 && d.is_finite() {
        format!("{:.1}", d)
    } else {
        format!("{}", d)
    }
}

/// RDF term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Iri(String),
    BNode(String),
    Literal(Literal),
}

impl Value {
    pub fn iri(iri: impl Into<String>) -> Self {
        Value::Iri(iri.into())
    }

    pub fn bnode(id: impl Into<String>) -> Self {
        Value::BNode(id.into())
    }

    /// Plain string literal
    pub fn literal(label: impl Into<String>) -> Self {
        Value::Literal(Literal::new(label))
    }

    pub fn typed_literal(label: impl Into<String>, datatype: impl Into<String>) -> Self {
        Value::Literal(Literal::typed(label, datatype))
    }

    pub fn lang_literal(label: impl Into<String>, language: impl Into<String>) -> Self {
        Value::Literal(Literal::lang(label, language))
    }

    pub fn integer(value: i64) -> Self {
        Value::typed_literal(value.to_string(), vocab::XSD_INTEGER)
    }

    pub fn double(value: f64) -> Self {
        let label = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value > 0.0 { "INF" } else { "-INF" }.to_string()
        } else {
            format!("{:E}", value)
        };
        Value::typed_literal(label, vocab::XSD_DOUBLE)
    }

    pub fn boolean(value: bool) -> Self {
        Value::typed_literal(value.to_string(), vocab::XSD_BOOLEAN)
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Value::Iri(_))
    }

    pub fn is_bnode(&self) -> bool {
        matches!(self, Value::BNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Value::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Numeric interpretation if this is a numeric literal
    pub fn as_numeric(&self) -> Option<Numeric> {
        self.as_literal().and_then(Literal::numeric)
    }

    /// Lexical form: the IRI, the blank node id or the literal label
    pub fn string_value(&self) -> &str {
        match self {
            Value::Iri(s) | Value::BNode(s) => s,
            Value::Literal(l) => l.label(),
        }
    }

    /// Get the type name of this value (for diagnostics)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Iri(_) => "IRI",
            Value::BNode(_) => "BNode",
            Value::Literal(_) => "Literal",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(iri) => write!(f, "<{}>", iri),
            Value::BNode(id) => write!(f, "_:{}", id),
            Value::Literal(l) => {
                write!(f, "\"{}\"", l.label.escape_default())?;
                if let Some(lang) = &l.language {
                    write!(f, "@{}", lang)
                } else if l.datatype != vocab::XSD_STRING {
                    write!(f, "^^<{}>", l.datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::literal(value)
    }
}

/// Statement (triple or quad)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Value,
    pub predicate: Value,
    pub object: Value,
    /// Named graph, `None` for the default graph
    pub context: Option<Value>,
}

impl Statement {
    pub fn new(subject: Value, predicate: Value, object: Value) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: None,
        }
    }

    pub fn in_context(subject: Value, predicate: Value, object: Value, context: Value) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: Some(context),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(ctx) = &self.context {
            write!(f, " {}", ctx)?;
        }
        write!(f, " .")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_literals() {
        assert_eq!(Value::integer(42).as_numeric(), Some(Numeric::Integer(42)));
        assert_eq!(
            Value::typed_literal("1.5", vocab::XSD_DECIMAL).as_numeric(),
            Some(Numeric::Decimal(1.5))
        );
        assert_eq!(
            Value::typed_literal("-7", vocab::XSD_INT).as_numeric(),
            Some(Numeric::Integer(-7))
        );
        assert_eq!(Value::literal("42").as_numeric(), None);
        assert_eq!(Value::iri("http://example.org/a").as_numeric(), None);
    }

    #[test]
    fn test_numeric_promotion() {
        let i = Numeric::Integer(3);
        assert_eq!(i.promote(NumericKind::Integer), Numeric::Integer(3));
        assert_eq!(i.promote(NumericKind::Decimal), Numeric::Decimal(3.0));
        assert_eq!(i.promote(NumericKind::Double), Numeric::Double(3.0));
        // Never narrows
        assert_eq!(
            Numeric::Double(2.5).promote(NumericKind::Integer),
            Numeric::Double(2.5)
        );
    }

    #[test]
    fn test_content_equality() {
        assert_eq!(Value::iri("http://a"), Value::iri(String::from("http://a")));
        assert_ne!(Value::iri("http://a"), Value::literal("http://a"));
        assert_ne!(Value::literal("1"), Value::integer(1));
        assert_eq!(Value::lang_literal("chat", "FR"), Value::lang_literal("chat", "fr"));
    }

    #[test]
    fn test_date_time_literal() {
        let v = Value::typed_literal("2024-03-01T10:00:00Z", vocab::XSD_DATE_TIME);
        assert!(v.as_literal().unwrap().date_time().is_some());

        let local = Value::typed_literal("2024-03-01T10:00:00", vocab::XSD_DATE_TIME);
        assert!(local.as_literal().unwrap().date_time().is_some());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::iri("http://a").to_string(), "<http://a>");
        assert_eq!(Value::literal("x").to_string(), "\"x\"");
        assert_eq!(Value::lang_literal("x", "en").to_string(), "\"x\"@en");
        assert_eq!(
            Value::integer(1).to_string(),
            format!("\"1\"^^<{}>", vocab::XSD_INTEGER)
        );
    }
}
