//! Conversion between [`AttrValue`] and DynamoDB's typed `AttributeValue`.
//!
//! Numbers travel as decimal strings. On read, a number containing `.`,
//! `e` or `E` is a [`AttrValue::Float`]; otherwise it is an
//! [`AttrValue::Int`] when it fits 32 bits and [`AttrValue::Long`] when it
//! fits 64. Anything wider comes back as its string form.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::capability::{AttrValue, CapabilityError, Item, Result};

pub type WireItem = HashMap<String, AttributeValue>;

pub fn to_attribute(value: &AttrValue) -> Result<AttributeValue> {
    Ok(match value {
        AttrValue::Null => AttributeValue::Null(true),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::Int(v) => AttributeValue::N(v.to_string()),
        AttrValue::Long(v) => AttributeValue::N(v.to_string()),
        AttrValue::Float(v) => {
            if !v.is_finite() {
                return Err(CapabilityError::InvalidArgument(format!(
                    "non-finite number {v} cannot be stored"
                )));
            }
            // Debug keeps the decimal point on whole floats ("30.0")
            AttributeValue::N(format!("{v:?}"))
        }
        AttrValue::String(s) => AttributeValue::S(s.clone()),
        AttrValue::Binary(bytes) => AttributeValue::B(Blob::new(bytes.clone())),
        AttrValue::List(items) => {
            AttributeValue::L(items.iter().map(to_attribute).collect::<Result<_>>()?)
        }
        AttrValue::Map(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_attribute(v)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

pub fn to_item(item: &Item) -> Result<WireItem> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), to_attribute(v)?)))
        .collect()
}

pub fn from_attribute(value: AttributeValue) -> AttrValue {
    match value {
        AttributeValue::S(s) => AttrValue::String(s),
        AttributeValue::N(n) => parse_number(&n),
        AttributeValue::Bool(b) => AttrValue::Bool(b),
        AttributeValue::Null(_) => AttrValue::Null,
        AttributeValue::B(blob) => AttrValue::Binary(blob.into_inner()),
        AttributeValue::L(items) => AttrValue::List(items.into_iter().map(from_attribute).collect()),
        AttributeValue::M(map) => AttrValue::Map(
            map.into_iter()
                .map(|(k, v)| (k, from_attribute(v)))
                .collect(),
        ),
        AttributeValue::Ss(set) => AttrValue::List(set.into_iter().map(AttrValue::String).collect()),
        AttributeValue::Ns(set) => AttrValue::List(set.iter().map(|n| parse_number(n)).collect()),
        AttributeValue::Bs(set) => AttrValue::List(
            set.into_iter()
                .map(|b| AttrValue::Binary(b.into_inner()))
                .collect(),
        ),
        other => AttrValue::String(format!("{other:?}")),
    }
}

pub fn from_item(item: WireItem) -> Item {
    item.into_iter()
        .map(|(k, v)| (k, from_attribute(v)))
        .collect()
}

pub fn parse_number(n: &str) -> AttrValue {
    if n.contains(['.', 'e', 'E']) {
        return match n.parse::<f64>() {
            Ok(v) => AttrValue::Float(v),
            Err(_) => AttrValue::String(n.to_string()),
        };
    }
    match n.parse::<i64>() {
        Ok(v) => match i32::try_from(v) {
            Ok(small) => AttrValue::Int(small),
            Err(_) => AttrValue::Long(v),
        },
        Err(_) => AttrValue::String(n.to_string()),
    }
}
