//! HTTP handlers

pub mod health;
pub mod menus;
pub mod pages;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that distinguishes "absent" from "present but
/// null": absent stays `None`, an explicit `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
