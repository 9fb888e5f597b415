//! Registry payload and read-only views over its records

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

/// Label used whenever a name or category cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

static MISSING: Value = Value::Null;

/// The raw registry document as returned by the Tricount API.
///
/// The document is kept as untyped JSON: records are read through the
/// borrowed views below, so a malformed record degrades to defaults
/// instead of rejecting the whole payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryPayload(Value);

impl RegistryPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value = serde_json::from_str(json).context("Failed to parse registry payload")?;
        Ok(Self(value))
    }

    fn registry(&self) -> Option<&Value> {
        self.0.get("Response")?.get(0)?.get("Registry")
    }

    /// Entries of the first registry in the response.
    pub fn entries(&self) -> impl Iterator<Item = RegistryEntry<'_>> {
        self.registry()
            .and_then(|registry| registry.get("all_registry_entry"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|wrapper| wrapper.get("RegistryEntry"))
            .map(RegistryEntry)
    }

    /// Memberships of the first registry in the response.
    pub fn memberships(&self) -> impl Iterator<Item = Membership<'_>> {
        self.registry()
            .and_then(|registry| registry.get("memberships"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(Membership)
    }
}

/// Source of registry payloads.
#[async_trait]
pub trait RegistryProvider: Send + Sync {
    async fn fetch_registry(&self) -> Result<RegistryPayload>;
}

/// What a caller does with an entry that carries no allocation for the
/// participant it is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnallocatedPolicy {
    /// The payer is the sole beneficiary of the whole entry.
    AttributeToPayer,
    /// The entry is left out.
    Exclude,
}

impl UnallocatedPolicy {
    /// The participant an unallocated entry falls back to, if any.
    pub fn fallback<'a>(self, entry: &RegistryEntry<'a>) -> Option<Membership<'a>> {
        match self {
            UnallocatedPolicy::AttributeToPayer => Some(entry.payer()),
            UnallocatedPolicy::Exclude => None,
        }
    }
}

/// One transaction of the registry.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry<'a>(&'a Value);

impl<'a> RegistryEntry<'a> {
    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(scalar_to_string)
    }

    /// Entries count when their status is `ACTIVE` or not set at all.
    ///
    /// Empty values (`""`, `false`, `0`, `[]`, `{}`) read as not set.
    pub fn is_active(&self) -> bool {
        match self.0.get("status") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => true,
            Some(Value::String(status)) => status.is_empty() || status == "ACTIVE",
            Some(Value::Number(number)) => number.as_f64() == Some(0.0),
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Object(fields)) => fields.is_empty(),
            Some(Value::Bool(true)) => false,
        }
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.0.get("date").and_then(Value::as_str).and_then(parse_entry_date)
    }

    pub fn amount(&self) -> f64 {
        extract_amount(self.0)
    }

    /// Custom category first, then the standard one.
    pub fn category(&self) -> &'a str {
        non_empty_str(self.0.get("category_custom"))
            .or_else(|| non_empty_str(self.0.get("category")))
            .unwrap_or(UNKNOWN)
    }

    /// The membership that paid for the entry.
    pub fn payer(&self) -> Membership<'a> {
        Membership(self.0.get("membership_owned").unwrap_or(&MISSING))
    }

    /// Refunds between participants.
    pub fn is_balance(&self) -> bool {
        self.0.get("type_transaction").and_then(Value::as_str) == Some("BALANCE")
    }

    pub fn allocations(&self) -> impl Iterator<Item = Allocation<'a>> + use<'a> {
        self.0
            .get("allocations")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(Allocation)
    }
}

/// Share of an entry assigned to one participant.
#[derive(Debug, Clone, Copy)]
pub struct Allocation<'a>(&'a Value);

impl<'a> Allocation<'a> {
    pub fn amount(&self) -> f64 {
        extract_amount(self.0)
    }

    pub fn membership(&self) -> Membership<'a> {
        Membership(self.0.get("membership").unwrap_or(&MISSING))
    }
}

/// A participant wrapper, e.g. `{"RegistryMembershipNonUser": {...}}`.
#[derive(Debug, Clone, Copy)]
pub struct Membership<'a>(&'a Value);

impl<'a> Membership<'a> {
    fn non_user(&self) -> Option<&'a Value> {
        self.0.get("RegistryMembershipNonUser")
    }

    pub fn id(&self) -> Option<String> {
        self.non_user()?.get("id").and_then(scalar_to_string)
    }

    pub fn display_name(&self) -> &'a str {
        display_name(self.0)
    }

    /// Name of the alias pointer, which the member list uses.
    pub fn pointer_name(&self) -> Option<&'a str> {
        non_empty_str(self.non_user()?.get("alias")?.get("pointer")?.get("name"))
    }
}

/// Resolves a monetary value from an entry or allocation.
///
/// `amount_local.value` wins when present and not null, then
/// `amount.value`. Numbers and numeric strings are accepted; anything else
/// reads as zero.
pub fn extract_amount(record: &Value) -> f64 {
    let local = record
        .get("amount_local")
        .and_then(|amount| amount.get("value"))
        .filter(|value| !value.is_null());
    let value = local.or_else(|| record.get("amount").and_then(|amount| amount.get("value")));

    value.and_then(numeric_value).unwrap_or(0.0)
}

/// Display name of a membership wrapper, or [`UNKNOWN`].
pub fn display_name(membership: &Value) -> &str {
    let name = membership
        .get("RegistryMembershipNonUser")
        .and_then(|non_user| non_user.get("alias"))
        .and_then(|alias| alias.get("display_name"));
    non_empty_str(name).unwrap_or(UNKNOWN)
}

/// Parses the registry timestamp format, fractional seconds optional.
pub fn parse_entry_date(date: &str) -> Option<NaiveDateTime> {
    if date.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(date, format).ok())
}

fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}
