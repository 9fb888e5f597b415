//! Participant and expense listings over a registry payload
use super::registry::{RegistryPayload, UnallocatedPolicy};
use std::collections::BTreeMap;

/// Maps membership ids to participant names.
pub fn users(payload: &RegistryPayload) -> BTreeMap<String, String> {
    payload
        .memberships()
        .filter_map(|membership| {
            let id = membership.id()?;
            let name = membership
                .pointer_name()
                .unwrap_or_else(|| membership.display_name());
            Some((id, name.to_string()))
        })
        .collect()
}

/// Amounts of every non-refund entry.
///
/// With `user_id`, each entry yields that participant's allocation amount
/// instead; when several allocations match, the last one wins. Entries
/// without a matching allocation are left out.
pub fn expense_amounts(payload: &RegistryPayload, user_id: Option<&str>) -> Vec<f64> {
    let unallocated = UnallocatedPolicy::Exclude;
    payload
        .entries()
        .filter(|entry| !entry.is_balance())
        .filter_map(|entry| {
            let Some(user_id) = user_id else {
                return Some(entry.amount());
            };
            let is_user = |id: Option<String>| id.as_deref() == Some(user_id);
            entry
                .allocations()
                .filter(|allocation| is_user(allocation.membership().id()))
                .last()
                .map(|allocation| allocation.amount())
                .or_else(|| {
                    unallocated
                        .fallback(&entry)
                        .filter(|member| is_user(member.id()))
                        .map(|_| entry.amount())
                })
        })
        .collect()
}

/// Sum of the expense amounts of every member, keyed by member name.
pub fn expense_totals_per_user(payload: &RegistryPayload) -> BTreeMap<String, f64> {
    users(payload)
        .into_iter()
        .map(|(id, name)| (name, expense_amounts(payload, Some(&id)).iter().sum::<f64>()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> RegistryPayload {
        let alice = json!({"RegistryMembershipNonUser": {"id": 1, "alias": {"display_name": "Alice", "pointer": {"name": "Alice Liddell"}}}});
        let bob = json!({"RegistryMembershipNonUser": {"id": 2, "alias": {"display_name": "Bob"}}});
        RegistryPayload::new(json!({
            "Response": [{
                "Registry": {
                    "memberships": [alice, bob, {"RegistryMembershipNonUser": {"alias": {}}}],
                    "all_registry_entry": [
                        {"RegistryEntry": {
                            "id": 1,
                            "amount": {"value": "-30.00"},
                            "type_transaction": "NORMAL",
                            "membership_owned": alice,
                            "allocations": [
                                {"amount": {"value": "-20.00"}, "membership": alice},
                                {"amount": {"value": "-10.00"}, "membership": bob}
                            ]
                        }},
                        {"RegistryEntry": {
                            "id": 2,
                            "amount": {"value": "-15.00"},
                            "type_transaction": "BALANCE",
                            "membership_owned": bob,
                            "allocations": [{"amount": {"value": "-15.00"}, "membership": alice}]
                        }},
                        {"RegistryEntry": {
                            "id": 3,
                            "amount": {"value": "-8.00"},
                            "type_transaction": "NORMAL",
                            "membership_owned": bob,
                            "allocations": [{"amount": {"value": "-8.00"}, "membership": bob}]
                        }}
                    ]
                }
            }]
        }))
    }

    #[test]
    fn test_users() {
        let users = users(&sample_payload());
        assert_eq!(users.len(), 2);
        assert_eq!(users.get("1").map(String::as_str), Some("Alice Liddell"));
        assert_eq!(users.get("2").map(String::as_str), Some("Bob"));
    }

    #[test]
    fn test_expense_amounts_skip_refunds() {
        assert_eq!(expense_amounts(&sample_payload(), None), vec![-30.0, -8.0]);
    }

    #[test]
    fn test_expense_amounts_per_user() {
        let payload = sample_payload();
        assert_eq!(expense_amounts(&payload, Some("1")), vec![-20.0]);
        assert_eq!(expense_amounts(&payload, Some("2")), vec![-10.0, -8.0]);
        assert!(expense_amounts(&payload, Some("42")).is_empty());
    }

    #[test]
    fn test_payer_without_allocation_gets_nothing() {
        let unallocated = RegistryPayload::new(json!({
            "Response": [{"Registry": {"all_registry_entry": [
                {"RegistryEntry": {
                    "amount": {"value": "-9.00"},
                    "type_transaction": "NORMAL",
                    "membership_owned": {"RegistryMembershipNonUser": {"id": 1}},
                    "allocations": []
                }}
            ]}}]
        }));
        assert!(expense_amounts(&unallocated, Some("1")).is_empty());
        assert_eq!(expense_amounts(&unallocated, None), vec![-9.0]);
    }

    #[test]
    fn test_expense_totals_per_user() {
        let totals = expense_totals_per_user(&sample_payload());
        assert_eq!(totals.len(), 2);
        assert_eq!(totals.get("Alice Liddell"), Some(&-20.0));
        assert_eq!(totals.get("Bob"), Some(&-18.0));
    }

    #[test]
    fn test_expense_amounts_empty_payload() {
        assert!(expense_amounts(&RegistryPayload::default(), None).is_empty());
        assert!(users(&RegistryPayload::default()).is_empty());
    }
}
