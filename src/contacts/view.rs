//! Projection of a settled cluster into its public view

use super::types::{ClusterView, Contact, ContactId};
use std::collections::HashSet;

/// Build the deduplicated view of `primary`'s cluster.
///
/// The primary's own email and phone come first; the remaining values
/// follow in cluster order with duplicates removed. Pure: the same input
/// always yields the same output.
pub fn project(primary: &Contact, cluster: &[Contact]) -> ClusterView {
    let primary_contact_id = primary.root_id();

    let emails = collect_values(primary.email.as_deref(), cluster, |c| c.email.as_deref());
    let phone_numbers = collect_values(primary.phone_number.as_deref(), cluster, |c| {
        c.phone_number.as_deref()
    });

    let mut seen = HashSet::new();
    let secondary_contact_ids: Vec<ContactId> = cluster
        .iter()
        .filter(|c| c.is_secondary() && c.linked_id == Some(primary_contact_id))
        .map(|c| c.id)
        .filter(|id| seen.insert(*id))
        .collect();

    ClusterView {
        primary_contact_id,
        emails,
        phone_numbers,
        secondary_contact_ids,
    }
}

fn collect_values<'a>(
    lead: Option<&'a str>,
    cluster: &'a [Contact],
    field: impl Fn(&'a Contact) -> Option<&'a str>,
) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut values = Vec::new();

    for value in lead.into_iter().chain(cluster.iter().filter_map(field)) {
        if seen.insert(value) {
            values.push(value.to_string());
        }
    }
    values
}
