use std::collections::BTreeSet;

use tracing::trace;

use crate::error::{require_non_blank, Error, Result};
use crate::vra::{ActionId, CatalogResource, ResourceAction, ResourceId, TENANT_PREFIX_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatch {
    #[default]
    Exact,
    IgnoreCase,
}

impl NameMatch {
    pub fn from_flag(ignore_case: bool) -> Self {
        if ignore_case {
            NameMatch::IgnoreCase
        } else {
            NameMatch::Exact
        }
    }
}

/// Compares a catalog name with the requested machine, skipping the tenant prefix.
///
/// The comparison is literal, so names containing `.`, `*` or `(` only match themselves.
pub fn machine_name_matches(catalog_name: &str, machine: &str, mode: NameMatch) -> bool {
    let Some((offset, _)) = catalog_name.char_indices().nth(TENANT_PREFIX_LEN) else {
        return false;
    };
    let name = &catalog_name[offset..];

    match mode {
        NameMatch::Exact => name == machine,
        NameMatch::IgnoreCase => name.to_lowercase() == machine.to_lowercase(),
    }
}

pub fn find_vm_resource(
    resources: &[CatalogResource],
    machine: &str,
    mode: NameMatch,
) -> Result<ResourceId> {
    let mut matches = resources
        .iter()
        .filter(|resource| resource.is_virtual_machine())
        .filter(|resource| machine_name_matches(&resource.name, machine, mode));

    let Some(found) = matches.next() else {
        return Err(Error::ResourceNotFound(machine.to_string()));
    };

    let mut ids: BTreeSet<&str> = matches.map(|other| other.id.as_str()).collect();
    ids.insert(&found.id);
    if ids.len() > 1 {
        return Err(Error::AmbiguousResource {
            name: machine.to_string(),
            count: ids.len(),
        });
    }

    trace!("Catalog resource {} is {}", found.name, found.id);
    require_non_blank("machineID", &found.id)?;
    Ok(ResourceId(found.id.clone()))
}

pub fn find_snapshot_action(actions: &[ResourceAction]) -> Result<ActionId> {
    let action = actions
        .iter()
        .find(|action| action.is_create_snapshot())
        .ok_or(Error::ActionNotFound)?;

    require_non_blank("Create Snapshot Action ID", &action.id)?;
    Ok(ActionId(action.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn resources(machines: &[(&str, &str)]) -> Vec<CatalogResource> {
        let page: crate::vra::Page<CatalogResource> =
            serde_json::from_str(&testing::resources_body(machines)).unwrap();
        page.content
    }

    #[test]
    fn prefix_is_skipped_before_comparing() {
        assert!(machine_name_matches("ACMweb01", "web01", NameMatch::Exact));
        assert!(!machine_name_matches("ACMweb01", "ACMweb01", NameMatch::Exact));
        assert!(!machine_name_matches("AC", "", NameMatch::Exact));
    }

    #[test]
    fn prefix_counts_characters_not_bytes() {
        assert!(machine_name_matches("ÄÖÜweb01", "web01", NameMatch::Exact));
    }

    #[test]
    fn equality_not_containment() {
        assert!(!machine_name_matches("ACMweb01-old", "web01", NameMatch::Exact));
        assert!(!machine_name_matches("ACMweb0", "web01", NameMatch::Exact));
    }

    #[test]
    fn metacharacters_are_literal() {
        assert!(!machine_name_matches("ACMwebX01", "web.01", NameMatch::Exact));
        assert!(machine_name_matches("ACMweb.01", "web.01", NameMatch::Exact));
        assert!(!machine_name_matches("ACMweb01", "web.*", NameMatch::IgnoreCase));
    }

    #[test]
    fn case_folding_is_opt_in() {
        assert!(!machine_name_matches("ACMWeb01", "web01", NameMatch::Exact));
        assert!(machine_name_matches("ACMWeb01", "web01", NameMatch::IgnoreCase));
    }

    #[test]
    fn finds_vm_and_ignores_deployments() {
        let list = resources(&[("ACMweb01", testing::VM_ID)]);
        let id = find_vm_resource(&list, "web01", NameMatch::Exact).unwrap();
        assert_eq!(id.to_string(), testing::VM_ID);
    }

    #[test]
    fn similar_names_do_not_shadow_target() {
        let list = resources(&[
            ("ACMweb01-old", "11111111-2222-3333-4444-555555555555"),
            ("ACMweb011", "66666666-7777-8888-9999-000000000000"),
            ("ACMweb01", testing::VM_ID),
        ]);
        let id = find_vm_resource(&list, "web01", NameMatch::Exact).unwrap();
        assert_eq!(id.to_string(), testing::VM_ID);
    }

    #[test]
    fn missing_machine_is_named() {
        let list = resources(&[("ACMweb01", testing::VM_ID)]);
        let err = find_vm_resource(&list, "db01", NameMatch::Exact).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to find Catalog Resource id for virtual machine \"db01\""
        );
    }

    #[test]
    fn case_insensitive_match_only_when_enabled() {
        let list = resources(&[("ACMWEB01", testing::VM_ID)]);
        assert!(matches!(
            find_vm_resource(&list, "web01", NameMatch::Exact),
            Err(Error::ResourceNotFound(_))
        ));
        assert!(find_vm_resource(&list, "web01", NameMatch::IgnoreCase).is_ok());
    }

    #[test]
    fn two_distinct_matches_are_ambiguous() {
        let list = resources(&[
            ("ACMweb01", testing::VM_ID),
            ("XYZWEB01", "66666666-7777-8888-9999-000000000000"),
        ]);
        assert!(find_vm_resource(&list, "web01", NameMatch::Exact).is_ok());
        assert!(matches!(
            find_vm_resource(&list, "web01", NameMatch::IgnoreCase),
            Err(Error::AmbiguousResource { count: 2, .. })
        ));
    }

    #[test]
    fn ambiguity_counts_distinct_ids() {
        let list = resources(&[
            ("ACMweb01", testing::VM_ID),
            ("XYZweb01", "66666666-7777-8888-9999-000000000000"),
            ("QRSweb01", "66666666-7777-8888-9999-000000000000"),
        ]);
        let err = find_vm_resource(&list, "web01", NameMatch::Exact).unwrap_err();
        assert!(matches!(err, Error::AmbiguousResource { count: 2, .. }));
        assert_eq!(
            err.to_string(),
            "Found 2 Catalog Resources for virtual machine \"web01\", expected one"
        );
    }

    #[test]
    fn duplicate_rows_of_one_vm_are_not_ambiguous() {
        let list = resources(&[("ACMweb01", testing::VM_ID), ("XYZweb01", testing::VM_ID)]);
        let id = find_vm_resource(&list, "web01", NameMatch::Exact).unwrap();
        assert_eq!(id.to_string(), testing::VM_ID);
    }

    #[test]
    fn picks_create_snapshot_action() {
        let page: crate::vra::Page<ResourceAction> =
            serde_json::from_str(&testing::actions_body(true)).unwrap();
        let id = find_snapshot_action(&page.content).unwrap();
        assert_eq!(id.to_string(), testing::ACTION_ID);
    }

    #[test]
    fn snapshot_action_must_be_of_action_kind() {
        let actions: Vec<ResourceAction> = serde_json::from_value(serde_json::json!([
            {"name": "Create VM Snapshot", "type": "REQUEST", "id": testing::ACTION_ID}
        ]))
        .unwrap();
        assert!(matches!(
            find_snapshot_action(&actions),
            Err(Error::ActionNotFound)
        ));
    }

    #[test]
    fn absent_snapshot_action_fails() {
        let page: crate::vra::Page<ResourceAction> =
            serde_json::from_str(&testing::actions_body(false)).unwrap();
        assert!(matches!(
            find_snapshot_action(&page.content),
            Err(Error::ActionNotFound)
        ));
    }
}
