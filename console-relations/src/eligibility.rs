//! Which servers may join a node pool.

use console_core::ResourceId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Master,
    Worker,
    Bastion,
    /// A role this client does not know; never matches a pool role.
    #[serde(other)]
    Unknown,
}

/// A pool without a role accepts any server; otherwise the roles must match.
pub fn can_attach_to_pool(pool_role: Option<NodeRole>, server_role: Option<NodeRole>) -> bool {
    match (pool_role, server_role) {
        (None, _) => true,
        (Some(NodeRole::Unknown), _) | (_, Some(NodeRole::Unknown)) => false,
        (Some(pool), Some(server)) => pool == server,
        (Some(_), None) => false,
    }
}

/// Server fields needed to pick pool members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub id: ResourceId,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub role: Option<NodeRole>,
}

/// Candidates that may be attached to a pool with `pool_role`, in input order.
pub fn eligible_servers(
    pool_role: Option<NodeRole>,
    servers: &[ServerSummary],
) -> Vec<&ServerSummary> {
    servers
        .iter()
        .filter(|s| can_attach_to_pool(pool_role, s.role))
        .collect()
}

/// Selected ids that do not name an eligible server.
///
/// Ids missing from `servers` are reported too, since their role cannot be checked.
pub fn ineligible_selection<'a, I>(
    pool_role: Option<NodeRole>,
    servers: &[ServerSummary],
    selected: I,
) -> Vec<ResourceId>
where
    I: IntoIterator<Item = &'a ResourceId>,
{
    selected
        .into_iter()
        .filter(|id| {
            !servers
                .iter()
                .any(|s| &s.id == *id && can_attach_to_pool(pool_role, s.role))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(id: &str, role: Option<NodeRole>) -> ServerSummary {
        ServerSummary {
            id: ResourceId::from(id),
            hostname: Some(format!("{id}.internal")),
            role,
        }
    }

    #[test]
    fn pool_without_role_accepts_anything() {
        assert!(can_attach_to_pool(None, Some(NodeRole::Master)));
        assert!(can_attach_to_pool(None, Some(NodeRole::Bastion)));
        assert!(can_attach_to_pool(None, None));
    }

    #[test]
    fn roles_must_match() {
        assert!(can_attach_to_pool(Some(NodeRole::Worker), Some(NodeRole::Worker)));
        assert!(!can_attach_to_pool(Some(NodeRole::Worker), Some(NodeRole::Master)));
        assert!(!can_attach_to_pool(Some(NodeRole::Master), None));
        assert!(!can_attach_to_pool(Some(NodeRole::Unknown), Some(NodeRole::Unknown)));
    }

    #[test]
    fn unknown_roles_deserialize() {
        let s: ServerSummary =
            serde_json::from_str(r#"{"id":"s-1","role":"gpu"}"#).expect("valid summary");
        assert_eq!(s.role, Some(NodeRole::Unknown));
        let s: ServerSummary = serde_json::from_str(r#"{"id":"s-2"}"#).expect("valid summary");
        assert_eq!(s.role, None);
    }

    #[test]
    fn filters_candidates_in_order() {
        let servers = vec![
            server("w1", Some(NodeRole::Worker)),
            server("m1", Some(NodeRole::Master)),
            server("w2", Some(NodeRole::Worker)),
        ];
        let ids: Vec<_> = eligible_servers(Some(NodeRole::Worker), &servers)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["w1", "w2"]);
        assert_eq!(eligible_servers(None, &servers).len(), 3);
    }

    #[test]
    fn reports_ineligible_and_unknown_selection() {
        let servers = vec![
            server("w1", Some(NodeRole::Worker)),
            server("m1", Some(NodeRole::Master)),
        ];
        let selected = [ResourceId::from("w1"), ResourceId::from("m1"), ResourceId::from("gone")];
        assert_eq!(
            ineligible_selection(Some(NodeRole::Worker), &servers, &selected),
            vec![ResourceId::from("m1"), ResourceId::from("gone")]
        );
    }
}
