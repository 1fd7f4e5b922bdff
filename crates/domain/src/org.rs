use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Kinds of organizational nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgKind {
    /// Top-level site (district). Role assignments attach here.
    Site,
    /// School inside a site.
    School,
    /// Class inside a school.
    Class,
    /// Orthogonal grouping that may belong to a site.
    Group,
    /// Family grouping; never site-scoped.
    Family,
}

/// One node in the organization tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgNode {
    /// Node identifier.
    pub id: String,
    /// Node kind.
    pub kind: OrgKind,
    /// Display name.
    pub name: String,
    /// Parent node; `None` for sites and families.
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Read-only snapshot of the site → school → class tree plus groups and families.
#[derive(Debug, Clone, Default)]
pub struct OrgHierarchy {
    nodes: BTreeMap<String, OrgNode>,
}

impl OrgHierarchy {
    /// Builds a hierarchy from a flat node list. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = OrgNode>) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .map(|node| (node.id.clone(), node))
                .collect(),
        }
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, org_id: &str) -> Option<&OrgNode> {
        self.nodes.get(org_id)
    }

    /// Resolves the top-level site that owns `org_id`.
    ///
    /// Families, dangling parents and parent cycles resolve to `None`.
    #[must_use]
    pub fn top_level_site(&self, org_id: &str) -> Option<&str> {
        let mut current = self.nodes.get(org_id)?;
        let mut visited = BTreeSet::new();

        loop {
            if !visited.insert(current.id.as_str()) {
                return None;
            }

            match current.kind {
                OrgKind::Site => return Some(current.id.as_str()),
                OrgKind::Family => return None,
                OrgKind::School | OrgKind::Class | OrgKind::Group => {
                    let parent_id = current.parent_id.as_deref()?;
                    current = self.nodes.get(parent_id)?;
                }
            }
        }
    }

    /// Lists every node below `site_id`, for scoping queries to one site.
    #[must_use]
    pub fn descendants(&self, site_id: &str) -> Vec<&OrgNode> {
        let mut listed: Vec<&OrgNode> = self
            .nodes
            .values()
            .filter(|node| node.id != site_id && self.top_level_site(&node.id) == Some(site_id))
            .collect();
        listed.sort_by(|left, right| left.id.cmp(&right.id));
        listed
    }
}

#[cfg(test)]
mod tests {
    use super::{OrgHierarchy, OrgKind, OrgNode};

    fn node(id: &str, kind: OrgKind, parent_id: Option<&str>) -> OrgNode {
        OrgNode {
            id: id.to_owned(),
            kind,
            name: id.to_uppercase(),
            parent_id: parent_id.map(str::to_owned),
        }
    }

    fn sample() -> OrgHierarchy {
        OrgHierarchy::new([
            node("site-1", OrgKind::Site, None),
            node("school-1", OrgKind::School, Some("site-1")),
            node("class-1", OrgKind::Class, Some("school-1")),
            node("group-1", OrgKind::Group, Some("site-1")),
            node("family-1", OrgKind::Family, None),
            node("site-2", OrgKind::Site, None),
            node("orphan", OrgKind::Class, Some("missing-school")),
        ])
    }

    #[test]
    fn class_resolves_to_owning_site() {
        let hierarchy = sample();
        assert_eq!(hierarchy.top_level_site("class-1"), Some("site-1"));
        assert_eq!(hierarchy.top_level_site("site-2"), Some("site-2"));
    }

    #[test]
    fn families_and_dangling_nodes_have_no_site() {
        let hierarchy = sample();
        assert_eq!(hierarchy.top_level_site("family-1"), None);
        assert_eq!(hierarchy.top_level_site("orphan"), None);
        assert_eq!(hierarchy.top_level_site("unknown"), None);
    }

    #[test]
    fn parent_cycles_do_not_loop() {
        let hierarchy = OrgHierarchy::new([
            node("a", OrgKind::School, Some("b")),
            node("b", OrgKind::Class, Some("a")),
        ]);
        assert_eq!(hierarchy.top_level_site("a"), None);
    }

    #[test]
    fn descendants_lists_site_subtree() {
        let hierarchy = sample();
        let ids: Vec<&str> = hierarchy
            .descendants("site-1")
            .into_iter()
            .map(|node| node.id.as_str())
            .collect();
        assert_eq!(ids, vec!["class-1", "group-1", "school-1"]);
    }
}
