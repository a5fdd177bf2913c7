use crate::schema::{AsinRecord, AsinSelection};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct ChildInfo {
    seller_id: i64,
    normalized_name: String,
    variant_name: String,
    title: String,
}

/// Child-to-parent and parent-to-children lookups built once from the ASIN
/// table; immutable for the lifetime of one engine instance.
#[derive(Debug, Clone, Default)]
pub struct AsinHierarchy {
    parent_to_children: BTreeMap<String, Vec<String>>,
    child_info: BTreeMap<String, ChildInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildDetail {
    pub child_asin: String,
    pub variant_name: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentGroup {
    pub normalized_name: String,
    pub children: Vec<ChildDetail>,
    pub child_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerSummary {
    pub seller_id: i64,
    pub seller_name: String,
    pub marketplace: String,
    pub asin_count: usize,
    pub parent_asin_count: usize,
    pub product_count: usize,
}

impl AsinHierarchy {
    pub fn from_records(records: &[AsinRecord]) -> Self {
        let mut hierarchy = AsinHierarchy::default();

        for record in records {
            if record.normalized_name.is_empty() || record.child_asin.is_empty() {
                continue;
            }

            let children = hierarchy
                .parent_to_children
                .entry(record.normalized_name.clone())
                .or_default();
            if !children.contains(&record.child_asin) {
                children.push(record.child_asin.clone());
            }

            hierarchy
                .child_info
                .entry(record.child_asin.clone())
                .or_insert_with(|| ChildInfo {
                    seller_id: record.seller_id,
                    normalized_name: record.normalized_name.clone(),
                    variant_name: record.variant_name.clone(),
                    title: record.title.clone(),
                });
        }

        hierarchy
    }

    /// Parent (normalized name) of a child ASIN, if the ASIN table knows it.
    pub fn parent_of(&self, child_asin: &str) -> Option<&str> {
        self.child_info
            .get(child_asin)
            .map(|info| info.normalized_name.as_str())
    }

    pub fn variant_of(&self, child_asin: &str) -> Option<&str> {
        self.child_info
            .get(child_asin)
            .map(|info| info.variant_name.as_str())
    }

    pub fn children_of(&self, normalized_name: &str) -> &[String] {
        self.parent_to_children
            .get(normalized_name)
            .map(|children| children.as_slice())
            .unwrap_or(&[])
    }

    /// Expand a selection into the full set of child ASINs: every requested
    /// parent cascades to its children, unioned with explicit child ASINs.
    /// Unknown parent names contribute nothing.
    pub fn expand(&self, selection: &AsinSelection) -> BTreeSet<String> {
        let mut children: BTreeSet<String> = selection.child_asins.iter().cloned().collect();

        for parent in &selection.parent_names {
            if let Some(kids) = self.parent_to_children.get(parent) {
                children.extend(kids.iter().cloned());
            }
        }

        children
    }

    /// Ordered parent -> children mapping for selection UIs, optionally
    /// restricted to one seller. Sorted by parent name.
    pub fn hierarchy(&self, seller_id: Option<i64>) -> Vec<ParentGroup> {
        let mut groups = Vec::new();

        for (parent, children) in &self.parent_to_children {
            let details: Vec<ChildDetail> = children
                .iter()
                .filter_map(|asin| self.child_info.get(asin).map(|info| (asin, info)))
                .filter(|(_, info)| seller_id.map_or(true, |id| info.seller_id == id))
                .map(|(asin, info)| ChildDetail {
                    child_asin: asin.clone(),
                    variant_name: info.variant_name.clone(),
                    title: info.title.clone(),
                })
                .collect();

            if !details.is_empty() {
                groups.push(ParentGroup {
                    normalized_name: parent.clone(),
                    child_count: details.len(),
                    children: details,
                });
            }
        }

        groups
    }
}

/// One row per (seller, marketplace) with distinct child, parent, and
/// product counts from the ASIN table.
pub fn sellers(records: &[AsinRecord]) -> Vec<SellerSummary> {
    let mut grouped: BTreeMap<(i64, String, String), (BTreeSet<&str>, BTreeSet<&str>, BTreeSet<&str>)> =
        BTreeMap::new();

    for record in records {
        let key = (
            record.seller_id,
            record.seller_name.clone(),
            record.marketplace.clone(),
        );
        let (children, parents, products) = grouped.entry(key).or_default();
        children.insert(record.child_asin.as_str());
        parents.insert(record.parent_asin.as_str());
        products.insert(record.normalized_name.as_str());
    }

    grouped
        .into_iter()
        .map(
            |((seller_id, seller_name, marketplace), (children, parents, products))| {
                SellerSummary {
                    seller_id,
                    seller_name,
                    marketplace,
                    asin_count: children.len(),
                    parent_asin_count: parents.len(),
                    product_count: products.len(),
                }
            },
        )
        .collect()
}
