//! Category hierarchy resolution.
//!
//! Categories form a forest: each category optionally names a parent, and a
//! category without a parent is a root. The backend does not enforce that
//! parents exist or that the parent links are acyclic, so every upward walk
//! here is bounded by the number of categories.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::CategoryId;

/// A product category as stored in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl Category {
    /// Create a category without a description.
    #[must_use]
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        parent_id: Option<CategoryId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            parent_id,
        }
    }

    /// Whether this category has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// One step of a product's category breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCrumb {
    pub id: CategoryId,
    pub name: String,
}

/// A category together with its nested subcategories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Parent/child relationships over a flat list of categories.
///
/// Built once per catalogue load and queried for filtering and breadcrumbs.
/// Duplicate IDs keep their first occurrence; categories whose parent is
/// missing (or that sit on a parent cycle) are reachable by ID but do not
/// appear under [`roots`](Self::roots).
#[derive(Debug, Clone, Default)]
pub struct CategoryHierarchy {
    categories: Vec<Category>,
    by_id: HashMap<CategoryId, usize>,
    children: HashMap<CategoryId, Vec<usize>>,
    roots: Vec<CategoryNode>,
}

impl CategoryHierarchy {
    /// Build the hierarchy from a flat category list.
    #[must_use]
    pub fn build(categories: &[Category]) -> Self {
        let mut unique: Vec<Category> = Vec::with_capacity(categories.len());
        let mut by_id = HashMap::with_capacity(categories.len());

        for category in categories {
            if by_id.contains_key(&category.id) {
                continue;
            }
            by_id.insert(category.id.clone(), unique.len());
            unique.push(category.clone());
        }

        let mut children: HashMap<CategoryId, Vec<usize>> = HashMap::new();
        for (idx, category) in unique.iter().enumerate() {
            if let Some(parent_id) = &category.parent_id {
                children.entry(parent_id.clone()).or_default().push(idx);
            }
        }

        let mut hierarchy = Self {
            categories: unique,
            by_id,
            children,
            roots: Vec::new(),
        };

        hierarchy.roots = hierarchy
            .categories
            .iter()
            .filter(|c| c.is_root())
            .map(|c| hierarchy.node(c))
            .collect();

        hierarchy
    }

    // IDs are unique and every node below a root has a parent chain ending at
    // that root, so this recursion cannot revisit a node.
    fn node(&self, category: &Category) -> CategoryNode {
        CategoryNode {
            category: category.clone(),
            children: self
                .children_of(&category.id)
                .map(|child| self.node(child))
                .collect(),
        }
    }

    /// Root categories with their nested children, in input order.
    #[must_use]
    pub fn roots(&self) -> &[CategoryNode] {
        &self.roots
    }

    /// All categories, deduplicated by ID, in input order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Number of distinct categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the hierarchy has no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Look up a category by ID.
    #[must_use]
    pub fn get(&self, id: &CategoryId) -> Option<&Category> {
        self.by_id
            .get(id)
            .and_then(|&idx| self.categories.get(idx))
    }

    /// Look up a category by name. The first match in input order wins.
    ///
    /// Names are not guaranteed unique; prefer [`get`](Self::get).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// The parent of a category, if it has one and the parent exists.
    #[must_use]
    pub fn parent_of(&self, id: &CategoryId) -> Option<&Category> {
        self.get(id)?
            .parent_id
            .as_ref()
            .and_then(|parent_id| self.get(parent_id))
    }

    /// Direct children of a category, in input order.
    pub fn children_of<'a>(&'a self, id: &CategoryId) -> impl Iterator<Item = &'a Category> + 'a {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|&idx| self.categories.get(idx))
    }

    /// Whether `id` sits strictly below `ancestor` in the hierarchy.
    ///
    /// Walks parent links upward for at most [`len`](Self::len) steps; a walk
    /// that runs out of steps (a parent cycle) answers `false`.
    #[must_use]
    pub fn is_descendant_of_id(&self, id: &CategoryId, ancestor: &CategoryId) -> bool {
        let mut current = self.get(id).and_then(|c| c.parent_id.as_ref());

        for _ in 0..self.categories.len() {
            let Some(parent_id) = current else {
                return false;
            };
            if parent_id == ancestor {
                return true;
            }
            current = self.get(parent_id).and_then(|c| c.parent_id.as_ref());
        }

        false
    }

    /// Name-based variant of [`is_descendant_of_id`](Self::is_descendant_of_id).
    ///
    /// Both names resolve to the first category with that name.
    #[must_use]
    pub fn is_descendant_of(&self, category_name: &str, ancestor_name: &str) -> bool {
        match (
            self.find_by_name(category_name),
            self.find_by_name(ancestor_name),
        ) {
            (Some(category), Some(ancestor)) => self.is_descendant_of_id(&category.id, &ancestor.id),
            _ => false,
        }
    }

    /// IDs of the direct subcategories of a category.
    #[must_use]
    pub fn subcategory_ids(&self, id: &CategoryId) -> Vec<CategoryId> {
        self.children_of(id).map(|child| child.id.clone()).collect()
    }

    /// Names of the direct subcategories of the named category.
    #[must_use]
    pub fn subcategories_of(&self, category_name: &str) -> Vec<String> {
        self.find_by_name(category_name)
            .map(|category| {
                self.children_of(&category.id)
                    .map(|child| child.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Breadcrumb from the root ancestor down to the category itself.
    ///
    /// Returns an empty path for an unknown ID. A path that hits a parent
    /// cycle stops after [`len`](Self::len) steps.
    #[must_use]
    pub fn category_path(&self, id: &CategoryId) -> Vec<CategoryCrumb> {
        let mut path = Vec::new();
        let mut current = self.get(id);

        while let Some(category) = current {
            if path.len() >= self.categories.len() {
                break;
            }
            path.push(CategoryCrumb {
                id: category.id.clone(),
                name: category.name.clone(),
            });
            current = category
                .parent_id
                .as_ref()
                .and_then(|parent_id| self.get(parent_id));
        }

        path.reverse();
        path
    }

    /// Flatten the tree back into categories (pre-order, roots first).
    #[must_use]
    pub fn flatten(&self) -> Vec<Category> {
        fn walk(node: &CategoryNode, out: &mut Vec<Category>) {
            out.push(node.category.clone());
            for child in &node.children {
                walk(child, out);
            }
        }

        let mut out = Vec::with_capacity(self.categories.len());
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }
}

/// Build a category hierarchy from a flat list.
#[must_use]
pub fn build_hierarchy(categories: &[Category]) -> CategoryHierarchy {
    CategoryHierarchy::build(categories)
}

/// Whether the category named `category_name` is a descendant of `ancestor_name`.
#[must_use]
pub fn is_descendant_of(category_name: &str, ancestor_name: &str, categories: &[Category]) -> bool {
    CategoryHierarchy::build(categories).is_descendant_of(category_name, ancestor_name)
}

/// Names of the direct subcategories of `category_name`.
#[must_use]
pub fn subcategories_of(category_name: &str, categories: &[Category]) -> Vec<String> {
    CategoryHierarchy::build(categories).subcategories_of(category_name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn cat(id: &str, name: &str, parent: Option<&str>) -> Category {
        Category::new(id, name, parent.map(CategoryId::from))
    }

    fn sample() -> Vec<Category> {
        vec![
            cat("c1", "Flower", None),
            cat("c2", "Indoor", Some("c1")),
            cat("c3", "Outdoor", Some("c1")),
            cat("c4", "Edibles", None),
            cat("c5", "Gummies", Some("c4")),
            cat("c6", "Sour Gummies", Some("c5")),
        ]
    }

    #[test]
    fn test_build_nests_children_under_roots() {
        let hierarchy = CategoryHierarchy::build(&sample());
        let roots = hierarchy.roots();

        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].category.name, "Flower");
        let flower_children: Vec<_> = roots[0]
            .children
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(flower_children, ["Indoor", "Outdoor"]);
        assert_eq!(roots[1].children[0].children[0].category.name, "Sour Gummies");
    }

    #[test]
    fn test_flatten_roundtrip_preserves_triples() {
        let input = sample();
        let flattened = CategoryHierarchy::build(&input).flatten();

        let triples = |cats: &[Category]| -> HashSet<(CategoryId, String, Option<CategoryId>)> {
            cats.iter()
                .map(|c| (c.id.clone(), c.name.clone(), c.parent_id.clone()))
                .collect()
        };
        assert_eq!(triples(&input), triples(&flattened));
        assert_eq!(input.len(), flattened.len());
    }

    #[test]
    fn test_is_descendant_of() {
        let cats = sample();
        assert!(is_descendant_of("Indoor", "Flower", &cats));
        assert!(is_descendant_of("Sour Gummies", "Edibles", &cats));
        assert!(!is_descendant_of("Indoor", "Edibles", &cats));
        assert!(!is_descendant_of("Flower", "Flower", &cats));
        assert!(!is_descendant_of("Flower", "Indoor", &cats));
        assert!(!is_descendant_of("Missing", "Flower", &cats));
    }

    #[test]
    fn test_is_descendant_of_terminates_on_cycle() {
        let cats = vec![
            cat("a", "A", Some("b")),
            cat("b", "B", Some("a")),
            cat("r", "Root", None),
        ];
        let hierarchy = CategoryHierarchy::build(&cats);

        assert!(hierarchy.is_descendant_of("A", "B"));
        assert!(!hierarchy.is_descendant_of("A", "Root"));
        assert_eq!(hierarchy.roots().len(), 1);
        assert!(hierarchy.category_path(&CategoryId::from("a")).len() <= 3);
    }

    #[test]
    fn test_self_parent_is_not_a_root() {
        let cats = vec![cat("a", "A", Some("a"))];
        let hierarchy = CategoryHierarchy::build(&cats);
        assert!(hierarchy.roots().is_empty());
        assert_eq!(hierarchy.category_path(&CategoryId::from("a")).len(), 1);
    }

    #[test]
    fn test_subcategories_are_direct_children_only() {
        let cats = sample();
        assert_eq!(subcategories_of("Edibles", &cats), ["Gummies"]);
        assert_eq!(subcategories_of("Flower", &cats), ["Indoor", "Outdoor"]);
        assert!(subcategories_of("Sour Gummies", &cats).is_empty());
        assert!(subcategories_of("Nope", &cats).is_empty());

        let hierarchy = CategoryHierarchy::build(&cats);
        assert_eq!(
            hierarchy.subcategory_ids(&CategoryId::from("c1")),
            [CategoryId::from("c2"), CategoryId::from("c3")]
        );
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let cats = vec![
            cat("c1", "Accessories", None),
            cat("c2", "Papers", Some("c1")),
            cat("c3", "Accessories", None),
        ];
        let hierarchy = CategoryHierarchy::build(&cats);
        assert_eq!(
            hierarchy.find_by_name("Accessories").map(|c| c.id.as_str()),
            Some("c1")
        );
        assert_eq!(hierarchy.subcategories_of("Accessories"), ["Papers"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let cats = vec![cat("c1", "Flower", None), cat("c1", "Flower Again", Some("c1"))];
        let hierarchy = CategoryHierarchy::build(&cats);
        assert_eq!(hierarchy.len(), 1);
        assert_eq!(hierarchy.flatten().len(), 1);
    }

    #[test]
    fn test_orphans_are_reachable_but_not_rooted() {
        let cats = vec![cat("c1", "Flower", None), cat("c9", "Orphan", Some("gone"))];
        let hierarchy = CategoryHierarchy::build(&cats);
        assert_eq!(hierarchy.roots().len(), 1);
        assert!(hierarchy.get(&CategoryId::from("c9")).is_some());
        assert_eq!(
            hierarchy.category_path(&CategoryId::from("c9")),
            vec![CategoryCrumb {
                id: CategoryId::from("c9"),
                name: "Orphan".to_string()
            }]
        );
    }

    #[test]
    fn test_path_runs_root_to_leaf() {
        let hierarchy = CategoryHierarchy::build(&sample());
        let names: Vec<_> = hierarchy
            .category_path(&CategoryId::from("c6"))
            .into_iter()
            .map(|crumb| crumb.name)
            .collect();
        assert_eq!(names, ["Edibles", "Gummies", "Sour Gummies"]);
        assert!(hierarchy.category_path(&CategoryId::from("zz")).is_empty());
    }
}
