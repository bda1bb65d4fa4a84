//! Search and category filtering over an in-memory catalogue.
//!
//! A product is shown when it matches the search text AND the category
//! selection. Category selection drills down one level:
//!
//! - selecting a category shows its own products and the products of its
//!   direct subcategories;
//! - additionally selecting one of those subcategories narrows the parent to
//!   the selected subcategories only.
//!
//! The narrowing is stricter than the bare rule "a direct subcategory of a
//! selected category whose own name is not selected". Read literally, that
//! rule keeps Outdoor visible under {Flower, Indoor}. Here Outdoor is hidden,
//! since picking Indoor under Flower is a request to see less of Flower.
//!
//! Filtering is a linear scan and preserves catalogue order.

use serde::{Deserialize, Serialize};

use super::category::{Category, CategoryHierarchy};
use super::product::Product;
use crate::types::BrandId;

/// Whether the product's name or description contains `search`, ignoring case.
///
/// An empty search matches everything.
#[must_use]
pub fn matches_text(product: &Product, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    product.name.to_lowercase().contains(&needle)
        || product.description.to_lowercase().contains(&needle)
}

/// Whether the product passes the category selection.
///
/// An empty selection matches everything.
#[must_use]
pub fn matches_category(product: &Product, selected: &[String], hierarchy: &CategoryHierarchy) -> bool {
    if selected.is_empty() {
        return true;
    }

    let is_selected = |name: &str| selected.iter().any(|s| s == name);

    // Prefer the ID; fall back to the name for rows that only carry one.
    let own = product
        .category_id
        .as_ref()
        .and_then(|id| hierarchy.get(id))
        .or_else(|| {
            product
                .category_name
                .as_deref()
                .and_then(|name| hierarchy.find_by_name(name))
        });

    let own_name = product
        .category_name
        .as_deref()
        .or_else(|| own.map(|c| c.name.as_str()));

    if own_name.is_some_and(is_selected) {
        return true;
    }

    let Some(own) = own else {
        return false;
    };
    let Some(parent) = hierarchy.parent_of(&own.id) else {
        return false;
    };
    if !is_selected(&parent.name) || is_selected(&own.name) {
        return false;
    }

    // A selected sibling means the parent has been narrowed.
    !hierarchy
        .children_of(&parent.id)
        .any(|sibling| is_selected(&sibling.name))
}

/// Filter `products` by search text and selected category names.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    search: &str,
    selected: &[String],
    categories: &[Category],
) -> Vec<&'a Product> {
    let hierarchy = CategoryHierarchy::build(categories);
    products
        .iter()
        .filter(|p| matches_text(p, search) && matches_category(p, selected, &hierarchy))
        .collect()
}

/// One category filter badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBadge {
    pub name: String,
    pub selected: bool,
}

/// The shopper's current catalogue filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Free-text search over name and description.
    pub search: String,
    /// Selected category names, in selection order.
    pub categories: Vec<String>,
    /// Restrict to one brand (brand pages).
    pub brand: Option<BrandId>,
}

impl ProductFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    #[must_use]
    pub fn with_categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !name.is_empty() && !self.categories.contains(&name) {
                self.categories.push(name);
            }
        }
        self
    }

    #[must_use]
    pub fn with_brand(mut self, brand: BrandId) -> Self {
        self.brand = Some(brand);
        self
    }

    /// Select the category if unselected, otherwise deselect it.
    pub fn toggle_category(&mut self, name: &str) {
        if let Some(pos) = self.categories.iter().position(|c| c == name) {
            self.categories.remove(pos);
        } else {
            self.categories.push(name.to_string());
        }
    }

    /// Clear search text and category selection. Brand scoping is kept.
    pub fn reset(&mut self) {
        self.search.clear();
        self.categories.clear();
    }

    /// Whether search text or a category selection is in effect.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || !self.categories.is_empty()
    }

    #[must_use]
    pub fn is_selected(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    /// Whether a single product passes this filter.
    #[must_use]
    pub fn matches(&self, product: &Product, hierarchy: &CategoryHierarchy) -> bool {
        if self
            .brand
            .as_ref()
            .is_some_and(|brand| product.brand_id.as_ref() != Some(brand))
        {
            return false;
        }
        matches_text(product, &self.search)
            && matches_category(product, &self.categories, hierarchy)
    }

    /// Products passing this filter, in catalogue order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product], hierarchy: &CategoryHierarchy) -> Vec<&'a Product> {
        products
            .iter()
            .filter(|p| self.matches(p, hierarchy))
            .collect()
    }

    /// One badge per category, in hierarchy order.
    #[must_use]
    pub fn badges(&self, hierarchy: &CategoryHierarchy) -> Vec<CategoryBadge> {
        hierarchy
            .categories()
            .iter()
            .map(|c| CategoryBadge {
                name: c.name.clone(),
                selected: self.is_selected(&c.name),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryId, Price};

    fn product(id: &str, name: &str, category: &str) -> Product {
        let mut p = Product::new(id, name, Price::from_cents(1000));
        p.category_name = Some(category.to_string());
        p
    }

    fn cat(id: &str, name: &str, parent: Option<&str>) -> Category {
        Category::new(id, name, parent.map(CategoryId::from))
    }

    fn ids(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.id.to_string()).collect()
    }

    fn selected(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn drill_down_catalogue() -> (Vec<Product>, Vec<Category>) {
        let categories = vec![
            cat("c1", "Flower", None),
            cat("c2", "Indoor", Some("c1")),
            cat("c3", "Outdoor", Some("c1")),
            cat("c4", "Greenhouse", Some("c2")),
            cat("c5", "Edibles", None),
        ];
        let products = vec![
            product("1", "House Flower", "Flower"),
            product("2", "Indoor OG", "Indoor"),
            product("3", "Sun Grown", "Outdoor"),
            product("4", "Glass House", "Greenhouse"),
            product("5", "Gummies", "Edibles"),
        ];
        (products, categories)
    }

    #[test]
    fn test_selecting_flower_excludes_unrelated_category() {
        let products = vec![product("1", "A", "Flower"), product("2", "B", "Edibles")];
        let categories = vec![cat("c1", "Flower", None)];

        let result = filter_products(&products, "", &selected(&["Flower"]), &categories);
        assert_eq!(ids(&result), ["1"]);
    }

    #[test]
    fn test_empty_filters_return_everything_in_order() {
        let (products, categories) = drill_down_catalogue();
        let result = filter_products(&products, "", &[], &categories);
        assert_eq!(ids(&result), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_text_match_is_case_insensitive_substring() {
        let mut with_description = product("2", "Chocolate", "Edibles");
        with_description.description = "Dark CHOCOLATE with sea salt".to_string();
        let products = vec![product("1", "OG Kush", "Flower"), with_description];

        assert_eq!(ids(&filter_products(&products, "kush", &[], &[])), ["1"]);
        assert_eq!(ids(&filter_products(&products, "sea s", &[], &[])), ["2"]);
        assert!(filter_products(&products, "vape", &[], &[]).is_empty());
    }

    #[test]
    fn test_text_match_holds_under_satisfied_category_filter() {
        let (products, categories) = drill_down_catalogue();
        for p in &products {
            let own = p.category_name.clone().unwrap_or_default();
            let result = filter_products(&products, &p.name.to_uppercase(), &[own], &categories);
            assert!(result.iter().any(|r| r.id == p.id), "missing {}", p.id);
        }
    }

    #[test]
    fn test_parent_selection_shows_direct_children() {
        let (products, categories) = drill_down_catalogue();
        let result = filter_products(&products, "", &selected(&["Flower"]), &categories);
        assert_eq!(ids(&result), ["1", "2", "3"]);
    }

    #[test]
    fn test_child_selection_narrows_parent() {
        let (products, categories) = drill_down_catalogue();
        let result = filter_products(&products, "", &selected(&["Flower", "Indoor"]), &categories);
        // Indoor's own subcategory comes in through Indoor; Outdoor is narrowed away.
        assert_eq!(ids(&result), ["1", "2", "4"]);
    }

    #[test]
    fn test_child_alone_shows_child_and_its_children() {
        let (products, categories) = drill_down_catalogue();
        let result = filter_products(&products, "", &selected(&["Indoor"]), &categories);
        assert_eq!(ids(&result), ["2", "4"]);
    }

    #[test]
    fn test_category_id_takes_precedence_over_duplicate_names() {
        let categories = vec![
            cat("c1", "Accessories", None),
            cat("c2", "Papers", Some("c1")),
            cat("c3", "Papers", None),
        ];
        let mut rolling = Product::new("1", "Rolling Papers", Price::from_cents(200));
        rolling.category_id = Some(CategoryId::from("c3"));
        rolling.category_name = Some("Papers".to_string());

        let hierarchy = CategoryHierarchy::build(&categories);
        // Resolves to the root "Papers", which is not under Accessories.
        assert!(!matches_category(&rolling, &selected(&["Accessories"]), &hierarchy));

        rolling.category_id = Some(CategoryId::from("c2"));
        assert!(matches_category(&rolling, &selected(&["Accessories"]), &hierarchy));
    }

    #[test]
    fn test_product_filter_toggle_and_reset() {
        let mut filter = ProductFilter::new().with_search("kush");
        filter.toggle_category("Flower");
        filter.toggle_category("Edibles");
        assert_eq!(filter.categories, ["Flower", "Edibles"]);

        filter.toggle_category("Flower");
        assert_eq!(filter.categories, ["Edibles"]);
        assert!(filter.is_active());

        filter.reset();
        assert!(!filter.is_active());
    }

    #[test]
    fn test_with_categories_skips_blanks_and_duplicates() {
        let filter = ProductFilter::new().with_categories(["Flower", "", "Flower", "Edibles"]);
        assert_eq!(filter.categories, ["Flower", "Edibles"]);
    }

    #[test]
    fn test_brand_scoping() {
        let (mut products, categories) = drill_down_catalogue();
        products[1].brand_id = Some(BrandId::from("b1"));
        products[4].brand_id = Some(BrandId::from("b1"));
        let hierarchy = CategoryHierarchy::build(&categories);

        let filter = ProductFilter::new().with_brand(BrandId::from("b1"));
        assert_eq!(ids(&filter.apply(&products, &hierarchy)), ["2", "5"]);

        let filter = filter.with_search("gum");
        assert_eq!(ids(&filter.apply(&products, &hierarchy)), ["5"]);
    }

    #[test]
    fn test_badges_follow_hierarchy_order() {
        let (_, categories) = drill_down_catalogue();
        let hierarchy = CategoryHierarchy::build(&categories);
        let filter = ProductFilter::new().with_categories(["Outdoor"]);

        let badges = filter.badges(&hierarchy);
        assert_eq!(badges.len(), 5);
        assert!(badges.iter().filter(|b| b.selected).all(|b| b.name == "Outdoor"));
    }
}
