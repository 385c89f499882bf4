//! Wire types, named after the upstream JSON (`productId`, `lprice`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::store::SearchParams;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub product_id: String,
    pub title: String,
    pub link: String,
    pub image: String,
    /// Lowest price. Upstream sends it as a string.
    #[serde(deserialize_with = "price")]
    pub lprice: u64,
    #[serde(deserialize_with = "price")]
    pub hprice: u64,
    pub mall_name: String,
    pub brand: String,
    pub maker: String,
    pub category1: String,
    pub category2: String,
    pub category3: String,
    pub category4: String,
    pub description: String,
    pub stock: u32,
    pub review_count: u32,
    pub rating: f32,
}

fn price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.trim().is_empty() => Ok(0),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit as usize) as u32;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of `getProducts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub pagination: Pagination,
    /// The filters the page was computed for.
    pub filters: SearchParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
struct Leaf {}

/// `category1 -> category2 -> {}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTree(BTreeMap<String, BTreeMap<String, Leaf>>);

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category1: &str, category2: Option<&str>) {
        if category1.is_empty() {
            return;
        }
        let children = self.0.entry(category1.to_string()).or_default();
        if let Some(category2) = category2.filter(|c| !c.is_empty()) {
            children.insert(category2.to_string(), Leaf {});
        }
    }

    pub fn top_level(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn children_of(&self, category1: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(category1)
            .into_iter()
            .flat_map(|children| children.keys().map(String::as_str))
    }

    pub fn contains(&self, category1: &str, category2: Option<&str>) -> bool {
        match (self.0.get(category1), category2) {
            (Some(_), None) => true,
            (Some(children), Some(c2)) => children.contains_key(c2),
            (None, _) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_product_accepts_string_prices() {
        let json = r#"{"productId":"85067212996","title":"Rack","lprice":"220","hprice":"","mallName":"PCRUSH","category1":"Home","category2":"Storage"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.product_id, "85067212996");
        assert_eq!(product.lprice, 220);
        assert_eq!(product.hprice, 0);
        assert_eq!(product.mall_name, "PCRUSH");
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(1, 20, 41);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(!p.has_prev);

        let last = Pagination::new(3, 20, 41);
        assert!(!last.has_next);
        assert!(last.has_prev);

        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
    }

    #[test]
    fn test_category_tree_shape() {
        let mut tree = CategoryTree::new();
        tree.insert("Home", Some("Kitchen"));
        tree.insert("Home", Some("Bath"));
        tree.insert("Digital", None);

        assert_eq!(
            serde_json::to_string(&tree).unwrap(),
            r#"{"Digital":{},"Home":{"Bath":{},"Kitchen":{}}}"#
        );
        assert_eq!(tree.children_of("Home").collect::<Vec<_>>(), vec!["Bath", "Kitchen"]);
        assert!(tree.contains("Home", Some("Bath")));
        assert!(!tree.contains("Digital", Some("Bath")));
    }
}
