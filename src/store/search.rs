//! Listing filters and their URL query form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::PriceAsc,
        SortOrder::PriceDesc,
        SortOrder::NameAsc,
        SortOrder::NameDesc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::NameAsc => "name_asc",
            SortOrder::NameDesc => "name_desc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "Price: low to high",
            SortOrder::PriceDesc => "Price: high to low",
            SortOrder::NameAsc => "Name: A to Z",
            SortOrder::NameDesc => "Name: Z to A",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| format!("unknown sort `{s}`"))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page size. Only these four are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum PageLimit {
    Ten,
    #[default]
    Twenty,
    Fifty,
    Hundred,
}

impl PageLimit {
    pub const ALL: [PageLimit; 4] = [PageLimit::Ten, PageLimit::Twenty, PageLimit::Fifty, PageLimit::Hundred];

    pub fn value(self) -> u32 {
        match self {
            PageLimit::Ten => 10,
            PageLimit::Twenty => 20,
            PageLimit::Fifty => 50,
            PageLimit::Hundred => 100,
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        PageLimit::ALL.into_iter().find(|limit| limit.value() == value)
    }
}

impl From<PageLimit> for u32 {
    fn from(limit: PageLimit) -> Self {
        limit.value()
    }
}

impl TryFrom<u32> for PageLimit {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageLimit::from_value(value).ok_or_else(|| format!("unsupported page size {value}"))
    }
}

// ============================================================================
// SearchParams
// ============================================================================

/// What the listing shows. Any change to a filter, the sort or the page size
/// goes back to page 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub search: String,
    pub category1: Option<String>,
    pub category2: Option<String>,
    pub sort: SortOrder,
    pub limit: PageLimit,
    pub page: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            category1: None,
            category2: None,
            sort: SortOrder::default(),
            limit: PageLimit::default(),
            page: 1,
        }
    }
}

impl SearchParams {
    pub fn from_query(query: &str) -> Self {
        Self::from_query_or(query, PageLimit::default())
    }

    /// Parse `query` (with or without the leading `?`). `default_limit` is
    /// used when the query has no usable `limit`.
    pub fn from_query_or(query: &str, default_limit: PageLimit) -> Self {
        let mut params = SearchParams {
            limit: default_limit,
            ..Self::default()
        };
        let mut page_alias = None;

        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "search" => params.search = value.trim().to_string(),
                "category1" => params.category1 = non_empty(&value),
                "category2" => params.category2 = non_empty(&value),
                "sort" => match value.parse() {
                    Ok(sort) => params.sort = sort,
                    Err(_) => warn!(sort = %value, "unknown sort, using default"),
                },
                "limit" => match value.parse().ok().and_then(PageLimit::from_value) {
                    Some(limit) => params.limit = limit,
                    None => warn!(limit = %value, "unsupported limit, using default"),
                },
                "current" => params.page = parse_page(&value),
                "page" => page_alias = Some(parse_page(&value)),
                _ => {}
            }
        }
        if params.page == 1
            && let Some(page) = page_alias
        {
            params.page = page;
        }
        if params.category1.is_none() {
            params.category2 = None;
        }
        params
    }

    /// Query string without the `?`; default values are left out.
    pub fn to_query(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        if !self.search.is_empty() {
            out.append_pair("search", &self.search);
        }
        if let Some(c1) = &self.category1 {
            out.append_pair("category1", c1);
        }
        if let Some(c2) = &self.category2 {
            out.append_pair("category2", c2);
        }
        if self.sort != SortOrder::default() {
            out.append_pair("sort", self.sort.as_str());
        }
        if self.limit != PageLimit::default() {
            out.append_pair("limit", &self.limit.value().to_string());
        }
        if self.page > 1 {
            out.append_pair("current", &self.page.to_string());
        }
        out.finish()
    }

    pub fn with_search(self, search: &str) -> Self {
        let search = search.trim().to_string();
        if search == self.search {
            return self;
        }
        Self { search, page: 1, ..self }
    }

    /// Selecting a top-level category clears the sub-category.
    pub fn with_category1(self, category1: Option<&str>) -> Self {
        let category1 = category1.and_then(non_empty);
        if category1 == self.category1 {
            return self;
        }
        Self {
            category1,
            category2: None,
            page: 1,
            ..self
        }
    }

    pub fn with_category2(self, category2: Option<&str>) -> Self {
        let category2 = category2.and_then(non_empty);
        if category2 == self.category2 || self.category1.is_none() {
            return self;
        }
        Self {
            category2,
            page: 1,
            ..self
        }
    }

    pub fn with_sort(self, sort: SortOrder) -> Self {
        if sort == self.sort {
            return self;
        }
        Self { sort, page: 1, ..self }
    }

    pub fn with_limit(self, limit: PageLimit) -> Self {
        if limit == self.limit {
            return self;
        }
        Self { limit, page: 1, ..self }
    }

    pub fn with_page(self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self
        }
    }

    /// Breadcrumb "all": drop the search and both categories.
    pub fn reset_filters(self) -> Self {
        Self {
            search: String::new(),
            category1: None,
            category2: None,
            page: 1,
            ..self
        }
    }

    /// Index of the first item on the current page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit.value() as usize
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_page(value: &str) -> u32 {
    value.trim().parse::<u32>().ok().filter(|p| *p > 0).unwrap_or(1)
}
