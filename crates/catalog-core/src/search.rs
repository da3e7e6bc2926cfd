//! Product search query building.
//!
//! [`SearchQuery`] is the raw listing request (`search`, `category`,
//! `subcategory`, `page`, `limit`). [`SearchQuery::build`] turns it into a
//! [`ProductFilter`] predicate plus a [`Page`] window without touching the
//! store. The store translates the predicate into SQL; [`ProductMatcher`]
//! evaluates the same predicate in memory.
//!
//! Text search splits the term on whitespace. Every keyword must occur in the
//! product name as a whole token, bounded on each side by the string edge,
//! whitespace, `/`, or `-`, compared case-insensitively. A term equal to a
//! product's SKU matches that product regardless of its name.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::CoreError;

pub const DEFAULT_PAGE_LIMIT: i64 = 25;
pub const MAX_PAGE_LIMIT: i64 = 200;

const BOUNDARY_OPEN: &str = r"(^|\s|[/-])";
const BOUNDARY_CLOSE: &str = r"($|\s|[/-])";

/// Query-string parameters of a product listing request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchQuery {
    /// Build the predicate and page window for this request.
    #[must_use]
    pub fn build(&self) -> (ProductFilter, Page) {
        let filter = ProductFilter::new(
            self.search.as_deref(),
            self.category.as_deref(),
            self.subcategory.as_deref(),
        );
        (filter, Page::new(self.page, self.limit))
    }
}

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    /// Missing or sub-1 page numbers become 1; the limit defaults to
    /// [`DEFAULT_PAGE_LIMIT`] and is clamped to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn new(number: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.limit)
    }

    /// `ceil(total / limit)`; zero when there are no matches.
    #[must_use]
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

/// The text part of a search: name keywords OR exact SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextClause {
    /// Trimmed search term, compared verbatim against `sku`.
    pub term: String,
    /// One boundary-aware pattern per keyword; all must match `name`.
    pub name_patterns: Vec<String>,
}

impl TextClause {
    fn from_term(term: &str) -> Option<Self> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        let name_patterns = term.split_whitespace().map(keyword_pattern).collect();
        Some(Self {
            term: term.to_string(),
            name_patterns,
        })
    }
}

/// Boundary-aware pattern for one keyword, with regex metacharacters escaped.
///
/// The syntax is shared by the `regex` crate and PostgreSQL's `~*` operator.
#[must_use]
pub fn keyword_pattern(keyword: &str) -> String {
    format!("{BOUNDARY_OPEN}({}){BOUNDARY_CLOSE}", regex::escape(keyword))
}

/// Predicate over products: category and subcategory equality ANDed with an
/// optional text clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub text: Option<TextClause>,
}

impl ProductFilter {
    /// Empty strings are treated as absent filters.
    #[must_use]
    pub fn new(search: Option<&str>, category: Option<&str>, subcategory: Option<&str>) -> Self {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(ToOwned::to_owned);
        Self {
            category: non_empty(category),
            subcategory: non_empty(subcategory),
            text: search.and_then(TextClause::from_term),
        }
    }

    /// Compile the predicate for in-memory evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPattern`] if a keyword pattern fails to
    /// compile (only possible for pathologically large input).
    pub fn compile(&self) -> Result<ProductMatcher<'_>, CoreError> {
        let name_regexes = match &self.text {
            Some(text) => text
                .name_patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect::<Result<Vec<Regex>, _>>()?,
            None => Vec::new(),
        };
        Ok(ProductMatcher {
            filter: self,
            name_regexes,
        })
    }
}

/// A compiled [`ProductFilter`].
#[derive(Debug)]
pub struct ProductMatcher<'a> {
    filter: &'a ProductFilter,
    name_regexes: Vec<Regex>,
}

impl ProductMatcher<'_> {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_fields(
            &product.name,
            product.sku.as_deref(),
            product.category.as_deref(),
            product.subcategory.as_deref(),
        )
    }

    #[must_use]
    pub fn matches_fields(
        &self,
        name: &str,
        sku: Option<&str>,
        category: Option<&str>,
        subcategory: Option<&str>,
    ) -> bool {
        if let Some(ref wanted) = self.filter.category {
            if category != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(ref wanted) = self.filter.subcategory {
            if subcategory != Some(wanted.as_str()) {
                return false;
            }
        }
        match &self.filter.text {
            None => true,
            Some(text) => {
                self.name_regexes.iter().all(|re| re.is_match(name))
                    || sku == Some(text.term.as_str())
            }
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

impl ProductPage {
    #[must_use]
    pub fn new(products: Vec<Product>, total: i64, page: Page) -> Self {
        Self {
            products,
            total,
            pages: page.total_pages(total),
            current_page: page.number,
        }
    }
}
