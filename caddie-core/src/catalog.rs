//! In-memory club catalog.
//!
//! A [`Catalog`] is built once from a flat JSON array of records and is
//! read-only afterwards. Share it behind an `Arc<Catalog>`; every query is a
//! pure read, so any number of callers can use it concurrently.
//!
//! Stored item order is brand, category, sub-category, year (newest first),
//! then name. Pickers rely on "most recent first" within a group.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tracing::{debug, info};

use crate::error::CatalogError;

/// Accepted spellings of the sub-category field, first match wins.
const SUB_CATEGORY_FIELDS: &[&str] = &["subcategory", "subCategory", "sub_category"];

/// A club manufacturer, derived from the loaded items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Brand {
    pub name: String,
}

/// One comparable club model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub brand: String,
    pub category: String,
    #[serde(rename = "subcategory")]
    pub sub_category: String,
    pub name: String,
    pub year: i32,
}

impl CatalogItem {
    /// Identity key of this item.
    pub fn key(&self) -> ItemKey {
        ItemKey::from(self)
    }

    /// Short form shown in a model picker, e.g. `Paradym (2023) [DRIVER]`.
    pub fn picker_label(&self) -> String {
        format!(
            "{} ({}) [{}]",
            self.name,
            self.year,
            self.sub_category.to_uppercase()
        )
    }

    fn from_record(index: usize, record: &Value) -> Result<Self, CatalogError> {
        let obj = record
            .as_object()
            .ok_or_else(|| CatalogError::DataFormat {
                index,
                message: format!("expected an object, found {}", json_kind(record)),
            })?;

        let string_field = |field: &str| -> Result<String, CatalogError> {
            match obj.get(field) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(CatalogError::DataFormat {
                    index,
                    message: format!("field '{field}' must be a string, found {}", json_kind(other)),
                }),
                None => Err(CatalogError::DataFormat {
                    index,
                    message: format!("missing field '{field}'"),
                }),
            }
        };

        let sub_field = SUB_CATEGORY_FIELDS
            .iter()
            .copied()
            .find(|f| obj.contains_key(*f))
            .unwrap_or(SUB_CATEGORY_FIELDS[0]);

        Ok(Self {
            brand: string_field("brand")?,
            category: string_field("category")?,
            sub_category: string_field(sub_field)?,
            name: string_field("name")?,
            year: year_field(index, obj.get("year"))?,
        })
    }
}

/// The `year` field is an integer; numeric strings are tolerated.
fn year_field(index: usize, value: Option<&Value>) -> Result<i32, CatalogError> {
    let bad = |message: String| CatalogError::DataFormat { index, message };
    match value {
        None => Err(bad("missing field 'year'".to_string())),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .ok_or_else(|| bad(format!("field 'year' is not a valid integer: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| bad(format!("field 'year' is not a valid integer: {s:?}"))),
        Some(other) => Err(bad(format!(
            "field 'year' must be an integer, found {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identity of a catalog item: all five fields, strings compared
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemKey {
    pub brand: String,
    pub category: String,
    pub sub_category: String,
    pub name: String,
    pub year: i32,
}

impl From<&CatalogItem> for ItemKey {
    fn from(item: &CatalogItem) -> Self {
        Self {
            brand: item.brand.clone(),
            category: item.category.clone(),
            sub_category: item.sub_category.clone(),
            name: item.name.clone(),
            year: item.year,
        }
    }
}

impl ItemKey {
    /// Whether `item` has this identity.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        self.year == item.year
            && eq_ignore_case(&self.brand, &item.brand)
            && eq_ignore_case(&self.category, &item.category)
            && eq_ignore_case(&self.sub_category, &item.sub_category)
            && eq_ignore_case(&self.name, &item.name)
    }
}

impl PartialEq for ItemKey {
    fn eq(&self, other: &Self) -> bool {
        self.year == other.year
            && eq_ignore_case(&self.brand, &other.brand)
            && eq_ignore_case(&self.category, &other.category)
            && eq_ignore_case(&self.sub_category, &other.sub_category)
            && eq_ignore_case(&self.name, &other.name)
    }
}

impl Eq for ItemKey {}

impl Hash for ItemKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.brand.to_lowercase().hash(state);
        self.category.to_lowercase().hash(state);
        self.sub_category.to_lowercase().hash(state);
        self.name.to_lowercase().hash(state);
        self.year.hash(state);
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Order within a brand: category, sub-category, newest first, name.
fn cmp_within_brand(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    a.category
        .cmp(&b.category)
        .then_with(|| a.sub_category.cmp(&b.sub_category))
        .then_with(|| b.year.cmp(&a.year))
        .then_with(|| a.name.cmp(&b.name))
}

fn cmp_catalog(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    a.brand.cmp(&b.brand).then_with(|| cmp_within_brand(a, b))
}

/// Immutable, fully loaded club catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    brands: Vec<Brand>,
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog from flat records.
    ///
    /// Every record must carry string `brand`, `category`, `subcategory` and
    /// `name` fields and an integer `year`. The first malformed record aborts
    /// the load; no partial catalog is ever returned.
    pub fn load(records: &[Value]) -> Result<Self, CatalogError> {
        let mut items = records
            .iter()
            .enumerate()
            .map(|(index, record)| CatalogItem::from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;
        items.sort_by(cmp_catalog);

        let brands: Vec<Brand> = items
            .iter()
            .map(|item| item.brand.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|name| Brand {
                name: name.to_string(),
            })
            .collect();

        info!(
            items = items.len(),
            brands = brands.len(),
            "Loaded club catalog"
        );
        Ok(Self { brands, items })
    }

    /// Parse a JSON array-of-objects document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let doc: Value =
            serde_json::from_str(json).map_err(|e| CatalogError::InvalidDocument {
                message: e.to_string(),
            })?;
        match doc {
            Value::Array(records) => Self::load(&records),
            other => Err(CatalogError::InvalidDocument {
                message: format!("expected a top-level array, found {}", json_kind(&other)),
            }),
        }
    }

    /// Read and parse a catalog file.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        debug!(path = %path.display(), "Reading catalog file");
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in stored order.
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Distinct brands, sorted by name.
    pub fn list_brands(&self) -> &[Brand] {
        &self.brands
    }

    /// Distinct categories, sorted ascending.
    pub fn list_categories(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Distinct sub-categories, optionally restricted to one category.
    pub fn list_sub_categories(&self, category: Option<&str>) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| category.is_none_or(|c| eq_ignore_case(&item.category, c)))
            .map(|item| item.sub_category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Items of one brand, optionally within a category and minus one
    /// excluded item.
    ///
    /// Ordered by category, sub-category, year (newest first), then name.
    pub fn list_items(
        &self,
        brand: &str,
        category: Option<&str>,
        exclude: Option<&ItemKey>,
    ) -> Vec<CatalogItem> {
        let mut items: Vec<CatalogItem> = self
            .items
            .iter()
            .filter(|item| eq_ignore_case(&item.brand, brand))
            .filter(|item| category.is_none_or(|c| eq_ignore_case(&item.category, c)))
            .filter(|item| exclude.is_none_or(|key| !key.matches(item)))
            .cloned()
            .collect();
        items.sort_by(cmp_within_brand);
        items
    }

    /// Items across all brands, optionally filtered by category and
    /// sub-category, minus one excluded item. Ordered brand first.
    pub fn list_all_items(
        &self,
        category: Option<&str>,
        sub_category: Option<&str>,
        exclude: Option<&ItemKey>,
    ) -> Vec<CatalogItem> {
        let mut items: Vec<CatalogItem> = self
            .items
            .iter()
            .filter(|item| category.is_none_or(|c| eq_ignore_case(&item.category, c)))
            .filter(|item| sub_category.is_none_or(|s| eq_ignore_case(&item.sub_category, s)))
            .filter(|item| exclude.is_none_or(|key| !key.matches(item)))
            .cloned()
            .collect();
        items.sort_by(cmp_catalog);
        items
    }

    /// Look up one item, optionally within a category and sub-category.
    /// When either is left open the first match in stored order wins.
    pub fn find_item(
        &self,
        brand: &str,
        name: &str,
        year: i32,
        category: Option<&str>,
        sub_category: Option<&str>,
    ) -> Option<&CatalogItem> {
        self.items.iter().find(|item| {
            item.year == year
                && eq_ignore_case(&item.brand, brand)
                && eq_ignore_case(&item.name, name)
                && category.is_none_or(|c| eq_ignore_case(&item.category, c))
                && sub_category.is_none_or(|s| eq_ignore_case(&item.sub_category, s))
        })
    }
}

/// Human form of a category key: `FAIRWAY_WOOD` becomes `Fairway Wood`.
pub fn display_category(category: &str) -> String {
    category
        .replace('_', " ")
        .to_lowercase()
        .split(' ')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_records() -> Vec<Value> {
        vec![
            json!({"brand": "Ping", "category": "DRIVER", "subcategory": "max", "name": "G425", "year": 2021}),
            json!({"brand": "Callaway", "category": "DRIVER", "subcategory": "standard", "name": "Paradym", "year": 2023}),
            json!({"brand": "Ping", "category": "DRIVER", "subcategory": "max", "name": "G430", "year": 2023}),
            json!({"brand": "Ping", "category": "FAIRWAY_WOOD", "subcategory": "max", "name": "G430", "year": 2023}),
            json!({"brand": "Callaway", "category": "DRIVER", "subcategory": "standard", "name": "Rogue ST", "year": 2022}),
            json!({"brand": "Ping", "category": "DRIVER", "subcategory": "lst", "name": "G430", "year": 2023}),
        ]
    }

    fn sample_catalog() -> Catalog {
        Catalog::load(&sample_records()).unwrap()
    }

    fn names(items: &[CatalogItem]) -> Vec<String> {
        items
            .iter()
            .map(|i| format!("{} {} {} {}", i.brand, i.sub_category, i.name, i.year))
            .collect()
    }

    #[test]
    fn test_load_sorts_items() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 6);
        assert_eq!(
            names(catalog.items()),
            vec![
                "Callaway standard Paradym 2023",
                "Callaway standard Rogue ST 2022",
                "Ping lst G430 2023",
                "Ping max G430 2023",
                "Ping max G425 2021",
                "Ping max G430 2023",
            ]
        );
        assert_eq!(catalog.items()[5].category, "FAIRWAY_WOOD");
    }

    #[test]
    fn test_brands_distinct_and_sorted() {
        let catalog = sample_catalog();
        let brands: Vec<&str> = catalog
            .list_brands()
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(brands, vec!["Callaway", "Ping"]);
    }

    #[test]
    fn test_categories_sorted() {
        assert_eq!(
            sample_catalog().list_categories(),
            vec!["DRIVER".to_string(), "FAIRWAY_WOOD".to_string()]
        );
    }

    #[test]
    fn test_sub_categories() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.list_sub_categories(Some("driver")),
            vec!["lst", "max", "standard"]
        );
        assert_eq!(catalog.list_sub_categories(Some("fairway_wood")), vec!["max"]);
    }

    #[test]
    fn test_load_missing_field_fails() {
        let records = vec![
            json!({"brand": "Ping", "category": "DRIVER", "subcategory": "max", "name": "G430", "year": 2023}),
            json!({"brand": "Ping", "category": "DRIVER", "name": "G425", "year": 2021}),
        ];
        match Catalog::load(&records) {
            Err(CatalogError::DataFormat { index, message }) => {
                assert_eq!(index, 1);
                assert!(message.contains("subcategory"), "{message}");
            }
            other => panic!("Expected DataFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_load_wrong_type_fails() {
        let records = vec![json!({"brand": "Ping", "category": "DRIVER", "subcategory": "max", "name": "G430", "year": [2023]})];
        assert!(matches!(
            Catalog::load(&records),
            Err(CatalogError::DataFormat { index: 0, .. })
        ));

        let records = vec![json!("Ping G430")];
        assert!(matches!(
            Catalog::load(&records),
            Err(CatalogError::DataFormat { index: 0, .. })
        ));
    }

    #[test]
    fn test_load_accepts_numeric_string_year_and_camel_case_sub_category() {
        let records = vec![json!({"brand": "Titleist", "category": "DRIVER", "subCategory": "tsr2", "name": "TSR2", "year": "2022"})];
        let catalog = Catalog::load(&records).unwrap();
        assert_eq!(catalog.items()[0].year, 2022);
        assert_eq!(catalog.items()[0].sub_category, "tsr2");
    }

    #[test]
    fn test_from_json_str_rejects_non_array() {
        assert!(matches!(
            Catalog::from_json_str(r#"{"brand": "Ping"}"#),
            Err(CatalogError::InvalidDocument { .. })
        ));
        assert!(matches!(
            Catalog::from_json_str("not json"),
            Err(CatalogError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Catalog::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&sample_records()).unwrap()).unwrap();
        let catalog = Catalog::from_path(&path).unwrap();
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn test_list_items_by_brand_and_category() {
        let catalog = sample_catalog();
        let items = catalog.list_items("ping", Some("driver"), None);
        assert_eq!(
            names(&items),
            vec!["Ping lst G430 2023", "Ping max G430 2023", "Ping max G425 2021"]
        );
    }

    #[test]
    fn test_list_items_all_categories_for_brand() {
        let catalog = sample_catalog();
        let items = catalog.list_items("PING", None, None);
        assert_eq!(items.len(), 4);
        assert_eq!(items[3].category, "FAIRWAY_WOOD");
    }

    #[test]
    fn test_list_items_excludes_key_case_insensitively() {
        let catalog = sample_catalog();
        let first = catalog.find_item("Ping", "G430", 2023, None, Some("max")).unwrap();
        let mut key = first.key();
        key.brand = "PING".into();
        key.sub_category = "MAX".into();
        let items = catalog.list_items("Ping", Some("DRIVER"), Some(&key));
        assert_eq!(names(&items), vec!["Ping lst G430 2023", "Ping max G425 2021"]);
    }

    #[test]
    fn test_list_all_items_filters_and_orders_by_brand() {
        let catalog = sample_catalog();
        let items = catalog.list_all_items(Some("driver"), Some("STANDARD"), None);
        assert_eq!(
            names(&items),
            vec!["Callaway standard Paradym 2023", "Callaway standard Rogue ST 2022"]
        );

        let all = catalog.list_all_items(None, None, None);
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].brand, "Callaway");
    }

    #[test]
    fn test_find_item() {
        let catalog = sample_catalog();
        let item = catalog.find_item("ping", "g430", 2023, None, None).unwrap();
        assert_eq!(item.sub_category, "lst");
        assert!(catalog.find_item("Ping", "G430", 2019, None, None).is_none());
    }

    #[test]
    fn test_find_item_within_category() {
        let catalog = sample_catalog();
        // G430 2023 is both a driver and a fairway wood.
        let item = catalog
            .find_item("Ping", "G430", 2023, Some("fairway_wood"), None)
            .unwrap();
        assert_eq!(item.category, "FAIRWAY_WOOD");
        assert_eq!(item.sub_category, "max");

        let item = catalog
            .find_item("ping", "g430", 2023, Some("DRIVER"), Some("MAX"))
            .unwrap();
        assert_eq!(item.category, "DRIVER");

        assert!(catalog
            .find_item("Ping", "G425", 2021, Some("FAIRWAY_WOOD"), None)
            .is_none());
    }

    #[test]
    fn test_item_key_equality_and_hash() {
        use std::collections::HashSet;
        let catalog = sample_catalog();
        let item = &catalog.items()[0];
        let mut shouted = item.key();
        shouted.name = shouted.name.to_uppercase();
        assert_eq!(item.key(), shouted);

        let set: HashSet<ItemKey> = [item.key(), shouted].into_iter().collect();
        assert_eq!(set.len(), 1);

        let mut other_year = item.key();
        other_year.year -= 1;
        assert_ne!(item.key(), other_year);
    }

    #[test]
    fn test_picker_label() {
        let catalog = sample_catalog();
        let item = catalog.find_item("Ping", "G430", 2023, None, Some("lst")).unwrap();
        assert_eq!(item.picker_label(), "G430 (2023) [LST]");
    }

    #[test]
    fn test_display_category() {
        assert_eq!(display_category("FAIRWAY_WOOD"), "Fairway Wood");
        assert_eq!(display_category("driver"), "Driver");
        assert_eq!(display_category("hybrid_rescue club"), "Hybrid Rescue Club");
        assert_eq!(display_category(""), "");
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::load(&[]).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.list_brands().is_empty());
        assert!(catalog.list_categories().is_empty());
    }
}
