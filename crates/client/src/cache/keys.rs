//! Cache key namespace.
//!
//! Every cached entry lives under the `@cache:` prefix so a single prefix
//! scan can clear the whole cache or measure its size. These key shapes are
//! a persisted contract; changing them orphans existing entries.

use kirana_core::{Barcode, ProductId};

/// Namespace prefix shared by all cache keys.
pub const CACHE_PREFIX: &str = "@cache:";

/// Key for the full product list of the selected store.
pub const PRODUCTS: &str = "@cache:products";

/// Key for the category list.
pub const CATEGORIES: &str = "@cache:categories";

/// Key for the store list.
pub const STORES: &str = "@cache:stores";

/// Key for a single product, indexed by id.
#[must_use]
pub fn product(id: ProductId) -> String {
    format!("@cache:product:{id}")
}

/// Key for a single product, indexed by barcode (secondary index).
#[must_use]
pub fn barcode(code: &Barcode) -> String {
    format!("@cache:barcode:{code}")
}
