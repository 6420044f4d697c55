//! Built-in allergen taxonomy.
//!
//! Nine root allergens, each with a fixed list of common foods as sub-items.
//! This is static application data seeded into an empty store, never user
//! data; seeding adds whatever is missing by id and leaves everything else
//! alone.

use shared::Allergen;
use std::collections::HashSet;

/// Root allergens as `(id, name, icon)`
pub const BIG_9_ALLERGENS: &[(&str, &str, &str)] = &[
    ("milk", "Milk", "🥛"),
    ("eggs", "Eggs", "🥚"),
    ("fish", "Fish", "🐟"),
    ("shellfish", "Shellfish", "🦐"),
    ("tree-nuts", "Tree Nuts", "🌰"),
    ("peanuts", "Peanuts", "🥜"),
    ("wheat", "Wheat", "🌾"),
    ("soy", "Soy", "🫛"),
    ("sesame", "Sesame", "🌱"),
];

/// Sub-items per root as `(root_id, [(id, name)])`
pub const ALLERGEN_SUB_ITEMS: &[(&str, &[(&str, &str)])] = &[
    (
        "milk",
        &[
            ("cow-milk", "Cow Milk"),
            ("cheese", "Cheese"),
            ("butter", "Butter"),
            ("yogurt", "Yogurt"),
            ("cream", "Cream"),
            ("ice-cream", "Ice Cream"),
            ("whey", "Whey"),
            ("casein", "Casein"),
        ],
    ),
    (
        "eggs",
        &[
            ("chicken-egg", "Chicken Egg"),
            ("egg-white", "Egg White"),
            ("egg-yolk", "Egg Yolk"),
            ("duck-egg", "Duck Egg"),
            ("quail-egg", "Quail Egg"),
        ],
    ),
    (
        "fish",
        &[
            ("salmon", "Salmon"),
            ("tuna", "Tuna"),
            ("cod", "Cod"),
            ("tilapia", "Tilapia"),
            ("halibut", "Halibut"),
            ("trout", "Trout"),
            ("bass", "Bass"),
            ("sardine", "Sardine"),
            ("anchovy", "Anchovy"),
        ],
    ),
    (
        "shellfish",
        &[
            ("shrimp", "Shrimp"),
            ("crab", "Crab"),
            ("lobster", "Lobster"),
            ("clam", "Clam"),
            ("mussel", "Mussel"),
            ("oyster", "Oyster"),
            ("scallop", "Scallop"),
            ("crawfish", "Crawfish"),
        ],
    ),
    (
        "tree-nuts",
        &[
            ("walnut", "Walnut"),
            ("almond", "Almond"),
            ("cashew", "Cashew"),
            ("hazelnut", "Hazelnut"),
            ("pecan", "Pecan"),
            ("pistachio", "Pistachio"),
            ("macadamia", "Macadamia"),
            ("brazil-nut", "Brazil Nut"),
            ("pine-nut", "Pine Nut"),
            ("chestnut", "Chestnut"),
        ],
    ),
    (
        "peanuts",
        &[
            ("roasted-peanut", "Roasted Peanut"),
            ("peanut-butter", "Peanut Butter"),
            ("peanut-oil", "Peanut Oil"),
            ("boiled-peanut", "Boiled Peanut"),
        ],
    ),
    (
        "wheat",
        &[
            ("bread", "Bread"),
            ("pasta", "Pasta"),
            ("flour", "Flour"),
            ("cereal", "Cereal"),
            ("cracker", "Crackers"),
            ("couscous", "Couscous"),
            ("semolina", "Semolina"),
        ],
    ),
    (
        "soy",
        &[
            ("soy-milk", "Soy Milk"),
            ("tofu", "Tofu"),
            ("tempeh", "Tempeh"),
            ("edamame", "Edamame"),
            ("soy-sauce", "Soy Sauce"),
            ("miso", "Miso"),
            ("soy-protein", "Soy Protein"),
        ],
    ),
    (
        "sesame",
        &[
            ("sesame-seed", "Sesame Seeds"),
            ("tahini", "Tahini"),
            ("sesame-oil", "Sesame Oil"),
            ("hummus", "Hummus"),
            ("halvah", "Halvah"),
        ],
    ),
];

/// The full built-in catalog, roots first, then sub-items grouped by root
pub fn catalog_allergens() -> Vec<Allergen> {
    let roots = BIG_9_ALLERGENS.iter().map(|&(id, name, icon)| Allergen {
        id: id.to_string(),
        name: name.to_string(),
        is_custom: false,
        icon: Some(icon.to_string()),
        parent_id: None,
    });

    let sub_items = ALLERGEN_SUB_ITEMS.iter().flat_map(|&(root_id, items)| {
        items.iter().map(move |&(id, name)| Allergen {
            id: id.to_string(),
            name: name.to_string(),
            is_custom: false,
            icon: None,
            parent_id: Some(root_id.to_string()),
        })
    });

    roots.chain(sub_items).collect()
}

/// Catalog entries to add to `existing`.
///
/// An empty collection gets the whole catalog. Otherwise only sub-items whose
/// id is absent are returned; roots and anything already present (including
/// user edits of catalog entries) are left as they are.
pub fn missing_catalog_entries(existing: &[Allergen]) -> Vec<Allergen> {
    if existing.is_empty() {
        return catalog_allergens();
    }

    let known: HashSet<&str> = existing.iter().map(|allergen| allergen.id.as_str()).collect();
    catalog_allergens()
        .into_iter()
        .filter(|allergen| allergen.parent_id.is_some() && !known.contains(allergen.id.as_str()))
        .collect()
}
