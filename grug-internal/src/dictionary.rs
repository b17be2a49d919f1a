//! Grug-speak dictionary: the single source of truth for the storefront's
//! fictional vocabulary (categories, price tiers, recipients, occasions).
//!
//! The chat persona embeds the category vocabulary in its system instruction;
//! everything here is static data with a few lookup helpers.

/// A product category and its translation into store terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub grug_name: &'static str,
    pub real_name: &'static str,
    pub description: &'static str,
    pub emoji: &'static str,
    /// Terms used for product searches against affiliate catalogs.
    pub search_terms: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        id: "shiny-rocks-string",
        grug_name: "Shiny Rocks on String",
        real_name: "Necklaces",
        description: "Womanfolk hang from neck. Very pretty.",
        emoji: "💎",
        search_terms: &["necklace", "pendant", "chain necklace", "diamond necklace"],
    },
    Category {
        id: "shiny-rocks-finger",
        grug_name: "Shiny Rocks on Finger Thing",
        real_name: "Rings",
        description: "Go on finger. Make finger fancy.",
        emoji: "💍",
        search_terms: &["ring", "diamond ring", "gold ring", "silver ring"],
    },
    Category {
        id: "shiny-rocks-arm",
        grug_name: "Shiny Rocks on Arm Circle",
        real_name: "Bracelets",
        description: "Wrap around arm. Jingle jingle.",
        emoji: "📿",
        search_terms: &["bracelet", "bangle", "charm bracelet", "tennis bracelet"],
    },
    Category {
        id: "soft-fuzzy-wraps",
        grug_name: "Soft Fuzzy Wraps",
        real_name: "Cozy Clothing",
        description: "Keep womanfolk warm. Very soft.",
        emoji: "🧣",
        search_terms: &[
            "robe",
            "blanket",
            "cardigan",
            "cashmere sweater",
            "fuzzy socks",
        ],
    },
    Category {
        id: "magic-smell-water",
        grug_name: "Magic Smell Water",
        real_name: "Perfume",
        description: "Spray on. Smell good. Grug like.",
        emoji: "✨",
        search_terms: &["perfume", "fragrance", "eau de parfum", "cologne for women"],
    },
    Category {
        id: "face-paint",
        grug_name: "Face Paint Things",
        real_name: "Makeup",
        description: "Colors for face. Make pretty.",
        emoji: "💄",
        search_terms: &["makeup set", "lipstick", "eyeshadow palette", "makeup gift set"],
    },
    Category {
        id: "glowy-rectangles",
        grug_name: "Glowy Rectangle Things",
        real_name: "Electronics",
        description: "Magic light box. Show pictures.",
        emoji: "📱",
        search_terms: &["tablet", "e-reader", "kindle", "ipad"],
    },
    Category {
        id: "noise-makers",
        grug_name: "Noise Makers for Ears",
        real_name: "Headphones & Audio",
        description: "Put on ears. Hear music.",
        emoji: "🎧",
        search_terms: &[
            "headphones",
            "airpods",
            "wireless earbuds",
            "bluetooth speaker",
        ],
    },
    Category {
        id: "hot-leaf-water",
        grug_name: "Hot Leaf Water Makers",
        real_name: "Coffee & Tea",
        description: "Make hot drink. Wake up juice.",
        emoji: "☕",
        search_terms: &["coffee maker", "tea set", "espresso machine", "mug set"],
    },
    Category {
        id: "dead-tree-marks",
        grug_name: "Dead Tree with Marks",
        real_name: "Books & Journals",
        description: "Flat thing with words. Womanfolk stare at for hours.",
        emoji: "📚",
        search_terms: &["book", "journal", "planner", "bestseller book"],
    },
    Category {
        id: "soft-foot-wraps",
        grug_name: "Soft Foot Wraps",
        real_name: "Slippers & Socks",
        description: "Keep feet warm. Very cozy.",
        emoji: "🧦",
        search_terms: &["slippers", "fuzzy socks", "ugg slippers", "cozy socks"],
    },
    Category {
        id: "flower-water",
        grug_name: "Flower Water in Bottle",
        real_name: "Skincare & Spa",
        description: "Rub on face. Face happy.",
        emoji: "🧴",
        search_terms: &["skincare set", "face cream", "spa gift set", "moisturizer"],
    },
    Category {
        id: "bag-carry-things",
        grug_name: "Bag for Carry Things",
        real_name: "Handbags & Purses",
        description: "Big pouch. Put stuff inside.",
        emoji: "👜",
        search_terms: &["handbag", "purse", "tote bag", "crossbody bag"],
    },
    Category {
        id: "shiny-time-circle",
        grug_name: "Shiny Time Circle",
        real_name: "Watches",
        description: "Tell when sun go. On arm.",
        emoji: "⌚",
        search_terms: &["watch", "women watch", "smartwatch", "gold watch"],
    },
    Category {
        id: "fire-smell-sticks",
        grug_name: "Fire Smell Sticks",
        real_name: "Candles & Home",
        description: "Light on fire. Smell good. No burn cave.",
        emoji: "🕯️",
        search_terms: &["candle", "candle set", "diffuser", "aromatherapy"],
    },
];

/// Price tier in "shiny coins". `max` is exclusive; `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub id: &'static str,
    pub grug_name: &'static str,
    pub min: u32,
    pub max: Option<u32>,
    /// 1-5, for visual display.
    pub coins: u8,
}

pub const PRICE_RANGES: &[PriceRange] = &[
    PriceRange {
        id: "few",
        grug_name: "Few Coins",
        min: 0,
        max: Some(25),
        coins: 1,
    },
    PriceRange {
        id: "some",
        grug_name: "Some Coins",
        min: 25,
        max: Some(50),
        coins: 2,
    },
    PriceRange {
        id: "many",
        grug_name: "Many Coins",
        min: 50,
        max: Some(100),
        coins: 3,
    },
    PriceRange {
        id: "big-pile",
        grug_name: "Big Rock Pile",
        min: 100,
        max: Some(250),
        coins: 4,
    },
    PriceRange {
        id: "whole-cave",
        grug_name: "Whole Cave Worth",
        min: 250,
        max: None,
        coins: 5,
    },
];

/// A concept with a store-speak and a plain-English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub id: &'static str,
    pub grug_name: &'static str,
    pub real_name: &'static str,
}

pub const RECIPIENT_TYPES: &[Translation] = &[
    Translation {
        id: "wife",
        grug_name: "Man Womanfolk",
        real_name: "Wife/Girlfriend",
    },
    Translation {
        id: "mother",
        grug_name: "Man Maker Womanfolk",
        real_name: "Mother",
    },
    Translation {
        id: "sister",
        grug_name: "Man Blood Sister",
        real_name: "Sister",
    },
    Translation {
        id: "grandmother",
        grug_name: "Man Maker's Maker",
        real_name: "Grandmother",
    },
    Translation {
        id: "daughter",
        grug_name: "Man Small Womanfolk",
        real_name: "Daughter",
    },
    Translation {
        id: "friend",
        grug_name: "Womanfolk From Other Cave",
        real_name: "Friend",
    },
    Translation {
        id: "coworker",
        grug_name: "Hunt Together Womanfolk",
        real_name: "Coworker",
    },
];

pub const OCCASION_TYPES: &[Translation] = &[
    Translation {
        id: "birthday",
        grug_name: "Special Sun",
        real_name: "Birthday",
    },
    Translation {
        id: "anniversary",
        grug_name: "Remember First Hunt Day",
        real_name: "Anniversary",
    },
    Translation {
        id: "christmas",
        grug_name: "Cold Time Gift Sun",
        real_name: "Christmas",
    },
    Translation {
        id: "valentines",
        grug_name: "Heart Paint Sun",
        real_name: "Valentine's Day",
    },
    Translation {
        id: "mothers-day",
        grug_name: "Thank Maker Sun",
        real_name: "Mother's Day",
    },
    Translation {
        id: "just-because",
        grug_name: "Grug In Trouble",
        real_name: "Just Because / Apology",
    },
];

pub fn category_by_id(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// The price tier a given coin amount falls in.
pub fn price_range_for(amount: u32) -> &'static PriceRange {
    PRICE_RANGES
        .iter()
        .find(|r| amount >= r.min && r.max.is_none_or(|max| amount < max))
        .unwrap_or(&PRICE_RANGES[PRICE_RANGES.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_category_ids_are_unique() {
        let ids: HashSet<&str> = CATEGORIES.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), CATEGORIES.len());
    }

    #[test]
    fn test_category_lookup() {
        let category = category_by_id("noise-makers").unwrap();
        assert_eq!(category.real_name, "Headphones & Audio");
        assert!(category.search_terms.contains(&"headphones"));

        assert!(category_by_id("shiny-nonsense").is_none());
    }

    #[test]
    fn test_price_ranges_cover_all_amounts() {
        assert_eq!(price_range_for(0).id, "few");
        assert_eq!(price_range_for(24).id, "few");
        // Boundaries are inclusive-min, exclusive-max.
        assert_eq!(price_range_for(25).id, "some");
        assert_eq!(price_range_for(99).id, "many");
        assert_eq!(price_range_for(100).id, "big-pile");
        assert_eq!(price_range_for(250).id, "whole-cave");
        assert_eq!(price_range_for(100_000).id, "whole-cave");
    }

    #[test]
    fn test_every_category_has_search_terms() {
        for category in CATEGORIES {
            assert!(
                !category.search_terms.is_empty(),
                "category {} has no search terms",
                category.id
            );
        }
    }
}
