//! Heuristic category assignment.
//!
//! All available text about a listing (taxonomy, property values, tags,
//! materials, title) is lower-cased and searched for keywords. Rules are
//! checked in order and the first match wins. Dutch keywords sit next to the
//! English ones because the shop tags its listings in both languages.

use super::models::Category;

/// Everything the classifier may look at for one listing
#[derive(Debug, Default, Clone)]
pub struct ClassificationInput<'a> {
    pub tags: &'a [String],
    pub materials: &'a [String],
    pub title: &'a str,
    pub taxonomy_name: Option<&'a str>,
    pub taxonomy_path: &'a [String],
    pub property_values: &'a [String],
}

struct Rule {
    category: Category,
    any_of: &'static [&'static str],
    none_of: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        category: Category::Rings,
        any_of: &["ring"],
        none_of: &["earring"],
    },
    Rule {
        category: Category::Necklaces,
        any_of: &["necklace", "pendant", "chain", "choker", "ketting", "hanger", "collier"],
        none_of: &[],
    },
    Rule {
        category: Category::Earrings,
        any_of: &["earring", "ear", "stud", "hoop", "oorbel", "oorknop", "creool"],
        none_of: &[],
    },
    Rule {
        category: Category::Bracelets,
        any_of: &["bracelet", "bangle", "wrist", "anklet", "armband", "enkelband"],
        none_of: &[],
    },
];

pub const DEFAULT_CATEGORY: Category = Category::Bracelets;

fn haystack(input: &ClassificationInput<'_>) -> Vec<String> {
    input
        .taxonomy_name
        .into_iter()
        .chain(input.taxonomy_path.iter().map(String::as_str))
        .chain(input.property_values.iter().map(String::as_str))
        .chain(input.tags.iter().map(String::as_str))
        .chain(input.materials.iter().map(String::as_str))
        .chain(std::iter::once(input.title))
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// First matching rule, `None` when nothing matches
pub fn match_rule(input: &ClassificationInput<'_>) -> Option<Category> {
    let terms = haystack(input);
    let contains = |needle: &str| terms.iter().any(|t| t.contains(needle));

    RULES
        .iter()
        .find(|rule| {
            rule.any_of.iter().any(|k| contains(*k)) && !rule.none_of.iter().any(|k| contains(*k))
        })
        .map(|rule| rule.category)
}

pub fn classify_input(input: &ClassificationInput<'_>) -> Category {
    match_rule(input).unwrap_or(DEFAULT_CATEGORY)
}

pub fn classify(
    tags: &[String],
    title: &str,
    taxonomy_name: Option<&str>,
    taxonomy_path: &[String],
) -> Category {
    classify_input(&ClassificationInput {
        tags,
        title,
        taxonomy_name,
        taxonomy_path,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dutch_tags() {
        let cases = [
            (vec!["oorbellen", "goud"], Category::Earrings),
            (vec!["Ketting", "zilver"], Category::Necklaces),
            (vec!["armband", "kralen"], Category::Bracelets),
            (vec!["enkelband"], Category::Bracelets),
            (vec!["creool", "zilver"], Category::Earrings),
        ];
        for (tags, expected) in cases {
            assert_eq!(classify(&strings(&tags), "", None, &[]), expected, "tags {:?}", tags);
        }
    }

    #[test]
    fn test_ring_but_not_earring() {
        assert_eq!(classify(&strings(&["silver ring"]), "", None, &[]), Category::Rings);
        assert_eq!(
            classify(&strings(&["gold earrings"]), "", None, &[]),
            Category::Earrings
        );
    }

    #[test]
    fn test_earring_anywhere_blocks_rings() {
        // "ring" appears in the title, "earring" in a tag
        assert_eq!(
            classify(&strings(&["earring"]), "Statement ring", None, &[]),
            Category::Earrings
        );
    }

    #[test]
    fn test_earlier_rule_wins() {
        // both necklace and bracelet keywords: necklaces comes first
        assert_eq!(
            classify(&strings(&["bracelet", "chain"]), "", None, &[]),
            Category::Necklaces
        );
    }

    #[test]
    fn test_case_insensitive_over_title_and_taxonomy() {
        assert_eq!(classify(&[], "Beaded NECKLACE", None, &[]), Category::Necklaces);
        assert_eq!(
            classify(&[], "Handmade gift", Some("Hoops"), &[]),
            Category::Earrings
        );
        assert_eq!(
            classify(&[], "", None, &strings(&["Jewelry", "Rings", "Bands"])),
            Category::Rings
        );
    }

    #[test]
    fn test_materials_and_properties_are_considered() {
        let tags = strings(&["handmade"]);
        let materials = strings(&["pendant bail"]);
        let input = ClassificationInput {
            tags: &tags,
            materials: &materials,
            title: "Gift",
            ..Default::default()
        };
        assert_eq!(classify_input(&input), Category::Necklaces);

        let properties = strings(&["Anklet"]);
        let input = ClassificationInput {
            tags: &tags,
            property_values: &properties,
            title: "Gift",
            ..Default::default()
        };
        assert_eq!(classify_input(&input), Category::Bracelets);
    }

    #[test]
    fn test_no_match_defaults_to_bracelets() {
        let input = ClassificationInput {
            title: "Handmade gift",
            ..Default::default()
        };
        assert_eq!(match_rule(&input), None);
        assert_eq!(classify_input(&input), Category::Bracelets);
        assert_eq!(classify(&[], "", None, &[]), Category::Bracelets);
    }

    #[test]
    fn test_pure() {
        let tags = strings(&["oorknopjes"]);
        let first = classify(&tags, "x", None, &[]);
        for _ in 0..10 {
            assert_eq!(classify(&tags, "x", None, &[]), first);
        }
    }
}
