// src/api/categories.rs
//! The fixed catalogue of logical fetches that make up a full harvest.

use super::types::ListingQuery;
use crate::model::Bucket;
use crate::types::ValidationError;

/// A named listing feeding one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: &'static str,
    pub bucket: Bucket,
    pub query: ListingQuery,
}

/// Item categories keyed by Omeka S resource class id.
const ITEM_CLASSES: [(&str, u32); 10] = [
    ("documents", 49),
    ("audio_visual_documents", 38),
    ("images", 58),
    ("index_authority_files", 244),
    ("index_events", 54),
    ("index_locations", 9),
    ("index_organizations", 96),
    ("index_persons", 94),
    ("issues", 60),
    ("newspaper_articles", 36),
];

/// Bibliographic reference categories.
const REFERENCE_CLASSES: [(&str, u32); 9] = [
    ("references_articles", 35),
    ("references_chapters", 43),
    ("references_theses", 88),
    ("references_books", 40),
    ("references_reports", 82),
    ("references_reviews", 178),
    ("references_edited_books", 52),
    ("references_communications", 77),
    ("references_blog_posts", 305),
];

/// Every category, in the order results are merged.
pub fn catalogue() -> Vec<Category> {
    let items = ITEM_CLASSES.iter().map(|&(name, class_id)| Category {
        name,
        bucket: Bucket::Items,
        query: ListingQuery::items_of_class(class_id),
    });
    let collections = [
        Category {
            name: "item_sets",
            bucket: Bucket::ItemSets,
            query: ListingQuery::new("item_sets").public_only(),
        },
        Category {
            name: "media",
            bucket: Bucket::Media,
            query: ListingQuery::new("media").public_only(),
        },
    ];
    let references = REFERENCE_CLASSES.iter().map(|&(name, class_id)| Category {
        name,
        bucket: Bucket::References,
        query: ListingQuery::items_of_class(class_id),
    });

    items.chain(collections).chain(references).collect()
}

/// Export file a category is written to. The index sub-types share
/// `index` and the reference classes share `references`; every other
/// category keeps its own name.
pub fn export_group(category: &str) -> &str {
    if category.starts_with("index_") {
        "index"
    } else if category.starts_with("references_") {
        "references"
    } else {
        category
    }
}

pub fn category_names() -> Vec<&'static str> {
    catalogue().into_iter().map(|c| c.name).collect()
}

/// Restricts the catalogue to `names`; an empty list selects everything.
///
/// Bucket names (`items`, `references`, ...) select every category of
/// that bucket.
pub fn select(names: &[String]) -> Result<Vec<Category>, ValidationError> {
    let all = catalogue();
    if names.is_empty() {
        return Ok(all);
    }

    for name in names {
        let known = all.iter().any(|c| c.name == name)
            || Bucket::ALL.iter().any(|b| b.as_str() == name);
        if !known {
            return Err(ValidationError::UnknownCategory {
                name: name.clone(),
                known: category_names().join(", "),
            });
        }
    }

    Ok(all
        .into_iter()
        .filter(|c| {
            names
                .iter()
                .any(|n| n == c.name || n == c.bucket.as_str())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_covers_every_bucket() {
        let all = catalogue();
        assert_eq!(all.len(), 21);
        let names: HashSet<_> = all.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), all.len());

        let count = |bucket| all.iter().filter(|c| c.bucket == bucket).count();
        assert_eq!(count(Bucket::Items), 10);
        assert_eq!(count(Bucket::ItemSets), 1);
        assert_eq!(count(Bucket::Media), 1);
        assert_eq!(count(Bucket::References), 9);
    }

    #[test]
    fn test_item_sets_and_media_are_public_only() {
        for category in catalogue() {
            let expect_public = matches!(category.bucket, Bucket::ItemSets | Bucket::Media);
            assert_eq!(category.query.public_only, expect_public, "{}", category.name);
        }
    }

    #[test]
    fn test_select_by_name_and_bucket() {
        let picked = select(&["images".to_string(), "references".to_string()]).unwrap();
        assert_eq!(picked.len(), 10);
        assert_eq!(picked[0].name, "images");

        assert_eq!(select(&[]).unwrap().len(), 21);
        assert!(matches!(
            select(&["photos".to_string()]),
            Err(ValidationError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_export_groups_follow_item_types() {
        let mut distinct: Vec<&str> = catalogue().iter().map(|c| export_group(c.name)).collect();
        distinct.dedup();
        assert_eq!(
            distinct,
            vec![
                "documents",
                "audio_visual_documents",
                "images",
                "index",
                "issues",
                "newspaper_articles",
                "item_sets",
                "media",
                "references",
            ]
        );
    }
}
