//! Extension to category mapping

use crate::config::{Config, normalize_extension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Coarse file-type bucket, one folder per category under each month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "RAW")]
    Raw,
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "PNG")]
    Png,
    Video,
    Unclassified,
}

impl Category {
    /// Every category, in report order
    pub const ALL: [Category; 5] = [
        Category::Raw,
        Category::Jpeg,
        Category::Png,
        Category::Video,
        Category::Unclassified,
    ];

    /// Folder name used in the destination layout
    pub fn label(&self) -> &'static str {
        match self {
            Category::Raw => "RAW",
            Category::Jpeg => "JPEG",
            Category::Png => "PNG",
            Category::Video => "Video",
            Category::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lookup table built once per run from the configured extension lists
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: HashMap<String, Category>,
}

impl Classifier {
    /// Build the table from configuration
    ///
    /// An extension listed under several categories keeps the first one in
    /// [`Category::ALL`] order.
    pub fn from_config(config: &Config) -> Self {
        let mut classifier = Self::default();
        for (category, extensions) in [
            (Category::Raw, &config.raw_extensions),
            (Category::Jpeg, &config.jpeg_extensions),
            (Category::Png, &config.png_extensions),
            (Category::Video, &config.video_extensions),
        ] {
            for ext in extensions {
                classifier.insert(ext, category);
            }
        }
        classifier
    }

    fn insert(&mut self, ext: &str, category: Category) {
        let ext = normalize_extension(ext);
        if !ext.is_empty() {
            self.table.entry(ext).or_insert(category);
        }
    }

    /// Map an extension (with or without the dot, any case) to its category
    pub fn classify(&self, ext: &str) -> Category {
        self.table
            .get(&normalize_extension(ext))
            .copied()
            .unwrap_or(Category::Unclassified)
    }
}
