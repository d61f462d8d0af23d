use rustc_hash::FxHashSet;
use slug::slugify;

/// Generates heading ids, deduplicated within a single document.
#[derive(Default)]
pub struct Slugger {
    generated_slugs: FxHashSet<String>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as taken, e.g. an id set explicitly by the author.
    pub fn reserve(&mut self, id: &str) {
        self.generated_slugs.insert(id.to_string());
    }

    pub fn slugify(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut slug = base.clone();
        let mut counter = 1;
        while self.generated_slugs.contains(&slug) {
            slug = format!("{}-{}", base, counter);
            counter += 1;
        }
        self.generated_slugs.insert(slug.clone());
        slug
    }
}
