//! Accepting selection that records per-category counts in `details`.

use crate::traits::{Details, EventSelection, Verdict};

/// Label receiving events whose category is not one of the declared ones.
pub const OTHER_CATEGORY: &str = "other";

/// Accepts every event and counts it under the category `categorize` assigns.
///
/// The category keys are seeded with zero when the owning filter is built,
/// so independent runs always agree on the `details` key set and can be
/// merged even if some category never occurred in one of them.
pub struct CategoryTally<F> {
    categories: Vec<String>,
    categorize: F,
}

impl<F> CategoryTally<F> {
    /// Create a tally over a fixed set of categories.
    ///
    /// # Arguments
    /// * `categories` - Declared category labels, `other` is always added
    /// * `categorize` - Assigns a label to each event
    pub fn new<I, S>(categories: I, categorize: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        if !categories.iter().any(|c| c == OTHER_CATEGORY) {
            categories.push(OTHER_CATEGORY.to_string());
        }
        Self {
            categories,
            categorize,
        }
    }
}

impl<E, F> EventSelection<E> for CategoryTally<F>
where
    F: FnMut(&E) -> &'static str + Send,
{
    fn prepare(&mut self, details: &mut Details) {
        for category in &self.categories {
            details.entry(category.clone()).or_insert(0.0);
        }
    }

    fn passes(&mut self, event: &E, details: &mut Details) -> Verdict {
        let category = (self.categorize)(event);
        let key = if self.categories.iter().any(|c| c == category) {
            category
        } else {
            OTHER_CATEGORY
        };
        if let Some(count) = details.get_mut(key) {
            *count += 1.0;
        }
        Verdict::Accept
    }
}
