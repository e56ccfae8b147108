//! Default selections that never veto anything.
//!
//! Used for stages that only count, e.g. the entry stage of a cut-flow.

use crate::traits::{Details, EventSelection, ObjectSelection, Verdict};

/// Accepts every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<E> EventSelection<E> for AcceptAll {
    fn passes(&mut self, _event: &E, _details: &mut Details) -> Verdict {
        Verdict::Accept
    }
}

/// Returns every collection unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl<E, O> ObjectSelection<E, O> for KeepAll {
    fn filtered(&mut self, _event: &E, collection: Vec<O>, _details: &mut Details) -> Vec<O> {
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_never_veto() {
        let mut details = Details::new();
        assert_eq!(AcceptAll.passes(&42, &mut details), Verdict::Accept);

        let kept = KeepAll.filtered(&(), vec![1, 2, 3], &mut details);
        assert_eq!(kept, vec![1, 2, 3]);
        assert!(details.is_empty());
    }
}
