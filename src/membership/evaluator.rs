/// Membership evaluation
///
/// Decides whether a movie belongs to a remote list, given whatever portion of
/// the list has been observed so far. Only positive evidence counts: an
/// unresolved list, an unresolved movie, or an entry beyond the fetched page
/// all read as "not a member".
use crate::models::{ListEntry, ListPage, MovieId};

use super::Resource;

/// Returns true iff `list` is resolved and contains `movie_id`
pub fn evaluate(list: Option<&[ListEntry]>, movie_id: MovieId) -> bool {
    list.is_some_and(|entries| entries.iter().any(|entry| entry.id == movie_id))
}

/// Evaluates a fetched list page against the resolved movie, if both exist
pub fn evaluate_page(page: &Resource<ListPage>, movie_id: Option<MovieId>) -> bool {
    match movie_id {
        Some(movie_id) => evaluate(page.ready().map(ListPage::entries), movie_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries(ids: &[u64]) -> Vec<ListEntry> {
        ids.iter().map(|id| ListEntry::new(MovieId(*id))).collect()
    }

    #[test]
    fn test_member_found() {
        let favorites = entries(&[55, 101]);
        assert!(evaluate(Some(favorites.as_slice()), MovieId(101)));
        assert!(evaluate(Some(favorites.as_slice()), MovieId(55)));
    }

    #[test]
    fn test_absent_movie_is_not_member() {
        let favorites = entries(&[55, 101]);
        assert!(!evaluate(Some(favorites.as_slice()), MovieId(999)));
    }

    #[test]
    fn test_unresolved_list_is_not_member() {
        assert!(!evaluate(None, MovieId(101)));
    }

    #[test]
    fn test_empty_list_is_not_member() {
        assert!(!evaluate(Some(&[][..]), MovieId(101)));
    }

    #[test]
    fn test_evaluate_page_requires_both_inputs() {
        let page = Resource::Ready(ListPage::single(entries(&[55, 101])));

        assert!(evaluate_page(&page, Some(MovieId(101))));
        assert!(!evaluate_page(&page, None));
        assert!(!evaluate_page(&Resource::Loading, Some(MovieId(101))));
        assert!(!evaluate_page(
            &Resource::Failed("401".into()),
            Some(MovieId(101))
        ));
    }

    proptest! {
        #[test]
        fn prop_member_iff_present(ids in prop::collection::vec(0u64..200, 0..40), candidate in 0u64..200) {
            let list = entries(&ids);
            prop_assert_eq!(evaluate(Some(list.as_slice()), MovieId(candidate)), ids.contains(&candidate));
        }

        #[test]
        fn prop_unresolved_never_member(candidate in any::<u64>()) {
            prop_assert!(!evaluate(None, MovieId(candidate)));
        }

        #[test]
        fn prop_idempotent(ids in prop::collection::vec(0u64..50, 0..20), candidate in 0u64..50) {
            let list = entries(&ids);
            let before = list.clone();
            let first = evaluate(Some(list.as_slice()), MovieId(candidate));
            let second = evaluate(Some(list.as_slice()), MovieId(candidate));
            prop_assert_eq!(first, second);
            prop_assert_eq!(list, before);
        }
    }
}
