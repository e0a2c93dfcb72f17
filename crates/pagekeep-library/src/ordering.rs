// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sorting and search for list views.
//
// Each `SortOrder` is a total order: ties on the primary key fall through to
// fixed secondary keys and finally the identifier, so the result never
// depends on the order of the input. Re-sorting is idempotent and a sort
// never inherits tie-breaks from a previous one.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use pagekeep_core::SortOrder;
use uuid::Uuid;

/// Something shown in a sortable, searchable list.
pub trait Listing {
    fn display_name(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn byte_size(&self) -> u64;
    fn listing_id(&self) -> Uuid;
}

pub fn compare<T: Listing + ?Sized>(a: &T, b: &T, order: SortOrder) -> Ordering {
    let newest_first = || b.created_at().cmp(&a.created_at());
    let by_name = || {
        a.display_name()
            .to_lowercase()
            .cmp(&b.display_name().to_lowercase())
            .then_with(|| a.display_name().cmp(b.display_name()))
    };
    let largest_first = || b.byte_size().cmp(&a.byte_size());
    let by_id = || a.listing_id().cmp(&b.listing_id());

    match order {
        SortOrder::CreatedDescending => newest_first().then_with(by_name).then_with(by_id),
        SortOrder::NameAscending => by_name().then_with(newest_first).then_with(by_id),
        SortOrder::SizeDescending => largest_first()
            .then_with(newest_first)
            .then_with(by_name)
            .then_with(by_id),
    }
}

/// Sort a snapshot. The underlying storage is untouched.
pub fn sorted<'a, T, I>(items: I, order: SortOrder) -> Vec<&'a T>
where
    T: Listing + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out: Vec<&T> = items.into_iter().collect();
    out.sort_by(|a, b| compare(*a, *b, order));
    out
}

/// Case-insensitive substring match on the display name. A blank query
/// matches everything.
pub fn matches_search(name: &str, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}

/// Sort, then filter by `search`.
pub fn query<'a, T, I>(items: I, order: SortOrder, search: Option<&str>) -> Vec<&'a T>
where
    T: Listing + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = sorted(items, order);
    if let Some(search) = search {
        out.retain(|item| matches_search(item.display_name(), search));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        created: i64,
        size: u64,
        id: Uuid,
    }

    impl Listing for Item {
        fn display_name(&self) -> &str {
            self.name
        }
        fn created_at(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.created, 0).unwrap()
        }
        fn byte_size(&self) -> u64 {
            self.size
        }
        fn listing_id(&self) -> Uuid {
            self.id
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "beta", created: 300, size: 10, id: Uuid::from_u128(1) },
            Item { name: "Alpha", created: 100, size: 50, id: Uuid::from_u128(2) },
            Item { name: "alpha", created: 200, size: 50, id: Uuid::from_u128(3) },
            Item { name: "gamma", created: 200, size: 10, id: Uuid::from_u128(4) },
            Item { name: "beta", created: 300, size: 10, id: Uuid::from_u128(5) },
        ]
    }

    fn names(list: &[&Item]) -> Vec<(&'static str, u128)> {
        list.iter().map(|i| (i.name, i.id.as_u128())).collect()
    }

    #[test]
    fn default_is_newest_first() {
        let data = items();
        let list = sorted(&data, SortOrder::CreatedDescending);
        assert_eq!(list[0].created, 300);
        assert_eq!(list.last().unwrap().created, 100);
    }

    #[test]
    fn name_sort_is_idempotent() {
        let data = items();
        let once = sorted(&data, SortOrder::NameAscending);
        let twice = sorted(once.iter().copied(), SortOrder::NameAscending);
        assert_eq!(names(&once), names(&twice));
    }

    #[test]
    fn chained_sorts_leave_no_residue() {
        let data = items();
        let by_size = sorted(&data, SortOrder::SizeDescending);
        let by_date = sorted(by_size.iter().copied(), SortOrder::CreatedDescending);
        let chained = sorted(by_date.iter().copied(), SortOrder::NameAscending);
        let direct = sorted(&data, SortOrder::NameAscending);
        assert_eq!(names(&chained), names(&direct));

        let mut reversed = data.clone();
        reversed.reverse();
        assert_eq!(names(&sorted(&reversed, SortOrder::NameAscending)), names(&direct));
    }

    #[test]
    fn size_sort_is_largest_first() {
        let data = items();
        let list = sorted(&data, SortOrder::SizeDescending);
        assert_eq!(list[0].size, 50);
        assert_eq!(list[1].size, 50);
        // Equal sizes fall back to newest first.
        assert_eq!(list[0].created, 200);
    }

    #[test]
    fn search_is_case_insensitive_pure_filter() {
        let data = items();
        let hits = query(&data, SortOrder::NameAscending, Some("ALP"));
        assert_eq!(hits.len(), 2);
        assert!(query(&data, SortOrder::NameAscending, Some("zzz")).is_empty());
        assert_eq!(data.len(), 5);
        assert_eq!(query(&data, SortOrder::NameAscending, Some("  ")).len(), 5);
    }
}
