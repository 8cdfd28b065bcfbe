/// Number of pages needed for `total_count` items.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }

    u32::try_from(total_count.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}

/// Page links to show: the first page, up to two pages either side of
/// `current`, and the last page.
pub fn page_window(current: u32, total: u32) -> Vec<u32> {
    let mut pages = vec![1];

    let start = current.saturating_sub(2).max(2);
    let end = current.saturating_add(2).min(total.saturating_sub(1));
    pages.extend(start..=end);

    if total > 1 {
        pages.push(total);
    }

    pages.sort_unstable();
    pages.dedup();
    pages
}
