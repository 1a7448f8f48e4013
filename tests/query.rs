use idp_registry_explorer::query::{SearchFilter, Window, count_query, registry_query};

#[test]
fn windows_follow_page_size() {
    assert_eq!(Window::for_page(1, 5), Window { offset: 0, limit: 5 });
    assert_eq!(Window::for_page(4, 20), Window { offset: 60, limit: 20 });
    assert_eq!(Window::for_page(0, 10), Window { offset: 0, limit: 10 });
}

#[test]
fn isoforms_are_excluded_without_search() {
    let query = count_query(&SearchFilter::new(""));
    assert!(query.contains(r#"FILTER(!CONTAINS(REPLACE(STR(?sequenceID), "^.*/", ""), "-"))"#));
    assert!(!query.contains("FILTER(CONTAINS("));
}

#[test]
fn search_text_cannot_escape_literal() {
    let filter = SearchFilter::new(r#"P0") } DROP ALL { ("#);
    let query = registry_query(Window::for_page(2, 10), &filter);
    assert!(query.contains(r#""P0\") } DROP ALL { (""#));
    assert!(query.contains("LIMIT 10"));
    assert!(query.contains("OFFSET 10"));
}

#[test]
fn filter_text_is_passed_through_untouched() {
    let filter = SearchFilter::new(" P04 ");
    assert_eq!(filter.as_str(), " P04 ");
    assert!(!filter.is_empty());
    assert!(filter.clause().contains(r#", " P04 "))"#));
}
