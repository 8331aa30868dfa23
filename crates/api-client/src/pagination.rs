/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
///
/// Shopify sends `<url>; rel="previous", <url>; rel="next"`; either part may be absent.
pub fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| url.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_next_link() {
        let header = r#"<https://shop.example/admin/api/2024-10/products.json?limit=250&page_info=abc>; rel="next""#;
        assert_eq!(
            next_page_url(header).as_deref(),
            Some("https://shop.example/admin/api/2024-10/products.json?limit=250&page_info=abc")
        );
    }

    #[test]
    fn skips_previous_link() {
        let header = r#"<https://s/p.json?page_info=prev>; rel="previous", <https://s/p.json?page_info=nxt>; rel="next""#;
        assert_eq!(next_page_url(header).as_deref(), Some("https://s/p.json?page_info=nxt"));

        let last_page = r#"<https://s/p.json?page_info=prev>; rel="previous""#;
        assert_eq!(next_page_url(last_page), None);
    }

    #[test]
    fn malformed_header_has_no_next() {
        assert_eq!(next_page_url(""), None);
        assert_eq!(next_page_url(r#"https://s/p.json; rel="next""#), None);
    }
}
