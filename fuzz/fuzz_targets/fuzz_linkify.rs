#![no_main]

use labframe_text::{LinkifyOptions, find_links, linked_html};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 4096 {
        return;
    }

    let links = find_links(text);
    let mut cursor = 0;
    for link in &links {
        // Spans are ordered, disjoint and on char boundaries.
        assert!(link.range.start >= cursor);
        assert!(link.range.start < link.range.end);
        assert!(text.is_char_boundary(link.range.start));
        assert!(text.is_char_boundary(link.range.end));
        assert!(link.href.to_ascii_lowercase().starts_with("http"));
        cursor = link.range.end;
    }

    // Raw markup never survives into the output.
    let html = linked_html(text, &LinkifyOptions::default());
    let anchors = html.matches("<a ").count();
    assert_eq!(anchors, links.len());
    assert_eq!(html.matches('<').count(), anchors * 2);
});
