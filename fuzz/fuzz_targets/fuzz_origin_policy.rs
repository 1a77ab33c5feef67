#![no_main]

use arbitrary::Arbitrary;
use labframe_core::{Origin, OriginMatchMode, OriginPolicy};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    allowed: Vec<String>,
    sender: String,
    fragment: bool,
}

fuzz_target!(|input: Input| {
    if input.allowed.len() > 16 || input.sender.len() > 512 {
        return;
    }
    let mode = if input.fragment {
        OriginMatchMode::Fragment
    } else {
        OriginMatchMode::Strict
    };

    let mut policy = OriginPolicy::new(mode);
    for raw in &input.allowed {
        let _ = policy.allow(raw);
    }

    let verdict = policy.allows(&input.sender);

    if mode == OriginMatchMode::Strict {
        // Strict mode only trusts senders that parse to an allowed origin.
        let parsed = Origin::parse(&input.sender);
        assert_eq!(
            verdict,
            parsed.is_some_and(|origin| policy.entries().contains(&origin))
        );
        // Parsed origins re-serialize to something that parses identically.
        if let Some(origin) = Origin::parse(&input.sender) {
            assert_eq!(Origin::parse(&origin.to_string()), Some(origin));
        }
    }

    if policy.entries().is_empty() {
        assert!(!verdict, "an empty allow-list trusts nobody");
    }
});
