#![no_main]

use labframe_core::{FrameMessage, MessageCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    if json.len() > 4096 {
        return;
    }

    for codec in [MessageCodec::new(), MessageCodec::with_namespace("icmpp")] {
        // Decoding arbitrary input must never panic.
        let Ok(message) = codec.from_json(json) else {
            continue;
        };

        if let FrameMessage::Resize { height } = message {
            assert!(height > 0, "decoded heights are positive");
        }

        // Whatever decodes must survive a trip through the wire form.
        let wire = codec.to_json(&message);
        assert_eq!(codec.from_json(&wire), Ok(message));
    }
});
