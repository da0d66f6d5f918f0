#![no_main]

use fishing_session_client::codec::{self, Inbound};
use fishing_session_client::session::Session;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Exercise serde_json's own UTF-8 handling on the wire enum.
    let _ = serde_json::from_slice::<fishing_session_client::protocol::ServerMessage>(data);

    // Any frame that decodes must also apply without panicking.
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(Inbound::Event(event)) = codec::decode(text) {
            let mut session = Session::new();
            let _ = session.apply(event);
        }
    }
});
