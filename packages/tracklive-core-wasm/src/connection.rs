use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use crate::console_log;
use crate::feed;
use crate::session;

/// Fixed push endpoint. One connection per page lifetime.
pub const LISTEN_URL: &str = "wss://fiordland.antarkt.is/listen";
/// Marker prefixed to the session code in the credential frame.
pub const CREDENTIAL_MARKER: char = '+';

/// The single outbound frame: the session code behind the marker.
pub fn credential_frame(code: &str) -> String {
    format!("{}{}", CREDENTIAL_MARKER, code)
}

/// Open the push connection and install its callbacks. The callbacks are
/// leaked on purpose: they live exactly as long as the page, and the only
/// way out of a broken connection is the landing-page redirect — there is no
/// resumption protocol to reconnect into, so none is attempted here.
pub fn connect(code: &str) -> Result<(), JsValue> {
    let ws = WebSocket::new(LISTEN_URL)?;

    let frame = credential_frame(code);
    let ws_for_open = ws.clone();
    let onopen = Closure::<dyn FnMut()>::new(move || {
        console_log!("push connection open, sending credential");
        // The server validates the code out-of-band; a send failure means
        // the connection is already dead and the session with it
        if ws_for_open.send_with_str(&frame).is_err() {
            session::redirect_to_landing();
        }
    });
    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    onopen.forget();

    let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        let text = match event.data().as_string() {
            Some(text) => text,
            None => {
                // Non-text frames are outside the protocol
                session::redirect_to_landing();
                return;
            }
        };
        if let Err(reason) = feed::ingest(&text) {
            crate::console::error(&format!("fatal push message: {}", reason));
            session::redirect_to_landing();
        }
    });
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    // Transport error and close are terminal, same as a protocol violation
    let onerror = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
        session::redirect_to_landing();
    });
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    let onclose = Closure::<dyn FnMut(CloseEvent)>::new(move |_: CloseEvent| {
        session::redirect_to_landing();
    });
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_frame_prefixes_the_marker() {
        assert_eq!(credential_frame("12345"), "+12345");
        assert_eq!(credential_frame("4712345678"), "+4712345678");
    }
}
