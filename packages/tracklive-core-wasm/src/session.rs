use wasm_bindgen::prelude::*;

use crate::connection;
use crate::module_state::ModuleState;
use crate::popup;

/// Query parameter on the tracking page carrying the session code.
pub const SESSION_CODE_PARAM: &str = "map";
/// Every non-recoverable failure navigates here.
pub const LANDING_PAGE: &str = "/";

const MIN_CODE_LEN: usize = 5;
const MAX_CODE_LEN: usize = 30;

/// Opaque numeric session code binding this page to a tracked party.
/// Immutable for the page lifetime, used exactly once as the credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCode(String);

impl SessionCode {
    /// Accepts 5 to 30 ASCII digits, nothing else.
    pub fn parse(raw: &str) -> Option<SessionCode> {
        let len = raw.len();
        if len < MIN_CODE_LEN || len > MAX_CODE_LEN {
            return None;
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(SessionCode(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Navigate to the landing page, abandoning the session. The page unloads,
/// so nothing after this call matters; errors from the location API are
/// ignored for the same reason.
pub fn redirect_to_landing() {
    if let Some(window) = web_sys::window() {
        let _ = window.location().replace(LANDING_PAGE);
    }
}

fn code_from_href(href: &str) -> Option<SessionCode> {
    let url = web_sys::Url::new(href).ok()?;
    let raw = url.search_params().get(SESSION_CODE_PARAM)?;
    SessionCode::parse(&raw)
}

/// Page entry point, called by the bootstrap script once the map surface and
/// popup elements exist. Validates the session code from the page URL, wires
/// the popup closer, and opens the push connection. A missing or malformed
/// code is a precondition failure: redirect to the landing page, start
/// nothing.
#[wasm_bindgen]
pub fn bootstrap(href: &str) -> Result<(), JsValue> {
    let code = match code_from_href(href) {
        Some(code) => code,
        None => {
            redirect_to_landing();
            return Ok(());
        }
    };

    ModuleState::with_mut(|state| state.session_code = Some(code.clone()));
    popup::wire_popup_closer()?;
    connection::connect(code.as_str())
}

/// The validated code for this page, for the JS side's session header.
/// `None` until bootstrap has run.
#[wasm_bindgen]
pub fn session_code() -> Option<String> {
    ModuleState::with(|state| state.session_code.as_ref().map(|c| c.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_codes_in_range() {
        assert!(SessionCode::parse("12345").is_some());
        assert!(SessionCode::parse("4712345678").is_some());
        // 30 digits, upper bound
        assert!(SessionCode::parse("123456789012345678901234567890").is_some());
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(SessionCode::parse("").is_none());
        assert!(SessionCode::parse("1234").is_none());
        // 31 digits
        assert!(SessionCode::parse("1234567890123456789012345678901").is_none());
    }

    #[test]
    fn rejects_non_digits() {
        assert!(SessionCode::parse("12345a").is_none());
        assert!(SessionCode::parse("+12345").is_none());
        assert!(SessionCode::parse("12 345").is_none());
        // Non-ASCII digits are not session codes
        assert!(SessionCode::parse("١٢٣٤٥").is_none());
    }

    #[test]
    fn code_round_trips() {
        let code = SessionCode::parse("12345").unwrap();
        assert_eq!(code.as_str(), "12345");
    }
}
