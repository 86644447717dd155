/// Emergency calling through the device dialer.
use heapless::String;

use crate::provider::Dialer;

/// Buffer type for a `tel:` URI
pub type TelUri = String<32>;

/// What happened to a call request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialOutcome {
    /// The dialer was opened with the number
    Placed,
    /// The device cannot place calls
    Unsupported,
    /// Nothing dialable left after sanitizing
    InvalidNumber,
    /// The dialer reported an error while opening
    Failed,
}

impl DialOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialOutcome::Placed => "placed",
            DialOutcome::Unsupported => "unsupported",
            DialOutcome::InvalidNumber => "invalid_number",
            DialOutcome::Failed => "failed",
        }
    }
}

/// Keep only digits and `+`, dropping spaces, dashes and brackets.
///
/// Numbers longer than the buffer are cut short.
pub fn sanitize_number(raw: &str) -> String<24> {
    let mut out = String::new();
    for ch in raw.chars().filter(|c| c.is_ascii_digit() || *c == '+') {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// Build `tel:<sanitized number>`, or `None` if nothing dialable remains.
pub fn tel_uri(raw: &str) -> Option<TelUri> {
    let number = sanitize_number(raw);
    if number.is_empty() {
        return None;
    }
    let mut uri = TelUri::new();
    let _ = uri.push_str("tel:");
    let _ = uri.push_str(&number);
    Some(uri)
}

/// Open the dialer for `raw` if the device supports it.
pub fn place_call<D: Dialer>(dialer: &mut D, raw: &str) -> DialOutcome {
    let Some(uri) = tel_uri(raw) else {
        log::warn!("Refusing to dial '{}': no digits", raw);
        return DialOutcome::InvalidNumber;
    };

    if !dialer.can_open(&uri) {
        log::warn!("Phone calls are not supported on this device");
        return DialOutcome::Unsupported;
    }

    match dialer.open(&uri) {
        Ok(()) => {
            log::info!("Dialing {}", uri);
            DialOutcome::Placed
        }
        Err(e) => {
            log::error!("Error making call to {}: {:?}", uri, e);
            DialOutcome::Failed
        }
    }
}
