//! Frame codec for the `~m~N~m~<payload>` length-prefixed wire format.
//!
//! Frames arrive one-per-WebSocket-message in practice, but [`decode_stream`]
//! tolerates several frames concatenated in one buffer and never straddles a
//! frame boundary; the encode side always re-frames, even for echoed
//! heartbeats.

use crate::errors::Error;

const DELIM: &str = "~m~";

/// Encodes `payload` as `~m~<len(payload)>~m~<payload>`, where the length is
/// the UTF-8 byte length of `payload`.
pub fn encode(payload: &str) -> String {
    format!("{DELIM}{}{DELIM}{payload}", payload.len())
}

/// True iff `payload` is a heartbeat token of the shape `~h~<digits>`.
pub fn is_heartbeat(payload: &str) -> bool {
    match payload.strip_prefix("~h~") {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Splits every complete frame out of `buf`, returning the decoded payloads
/// in arrival order. A frame begins with the literal `~m~`, then ASCII
/// digits terminated by a second literal `~m~`, then exactly that many bytes
/// of payload.
///
/// Fails with [`Error::MalformedFrame`] if either delimiter is missing or the
/// length header is not all digits.
pub fn decode_stream(buf: &str) -> Result<Vec<String>, Error> {
    let mut payloads = Vec::new();
    let mut rest = buf;
    while !rest.is_empty() {
        let after_first = rest
            .strip_prefix(DELIM)
            .ok_or_else(|| Error::MalformedFrame(format!("missing opening delimiter in '{rest}'")))?;
        let second_delim = after_first
            .find(DELIM)
            .ok_or_else(|| Error::MalformedFrame(format!("missing length delimiter in '{rest}'")))?;
        let len_str = &after_first[..second_delim];
        let len: usize = len_str
            .parse()
            .map_err(|_| Error::MalformedFrame(format!("non-numeric length header '{len_str}'")))?;
        let payload_start = second_delim + DELIM.len();
        let body = &after_first[payload_start..];
        if body.len() < len {
            return Err(Error::MalformedFrame(format!(
                "truncated frame: expected {len} bytes, got {}",
                body.len()
            )));
        }
        payloads.push(body[..len].to_string());
        rest = &body[len..];
    }
    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_roundtrips_through_decode() {
        let payload = r#"{"m":"set_auth_token","p":["unauthorized_user_token"]}"#;
        let framed = encode(payload);
        assert_eq!(decode_stream(&framed).unwrap(), vec![payload.to_string()]);
    }

    #[test]
    fn encode_prefixes_with_utf8_byte_length() {
        let payload = r#"{"m":"set_auth_token","p":["unauthorized_user_token"]}"#;
        assert_eq!(payload.len(), 49);
        assert_eq!(
            encode(payload),
            "~m~49~m~{\"m\":\"set_auth_token\",\"p\":[\"unauthorized_user_token\"]}"
        );
    }

    #[test]
    fn decode_handles_multibyte_payload_length_in_bytes_not_chars() {
        let payload = "héllo"; // 6 UTF-8 bytes, 5 chars
        let framed = encode(payload);
        assert!(framed.starts_with("~m~6~m~"));
        assert_eq!(decode_stream(&framed).unwrap(), vec![payload.to_string()]);
    }

    #[test]
    fn decode_handles_several_frames_in_one_buffer() {
        let framed = format!("{}{}", encode("a"), encode("bb"));
        assert_eq!(decode_stream(&framed).unwrap(), vec!["a".to_string(), "bb".to_string()]);
    }

    #[test]
    fn decode_rejects_missing_delimiter() {
        assert!(decode_stream("not a frame").is_err());
    }

    #[test]
    fn decode_rejects_non_digit_length() {
        assert!(decode_stream("~m~abc~m~xyz").is_err());
    }

    #[test]
    fn heartbeat_detection() {
        assert!(is_heartbeat("~h~1"));
        assert!(is_heartbeat("~h~42"));
        assert!(!is_heartbeat("~h~"));
        assert!(!is_heartbeat("~h~1a"));
        assert!(!is_heartbeat(r#"{"m":"du"}"#));
    }

    #[test]
    fn heartbeat_frame_round_trips_through_encode() {
        // S2: inbound `~m~4~m~~h~1` echoes back identical bytes.
        let inbound = "~m~4~m~~h~1";
        let payloads = decode_stream(inbound).unwrap();
        assert_eq!(payloads, vec!["~h~1".to_string()]);
        assert!(is_heartbeat(&payloads[0]));
        assert_eq!(encode(&payloads[0]), inbound);
    }
}
