use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;

/// Decode a base64 string directly into a UTF-8 `String`.
pub fn decode_to_string(input: &str) -> Result<String, Base64StringError> {
    let bytes = b64.decode(input)?;
    String::from_utf8(bytes).map_err(Base64StringError::Utf8)
}

/// Encode raw bytes as a base64 string.
pub fn encode_str<T: AsRef<[u8]>>(input: T) -> String {
    b64.encode(input)
}

#[derive(Debug, thiserror::Error)]
pub enum Base64StringError {
    #[error("invalid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("base64 payload is not valid utf-8: {0}")]
    Utf8(std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_json_envelope() {
        let original = r#"{"x402Version":2,"accepted":{},"proof":"abc"}"#;
        let encoded = encode_str(original);
        let decoded = decode_to_string(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(decode_to_string("not-valid-base64!!").is_err());
    }
}
