//! Wire codec for the snappy-compressed protobuf envelope.
//!
//! Both remote-write and remote-read bodies are a raw snappy block wrapping
//! a protobuf message. Decoding reverses the compression first and then
//! parses the message; the two failure modes stay distinct so the HTTP
//! layer can pick different response codes. Pure, no side effects.

use prost::Message;

use crate::error::{DecodeError, EncodeError};
use crate::proto;

/// Decodes a compressed remote-write body into a [`proto::WriteRequest`].
///
/// # Errors
///
/// Returns [`DecodeError::Decompress`] if the body is not a valid snappy
/// block, [`DecodeError::Message`] if the decompressed bytes are not a
/// valid `WriteRequest`.
pub fn decode_write(body: &[u8]) -> Result<proto::WriteRequest, DecodeError> {
    let raw = decompress(body)?;
    proto::WriteRequest::decode(raw.as_slice()).map_err(|e| DecodeError::Message { source: e })
}

/// Decodes a compressed remote-read body into a [`proto::ReadRequest`].
///
/// # Errors
///
/// Same failure modes as [`decode_write`].
pub fn decode_read(body: &[u8]) -> Result<proto::ReadRequest, DecodeError> {
    let raw = decompress(body)?;
    proto::ReadRequest::decode(raw.as_slice()).map_err(|e| DecodeError::Message { source: e })
}

/// Encodes a [`proto::ReadResponse`] as a snappy-compressed protobuf body.
///
/// # Errors
///
/// Returns [`EncodeError`] if serialization or compression fails.
pub fn encode_read_response(response: &proto::ReadResponse) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::with_capacity(response.encoded_len());
    response
        .encode(&mut buf)
        .map_err(|e| EncodeError::Message { source: e })?;

    let mut encoder = snap::raw::Encoder::new();
    encoder
        .compress_vec(&buf)
        .map_err(|e| EncodeError::Compress { source: e })
}

fn decompress(body: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = snap::raw::Decoder::new();
    decoder
        .decompress_vec(body)
        .map_err(|e| DecodeError::Decompress { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(data: &[u8]) -> Vec<u8> {
        snap::raw::Encoder::new().compress_vec(data).unwrap()
    }

    fn sample_write_request() -> proto::WriteRequest {
        proto::WriteRequest {
            timeseries: vec![proto::TimeSeries {
                labels: vec![
                    proto::Label {
                        name: "__name__".to_string(),
                        value: "cpu_usage".to_string(),
                    },
                    proto::Label {
                        name: "host".to_string(),
                        value: "web1".to_string(),
                    },
                ],
                samples: vec![proto::Sample {
                    value: 0.42,
                    timestamp: 1_700_000_000_000,
                }],
            }],
        }
    }

    #[test]
    fn test_decode_write_roundtrip() {
        let request = sample_write_request();
        let body = compress(&request.encode_to_vec());

        let decoded = decode_write(&body).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decode_read_roundtrip() {
        let request = proto::ReadRequest {
            queries: vec![proto::Query {
                start_timestamp_ms: 0,
                end_timestamp_ms: 2000,
                matchers: vec![proto::LabelMatcher {
                    r#type: proto::MatcherType::Eq as i32,
                    name: "__name__".to_string(),
                    value: "cpu_usage".to_string(),
                }],
            }],
        };
        let body = compress(&request.encode_to_vec());

        let decoded = decode_read(&body).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decode_rejects_bad_compression() {
        let err = decode_write(b"definitely not snappy").unwrap_err();
        assert!(matches!(err, DecodeError::Decompress { .. }));
    }

    #[test]
    fn test_decode_rejects_bad_message() {
        // A valid snappy block whose payload is not a valid protobuf
        // message: tag 1 with wire type 7 is always invalid.
        let body = compress(&[0x0f, 0xff, 0xff]);
        let err = decode_write(&body).unwrap_err();
        assert!(matches!(err, DecodeError::Message { .. }));
    }

    #[test]
    fn test_encode_read_response_roundtrip() {
        let response = proto::ReadResponse {
            results: vec![proto::QueryResult {
                timeseries: sample_write_request().timeseries,
            }],
        };

        let body = encode_read_response(&response).unwrap();
        let raw = snap::raw::Decoder::new().decompress_vec(&body).unwrap();
        let decoded = proto::ReadResponse::decode(raw.as_slice()).unwrap();
        assert_eq!(decoded, response);
    }
}
