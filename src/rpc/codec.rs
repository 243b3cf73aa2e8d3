//! JSON-RPC 2.0 envelopes and length-prefixed framing.
//!
//! Wire format per message: `[4-byte length, big-endian u32][JSON payload]`.
//! Requests address a remote object through `params.target`; positional
//! operation arguments travel in `params.args`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::RpcError;

/// Upper bound for a single frame (16 MiB).
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: RequestParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestParams {
    pub target: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, target: &str, method: &str, args: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.to_string(),
            params: RequestParams {
                target: target.to_string(),
                args,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteFault>,
}

/// Error object reported by the remote side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteFault {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    #[cfg(test)]
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    #[cfg(test)]
    pub fn failure(id: u64, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Value::from(id),
            result: None,
            error: Some(RemoteFault {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Match the response against the request it answers and unwrap it.
    /// A missing `result` on success means the operation returns nothing.
    pub fn into_result(self, expected_id: u64) -> Result<Value, RpcError> {
        if self.id.as_u64() != Some(expected_id) {
            return Err(RpcError::IdMismatch {
                expected: expected_id,
                got: self.id.to_string(),
            });
        }
        if let Some(fault) = self.error {
            return Err(RpcError::Remote {
                code: fault.code,
                message: fault.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, RpcError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode_response(data: &[u8]) -> Result<RpcResponse, RpcError> {
    Ok(serde_json::from_slice(data)?)
}

#[cfg(test)]
pub fn decode_request(data: &[u8]) -> Result<RpcRequest, RpcError> {
    Ok(serde_json::from_slice(data)?)
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or(RpcError::FrameTooLarge {
            len: payload.len(),
            limit: MAX_FRAME_LEN,
        })?;
    writer.write_u32(len).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, RpcError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await?;
    if len > MAX_FRAME_LEN {
        return Err(RpcError::FrameTooLarge {
            len: len as usize,
            limit: MAX_FRAME_LEN,
        });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_shape() {
        let req = RpcRequest::new(4, "s/2", "getConf", vec![json!("port")]);
        let v: Value = serde_json::from_slice(&encode(&req).unwrap()).unwrap();
        assert_eq!(
            v,
            json!({
                "jsonrpc":"2.0",
                "id":4,
                "method":"getConf",
                "params":{"target":"s/2","args":["port"]}
            })
        );
    }

    #[test]
    fn response_without_result_is_null() {
        let resp = decode_response(br#"{"jsonrpc":"2.0","id":9}"#).unwrap();
        assert_eq!(resp.into_result(9).unwrap(), Value::Null);
    }

    #[test]
    fn response_error_becomes_remote_error() {
        let resp = RpcResponse::failure(3, -32000, "port already in use");
        match resp.into_result(3) {
            Err(RpcError::Remote { code, message }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "port already in use");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn mismatched_id_rejected() {
        let resp = RpcResponse::success(1, json!(true));
        assert!(matches!(
            resp.into_result(2),
            Err(RpcError::IdMismatch { expected: 2, .. })
        ));
    }

    #[tokio::test]
    async fn frame_carries_length_prefix() {
        let mut buf: Vec<u8> = Vec::new();
        write_frame(&mut buf, b"{}").await.unwrap();
        assert_eq!(buf, vec![0, 0, 0, 2, b'{', b'}']);

        let mut reader = buf.as_slice();
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn oversized_frame_rejected_before_allocation() {
        let header = (MAX_FRAME_LEN + 1).to_be_bytes();
        let mut reader = &header[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(RpcError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn truncated_frame_is_io_error() {
        let data = [0u8, 0, 0, 5, b'{'];
        let mut reader = &data[..];
        assert!(matches!(read_frame(&mut reader).await, Err(RpcError::Io(_))));
    }
}
