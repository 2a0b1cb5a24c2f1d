//! Textual JSON wire format and framing for the hot-reload delta protocol.
//!
//! Payloads are newline-delimited JSON documents ("delimited text documents"
//! per the protocol description): exactly one [`UpdatePayload`] or
//! [`DiagnosticsMsg`] per line, UTF-8, with the line's own newline escaped
//! by ordinary JSON string escaping so it never collides with the framing
//! delimiter. The one-byte ack that follows a payload on the pipe transport
//! is *not* part of this framing; see [`read_ack`]/[`write_ack`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::types::{Ack, Diagnostic, ModuleId, ModuleUpdate};

/// Errors raised while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
	/// The line was not valid JSON, or not shaped like the expected document.
	#[error("malformed payload: {0}")]
	Malformed(#[from] serde_json::Error),
	/// A delta carried a non-nil module id but both byte arrays were empty.
	///
	/// This is a fatal protocol error for the whole batch, not just the
	/// offending delta: a module id with nothing to apply indicates the
	/// sender's framing is out of sync with its own emit.
	#[error("module {0} has a non-nil id but both deltas are empty")]
	EmptyDeltaWithModuleId(ModuleId),
	/// The stream ended or faulted while framing a message.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDelta {
	#[serde(rename = "moduleId")]
	module_id: Uuid,
	#[serde(rename = "metadataDelta", with = "b64")]
	metadata_delta: Vec<u8>,
	#[serde(rename = "ilDelta", with = "b64")]
	il_delta: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePayload {
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	kind: Option<String>,
	deltas: Vec<WireDelta>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDiagnostics {
	#[serde(rename = "type")]
	kind: String,
	diagnostics: Vec<String>,
}

const BROWSER_DELTA_TYPE: &str = "HotReloadDelta";
const DIAGNOSTICS_TYPE: &str = "HotReloadDiagnosticsv1";

/// Serialize module updates to one JSON line (no trailing newline).
///
/// `tag_for_browser` adds the `"type": "HotReloadDelta"` discriminator the
/// browser-refresh channel expects; the pipe transport omits it.
pub fn encode_updates(updates: &[ModuleUpdate], tag_for_browser: bool) -> String {
	let payload = WirePayload {
		kind: tag_for_browser.then(|| BROWSER_DELTA_TYPE.to_string()),
		deltas: updates
			.iter()
			.map(|u| WireDelta {
				module_id: u.module_id.as_uuid(),
				metadata_delta: u.metadata_delta.clone(),
				il_delta: u.il_delta.clone(),
			})
			.collect(),
	};
	serde_json::to_string(&payload).expect("wire payload is always serializable")
}

/// Parse one JSON line back into module updates.
///
/// Rejects a delta whose decoded byte arrays are both empty alongside a
/// non-nil module id: such a delta cannot possibly describe a real edit
/// and signals a protocol-level framing bug in the sender.
pub fn decode_updates(line: &str) -> Result<Vec<ModuleUpdate>, WireError> {
	let payload: WirePayload = serde_json::from_str(line)?;
	payload
		.deltas
		.into_iter()
		.map(|d| {
			let module_id = ModuleId::from_uuid(d.module_id);
			if !module_id.is_nil() && d.metadata_delta.is_empty() && d.il_delta.is_empty() {
				return Err(WireError::EmptyDeltaWithModuleId(module_id));
			}
			Ok(ModuleUpdate {
				module_id,
				metadata_delta: d.metadata_delta,
				il_delta: d.il_delta,
			})
		})
		.collect()
}

/// Serialize a diagnostics message to one JSON line (no trailing newline).
pub fn encode_diagnostics(diagnostics: &[Diagnostic]) -> String {
	let msg = WireDiagnostics {
		kind: DIAGNOSTICS_TYPE.to_string(),
		diagnostics: diagnostics
			.iter()
			.map(|d| d.formatted_message.clone())
			.collect(),
	};
	serde_json::to_string(&msg).expect("diagnostics message is always serializable")
}

/// Parse a diagnostics message line back into plain strings.
pub fn decode_diagnostics(line: &str) -> Result<Vec<String>, WireError> {
	let msg: WireDiagnostics = serde_json::from_str(line)?;
	Ok(msg.diagnostics)
}

/// Write one JSON line (payload or diagnostics), followed by `\n`, and flush.
pub async fn write_line(
	writer: &mut (impl AsyncWrite + Unpin),
	line: &str,
) -> Result<(), WireError> {
	writer.write_all(line.as_bytes()).await?;
	writer.write_all(b"\n").await?;
	writer.flush().await?;
	Ok(())
}

/// Read one JSON line, stripping the trailing newline.
///
/// Returns `Ok(None)` on a clean EOF with no partial line buffered, which
/// callers treat as "the peer closed the connection".
pub async fn read_line(
	reader: &mut (impl AsyncBufRead + Unpin),
) -> Result<Option<String>, WireError> {
	let mut line = String::new();
	let bytes_read = reader.read_line(&mut line).await?;
	if bytes_read == 0 {
		return Ok(None);
	}
	if line.ends_with('\n') {
		line.pop();
		if line.ends_with('\r') {
			line.pop();
		}
	}
	Ok(Some(line))
}

/// Write the single ack byte and flush.
pub async fn write_ack(writer: &mut (impl AsyncWrite + Unpin), ack: Ack) -> Result<(), WireError> {
	writer.write_all(&[ack.to_byte()]).await?;
	writer.flush().await?;
	Ok(())
}

/// Read exactly one ack byte.
///
/// A byte outside the three defined codes is treated the same as a decode
/// failure on any other frame: a [`WireError::Malformed`]-shaped problem,
/// reported here as an I/O `InvalidData` error so callers have one error type
/// to match on.
pub async fn read_ack(reader: &mut (impl tokio::io::AsyncRead + Unpin)) -> Result<Ack, WireError> {
	use tokio::io::AsyncReadExt;
	let mut byte = [0u8; 1];
	reader.read_exact(&mut byte).await?;
	Ack::from_byte(byte[0]).ok_or_else(|| {
		WireError::Io(std::io::Error::new(
			std::io::ErrorKind::InvalidData,
			format!("unknown ack byte 0x{:02x}", byte[0]),
		))
	})
}

mod b64 {
	use serde::{Deserialize, Deserializer, Serializer};

	use super::BASE64;
	use super::Engine;

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&BASE64.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		BASE64
			.decode(encoded.as_bytes())
			.map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_update(id: u128) -> ModuleUpdate {
		ModuleUpdate {
			module_id: ModuleId::from_u128(id),
			metadata_delta: vec![1, 2, 3],
			il_delta: vec![4, 5, 6, 7],
		}
	}

	#[test]
	fn round_trip_module_id_and_bytes() {
		let updates = vec![sample_update(42), sample_update(7)];
		let line = encode_updates(&updates, false);
		let decoded = decode_updates(&line).unwrap();
		assert_eq!(decoded, updates);
	}

	#[test]
	fn browser_payload_carries_type_tag() {
		let updates = vec![sample_update(1)];
		let line = encode_updates(&updates, true);
		assert!(line.contains("\"type\":\"HotReloadDelta\""));
		let line_no_tag = encode_updates(&updates, false);
		assert!(!line_no_tag.contains("\"type\""));
	}

	#[test]
	fn rejects_empty_delta_with_non_nil_id() {
		let line = r#"{"deltas":[{"moduleId":"00000000-0000-0000-0000-000000000001","metadataDelta":"","ilDelta":""}]}"#;
		let err = decode_updates(line).unwrap_err();
		assert!(matches!(err, WireError::EmptyDeltaWithModuleId(_)));
	}

	#[test]
	fn nil_module_id_with_empty_deltas_is_accepted() {
		let line = r#"{"deltas":[{"moduleId":"00000000-0000-0000-0000-000000000000","metadataDelta":"","ilDelta":""}]}"#;
		let updates = decode_updates(line).unwrap();
		assert_eq!(updates.len(), 1);
		assert!(updates[0].module_id.is_nil());
	}

	#[test]
	fn malformed_json_is_rejected() {
		let err = decode_updates("not json").unwrap_err();
		assert!(matches!(err, WireError::Malformed(_)));
	}

	#[test]
	fn ack_byte_round_trip() {
		for ack in [Ack::Failed, Ack::Success, Ack::SuccessRefresh] {
			assert_eq!(Ack::from_byte(ack.to_byte()), Some(ack));
		}
		assert_eq!(Ack::from_byte(0xff), None);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn frame_round_trips_over_an_in_memory_pipe() {
		let (mut client, mut server) = tokio::io::duplex(4096);
		let updates = vec![sample_update(99)];
		let line = encode_updates(&updates, false);

		write_line(&mut client, &line).await.unwrap();
		write_ack(&mut client, Ack::Success).await.unwrap();
		drop(client);

		let mut reader = tokio::io::BufReader::new(&mut server);
		let received_line = read_line(&mut reader).await.unwrap().unwrap();
		assert_eq!(decode_updates(&received_line).unwrap(), updates);
		let ack = read_ack(&mut reader).await.unwrap();
		assert_eq!(ack, Ack::Success);
	}
}
