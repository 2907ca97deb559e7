use crate::band::BandPowerSnapshot;
use serde::{Deserialize, Serialize};

/// Version of the snapshot wire format produced by [`encode_snapshot`].
/// The version is not carried on the wire; bump it when the JSON shape changes.
pub const WIRE_FORMAT_VERSION: u32 = 1;

/// The message broadcast to every subscriber once per emission.
///
/// Encodes as `{"time": <epoch seconds>, "data": {"delta": .., "theta": .., "alpha": .., "beta": .., "gamma": ..}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    /// Wall-clock emission time in seconds since the Unix epoch.
    pub time: f64,
    pub data: BandPowerSnapshot,
}

impl SnapshotMessage {
    pub fn new(time: f64, data: BandPowerSnapshot) -> Self {
        Self { time, data }
    }
}

/// Serializes a snapshot into the UTF-8 JSON text frame sent to subscribers.
pub fn encode_snapshot(message: &SnapshotMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_encoded_shape() {
        let message = SnapshotMessage::new(
            1700000000.5,
            BandPowerSnapshot {
                delta: 1.0,
                theta: 2.0,
                alpha: 3.5,
                beta: 4.0,
                gamma: 0.25,
            },
        );
        let text = encode_snapshot(&message).unwrap();
        assert_eq!(
            text,
            r#"{"time":1700000000.5,"data":{"delta":1.0,"theta":2.0,"alpha":3.5,"beta":4.0,"gamma":0.25}}"#
        );

        let value: Value = serde_json::from_str(&text).unwrap();
        let data = value["data"].as_object().unwrap();
        assert_eq!(data.len(), 5);
        assert_eq!(value.as_object().unwrap().len(), 2);
    }
}
