// =====================================================================================
// ENDPOINT AGGREGATOR
// =====================================================================================

use tracing::{debug, warn};

use crate::error::ModemError;
use crate::models::{EndpointSpec, MergedStatRecord, RawFieldRecord};
use crate::services::session::DeviceSession;
use crate::services::xml::flatten;

pub struct EndpointAggregator {
    endpoints: &'static [EndpointSpec],
}

impl EndpointAggregator {
    pub fn new(endpoints: &'static [EndpointSpec]) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &'static [EndpointSpec] {
        self.endpoints
    }

    /// Fetches every endpoint in order and merges what came back. An endpoint
    /// that fails in any way just contributes no fields.
    pub async fn aggregate(&self, session: &DeviceSession, instance_name: &str) -> MergedStatRecord {
        let mut record = MergedStatRecord::new();

        for endpoint in self.endpoints {
            match fetch_endpoint(session, endpoint).await {
                Ok(fields) => {
                    debug!(
                        "{}: merging {} fields from {}",
                        instance_name,
                        fields.len(),
                        endpoint.name
                    );
                    record.merge(fields);
                }
                Err(ModemError::Device { code, message }) => {
                    warn!(
                        "{}: XML response from {} contained error. Error Code: {} Message: {}",
                        instance_name, endpoint.name, code, message
                    );
                }
                Err(e) => {
                    warn!("{}: skipping endpoint {}: {}", instance_name, endpoint.name, e);
                }
            }
        }

        record
    }
}

async fn fetch_endpoint(
    session: &DeviceSession,
    endpoint: &EndpointSpec,
) -> Result<RawFieldRecord, ModemError> {
    let body = session.fetch(endpoint.path).await?;
    let fields = flatten(&body)?;
    check_device_error(&fields)?;
    Ok(fields)
}

/// The device signals failures in-band with `code`/`message` children.
pub fn check_device_error(fields: &RawFieldRecord) -> Result<(), ModemError> {
    match fields.get("code").and_then(|code| code.as_deref()) {
        Some(code) if !code.trim().is_empty() => Err(ModemError::Device {
            code: code.to_string(),
            message: fields
                .get("message")
                .and_then(|message| message.clone())
                .unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fields(pairs: &[(&str, Option<&str>)]) -> RawFieldRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_device_error_detected() {
        let raw = fields(&[("code", Some("100003")), ("message", Some("Bad Request"))]);

        assert_matches!(
            check_device_error(&raw),
            Err(ModemError::Device { code, message }) if code == "100003" && message == "Bad Request"
        );
    }

    #[test]
    fn test_device_error_without_message() {
        let raw = fields(&[("code", Some("125002"))]);
        assert_matches!(check_device_error(&raw), Err(ModemError::Device { message, .. }) if message.is_empty());
    }

    #[test]
    fn test_blank_code_is_not_an_error() {
        let raw = fields(&[("code", None), ("rssi", Some("-69dBm"))]);
        assert!(check_device_error(&raw).is_ok());

        let raw = fields(&[("code", Some(" ")), ("rssi", Some("-69dBm"))]);
        assert!(check_device_error(&raw).is_ok());
    }
}
