use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{AppConfig, ModemInstanceConfig, SinkKind};

pub const TRAFFIC_PATH: &str = "/api/monitoring/traffic-statistics";
pub const MONTHLY_PATH: &str = "/api/monitoring/month_statistics";
pub const SIGNAL_PATH: &str = "/api/device/signal";

pub struct TestConfig {
    pub instances: Vec<ModemInstanceConfig>,
    pub fetch_timeout_secs: u64,
    pub keep_zero_readings: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            fetch_timeout_secs: 5,
            keep_zero_readings: false,
        }
    }
}

impl TestConfig {
    pub fn with_instance(mut self, instance: ModemInstanceConfig) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn keep_zero(mut self) -> Self {
        self.keep_zero_readings = true;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            instances: self.instances.clone(),
            interval_secs: 10,
            fetch_timeout_secs: self.fetch_timeout_secs,
            keep_zero_readings: self.keep_zero_readings,
            sink: SinkKind::Log,
            collectd_hostname: "test-host".to_string(),
        }
    }
}

pub struct DeviceFixtures;

impl DeviceFixtures {
    pub fn traffic_xml() -> &'static str {
        "<resp><CurrentDownload>100</CurrentDownload><CurrentUpload>50</CurrentUpload>\
         <TotalDownload>9000</TotalDownload><TotalUpload>3000</TotalUpload>\
         <CurrentConnectTime>3600</CurrentConnectTime></resp>"
    }

    pub fn monthly_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
<CurrentMonthDownload>123456789</CurrentMonthDownload>
<CurrentMonthUpload>23456789</CurrentMonthUpload>
<MonthDuration>86400</MonthDuration>
<MonthLastClearTime>2026-10-1</MonthLastClearTime>
</response>"#
    }

    pub fn signal_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
<pci>302</pci>
<sc></sc>
<cell_id>12345678</cell_id>
<rsrq>-11dB</rsrq>
<rsrp>-95dBm</rsrp>
<rssi>-69dBm</rssi>
<sinr>&gt;=30dB</sinr>
<rscp></rscp>
<ecio></ecio>
<mode>7</mode>
<band>3</band>
<lteulfreq>17600</lteulfreq>
<ltedlfreq>18550</ltedlfreq>
</response>"#
    }

    pub fn device_error_xml(code: &str, message: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><error><code>{}</code><message>{}</message></error>"#,
            code, message
        )
    }

    pub fn response(pairs: &[(&str, &str)]) -> String {
        let fields: String = pairs
            .iter()
            .map(|(tag, text)| format!("<{tag}>{text}</{tag}>"))
            .collect();
        format!("<response>{}</response>", fields)
    }
}

/// A fake modem web UI. Anything not mounted answers 404.
pub struct MockModem {
    server: MockServer,
}

impl MockModem {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Root page plus all three status endpoints with the stock fixtures.
    pub async fn healthy() -> Self {
        let modem = Self::start().await;
        modem.mount_root(200).await;
        modem.mount_xml(TRAFFIC_PATH, DeviceFixtures::traffic_xml()).await;
        modem.mount_xml(MONTHLY_PATH, DeviceFixtures::monthly_xml()).await;
        modem.mount_xml(SIGNAL_PATH, DeviceFixtures::signal_xml()).await;
        modem
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    pub fn instance(&self, name: &str) -> ModemInstanceConfig {
        ModemInstanceConfig::new(name, self.uri())
    }

    pub async fn mount_root(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_raw("<html><body>LTE CPE</body></html>", "text/html"),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mount_xml(&self, endpoint: &str, body: impl Into<String>) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.into(), "text/xml"))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_status(&self, endpoint: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Request paths in the order the modem saw them.
    pub async fn received_paths(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| request.url.path().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default()
            .with_instance(ModemInstanceConfig::new("spark", "192.168.1.254"))
            .to_app_config();

        assert_eq!(config.instances.len(), 1);
        assert!(config.is_configured());
        assert!(!config.keep_zero_readings);
    }

    #[test]
    fn test_response_fixture() {
        let body = DeviceFixtures::response(&[("band", "3"), ("rssi", "-69dBm")]);
        assert_eq!(body, "<response><band>3</band><rssi>-69dBm</rssi></response>");
    }

    #[tokio::test]
    async fn test_mock_modem_serves_fixtures() {
        let modem = MockModem::healthy().await;

        let body = reqwest::get(format!("{}{}", modem.uri(), SIGNAL_PATH))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("<band>3</band>"));

        let missing = reqwest::get(format!("{}/api/unknown", modem.uri())).await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        assert_eq!(modem.received_paths().await, vec![SIGNAL_PATH, "/api/unknown"]);
    }
}
