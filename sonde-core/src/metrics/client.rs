//! Metrics client
//!
//! Executes the plan from [`LinkState::plan`] against a [`MetricsTransport`].

use super::link::{LinkAction, LinkEvent, LinkInputs, LinkState};
use super::payload::{self, Overflow, Payload, Topic};
use super::{PublishReport, TelemetrySnapshot};
use crate::config::MetricsConfig;
use crate::traits::{ConnectOptions, MetricsTransport};

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Publish client with reconnect backoff and a fixed publish period
pub struct MetricsClient<T> {
    transport: T,
    config: MetricsConfig,
    version: &'static str,
    state: LinkState,
    enabled: bool,
    last_attempt_ms: Option<u32>,
    last_publish_ms: Option<u32>,
    connect_attempts: u32,
}

impl<T: MetricsTransport> MetricsClient<T> {
    /// Create a client; `version` goes into the startup announcement
    pub fn new(transport: T, config: MetricsConfig, version: &'static str) -> Self {
        let enabled = config.enabled;
        Self {
            transport,
            config,
            version,
            state: if enabled {
                LinkState::Disconnected
            } else {
                LinkState::Disabled
            },
            enabled,
            last_attempt_ms: None,
            last_publish_ms: None,
            connect_attempts: 0,
        }
    }

    /// Run one maintenance tick
    ///
    /// Call on every loop iteration. Returns a report when a periodic publish
    /// happened on this tick.
    pub fn maintain(&mut self, now_ms: u32, snapshot: &TelemetrySnapshot<'_>) -> Option<PublishReport> {
        let inputs = LinkInputs {
            enabled: self.enabled,
            network_up: self.transport.network_up(),
            transport_connected: self.transport.is_connected(),
            now_ms,
            last_attempt_ms: self.last_attempt_ms,
            last_publish_ms: self.last_publish_ms,
        };

        let step = self.state.plan(&inputs);
        if step.next != self.state {
            sonde_log::debug!(
                "metrics link {} -> {}",
                self.state.as_str(),
                step.next.as_str()
            );
        }
        self.state = step.next;

        match step.action {
            LinkAction::Idle => {
                if self.state == LinkState::Connected {
                    self.transport.service();
                }
                None
            }
            LinkAction::Disconnect => {
                sonde_log::info!("metrics link closed");
                self.transport.disconnect();
                None
            }
            LinkAction::Connect => {
                self.connect(now_ms);
                None
            }
            LinkAction::Publish => {
                self.transport.service();
                Some(self.publish_now(now_ms, snapshot))
            }
        }
    }

    /// Turn the bridge on or off
    ///
    /// Turning it off closes any open session right away.
    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.state = self.state.transition(LinkEvent::Enable);
        } else {
            if self.transport.is_connected() {
                self.transport.disconnect();
            }
            self.state = self.state.transition(LinkEvent::Disable);
        }
    }

    /// Publish every metric immediately, bypassing the period
    ///
    /// Returns `None` when no session is open. Restarts the period.
    pub fn force_publish(&mut self, now_ms: u32, snapshot: &TelemetrySnapshot<'_>) -> Option<PublishReport> {
        if !self.is_live() {
            return None;
        }
        Some(self.publish_now(now_ms, snapshot))
    }

    /// Publish a self-test verdict under `tests/<name>/`
    pub fn publish_test_result(
        &mut self,
        name: &str,
        status: &str,
        duration_ms: Option<u32>,
    ) -> Option<PublishReport> {
        if !self.is_live() {
            return None;
        }

        let mut report = PublishReport::default();
        let topic = payload::test_topic(&self.config.topic_prefix, name, "status");
        self.send(topic, status.as_bytes(), false, &mut report);

        if let Some(duration) = duration_ms {
            let topic = payload::test_topic(&self.config.topic_prefix, name, "duration_ms");
            self.send_value(topic, payload::integer(duration), &mut report);
        }

        Some(report)
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Session open according to both the state machine and the transport
    pub fn is_live(&self) -> bool {
        self.state == LinkState::Connected && self.transport.is_connected()
    }

    /// Connection attempts made so far
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn connect(&mut self, now_ms: u32) {
        self.last_attempt_ms = Some(now_ms);
        self.connect_attempts = self.connect_attempts.wrapping_add(1);

        let options = ConnectOptions {
            broker: &self.config.broker,
            port: self.config.port,
            client_id: &self.config.hostname,
            username: non_empty(&self.config.username),
            password: non_empty(&self.config.password),
            keep_alive_s: self.config.keep_alive_s,
        };

        match self.transport.connect(&options) {
            Ok(()) => {
                self.state = self.state.transition(LinkEvent::ConnectSucceeded);
                sonde_log::info!(
                    "metrics connected to {}:{}",
                    self.config.broker.as_str(),
                    self.config.port
                );
                self.publish_startup();
            }
            Err(_) => {
                self.state = self.state.transition(LinkEvent::ConnectFailed);
                sonde_log::warn!(
                    "metrics connect to {}:{} failed, retry in {} ms",
                    self.config.broker.as_str(),
                    self.config.port,
                    super::RECONNECT_BACKOFF_MS
                );
            }
        }
    }

    fn publish_startup(&mut self) {
        let mut report = PublishReport::default();
        let json = payload::startup_json(
            &self.config.hostname,
            self.version,
            self.transport.local_address(),
        );
        let topic = payload::topic(&self.config.topic_prefix, "status/startup");

        match json {
            Ok(json) => self.send(topic, json.as_bytes(), true, &mut report),
            Err(Overflow) => report.record(false),
        }
    }

    fn publish_now(&mut self, now_ms: u32, snapshot: &TelemetrySnapshot<'_>) -> PublishReport {
        self.last_publish_ms = Some(now_ms);
        let report = self.publish_metrics(snapshot);
        if !report.all_ok() {
            sonde_log::warn!(
                "metrics publish: {} of {} failed",
                report.failed,
                report.attempted
            );
        }
        report
    }

    fn publish_metrics(&mut self, snapshot: &TelemetrySnapshot<'_>) -> PublishReport {
        let mut report = PublishReport::default();
        let host = snapshot.host;

        self.metric("system/uptime_seconds", payload::integer(host.uptime_s), &mut report);

        self.metric("memory/heap_free", payload::integer(host.heap_free), &mut report);
        self.metric("memory/heap_total", payload::integer(host.heap_total), &mut report);
        if let Some(used) = payload::used_percent(host.heap_free, host.heap_total) {
            self.metric("memory/heap_percent", payload::decimal(used as f64, 1), &mut report);
        }

        if let Some(psram) = host.psram.filter(|p| p.total > 0) {
            self.metric("memory/psram_free", payload::integer(psram.free), &mut report);
            self.metric("memory/psram_total", payload::integer(psram.total), &mut report);
            if let Some(used) = payload::used_percent(psram.free, psram.total) {
                self.metric("memory/psram_percent", payload::decimal(used as f64, 1), &mut report);
            }
        }

        self.metric("network/wifi_rssi", payload::integer(host.wifi_rssi), &mut report);
        self.metric("network/wifi_channel", payload::integer(host.wifi_channel), &mut report);

        let env = snapshot.environment;
        if let Some(t) = env.average_temperature.get() {
            self.metric("sensors/env/temperature", payload::decimal(t as f64, 2), &mut report);
        }
        if let Some(h) = env.aht20.humidity.get().filter(|h| *h >= 0.0) {
            self.metric("sensors/env/humidity", payload::decimal(h as f64, 1), &mut report);
        }
        if let Some(p) = env.bmp280.pressure_hpa.get().filter(|p| *p > 0.0) {
            self.metric("sensors/env/pressure_hpa", payload::decimal(p as f64, 1), &mut report);
        }
        if let Some(a) = env.bmp280.altitude_m.get() {
            self.metric("sensors/env/altitude_m", payload::decimal(a as f64, 1), &mut report);
        }

        if let Some(fix) = snapshot.position {
            if fix.has_fix {
                self.metric("sensors/gps/latitude", payload::decimal(fix.latitude, 6), &mut report);
                self.metric("sensors/gps/longitude", payload::decimal(fix.longitude, 6), &mut report);
                self.metric(
                    "sensors/gps/altitude",
                    payload::decimal(fix.altitude_m as f64, 2),
                    &mut report,
                );
            }
            self.metric(
                "sensors/gps/satellites",
                payload::integer(fix.satellites_visible),
                &mut report,
            );
            self.metric("sensors/gps/hdop", payload::decimal(fix.hdop as f64, 2), &mut report);
        }

        report
    }

    fn metric(&mut self, suffix: &str, value: Result<Payload, Overflow>, report: &mut PublishReport) {
        let topic = payload::topic(&self.config.topic_prefix, suffix);
        self.send_value(topic, value, report);
    }

    fn send_value(
        &mut self,
        topic: Result<Topic, Overflow>,
        value: Result<Payload, Overflow>,
        report: &mut PublishReport,
    ) {
        match value {
            Ok(value) => self.send(topic, value.as_bytes(), false, report),
            Err(Overflow) => report.record(false),
        }
    }

    /// One independent publish; a failure only shows up in the report
    fn send(
        &mut self,
        topic: Result<Topic, Overflow>,
        payload: &[u8],
        retain: bool,
        report: &mut PublishReport,
    ) {
        let Ok(topic) = topic else {
            sonde_log::warn!("metrics topic too long");
            report.record(false);
            return;
        };

        match self.transport.publish(&topic, payload, retain) {
            Ok(()) => report.record(true),
            Err(_) => {
                sonde_log::warn!("metrics publish failed: {}", topic.as_str());
                report.record(false);
            }
        }
    }
}
