//! Polling loop integration
//!
//! [`Station`] owns the GPS receiver, the environment monitor and the metrics
//! client. Board glue calls [`Station::poll`] from its main loop and reads the
//! results through shared references; nothing here blocks except the
//! environmental self-test.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady};
use heapless::String;

use crate::config::StationConfig;
use crate::environment::{CombinedStatus, EnvTestOutcome, EnvironmentMonitor, EnvironmentalReading};
use crate::metrics::{HostMetrics, MetricsClient, PublishReport, TelemetrySnapshot};
use crate::position::{GpsReceiver, GpsSelfTest, GpsStats, GpsTestOutcome, PositionFix};
use crate::traits::{HumiditySensor, MetricsTransport, PressureSensor};

/// Test name used on the metrics topics
const GPS_TEST_NAME: &str = "gps";
const ENV_TEST_NAME: &str = "environmental";

/// What one [`Station::poll`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollReport {
    /// Serial bytes consumed
    pub bytes_read: usize,
    /// Set when the sensors were polled on this call
    pub environment: Option<CombinedStatus>,
    /// Set when a periodic publish happened on this call
    pub published: Option<PublishReport>,
}

/// Finished GPS self-test
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsTestReport {
    pub outcome: GpsTestOutcome,
    pub duration_ms: u32,
    /// Fix at the time of the verdict
    pub fix: PositionFix,
}

/// Finished environmental self-test
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvTestReport {
    pub outcome: EnvTestOutcome,
    pub reading: EnvironmentalReading,
}

/// Telemetry station
pub struct Station<H, P, T> {
    config: StationConfig,
    /// `None` when the receiver is disabled in the config
    gps: Option<GpsReceiver>,
    environment: EnvironmentMonitor<H, P>,
    metrics: MetricsClient<T>,
    acquiring: bool,
    last_env_poll_ms: Option<u32>,
    gps_test: Option<GpsSelfTest>,
}

impl<H, P, T> Station<H, P, T>
where
    H: HumiditySensor,
    P: PressureSensor,
    T: MetricsTransport,
{
    /// Build a station from probed devices
    ///
    /// Pass `None` for a sensor that failed its probe. Acquisition starts
    /// running.
    pub fn new(config: StationConfig, humidity: Option<H>, pressure: Option<P>, transport: T) -> Self {
        let gps = config
            .gps
            .enabled
            .then(|| GpsReceiver::new(config.gps.checksum));
        let environment =
            EnvironmentMonitor::new(humidity, pressure, config.environment.sea_level_hpa);
        let metrics = MetricsClient::new(transport, config.metrics.clone(), crate::VERSION);

        Self {
            config,
            gps,
            environment,
            metrics,
            acquiring: true,
            last_env_poll_ms: None,
            gps_test: None,
        }
    }

    /// Run one loop iteration
    pub fn poll<S: Read + ReadReady>(
        &mut self,
        now_ms: u32,
        serial: &mut S,
        host: &HostMetrics,
    ) -> PollReport {
        let mut report = PollReport::default();

        if self.acquiring {
            if let Some(gps) = self.gps.as_mut() {
                match gps.poll_serial(serial) {
                    Ok(n) => report.bytes_read = n,
                    Err(_) => {
                        gps.record_serial_error();
                        sonde_log::warn!("GPS serial read failed");
                    }
                }
            }

            if self.environment_due(now_ms) {
                self.last_env_poll_ms = Some(now_ms);
                report.environment = Some(self.environment.poll());
            }
        }

        let snapshot = TelemetrySnapshot {
            host,
            position: self.gps.as_ref().map(GpsReceiver::fix),
            environment: self.environment.reading(),
        };
        report.published = self.metrics.maintain(now_ms, &snapshot);

        report
    }

    fn environment_due(&self, now_ms: u32) -> bool {
        if !self.config.environment.enabled || !self.environment.reading().any_available() {
            return false;
        }
        match self.last_env_poll_ms {
            Some(t) => now_ms.wrapping_sub(t) >= self.config.environment.poll_interval_ms,
            None => true,
        }
    }

    /// Resume consuming serial bytes and polling sensors
    pub fn start_acquisition(&mut self) {
        if !self.acquiring {
            sonde_log::info!("acquisition started");
        }
        self.acquiring = true;
    }

    /// Stop consuming serial bytes and polling sensors
    ///
    /// Last readings stay available.
    pub fn stop_acquisition(&mut self) {
        if self.acquiring {
            sonde_log::info!("acquisition stopped");
        }
        self.acquiring = false;
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    /// Read-only view for a publish or a status page
    pub fn snapshot<'a>(&'a self, host: &'a HostMetrics) -> TelemetrySnapshot<'a> {
        TelemetrySnapshot {
            host,
            position: self.position(),
            environment: self.environment.reading(),
        }
    }

    /// Current position, `None` when the receiver is disabled
    pub fn position(&self) -> Option<&PositionFix> {
        self.gps.as_ref().map(GpsReceiver::fix)
    }

    pub fn gps_stats(&self) -> Option<&GpsStats> {
        self.gps.as_ref().map(GpsReceiver::stats)
    }

    pub fn environment(&self) -> &EnvironmentalReading {
        self.environment.reading()
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsClient<T> {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut MetricsClient<T> {
        &mut self.metrics
    }

    /// Record a pulse-per-second edge
    pub fn mark_pps(&mut self) {
        if let Some(gps) = self.gps.as_mut() {
            gps.mark_pps();
        }
    }

    /// Arm the GPS self-test
    ///
    /// Returns a report right away when the test cannot run; otherwise the
    /// verdict comes from [`Station::poll_gps_self_test`].
    pub fn start_gps_self_test(&mut self, now_ms: u32) -> Option<GpsTestReport> {
        let lines = match self.gps.as_ref() {
            Some(gps) if self.acquiring => gps.stats().lines,
            _ => {
                self.gps_test = None;
                return Some(self.finish_gps_test(GpsTestOutcome::NotInitialized, 0));
            }
        };

        sonde_log::info!("GPS self-test started");
        self.gps_test = Some(GpsSelfTest::start(now_ms, lines));
        None
    }

    /// Check the armed GPS self-test
    ///
    /// Returns the verdict once; `None` while waiting or when nothing is armed.
    pub fn poll_gps_self_test(&mut self, now_ms: u32) -> Option<GpsTestReport> {
        let test = self.gps_test?;

        let outcome = match self.gps.as_ref() {
            Some(gps) if self.acquiring => test.poll(now_ms, gps.fix(), gps.stats().lines)?,
            _ => GpsTestOutcome::NotInitialized,
        };

        self.gps_test = None;
        Some(self.finish_gps_test(outcome, test.elapsed_ms(now_ms)))
    }

    /// A GPS self-test is armed
    pub fn gps_self_test_running(&self) -> bool {
        self.gps_test.is_some()
    }

    fn finish_gps_test(&mut self, outcome: GpsTestOutcome, duration_ms: u32) -> GpsTestReport {
        sonde_log::info!("GPS self-test finished after {} ms", duration_ms);
        self.publish_test_result(GPS_TEST_NAME, &outcome, Some(duration_ms));

        GpsTestReport {
            outcome,
            duration_ms,
            fix: self.position().cloned().unwrap_or_default(),
        }
    }

    /// Run the environmental self-test
    ///
    /// Blocks for at most a few hundred milliseconds through `delay`.
    pub fn run_environmental_self_test<D: DelayNs>(&mut self, delay: &mut D) -> EnvTestReport {
        let outcome = self.environment.self_test(delay);
        sonde_log::info!("environmental self-test: {}", outcome.passed());
        self.publish_test_result(ENV_TEST_NAME, &outcome, None);

        EnvTestReport {
            outcome,
            reading: *self.environment.reading(),
        }
    }

    /// Publish every metric now, if the link is up
    pub fn force_metrics_publish(&mut self, now_ms: u32, host: &HostMetrics) -> Option<PublishReport> {
        let snapshot = TelemetrySnapshot {
            host,
            position: self.gps.as_ref().map(GpsReceiver::fix),
            environment: self.environment.reading(),
        };
        self.metrics.force_publish(now_ms, &snapshot)
    }

    fn publish_test_result(
        &mut self,
        name: &str,
        status: &dyn core::fmt::Display,
        duration_ms: Option<u32>,
    ) {
        let mut text: String<64> = String::new();
        if write!(text, "{}", status).is_err() {
            sonde_log::warn!("self-test status too long");
            return;
        }
        if self
            .metrics
            .publish_test_result(name, &text, duration_ms)
            .is_none()
        {
            sonde_log::debug!("metrics link down, {} result not published", name);
        }
    }
}
