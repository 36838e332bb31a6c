//! Metric sources for the stats line.
//!
//! - [`ThermalZoneTemperature`] reads a Linux thermal zone (millidegrees)
//! - [`VcgencmdTemperature`] asks the Raspberry Pi firmware via `vcgencmd`
//! - [`SysinfoUsage`] samples CPU usage through `sysinfo`
//! - [`FixedReading`] returns a constant, for tests and sensorless hosts

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use sysinfo::System;

use super::{SensorError, TemperatureSource, UsageSource};

/// Temperature from a sysfs thermal zone file.
pub struct ThermalZoneTemperature {
    path: PathBuf,
}

impl ThermalZoneTemperature {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parses the millidegree integer a thermal zone file contains.
fn parse_millidegrees(raw: &str) -> Result<f64, SensorError> {
    raw.trim()
        .parse::<i64>()
        .map(|milli| milli as f64 / 1000.0)
        .map_err(|_| SensorError::Parse(raw.trim().to_string()))
}

#[async_trait]
impl TemperatureSource for ThermalZoneTemperature {
    async fn read(&self) -> Result<f64, SensorError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        parse_millidegrees(&raw)
    }
}

/// Temperature from `vcgencmd measure_temp`.
#[derive(Default)]
pub struct VcgencmdTemperature;

/// Parses `temp=48.3'C`.
fn parse_vcgencmd(output: &str) -> Result<f64, SensorError> {
    output
        .trim()
        .strip_prefix("temp=")
        .and_then(|rest| rest.split('\'').next())
        .and_then(|value| value.parse::<f64>().ok())
        .ok_or_else(|| SensorError::Parse(output.trim().to_string()))
}

#[async_trait]
impl TemperatureSource for VcgencmdTemperature {
    async fn read(&self) -> Result<f64, SensorError> {
        let output = tokio::process::Command::new("vcgencmd")
            .arg("measure_temp")
            .output()
            .await?;
        if !output.status.success() {
            return Err(SensorError::Parse(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        parse_vcgencmd(&String::from_utf8_lossy(&output.stdout))
    }
}

/// CPU usage from `sysinfo`.
///
/// Usage is computed between two refreshes, so each reading covers the time
/// since the previous one (one stats tick).
pub struct SysinfoUsage {
    system: Mutex<System>,
    cores: usize,
}

impl SysinfoUsage {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        let cores = system.cpus().len().max(1);
        Self {
            system: Mutex::new(system),
            cores,
        }
    }
}

impl Default for SysinfoUsage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageSource for SysinfoUsage {
    async fn read(&self) -> Result<f64, SensorError> {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        let percent = f64::from(system.global_cpu_usage());
        Ok((percent / 100.0).clamp(0.0, 1.0))
    }

    fn cores(&self) -> usize {
        self.cores
    }
}

/// A source that always reports the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedReading {
    pub value: f64,
    pub cores: usize,
}

impl FixedReading {
    pub const fn new(value: f64) -> Self {
        Self { value, cores: 1 }
    }

    #[must_use]
    pub const fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }
}

#[async_trait]
impl TemperatureSource for FixedReading {
    async fn read(&self) -> Result<f64, SensorError> {
        Ok(self.value)
    }
}

#[async_trait]
impl UsageSource for FixedReading {
    async fn read(&self) -> Result<f64, SensorError> {
        Ok(self.value)
    }

    fn cores(&self) -> usize {
        self.cores
    }
}
