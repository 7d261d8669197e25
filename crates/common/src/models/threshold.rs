use serde::{Deserialize, Serialize};

use super::constants::DEFAULT_THRESHOLD;
use super::snapshot::SystemSnapshot;

/// 单台主机的告警阈值（百分比）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLevels {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl Default for ThresholdLevels {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_THRESHOLD,
            memory: DEFAULT_THRESHOLD,
            disk: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMetric {
    Cpu,
    Memory,
    Disk,
}

/// 超过阈值的告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric: AlertMetric,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

impl ThresholdLevels {
    /// 检查快照，返回严格超过阈值的指标
    pub fn evaluate(&self, snapshot: &SystemSnapshot) -> Vec<Alert> {
        let checks = [
            (AlertMetric::Cpu, "High CPU Usage", snapshot.cpu_percent, self.cpu),
            (AlertMetric::Memory, "High Memory Usage", snapshot.memory.percent, self.memory),
            (AlertMetric::Disk, "High Disk Usage", snapshot.max_disk_percent(), self.disk),
        ];

        checks
            .into_iter()
            .filter(|(_, _, value, threshold)| value > threshold)
            .map(|(metric, label, value, threshold)| Alert {
                metric,
                value,
                threshold,
                message: format!("{}: {:.1}% (threshold {:.1}%)", label, value, threshold),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiskUsage, MemoryInfo};

    fn snapshot(cpu: f64, memory: f64, disk: f64) -> SystemSnapshot {
        let mut disks = std::collections::BTreeMap::new();
        disks.insert("/".to_string(), DiskUsage { percent: disk, ..Default::default() });
        SystemSnapshot {
            cpu_percent: cpu,
            cpu_count: 4,
            memory: MemoryInfo { percent: memory, ..Default::default() },
            disks,
            network: Default::default(),
            process_count: 0,
            uptime_seconds: 0,
        }
    }

    #[test]
    fn test_default_levels() {
        let levels = ThresholdLevels::default();
        assert_eq!((levels.cpu, levels.memory, levels.disk), (80.0, 80.0, 80.0));
    }

    #[test]
    fn test_evaluate_reports_only_breaches() {
        let levels = ThresholdLevels { cpu: 50.0, memory: 60.0, disk: 70.0 };
        let alerts = levels.evaluate(&snapshot(75.0, 60.0, 90.0));
        let metrics: Vec<_> = alerts.iter().map(|a| a.metric).collect();
        assert_eq!(metrics, vec![AlertMetric::Cpu, AlertMetric::Disk]);
        assert!(alerts[0].message.starts_with("High CPU Usage"));
    }

    #[test]
    fn test_evaluate_quiet_system() {
        assert!(ThresholdLevels::default().evaluate(&snapshot(10.0, 20.0, 30.0)).is_empty());
    }
}
