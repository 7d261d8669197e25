/// 工具函数集合
///
/// 字节数 / 运行时长的规范化与人类可读格式互转

use tracing::warn;

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// 格式化字节大小
///
/// 选择使缩放后数值小于 1024 的最大单位，保留两位小数；0 返回 `"0B"`
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// 解析 "12.5 MB" 形式的字符串为字节数
///
/// 解析失败返回 0 并记录日志，不向调用方抛出错误
pub fn parse_bytes(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        warn!("无法解析字节大小: 空字符串");
        return 0.0;
    }

    let split_at = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split_at);

    let value: f64 = match number.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!("无法解析字节大小: {:?}", text);
            return 0.0;
        }
    };

    let unit = unit.trim().to_ascii_uppercase().replace("IB", "B");
    let exponent = match unit.as_str() {
        "" | "B" => 0,
        "K" | "KB" => 1,
        "M" | "MB" => 2,
        "G" | "GB" => 3,
        "T" | "TB" => 4,
        _ => {
            warn!("未知的字节单位: {:?}", text);
            return 0.0;
        }
    };

    value * 1024f64.powi(exponent)
}

/// 格式化运行时长，只保留最粗的非零单位组合
pub fn format_uptime(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// 百分比保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 计算百分比，分母为 0 时返回 0
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}
