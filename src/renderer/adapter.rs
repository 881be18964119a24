//! 适配器选择与特性等级
//!
//! 枚举 DXGI 适配器的结果被整理成 `AdapterInfo` 列表，选择策略在这里以纯函数实现：
//! 跳过软件适配器，取第一个能创建 D3D12 设备的硬件适配器，否则退回 WARP。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{ConfigError, Result};

/// Direct3D 特性等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum FeatureLevel {
    #[default]
    #[serde(rename = "11_0")]
    Level11_0,
    #[serde(rename = "11_1")]
    Level11_1,
    #[serde(rename = "12_0")]
    Level12_0,
    #[serde(rename = "12_1")]
    Level12_1,
    #[serde(rename = "12_2")]
    Level12_2,
}

impl FeatureLevel {
    /// 从高到低排列的全部等级
    pub const ALL_DESCENDING: [FeatureLevel; 5] = [
        FeatureLevel::Level12_2,
        FeatureLevel::Level12_1,
        FeatureLevel::Level12_0,
        FeatureLevel::Level11_1,
        FeatureLevel::Level11_0,
    ];

    /// `D3D_FEATURE_LEVEL` 数值
    pub fn raw(self) -> i32 {
        match self {
            FeatureLevel::Level11_0 => 0xb000,
            FeatureLevel::Level11_1 => 0xb100,
            FeatureLevel::Level12_0 => 0xc000,
            FeatureLevel::Level12_1 => 0xc100,
            FeatureLevel::Level12_2 => 0xc200,
        }
    }

    pub fn from_raw(raw: i32) -> Option<FeatureLevel> {
        Self::ALL_DESCENDING.into_iter().find(|l| l.raw() == raw)
    }

    /// 解析 "12_1" 形式的字符串
    pub fn parse(text: &str) -> Result<FeatureLevel> {
        Self::ALL_DESCENDING
            .into_iter()
            .find(|l| l.as_str() == text.trim())
            .ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "min_feature_level".to_string(),
                    reason: format!("unknown feature level '{}'", text),
                }
                .into()
            })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureLevel::Level11_0 => "11_0",
            FeatureLevel::Level11_1 => "11_1",
            FeatureLevel::Level12_0 => "12_0",
            FeatureLevel::Level12_1 => "12_1",
            FeatureLevel::Level12_2 => "12_2",
        }
    }

    /// 向 CheckFeatureSupport 查询的等级列表，不低于 `min`，从高到低
    pub fn requested_levels(min: FeatureLevel) -> Vec<FeatureLevel> {
        Self::ALL_DESCENDING.into_iter().filter(|l| *l >= min).collect()
    }

    /// 查询失败时沿用最低等级
    pub fn resolve(max_supported: Option<FeatureLevel>, min: FeatureLevel) -> FeatureLevel {
        match max_supported {
            Some(level) if level >= min => level,
            _ => min,
        }
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D3D_FEATURE_LEVEL_{}", self.as_str())
    }
}

/// 适配器描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub index: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub description: String,
    pub dedicated_video_memory: u64,
    pub is_software: bool,
}

impl AdapterInfo {
    /// 厂商名称，未知厂商返回 None
    pub fn vendor_name(&self) -> Option<&'static str> {
        match self.vendor_id {
            0x10DE => Some("NVIDIA"),
            0x1002 => Some("AMD"),
            0x8086 => Some("Intel"),
            0x1414 => Some("Microsoft"),
            _ => None,
        }
    }
}

/// 选择结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterChoice {
    Hardware(AdapterInfo),
    Warp,
}

/// 选择适配器
///
/// `candidates` 已按 GPU 性能偏好排序；`supports_d3d12` 用于探测能否创建设备。
pub fn select_adapter<F>(candidates: &[AdapterInfo], force_warp: bool, mut supports_d3d12: F) -> AdapterChoice
where
    F: FnMut(&AdapterInfo) -> bool,
{
    if force_warp {
        return AdapterChoice::Warp;
    }

    candidates
        .iter()
        .filter(|info| !info.is_software)
        .find(|info| supports_d3d12(info))
        .cloned()
        .map(AdapterChoice::Hardware)
        .unwrap_or(AdapterChoice::Warp)
}

/// UTF-16 描述字符串（以 0 结尾）转换为 String
pub fn description_from_utf16(raw: &[u16]) -> String {
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf16_lossy(&raw[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(index: u32, vendor_id: u32, is_software: bool) -> AdapterInfo {
        AdapterInfo {
            index,
            vendor_id,
            device_id: 0x1000 + index,
            description: format!("Adapter {}", index),
            dedicated_video_memory: 0,
            is_software,
        }
    }

    #[test]
    fn test_feature_level_ordering_and_parse() {
        assert!(FeatureLevel::Level12_1 > FeatureLevel::Level11_0);
        assert_eq!(FeatureLevel::parse("12_0").unwrap(), FeatureLevel::Level12_0);
        assert!(FeatureLevel::parse("9_3").is_err());
        assert_eq!(FeatureLevel::from_raw(0xc100), Some(FeatureLevel::Level12_1));
        assert_eq!(FeatureLevel::from_raw(0x9300), None);
        assert_eq!(FeatureLevel::Level11_1.to_string(), "D3D_FEATURE_LEVEL_11_1");
    }

    #[test]
    fn test_requested_levels_and_resolve() {
        let levels = FeatureLevel::requested_levels(FeatureLevel::Level12_0);
        assert_eq!(
            levels,
            vec![FeatureLevel::Level12_2, FeatureLevel::Level12_1, FeatureLevel::Level12_0]
        );

        let min = FeatureLevel::Level11_0;
        assert_eq!(FeatureLevel::resolve(Some(FeatureLevel::Level12_1), min), FeatureLevel::Level12_1);
        assert_eq!(FeatureLevel::resolve(None, min), min);
        assert_eq!(
            FeatureLevel::resolve(Some(FeatureLevel::Level11_0), FeatureLevel::Level12_0),
            FeatureLevel::Level12_0
        );
    }

    #[test]
    fn test_select_skips_software_adapters() {
        let candidates = vec![adapter(0, 0x1414, true), adapter(1, 0x10DE, false), adapter(2, 0x8086, false)];
        let choice = select_adapter(&candidates, false, |_| true);
        assert_eq!(choice, AdapterChoice::Hardware(candidates[1].clone()));
    }

    #[test]
    fn test_select_first_supported() {
        let candidates = vec![adapter(0, 0x1002, false), adapter(1, 0x8086, false)];
        let mut probed = Vec::new();
        let choice = select_adapter(&candidates, false, |info| {
            probed.push(info.index);
            info.index == 1
        });
        assert_eq!(choice, AdapterChoice::Hardware(candidates[1].clone()));
        assert_eq!(probed, vec![0, 1]);
    }

    #[test]
    fn test_select_falls_back_to_warp() {
        let candidates = vec![adapter(0, 0x1414, true)];
        assert_eq!(select_adapter(&candidates, false, |_| true), AdapterChoice::Warp);
        assert_eq!(select_adapter(&[], false, |_| true), AdapterChoice::Warp);

        let hardware = vec![adapter(0, 0x10DE, false)];
        assert_eq!(select_adapter(&hardware, true, |_| true), AdapterChoice::Warp);
    }

    #[test]
    fn test_vendor_and_description() {
        assert_eq!(adapter(0, 0x10DE, false).vendor_name(), Some("NVIDIA"));
        assert_eq!(adapter(0, 0x1234, false).vendor_name(), None);

        let mut raw = [0u16; 128];
        for (i, c) in "Microsoft Basic Render Driver".encode_utf16().enumerate() {
            raw[i] = c;
        }
        assert_eq!(description_from_utf16(&raw), "Microsoft Basic Render Driver");
    }
}
