use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::scene::SCENE_DEFAULT_ADDR;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub garment: GarmentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// パイプラインの目標FPS
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// オラクル接続を受けるアドレス
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SceneConfig {
    /// レンダラーのOSC送信先
    #[serde(default = "default_scene_addr")]
    pub addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothConfig {
    /// 平滑化係数 (0.0〜1.0)。大きいほど追従が遅くジッタが減る
    #[serde(default = "default_smooth_factor")]
    pub factor: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    /// Tポーズ判定の間隔（ミリ秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 諦めるまでの時間（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 腕ベクトルと胴体軸の内積閾値（小さいほど厳格）
    #[serde(default = "default_arm_dot_threshold")]
    pub arm_dot_threshold: f32,
    /// 採寸の保存先パス
    #[serde(default = "default_measurements_output")]
    pub output_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GarmentConfig {
    /// ユーザー指定のサイズ調整係数
    #[serde(default = "default_size_adjustment")]
    pub size_adjustment: f32,
}

fn default_target_fps() -> u32 { 60 }
fn default_listen_addr() -> String { "127.0.0.1:39680".to_string() }
fn default_scene_addr() -> String { SCENE_DEFAULT_ADDR.to_string() }
fn default_smooth_factor() -> f32 { 0.8 }
fn default_poll_interval_ms() -> u64 { 500 }
fn default_timeout_secs() -> u64 { 10 }
fn default_arm_dot_threshold() -> f32 { 0.3 }
fn default_measurements_output() -> String { "measurements.json".to_string() }
fn default_size_adjustment() -> f32 { 1.0 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            addr: default_scene_addr(),
        }
    }
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            factor: default_smooth_factor(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
            arm_dot_threshold: default_arm_dot_threshold(),
            output_path: default_measurements_output(),
        }
    }
}

impl Default for GarmentConfig {
    fn default() -> Self {
        Self {
            size_adjustment: default_size_adjustment(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルが無い・壊れている場合はデフォルト値を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.app.target_fps, 60);
        assert_eq!(config.smooth.factor, 0.8);
        assert_eq!(config.calibration.poll_interval_ms, 500);
        assert_eq!(config.calibration.timeout_secs, 10);
        assert_eq!(config.calibration.arm_dot_threshold, 0.3);
        assert_eq!(config.garment.size_adjustment, 1.0);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("definitely/not/a/config.toml");
        assert_eq!(config.app.target_fps, 60);
        assert_eq!(config.scene.addr, SCENE_DEFAULT_ADDR);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[smooth]\nfactor = 0.5\n").unwrap();
        assert_eq!(config.smooth.factor, 0.5);
        assert_eq!(config.app.target_fps, 60);
    }
}
