use anyhow::{Context, Result};
use std::fs;
use std::time::{Duration, Instant};

use crate::config::CalibrationConfig;
use crate::fitting::measure::{extract, BodyMeasurements};
use crate::pose::landmark::{point, Landmark, LandmarkIndex};

/// キャリブレーションの進行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Polling,
    Calibrated,
    TimedOut,
}

/// 1回のpollの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// ポーリング中でない、または間隔が空いていない
    NotDue,
    /// 判定したがTポーズではなかった
    Rejected,
    /// Tポーズを検出し、基準採寸を確定した
    Calibrated,
    /// 制限時間内にTポーズが取れなかった
    TimedOut,
}

/// Tポーズ判定
///
/// 肩→手首の単位ベクトルと胴体軸（腰中点→肩中点）の内積の絶対値が
/// 両腕とも閾値未満なら、腕が胴体に対してほぼ垂直＝Tポーズとみなす。
/// 毎回独立に判定する（ヒステリシスなし）。
pub fn is_t_pose(landmarks: &[Landmark], arm_dot_threshold: f32) -> bool {
    if landmarks.len() < LandmarkIndex::COUNT {
        return false;
    }

    let left_shoulder = point(landmarks, LandmarkIndex::LeftShoulder);
    let right_shoulder = point(landmarks, LandmarkIndex::RightShoulder);
    let left_wrist = point(landmarks, LandmarkIndex::LeftWrist);
    let right_wrist = point(landmarks, LandmarkIndex::RightWrist);
    let left_hip = point(landmarks, LandmarkIndex::LeftHip);
    let right_hip = point(landmarks, LandmarkIndex::RightHip);

    let shoulder_mid = (left_shoulder + right_shoulder) * 0.5;
    let hip_mid = (left_hip + right_hip) * 0.5;

    let up = (shoulder_mid - hip_mid).normalize();
    let left_arm = (left_wrist - left_shoulder).normalize();
    let right_arm = (right_wrist - right_shoulder).normalize();

    left_arm.dot(&up).abs() < arm_dot_threshold && right_arm.dot(&up).abs() < arm_dot_threshold
}

/// Tポーズによる基準採寸の確定を管理するゲート
///
/// Idle → Polling → Calibrated | TimedOut の状態機械。
/// タイマーは持たず、呼び出し側が時刻(Instant)を渡す。
pub struct CalibrationGate {
    poll_interval: Duration,
    timeout: Duration,
    arm_dot_threshold: f32,
    phase: CalibrationPhase,
    started_at: Option<Instant>,
    last_poll: Option<Instant>,
    committed: Option<BodyMeasurements>,
}

impl CalibrationGate {
    pub fn new(poll_interval: Duration, timeout: Duration, arm_dot_threshold: f32) -> Self {
        Self {
            poll_interval,
            timeout,
            arm_dot_threshold,
            phase: CalibrationPhase::Idle,
            started_at: None,
            last_poll: None,
            committed: None,
        }
    }

    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_secs(config.timeout_secs),
            config.arm_dot_threshold,
        )
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// 基準採寸が確定済みか
    pub fn is_calibrated(&self) -> bool {
        self.committed.is_some()
    }

    /// 確定済みの基準採寸
    pub fn base_measurements(&self) -> Option<BodyMeasurements> {
        self.committed
    }

    /// 新しいキャリブレーション試行を開始する。
    /// 既存の確定値はそのまま残り、成功時のみ上書きされる。
    pub fn begin(&mut self, now: Instant) {
        self.phase = CalibrationPhase::Polling;
        self.started_at = Some(now);
        self.last_poll = None;
    }

    /// 試行を中断する。確定値は変更しない。
    pub fn cancel(&mut self) {
        self.phase = CalibrationPhase::Idle;
        self.started_at = None;
        self.last_poll = None;
    }

    /// 保存済みの採寸を復元して確定状態にする
    pub fn restore(&mut self, measurements: BodyMeasurements) {
        self.committed = Some(measurements);
        self.phase = CalibrationPhase::Calibrated;
        self.started_at = None;
        self.last_poll = None;
    }

    /// 最新のランドマークスナップショットでTポーズ判定を行う。
    ///
    /// ポーリング間隔が空いていなければ何もしない。制限時間を超えたら
    /// TimedOutに遷移する（以前の確定値は保持）。
    pub fn poll(&mut self, landmarks: &[Landmark], now: Instant) -> PollOutcome {
        if self.phase != CalibrationPhase::Polling {
            return PollOutcome::NotDue;
        }

        let started = match self.started_at {
            Some(t) => t,
            None => return PollOutcome::NotDue,
        };
        if now.duration_since(started) >= self.timeout {
            self.phase = CalibrationPhase::TimedOut;
            return PollOutcome::TimedOut;
        }

        if let Some(last) = self.last_poll {
            if now.duration_since(last) < self.poll_interval {
                return PollOutcome::NotDue;
            }
        }
        self.last_poll = Some(now);

        if !is_t_pose(landmarks, self.arm_dot_threshold) {
            return PollOutcome::Rejected;
        }

        match extract(landmarks) {
            Some(measurements) => {
                self.committed = Some(measurements);
                self.phase = CalibrationPhase::Calibrated;
                PollOutcome::Calibrated
            }
            None => PollOutcome::Rejected,
        }
    }
}

// --- Save / Load ---

pub fn save_measurements(path: &str, measurements: &BodyMeasurements) -> Result<()> {
    let json = serde_json::to_string_pretty(measurements)?;
    fs::write(path, json).context("Failed to write measurements file")?;
    Ok(())
}

pub fn load_measurements(path: &str) -> Result<BodyMeasurements> {
    let content = fs::read_to_string(path).context("Failed to read measurements file")?;
    let measurements: BodyMeasurements = serde_json::from_str(&content)?;
    Ok(measurements)
}
