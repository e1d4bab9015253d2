use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::pose::landmark::{point, Landmark, LandmarkIndex};

/// 体の採寸値（メートル）
///
/// 基準採寸（キャリブレーション時に確定）とライブ採寸（毎フレーム再計算）の
/// 両方に同じ型を使う。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurements {
    /// 肩幅
    pub shoulder_width: f32,
    /// 腰幅
    pub hip_width: f32,
    /// 胴体長（肩中点〜腰中点）
    pub torso_length: f32,
    /// 腕長（肩→肘→手首の2区間和、左右平均）
    pub arm_length: f32,
    /// 脚長（腰→膝→足首の2区間和、左右平均）
    pub leg_length: f32,
}

fn midpoint(a: Vector3<f32>, b: Vector3<f32>) -> Vector3<f32> {
    (a + b) * 0.5
}

/// ランドマーク集合から採寸値を導出する
///
/// 33点に満たない場合はNone（欠けたフレームはエラーではなく想定内の結果）。
/// 平滑化はここでは行わない。変換側で行う。
pub fn extract(landmarks: &[Landmark]) -> Option<BodyMeasurements> {
    if landmarks.len() < LandmarkIndex::COUNT {
        return None;
    }

    let left_shoulder = point(landmarks, LandmarkIndex::LeftShoulder);
    let right_shoulder = point(landmarks, LandmarkIndex::RightShoulder);
    let left_hip = point(landmarks, LandmarkIndex::LeftHip);
    let right_hip = point(landmarks, LandmarkIndex::RightHip);
    let left_elbow = point(landmarks, LandmarkIndex::LeftElbow);
    let right_elbow = point(landmarks, LandmarkIndex::RightElbow);
    let left_wrist = point(landmarks, LandmarkIndex::LeftWrist);
    let right_wrist = point(landmarks, LandmarkIndex::RightWrist);
    let left_knee = point(landmarks, LandmarkIndex::LeftKnee);
    let right_knee = point(landmarks, LandmarkIndex::RightKnee);
    let left_ankle = point(landmarks, LandmarkIndex::LeftAnkle);
    let right_ankle = point(landmarks, LandmarkIndex::RightAnkle);

    let shoulder_mid = midpoint(left_shoulder, right_shoulder);
    let hip_mid = midpoint(left_hip, right_hip);

    // 腕・脚は端点間の直線距離ではなく関節を経由した2区間の和
    let left_arm = (left_shoulder - left_elbow).norm() + (left_elbow - left_wrist).norm();
    let right_arm = (right_shoulder - right_elbow).norm() + (right_elbow - right_wrist).norm();
    let left_leg = (left_hip - left_knee).norm() + (left_knee - left_ankle).norm();
    let right_leg = (right_hip - right_knee).norm() + (right_knee - right_ankle).norm();

    Some(BodyMeasurements {
        shoulder_width: (left_shoulder - right_shoulder).norm(),
        hip_width: (left_hip - right_hip).norm(),
        torso_length: (shoulder_mid - hip_mid).norm(),
        arm_length: (left_arm + right_arm) / 2.0,
        leg_length: (left_leg + right_leg) / 2.0,
    })
}
