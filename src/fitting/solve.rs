use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use crate::fitting::measure::BodyMeasurements;
use crate::garment::GarmentCategory;
use crate::pose::landmark::{point, Landmark, LandmarkIndex};
use crate::scene::GarmentTransform;

/// ゆとりのある上衣のスケール補正（肩・胴）
const LOOSE_SHOULDER_FACTOR: f32 = 1.1;
const LOOSE_TORSO_FACTOR: f32 = 1.05;

/// ランドマークと基準採寸から衣服の目標変換を解く
///
/// 33点に満たないフレームでは恒等変換を返す（リアルタイムループを
/// 止めないため、例外にはしない）。
///
/// 前提: baseの各フィールドは非ゼロ（キャリブレーション前は
/// カテゴリのデフォルト採寸で埋めておくこと）。ここではゼロ除算を
/// 検査しない。
pub fn solve(
    landmarks: &[Landmark],
    base: &BodyMeasurements,
    category: GarmentCategory,
    size_adjustment: f32,
) -> GarmentTransform {
    if landmarks.len() < LandmarkIndex::COUNT {
        return GarmentTransform::identity();
    }

    match category {
        GarmentCategory::UpperFitted => solve_upper(landmarks, base, false, size_adjustment),
        GarmentCategory::UpperLoose => solve_upper(landmarks, base, true, size_adjustment),
        GarmentCategory::LowerBody => solve_lower(landmarks, base, size_adjustment),
        GarmentCategory::Generic => solve_generic(landmarks, size_adjustment),
    }
}

/// 3軸の基底から回転を組み立てる
/// forwardが潰れる（rightとupがほぼ平行）場合は恒等回転
fn basis_rotation(right: Vector3<f32>, up: Vector3<f32>) -> UnitQuaternion<f32> {
    let right = right.normalize();
    let up = up.normalize();
    let forward = right.cross(&up);
    if forward.norm() < 1e-6 {
        return UnitQuaternion::identity();
    }
    let forward = forward.normalize();
    // 軸が厳密に直交していないポーズに備えて上方向を再直交化
    let up = forward.cross(&right);

    let matrix = Matrix3::from_columns(&[right, up, forward]);
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(matrix))
}

fn solve_upper(
    landmarks: &[Landmark],
    base: &BodyMeasurements,
    loose: bool,
    size_adjustment: f32,
) -> GarmentTransform {
    let left_shoulder = point(landmarks, LandmarkIndex::LeftShoulder);
    let right_shoulder = point(landmarks, LandmarkIndex::RightShoulder);
    let left_hip = point(landmarks, LandmarkIndex::LeftHip);
    let right_hip = point(landmarks, LandmarkIndex::RightHip);

    let shoulder_mid = (left_shoulder + right_shoulder) * 0.5;
    let hip_mid = (left_hip + right_hip) * 0.5;

    // 胴の中心（肩中点と腰中点の中点）に衣服を置く
    let position = (shoulder_mid + hip_mid) * 0.5;

    let shoulder_width = (left_shoulder - right_shoulder).norm();
    let torso_length = (shoulder_mid - hip_mid).norm();

    let mut shoulder_ratio = shoulder_width / base.shoulder_width;
    let mut torso_ratio = torso_length / base.torso_length;
    if loose {
        shoulder_ratio *= LOOSE_SHOULDER_FACTOR;
        torso_ratio *= LOOSE_TORSO_FACTOR;
    }

    let scale = Vector3::new(
        shoulder_ratio * size_adjustment,
        torso_ratio * size_adjustment,
        (shoulder_ratio + torso_ratio) / 2.0 * size_adjustment,
    );

    let rotation = basis_rotation(right_shoulder - left_shoulder, shoulder_mid - hip_mid);

    GarmentTransform::new(position, rotation, scale)
}

fn solve_lower(
    landmarks: &[Landmark],
    base: &BodyMeasurements,
    size_adjustment: f32,
) -> GarmentTransform {
    let left_hip = point(landmarks, LandmarkIndex::LeftHip);
    let right_hip = point(landmarks, LandmarkIndex::RightHip);
    let left_ankle = point(landmarks, LandmarkIndex::LeftAnkle);
    let right_ankle = point(landmarks, LandmarkIndex::RightAnkle);

    let hip_mid = (left_hip + right_hip) * 0.5;
    let ankle_mid = (left_ankle + right_ankle) * 0.5;

    let hip_width = (left_hip - right_hip).norm();
    let hip_ratio = hip_width / base.hip_width;

    // 縦は腰→足首の直線距離（左右平均）を基準脚長と比べる
    let leg_span = ((left_ankle - left_hip).norm() + (right_ankle - right_hip).norm()) / 2.0;
    let leg_ratio = leg_span / base.leg_length;

    let scale = Vector3::new(
        hip_ratio * size_adjustment,
        leg_ratio * size_adjustment,
        hip_ratio * size_adjustment,
    );

    // 脚方向は下向きなので反転して上向き軸にする
    let rotation = basis_rotation(right_hip - left_hip, hip_mid - ankle_mid);

    GarmentTransform::new(hip_mid, rotation, scale)
}

fn solve_generic(landmarks: &[Landmark], size_adjustment: f32) -> GarmentTransform {
    let left_shoulder = point(landmarks, LandmarkIndex::LeftShoulder);
    let right_shoulder = point(landmarks, LandmarkIndex::RightShoulder);
    let shoulder_mid = (left_shoulder + right_shoulder) * 0.5;

    GarmentTransform::new(
        shoulder_mid,
        UnitQuaternion::identity(),
        Vector3::new(size_adjustment, size_adjustment, size_adjustment),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_landmarks(points: &[(LandmarkIndex, (f32, f32, f32))]) -> Vec<Landmark> {
        let mut landmarks = vec![Landmark::default(); LandmarkIndex::COUNT];
        for &(idx, (x, y, z)) in points {
            landmarks[idx as usize] = Landmark::new(x, y, z, 0.9);
        }
        landmarks
    }

    /// 正面向き直立。肩幅0.44、胴長0.5、腰幅0.3
    fn facing_camera() -> Vec<Landmark> {
        make_landmarks(&[
            (LandmarkIndex::LeftShoulder, (0.03, 0.3, 0.0)),
            (LandmarkIndex::RightShoulder, (0.47, 0.3, 0.0)),
            (LandmarkIndex::LeftHip, (0.1, 0.8, 0.0)),
            (LandmarkIndex::RightHip, (0.4, 0.8, 0.0)),
            (LandmarkIndex::LeftAnkle, (0.1, 1.6, 0.0)),
            (LandmarkIndex::RightAnkle, (0.4, 1.6, 0.0)),
        ])
    }

    fn base() -> BodyMeasurements {
        BodyMeasurements {
            shoulder_width: 0.4,
            hip_width: 0.3,
            torso_length: 0.5,
            arm_length: 0.6,
            leg_length: 0.8,
        }
    }

    #[test]
    fn test_short_input_returns_identity() {
        let landmarks = vec![Landmark::default(); 5];
        let t = solve(&landmarks, &base(), GarmentCategory::UpperFitted, 1.0);
        assert_eq!(t, GarmentTransform::identity());
    }

    #[test]
    fn test_fitted_scale_from_shoulder_ratio() {
        // 肩幅0.44 / 基準0.4 = 1.1、胴長0.5 / 基準0.5 = 1.0
        let t = solve(&facing_camera(), &base(), GarmentCategory::UpperFitted, 1.0);
        assert!((t.scale.x - 1.1).abs() < 1e-5, "scale.x={}", t.scale.x);
        assert!((t.scale.y - 1.0).abs() < 1e-5, "scale.y={}", t.scale.y);
        assert!((t.scale.z - 1.05).abs() < 1e-5, "scale.z={}", t.scale.z);
    }

    #[test]
    fn test_fitted_position_is_torso_center() {
        let t = solve(&facing_camera(), &base(), GarmentCategory::UpperFitted, 1.0);
        // 肩中点(0.25, -0.3) 腰中点(0.25, -0.8) → 中心(0.25, -0.55)
        assert!((t.position.x - 0.25).abs() < 1e-6);
        assert!((t.position.y - (-0.55)).abs() < 1e-6);
    }

    #[test]
    fn test_fitted_rotation_upright_is_identity() {
        // 正面直立: right=+X, up=+Y → 恒等回転
        let t = solve(&facing_camera(), &base(), GarmentCategory::UpperFitted, 1.0);
        let angle = t.rotation.angle();
        assert!(angle.abs() < 1e-5, "angle={}", angle);
    }

    #[test]
    fn test_size_adjustment_scales_all_axes() {
        let t = solve(&facing_camera(), &base(), GarmentCategory::UpperFitted, 1.5);
        assert!((t.scale.x - 1.1 * 1.5).abs() < 1e-5);
        assert!((t.scale.y - 1.0 * 1.5).abs() < 1e-5);
        assert!((t.scale.z - 1.05 * 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_loose_inflates_ratios() {
        let fitted = solve(&facing_camera(), &base(), GarmentCategory::UpperFitted, 1.0);
        let loose = solve(&facing_camera(), &base(), GarmentCategory::UpperLoose, 1.0);
        assert!((loose.scale.x - fitted.scale.x * LOOSE_SHOULDER_FACTOR).abs() < 1e-5);
        assert!((loose.scale.y - fitted.scale.y * LOOSE_TORSO_FACTOR).abs() < 1e-5);
    }

    #[test]
    fn test_lower_body_position_is_hip_mid() {
        let t = solve(&facing_camera(), &base(), GarmentCategory::LowerBody, 1.0);
        assert!((t.position.x - 0.25).abs() < 1e-6);
        assert!((t.position.y - (-0.8)).abs() < 1e-6);
    }

    #[test]
    fn test_lower_body_scale_axes() {
        // 腰幅0.3 / 基準0.3 = 1.0 → x/z
        // 腰→足首 左:√(0+0.64)=0.8 右:0.8 → 平均0.8 / 基準0.8 = 1.0 → y
        let t = solve(&facing_camera(), &base(), GarmentCategory::LowerBody, 1.0);
        assert!((t.scale.x - 1.0).abs() < 1e-5);
        assert!((t.scale.y - 1.0).abs() < 1e-5);
        assert!((t.scale.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_lower_body_rotation_upright_is_identity() {
        let t = solve(&facing_camera(), &base(), GarmentCategory::LowerBody, 1.0);
        assert!(t.rotation.angle().abs() < 1e-5);
    }

    #[test]
    fn test_generic_fallback() {
        let t = solve(&facing_camera(), &base(), GarmentCategory::Generic, 1.3);
        assert_eq!(t.rotation, UnitQuaternion::identity());
        assert_eq!(t.scale, Vector3::new(1.3, 1.3, 1.3));
        // 肩中点
        assert!((t.position.x - 0.25).abs() < 1e-6);
        assert!((t.position.y - (-0.3)).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_category_name_solves_as_generic() {
        let category = GarmentCategory::from_name("cape-of-wonders");
        let t = solve(&facing_camera(), &base(), category, 1.0);
        assert_eq!(t.rotation, UnitQuaternion::identity());
        assert_eq!(t.scale, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_leaning_body_tilts_rotation() {
        // 上体を右に傾けたポーズ: 肩が腰より右にずれる
        let leaning = make_landmarks(&[
            (LandmarkIndex::LeftShoulder, (0.2, 0.3, 0.0)),
            (LandmarkIndex::RightShoulder, (0.6, 0.35, 0.0)),
            (LandmarkIndex::LeftHip, (0.1, 0.8, 0.0)),
            (LandmarkIndex::RightHip, (0.4, 0.8, 0.0)),
        ]);
        let t = solve(&leaning, &base(), GarmentCategory::UpperFitted, 1.0);
        assert!(t.rotation.angle() > 0.01, "angle={}", t.rotation.angle());
    }
}
