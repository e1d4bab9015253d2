use std::collections::HashMap;

use crate::config::SmoothConfig;
use crate::scene::GarmentTransform;

/// 衣服インスタンスごとの変換平滑化フィルタ
///
/// 位置・スケール: 目標値への線形補間
/// 回転: slerp
///
/// 状態は衣服idをキーに明示的に保持する（モジュールレベルの
/// グローバルマップにはしない）。試着セッション中、レンダラーに
/// 渡る変換はこのフィルタの出力のみ（単一ライター）。
pub struct TransformSmoother {
    factor: f32,
    current: HashMap<u32, GarmentTransform>,
}

impl TransformSmoother {
    /// factorは0.0〜1.0にクランプされる。大きいほど追従が遅い
    pub fn new(factor: f32) -> Self {
        Self {
            factor: factor.clamp(0.0, 1.0),
            current: HashMap::new(),
        }
    }

    pub fn from_config(config: &SmoothConfig) -> Self {
        Self::new(config.factor)
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// 目標変換を前回の適用値に向かってブレンドし、適用値として記録する。
    /// 初回はそのまま通す（平滑化なし）。
    pub fn apply(&mut self, id: u32, target: GarmentTransform) -> GarmentTransform {
        let applied = match self.current.get(&id) {
            None => target,
            Some(prev) => {
                let t = 1.0 - self.factor;
                let position = prev.position.lerp(&target.position, t);
                let scale = prev.scale.lerp(&target.scale, t);
                let rotation = prev
                    .rotation
                    .try_slerp(&target.rotation, t, 1.0e-6)
                    .unwrap_or(target.rotation);
                GarmentTransform::new(position, rotation, scale)
            }
        };
        self.current.insert(id, applied);
        applied
    }

    /// 1着分の状態を破棄（衣服を外した時）
    pub fn remove(&mut self, id: u32) {
        self.current.remove(&id);
    }

    /// 全状態を破棄（セッション終了時）
    pub fn reset(&mut self) {
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    fn transform_at(x: f32) -> GarmentTransform {
        GarmentTransform::new(
            Vector3::new(x, 0.0, 0.0),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        )
    }

    #[test]
    fn test_factor_clamped() {
        assert_eq!(TransformSmoother::new(1.5).factor(), 1.0);
        assert_eq!(TransformSmoother::new(-0.5).factor(), 0.0);
        assert_eq!(TransformSmoother::new(0.8).factor(), 0.8);
    }

    #[test]
    fn test_first_frame_passthrough() {
        let mut s = TransformSmoother::new(0.8);
        let target = transform_at(5.0);
        let applied = s.apply(0, target);
        assert_eq!(applied, target);
    }

    #[test]
    fn test_blend_weight() {
        let mut s = TransformSmoother::new(0.8);
        s.apply(0, transform_at(0.0));
        let applied = s.apply(0, transform_at(1.0));
        // weight = 1 - 0.8 = 0.2
        assert!((applied.position.x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_zero_factor_tracks_target_exactly() {
        let mut s = TransformSmoother::new(0.0);
        s.apply(0, transform_at(0.0));
        let applied = s.apply(0, transform_at(3.0));
        assert!((applied.position.x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_converges_to_constant_target() {
        let mut s = TransformSmoother::new(0.8);
        s.apply(0, transform_at(0.0));

        let target = transform_at(1.0);
        let mut prev_error = 1.0f32;
        let mut applied = GarmentTransform::identity();
        for _ in 0..50 {
            applied = s.apply(0, target);
            let error = (target.position.x - applied.position.x).abs();
            // 単調に目標へ近づく
            assert!(error <= prev_error + 1e-7);
            prev_error = error;
        }
        // 50回で初期誤差1.0に対し1e-3未満まで収束
        assert!(
            (target.position.x - applied.position.x).abs() < 1e-3,
            "applied.x={}",
            applied.position.x
        );
    }

    #[test]
    fn test_rotation_slerp_midway() {
        let mut s = TransformSmoother::new(0.5);
        let flat = GarmentTransform::identity();
        let quarter = GarmentTransform::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2),
            Vector3::new(1.0, 1.0, 1.0),
        );
        s.apply(0, flat);
        let applied = s.apply(0, quarter);
        // 90度回転の半分 = 45度
        let angle = applied.rotation.angle();
        assert!(
            (angle - std::f32::consts::FRAC_PI_4).abs() < 1e-4,
            "angle={}",
            angle
        );
    }

    #[test]
    fn test_instances_are_independent() {
        let mut s = TransformSmoother::new(0.8);
        s.apply(0, transform_at(0.0));
        s.apply(1, transform_at(10.0));

        let a = s.apply(0, transform_at(1.0));
        let b = s.apply(1, transform_at(11.0));
        assert!((a.position.x - 0.2).abs() < 1e-6);
        assert!((b.position.x - 10.2).abs() < 1e-6);
    }

    #[test]
    fn test_remove_clears_one_instance() {
        let mut s = TransformSmoother::new(0.8);
        s.apply(0, transform_at(0.0));
        s.apply(1, transform_at(0.0));
        s.remove(0);

        // 0は初回扱い、1は平滑化継続
        let a = s.apply(0, transform_at(1.0));
        let b = s.apply(1, transform_at(1.0));
        assert!((a.position.x - 1.0).abs() < 1e-6);
        assert!((b.position.x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_reset_clears_all() {
        let mut s = TransformSmoother::new(0.8);
        s.apply(0, transform_at(0.0));
        s.reset();
        let applied = s.apply(0, transform_at(4.0));
        assert_eq!(applied.position.x, 4.0);
    }

    #[test]
    fn test_scale_smoothing() {
        let mut s = TransformSmoother::new(0.8);
        let small = GarmentTransform::identity();
        let large = GarmentTransform::new(
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::new(2.0, 2.0, 2.0),
        );
        s.apply(0, small);
        let applied = s.apply(0, large);
        // 1.0 + 0.2 * (2.0 - 1.0) = 1.2
        assert!((applied.scale.x - 1.2).abs() < 1e-6);
    }
}
