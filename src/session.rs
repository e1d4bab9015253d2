use std::time::Instant;

use crate::config::Config;
use crate::fitting::calibrate::{CalibrationGate, PollOutcome};
use crate::fitting::measure::{extract, BodyMeasurements};
use crate::fitting::score::{score, FitQuality};
use crate::fitting::smooth::TransformSmoother;
use crate::fitting::solve::solve;
use crate::garment::Garment;
use crate::pose::landmark::Landmark;
use crate::scene::GarmentTransform;

/// 1着分のフレーム結果
#[derive(Debug, Clone, Copy)]
pub struct GarmentFit {
    pub garment_id: u32,
    pub transform: GarmentTransform,
    pub quality: FitQuality,
}

/// 試着セッションのコントローラ
///
/// 採寸→変換→平滑化→評価 を1フレーム分同期実行する。
/// キャリブレーションゲートと平滑化状態を所有し、&mut selfで
/// パイプラインの多重実行を型レベルで防ぐ。
pub struct TryOnSession {
    gate: CalibrationGate,
    smoother: TransformSmoother,
    garments: Vec<Garment>,
    active: bool,
}

impl TryOnSession {
    pub fn new(config: &Config) -> Self {
        Self {
            gate: CalibrationGate::from_config(&config.calibration),
            smoother: TransformSmoother::from_config(&config.smooth),
            garments: Vec::new(),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn garments(&self) -> &[Garment] {
        &self.garments
    }

    /// 衣服を追加する。同じidが既にあれば置き換え、平滑化状態も破棄する
    pub fn add_garment(&mut self, garment: Garment) {
        if let Some(existing) = self.garments.iter_mut().find(|g| g.id == garment.id) {
            *existing = garment;
            self.smoother.remove(garment.id);
        } else {
            self.garments.push(garment);
        }
    }

    /// 衣服を外す。平滑化状態も破棄する
    pub fn remove_garment(&mut self, id: u32) {
        self.garments.retain(|g| g.id != id);
        self.smoother.remove(id);
    }

    pub fn is_calibrated(&self) -> bool {
        self.gate.is_calibrated()
    }

    /// 保存済みの採寸を復元する
    pub fn restore_measurements(&mut self, measurements: BodyMeasurements) {
        self.gate.restore(measurements);
    }

    pub fn base_measurements(&self) -> Option<BodyMeasurements> {
        self.gate.base_measurements()
    }

    /// キャリブレーション試行を開始する
    pub fn request_calibration(&mut self, now: Instant) {
        if !self.active {
            return;
        }
        self.gate.begin(now);
    }

    /// キャリブレーションのポーリング。フレーム更新とは独立に呼ばれるが、
    /// 渡されたスナップショットを読むだけでパイプラインを妨げない。
    /// 停止後のpollは何も確定しない。
    pub fn poll_calibration(&mut self, landmarks: &[Landmark], now: Instant) -> PollOutcome {
        if !self.active {
            return PollOutcome::NotDue;
        }
        self.gate.poll(landmarks, now)
    }

    /// 1フレーム分のパイプラインを実行する
    ///
    /// ランドマークが欠けたフレームは結果を返さない（前回の適用値が
    /// レンダラーに残り続ける）。
    pub fn update(&mut self, landmarks: &[Landmark]) -> Vec<GarmentFit> {
        if !self.active {
            return Vec::new();
        }
        let live = match extract(landmarks) {
            Some(m) => m,
            None => return Vec::new(),
        };

        let mut results = Vec::with_capacity(self.garments.len());
        for garment in &self.garments {
            // キャリブレーション前はカテゴリのデフォルト採寸（非ゼロ保証）
            let base = self
                .gate
                .base_measurements()
                .unwrap_or_else(|| garment.category.default_measurements());

            let target = solve(landmarks, &base, garment.category, garment.size_adjustment());
            let applied = self.smoother.apply(garment.id, target);
            let quality = score(garment.category, &live, &applied.scale);

            results.push(GarmentFit {
                garment_id: garment.id,
                transform: applied,
                quality,
            });
        }
        results
    }

    /// セッションを終了する。進行中のキャリブレーション試行を中断し、
    /// 平滑化状態を全て破棄する（次のセッションに持ち越さない）。
    pub fn stop(&mut self) {
        self.active = false;
        self.gate.cancel();
        self.smoother.reset();
    }
}
