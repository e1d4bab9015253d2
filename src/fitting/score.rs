use nalgebra::Vector3;

use crate::fitting::measure::BodyMeasurements;
use crate::garment::GarmentCategory;

/// 部位ごとのフィット評価 (0.0〜1.0)
///
/// 毎フレーム、ライブ採寸と平滑化後のスケールから再計算する。
/// カテゴリに関係しない部位は1.0のまま（総合値の重みは0）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitQuality {
    pub overall: f32,
    pub shoulders: f32,
    pub torso: f32,
    pub arms: f32,
    pub legs: f32,
}

impl FitQuality {
    /// 全部位1.0
    pub fn perfect() -> Self {
        Self {
            overall: 1.0,
            shoulders: 1.0,
            torso: 1.0,
            arms: 1.0,
            legs: 1.0,
        }
    }
}

/// 体に沿う上衣の理想比率帯域
const FITTED_BAND: (f32, f32) = (0.9, 1.1);
/// ゆとりのある上衣の理想比率帯域
const LOOSE_BAND: (f32, f32) = (0.85, 1.05);
/// 下衣の理想比率帯域
const LOWER_BAND: (f32, f32) = (0.9, 1.1);

/// 帯域内（両端含む）なら1.0、外れたら距離に応じて線形減衰
fn band_score(ratio: f32, band: (f32, f32)) -> f32 {
    let (lo, hi) = band;
    if ratio >= lo && ratio <= hi {
        return 1.0;
    }
    let deviation = if ratio < lo { lo - ratio } else { ratio - hi };
    (1.0 - 2.0 * deviation).max(0.0)
}

/// ライブ採寸と適用済みスケールからフィット評価を計算する
///
/// 各部位の比率 = ライブ採寸 / (適用スケール軸 × モデル基準採寸)。
/// 基準採寸はカテゴリのデフォルト値（衣服モデル組み込みの寸法）。
pub fn score(
    category: GarmentCategory,
    live: &BodyMeasurements,
    applied_scale: &Vector3<f32>,
) -> FitQuality {
    let reference = category.default_measurements();

    match category {
        GarmentCategory::UpperFitted => {
            let shoulders = band_score(
                live.shoulder_width / (applied_scale.x * reference.shoulder_width),
                FITTED_BAND,
            );
            let torso = band_score(
                live.torso_length / (applied_scale.y * reference.torso_length),
                FITTED_BAND,
            );
            FitQuality {
                overall: 0.6 * shoulders + 0.4 * torso,
                shoulders,
                torso,
                arms: 1.0,
                legs: 1.0,
            }
        }
        GarmentCategory::UpperLoose => {
            let shoulders = band_score(
                live.shoulder_width / (applied_scale.x * reference.shoulder_width),
                LOOSE_BAND,
            );
            let torso = band_score(
                live.torso_length / (applied_scale.y * reference.torso_length),
                LOOSE_BAND,
            );
            // 袖は肩側のスケールに追従する
            let arms = band_score(
                live.arm_length / (applied_scale.x * reference.arm_length),
                LOOSE_BAND,
            );
            FitQuality {
                overall: 0.4 * shoulders + 0.3 * torso + 0.3 * arms,
                shoulders,
                torso,
                arms,
                legs: 1.0,
            }
        }
        GarmentCategory::LowerBody => {
            // 下衣の胴スロットは腰幅の評価
            let torso = band_score(
                live.hip_width / (applied_scale.x * reference.hip_width),
                LOWER_BAND,
            );
            let legs = band_score(
                live.leg_length / (applied_scale.y * reference.leg_length),
                LOWER_BAND,
            );
            FitQuality {
                overall: 0.4 * torso + 0.6 * legs,
                shoulders: 1.0,
                torso,
                arms: 1.0,
                legs,
            }
        }
        GarmentCategory::Generic => FitQuality::perfect(),
    }
}
