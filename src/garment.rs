use serde::{Deserialize, Serialize};

use crate::fitting::measure::BodyMeasurements;

/// サイズ調整係数の許容範囲
pub const SIZE_ADJUSTMENT_MIN: f32 = 0.5;
pub const SIZE_ADJUSTMENT_MAX: f32 = 2.0;

/// 衣服カテゴリ
///
/// カテゴリごとに変換の解き方とフィット評価の重みが変わる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GarmentCategory {
    /// 体に沿う上衣（Tシャツ・シャツ）
    UpperFitted,
    /// ゆとりのある上衣（ジャケット・パーカー）
    UpperLoose,
    /// 下衣（パンツ）
    LowerBody,
    /// カテゴリ不明のフォールバック
    Generic,
}

impl GarmentCategory {
    /// アセットのカテゴリ名から変換。未知の名前はGeneric
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "tshirt" | "t-shirt" | "shirt" => Self::UpperFitted,
            "jacket" | "hoodie" => Self::UpperLoose,
            "pants" => Self::LowerBody,
            _ => Self::Generic,
        }
    }

    /// カテゴリ固有のデフォルト基準採寸（モデル組み込み値、メートル）
    ///
    /// キャリブレーション前のフォールバック。スケール比の分母になるため
    /// 全フィールドが非ゼロであること。
    pub fn default_measurements(self) -> BodyMeasurements {
        match self {
            Self::UpperFitted | Self::UpperLoose => BodyMeasurements {
                shoulder_width: 0.40,
                hip_width: 0.34,
                torso_length: 0.50,
                arm_length: 0.58,
                leg_length: 0.85,
            },
            Self::LowerBody => BodyMeasurements {
                shoulder_width: 0.40,
                hip_width: 0.36,
                torso_length: 0.50,
                arm_length: 0.58,
                leg_length: 0.88,
            },
            Self::Generic => BodyMeasurements {
                shoulder_width: 0.40,
                hip_width: 0.35,
                torso_length: 0.50,
                arm_length: 0.58,
                leg_length: 0.86,
            },
        }
    }
}

/// 試着対象の衣服インスタンス
///
/// idはメッシュインスタンスの安定した識別子。平滑化状態のキーになる。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Garment {
    pub id: u32,
    pub category: GarmentCategory,
    size_adjustment: f32,
}

impl Garment {
    pub fn new(id: u32, category: GarmentCategory) -> Self {
        Self {
            id,
            category,
            size_adjustment: 1.0,
        }
    }

    pub fn size_adjustment(&self) -> f32 {
        self.size_adjustment
    }

    /// ユーザー指定のサイズ調整係数を設定（0.5〜2.0にクランプ）
    pub fn set_size_adjustment(&mut self, value: f32) {
        self.size_adjustment = value.clamp(SIZE_ADJUSTMENT_MIN, SIZE_ADJUSTMENT_MAX);
    }
}
