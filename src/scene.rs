use anyhow::Result;
use nalgebra::{UnitQuaternion, Vector3};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// レンダラーのデフォルトアドレス
pub const SCENE_DEFAULT_ADDR: &str = "127.0.0.1:39600";

/// 衣服メッシュに適用する剛体変換（位置・回転・スケール）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GarmentTransform {
    /// 位置（メートル）
    pub position: Vector3<f32>,
    /// 回転（クォータニオン）
    pub rotation: UnitQuaternion<f32>,
    /// 軸ごとのスケール
    pub scale: Vector3<f32>,
}

impl GarmentTransform {
    pub fn new(
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// 原点、回転なし、等倍
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// シーンへ送信するOSCメッセージを構築
/// 引数: id, x, y, z, qx, qy, qz, qw, sx, sy, sz, fit
pub fn build_osc_message(id: i32, transform: &GarmentTransform, fit_overall: f32) -> OscMessage {
    OscMessage {
        addr: "/fit/garment".to_string(),
        args: vec![
            OscType::Int(id),
            OscType::Float(transform.position.x),
            OscType::Float(transform.position.y),
            OscType::Float(transform.position.z),
            OscType::Float(transform.rotation.coords.x),
            OscType::Float(transform.rotation.coords.y),
            OscType::Float(transform.rotation.coords.z),
            OscType::Float(transform.rotation.coords.w),
            OscType::Float(transform.scale.x),
            OscType::Float(transform.scale.y),
            OscType::Float(transform.scale.z),
            OscType::Float(fit_overall),
        ],
    }
}

/// OSCメッセージをバイト列にエンコード
pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// シーン（外部レンダラー）クライアント
pub struct SceneClient {
    socket: UdpSocket,
    target_addr: String,
}

impl SceneClient {
    /// 新しいシーンクライアントを作成
    pub fn new(target_addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
        })
    }

    /// デフォルトアドレス(127.0.0.1:39600)で作成
    pub fn default() -> Result<Self> {
        Self::new(SCENE_DEFAULT_ADDR)
    }

    /// 衣服の適用済み変換とフィット総合値を送信
    pub fn send(&self, id: i32, transform: &GarmentTransform, fit_overall: f32) -> Result<()> {
        let msg = build_osc_message(id, transform, fit_overall);
        let data = encode_osc_message(&msg)?;
        self.socket.send_to(&data, &self.target_addr)?;
        Ok(())
    }
}
