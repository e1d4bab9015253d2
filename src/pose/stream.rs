//! 姿勢オラクル（MediaPipe側プロセス）との通信
//!
//! フレームごとのランドマークを長さプレフィックス付きbincodeフレームで
//! 受信し、最新スナップショットだけを保持する。パイプライン側は
//! frame_idをポーリングし、ソケットを待たない。

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::pose::landmark::{merge_streams, Landmark};

/// オラクル → トラッカー
#[derive(Serialize, Deserialize, Debug)]
pub enum OracleMessage {
    /// 1フレーム分のランドマーク
    /// imageは正規化画像座標（可視性あり）、worldはメートル座標（任意）
    Landmarks {
        timestamp_us: u64,
        image: Vec<Landmark>,
        world: Option<Vec<Landmark>>,
    },
    /// Tポーズキャリブレーション開始要求
    TriggerCalibration,
    /// セッション終了
    Stop,
}

/// トラッカー → オラクル
#[derive(Serialize, Deserialize, Debug)]
pub enum TrackerMessage {
    Ready,
}

// --- TCP codec helpers ---

pub type MessageStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream(stream: TcpStream) -> MessageStream {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(1024 * 1024) // 1MB: ランドマークフレームには十分
        .new_codec();
    Framed::new(stream, codec)
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<T: Serialize>(stream: &mut MessageStream, msg: &T) -> Result<()> {
    let data = bincode::serialize(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and deserialize a message.
pub async fn recv_message<T: DeserializeOwned>(stream: &mut MessageStream) -> Result<T> {
    match stream.next().await {
        Some(Ok(bytes)) => Ok(bincode::deserialize(&bytes)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}

/// 別スレッドでオラクル接続を受け、最新のランドマークスナップショットを提供する
pub struct ThreadedLandmarkSource {
    latest: Arc<Mutex<Option<Vec<Landmark>>>>,
    frame_id: Arc<AtomicU64>,
    calibration_requested: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    _handle: thread::JoinHandle<()>,
}

impl ThreadedLandmarkSource {
    pub fn start(listen_addr: &str) -> Result<Self> {
        // bind失敗は起動時に検出したいので、スレッドに渡す前にバインドする
        let std_listener =
            std::net::TcpListener::bind(listen_addr).context("Failed to bind oracle listener")?;
        std_listener.set_nonblocking(true)?;

        let latest = Arc::new(Mutex::new(None::<Vec<Landmark>>));
        let frame_id = Arc::new(AtomicU64::new(0));
        let calibration_requested = Arc::new(AtomicBool::new(false));
        let stop_requested = Arc::new(AtomicBool::new(false));

        let latest_ref = latest.clone();
        let frame_id_ref = frame_id.clone();
        let calibration_ref = calibration_requested.clone();
        let stop_ref = stop_requested.clone();

        let handle = thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("oracle receiver: runtime error: {}", e);
                    return;
                }
            };
            if let Err(e) = runtime.block_on(Self::run(
                std_listener,
                latest_ref,
                frame_id_ref,
                calibration_ref,
                stop_ref,
            )) {
                eprintln!("oracle receiver: {}", e);
            }
        });

        Ok(Self {
            latest,
            frame_id,
            calibration_requested,
            stop_requested,
            _handle: handle,
        })
    }

    async fn run(
        std_listener: std::net::TcpListener,
        latest: Arc<Mutex<Option<Vec<Landmark>>>>,
        frame_id: Arc<AtomicU64>,
        calibration_requested: Arc<AtomicBool>,
        stop_requested: Arc<AtomicBool>,
    ) -> Result<()> {
        let listener = TcpListener::from_std(std_listener)?;
        loop {
            let (socket, peer) = listener.accept().await?;
            eprintln!("oracle connected: {}", peer);
            let mut stream = message_stream(socket);
            send_message(&mut stream, &TrackerMessage::Ready).await?;

            loop {
                let msg: OracleMessage = match recv_message(&mut stream).await {
                    Ok(msg) => msg,
                    Err(_) => {
                        // 切断: 次の接続を待つ
                        eprintln!("oracle disconnected");
                        break;
                    }
                };
                match msg {
                    OracleMessage::Landmarks { image, world, .. } => {
                        let merged = merge_streams(&image, world.as_deref());
                        *latest.lock().unwrap() = Some(merged);
                        frame_id.fetch_add(1, Ordering::Release);
                    }
                    OracleMessage::TriggerCalibration => {
                        calibration_requested.store(true, Ordering::Release);
                    }
                    OracleMessage::Stop => {
                        stop_requested.store(true, Ordering::Release);
                        return Ok(());
                    }
                }
            }
        }
    }

    /// 現在のフレームIDを取得。新フレームが到着するたびにインクリメントされる。
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    /// 最新のランドマークスナップショットを取得。
    /// 初回フレーム到着前のみNone。
    pub fn snapshot(&self) -> Option<Vec<Landmark>> {
        let guard = self.latest.lock().unwrap();
        guard.clone()
    }

    /// キャリブレーション要求が来ていれば取り出す（取り出すとクリアされる）
    pub fn take_calibration_request(&self) -> bool {
        self.calibration_requested.swap(false, Ordering::AcqRel)
    }

    /// オラクルから終了要求が来たか
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}
