use anyhow::Result;
use std::time::{Duration, Instant};

use virtufit_tracker::config::Config;
use virtufit_tracker::fitting::calibrate::{load_measurements, save_measurements, PollOutcome};
use virtufit_tracker::garment::{Garment, GarmentCategory};
use virtufit_tracker::pose::ThreadedLandmarkSource;
use virtufit_tracker::scene::SceneClient;
use virtufit_tracker::session::TryOnSession;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== VirtuFit Tracker ===");
    println!("Oracle listen: {}", config.stream.listen_addr);
    println!("Scene target: {}", config.scene.addr);
    println!("Target FPS: {}", config.app.target_fps);
    println!("Smooth factor: {}", config.smooth.factor);
    println!(
        "Calibration: interval={}ms timeout={}s",
        config.calibration.poll_interval_ms, config.calibration.timeout_secs
    );
    println!();
    println!("オラクル側からTriggerCalibrationを送るとTポーズ計測を開始します");
    println!();

    let source = ThreadedLandmarkSource::start(&config.stream.listen_addr)?;
    let scene = SceneClient::new(&config.scene.addr)?;
    println!("Scene client ready");

    let mut session = TryOnSession::new(&config);

    // デモ用: Tシャツ1着を試着
    let mut shirt = Garment::new(0, GarmentCategory::UpperFitted);
    shirt.set_size_adjustment(config.garment.size_adjustment);
    session.add_garment(shirt);

    // 保存済みの採寸があれば復元
    if let Ok(measurements) = load_measurements(&config.calibration.output_path) {
        session.restore_measurements(measurements);
        println!("採寸を復元: {}", config.calibration.output_path);
    }

    let frame_duration = Duration::from_secs_f64(1.0 / config.app.target_fps as f64);

    // FPS計測
    let mut frame_count = 0u32;
    let mut update_count = 0u32;
    let mut fps_timer = Instant::now();
    let mut t_update = 0.0f64;
    let mut t_send = 0.0f64;

    let mut last_frame_id: u64 = 0;
    let mut last_fit: Option<f32> = None;

    loop {
        let loop_start = Instant::now();

        if source.stop_requested() {
            break;
        }

        let now = Instant::now();
        if source.take_calibration_request() {
            session.request_calibration(now);
            println!("Calibration... Tポーズをとってください");
        }

        let current_frame_id = source.frame_id();
        if current_frame_id != last_frame_id {
            if let Some(landmarks) = source.snapshot() {
                match session.poll_calibration(&landmarks, now) {
                    PollOutcome::Calibrated => {
                        if let Some(base) = session.base_measurements() {
                            if let Err(e) =
                                save_measurements(&config.calibration.output_path, &base)
                            {
                                eprintln!("採寸の保存に失敗: {}", e);
                            }
                        }
                        println!("Calibrated!");
                    }
                    PollOutcome::TimedOut => println!("Calibration timed out"),
                    _ => {}
                }

                let t0 = Instant::now();
                let fits = session.update(&landmarks);
                let t1 = Instant::now();
                for fit in &fits {
                    scene.send(fit.garment_id as i32, &fit.transform, fit.quality.overall)?;
                }
                let t2 = Instant::now();

                if let Some(first) = fits.first() {
                    last_fit = Some(first.quality.overall);
                }

                t_update += (t1 - t0).as_secs_f64() * 1000.0;
                t_send += (t2 - t1).as_secs_f64() * 1000.0;
                update_count += 1;
            }
            last_frame_id = current_frame_id;
        }

        // FPS表示（1秒に1回）
        frame_count += 1;
        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            if update_count > 0 {
                let n = update_count as f64;
                println!(
                    "FPS: {:.1} (frames: {}) | update {:.2}ms  send {:.2}ms | fit {}{}",
                    frame_count as f32 / elapsed,
                    update_count,
                    t_update / n,
                    t_send / n,
                    last_fit.map_or("-".to_string(), |f| format!("{:.2}", f)),
                    if session.is_calibrated() { " [CAL]" } else { "" }
                );
            } else {
                println!("FPS: {:.1} (frames: 0)", frame_count as f32 / elapsed);
            }
            frame_count = 0;
            update_count = 0;
            fps_timer = Instant::now();
            t_update = 0.0;
            t_send = 0.0;
        }

        // FPS上限制御（spin wait for precision）
        while loop_start.elapsed() < frame_duration {
            std::hint::spin_loop();
        }
    }

    session.stop();
    println!("Shutting down...");
    Ok(())
}
