use std::fs;
use std::path::PathBuf;

use clap::Parser;

use av1_encode::{
    ColorRange, ColorSpace, EncoderAdapter, FrameRate, PixelFormat, VideoDescriptor, VideoFrame,
    default_settings, keys, open_session,
};

#[derive(Parser, Debug)]
#[command(about = "Encode synthetic I420 frames with the AV1 session adapter")]
struct Args {
    #[arg(long, default_value_t = 640)]
    width: u32,
    #[arg(long, default_value_t = 360)]
    height: u32,
    #[arg(long, default_value_t = 120)]
    frames: u32,
    #[arg(long, default_value_t = 30)]
    fps: u32,
    #[arg(long, default_value_t = 10)]
    speed: i64,
    #[arg(long)]
    bitrate_kbps: Option<i64>,
    #[arg(long)]
    output: Option<String>,
}

fn synthetic_i420(width: u32, height: u32, frame_index: u32) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let (w, h) = (width as usize, height as usize);
    let mut y = vec![0u8; w * h];
    for row in 0..h {
        for col in 0..w {
            y[row * w + col] = ((col + frame_index as usize) % 256) as u8;
        }
    }
    let (cw, ch) = (w / 2, h / 2);
    let mut u = vec![0u8; cw * ch];
    let mut v = vec![0u8; cw * ch];
    for row in 0..ch {
        for col in 0..cw {
            u[row * cw + col] = ((row + frame_index as usize * 2) % 256) as u8;
            v[row * cw + col] = ((frame_index as usize * 5) % 256) as u8;
        }
    }
    (y, u, v)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = default_settings();
    settings.set(keys::SPEED, args.speed);
    settings.set(keys::LOOKAHEAD_FRAMES, 0);
    if let Some(bitrate) = args.bitrate_kbps {
        settings.set(keys::RC_MODE, 0);
        settings.set(keys::RC_BITRATE, bitrate);
    }

    let descriptor = VideoDescriptor {
        width: args.width,
        height: args.height,
        fps: FrameRate {
            num: args.fps,
            den: 1,
        },
        format: PixelFormat::I420,
        range: ColorRange::Full,
        color_space: ColorSpace::Bt709,
    };
    let output_path = args
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./encoded-output.obu"));

    let mut session = open_session(&settings, &descriptor)?;
    let mut payload = Vec::new();
    let mut packet_count = 0usize;

    for index in 0..args.frames {
        let (y, u, v) = synthetic_i420(args.width, args.height, index);
        let frame = VideoFrame {
            planes: [&y, &u, &v],
            strides: [
                args.width as usize,
                args.width as usize / 2,
                args.width as usize / 2,
            ],
            pts: i64::from(index),
        };
        if let Some(packet) = session.encode(&frame)? {
            payload.extend_from_slice(packet.data);
            packet_count += 1;
        }
    }
    for packet in session.finish()? {
        payload.extend_from_slice(&packet.data);
        packet_count += 1;
    }

    fs::write(&output_path, &payload)?;
    println!(
        "encoded_packets={}, bytes={}, output={}",
        packet_count,
        payload.len(),
        output_path.display()
    );
    Ok(())
}
