use criterion::{Criterion, criterion_group, criterion_main};

use av1_encode::{
    ColorRange, ColorSpace, EncoderAdapter, FrameRate, PixelFormat, VideoDescriptor, VideoFrame,
    default_settings, keys, open_session,
};

fn gradient_plane(rows: usize, cols: usize, seed: usize) -> Vec<u8> {
    (0..rows * cols)
        .map(|index| ((index + seed) % 256) as u8)
        .collect()
}

fn bench_encode_frame(c: &mut Criterion) {
    let mut settings = default_settings();
    settings.set(keys::SPEED, 10);
    settings.set(keys::THREADS, 1);
    settings.set(keys::LOOKAHEAD_FRAMES, 0);

    let descriptor = VideoDescriptor {
        width: 320,
        height: 180,
        fps: FrameRate { num: 30, den: 1 },
        format: PixelFormat::I420,
        range: ColorRange::Limited,
        color_space: ColorSpace::Bt709,
    };
    let mut session = open_session(&settings, &descriptor).expect("session should open");

    let y = gradient_plane(180, 320, 0);
    let u = gradient_plane(90, 160, 7);
    let v = gradient_plane(90, 160, 13);
    let mut pts = 0i64;

    c.bench_function("encode_320x180_i420", |b| {
        b.iter(|| {
            let frame = VideoFrame {
                planes: [&y, &u, &v],
                strides: [320, 160, 160],
                pts,
            };
            pts += 1;
            session
                .encode(&frame)
                .expect("encode should succeed")
                .map(|packet| packet.data.len())
        });
    });
}

criterion_group!(benches, bench_encode_frame);
criterion_main!(benches);
