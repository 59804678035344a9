use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gifreel::Encoder;

const WIDTH: u16 = 320;
const HEIGHT: u16 = 240;

/// Make a gradient frame, shifted for each step
fn gradient(step: usize) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(usize::from(WIDTH) * usize::from(HEIGHT) * 4);
    for y in 0..usize::from(HEIGHT) {
        for x in 0..usize::from(WIDTH) {
            rgba.push((x + step) as u8);
            rgba.push((y + step) as u8);
            rgba.push((x ^ y) as u8);
            rgba.push(255);
        }
    }
    rgba
}

fn encode_frames(crit: &mut Criterion) {
    let frames: Vec<Vec<u8>> = (0..4).map(|s| gradient(s * 8)).collect();
    crit.bench_function("encode_frames", |b| {
        b.iter(|| {
            let mut enc = Encoder::new(WIDTH, HEIGHT).unwrap();
            for frame in &frames {
                enc.add_frame(black_box(frame)).unwrap();
            }
            enc.finish().unwrap();
            black_box(enc.into_output());
        })
    });
}

criterion_group!(benches, encode_frames);
criterion_main!(benches);
