// cargo fuzz run encode corpus/encode -- -timeout=30

#![no_main]

use libfuzzer_sys::fuzz_target;

use gifreel::Encoder;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // first two bytes pick the frame size
    let width = u16::from(data[0] % 32) + 1;
    let height = u16::from(data[1] % 32) + 1;
    let frame_sz = usize::from(width) * usize::from(height) * 4;
    let mut enc = Encoder::new(width, height).unwrap();
    for frame in data[2..].chunks_exact(frame_sz) {
        enc.add_frame(frame).unwrap();
    }
    enc.finish().unwrap();
    assert_eq!(enc.output().last(), Some(&0x3B));
});
