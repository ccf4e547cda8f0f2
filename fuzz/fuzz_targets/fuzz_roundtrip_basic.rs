#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Write;
use zbatch::EncodeOptions;

fuzz_target!(|data: &[u8]| {
    let mut encoder = EncodeOptions::new()
        .block_size(100)
        .into_encoder(Vec::<u8>::new())
        .unwrap();
    encoder.write_all(data).unwrap();
    let compressed = encoder.finish().unwrap();

    let decompressed = zstd::decode_all(compressed.as_slice()).unwrap();
    assert_eq!(data, &decompressed);
});
