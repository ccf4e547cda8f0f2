#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Write;
use zbatch::EncodeOptions;

fuzz_target!(|data: &[u8]| {
    let (header, data) = if let Some(x) = data.split_at_checked(3) {
        x
    } else {
        return;
    };
    let block_size = u16::from_le_bytes([header[0], header[1]]) as usize + 1;
    let chunk_size = header[2] as usize + 1;

    let mut single = EncodeOptions::new()
        .block_size(block_size)
        .into_encoder(Vec::<u8>::new())
        .unwrap();
    single.write_all(data).unwrap();
    let single = single.finish().unwrap();

    let mut chunked = EncodeOptions::new()
        .block_size(block_size)
        .into_encoder(Vec::<u8>::new())
        .unwrap();
    for chunk in data.chunks(chunk_size) {
        chunked.write_all(chunk).unwrap();
    }
    let chunked = chunked.finish().unwrap();

    assert_eq!(single.len(), chunked.len());
    let decompressed = zstd::decode_all(chunked.as_slice()).unwrap();
    assert_eq!(data, &decompressed);
});
