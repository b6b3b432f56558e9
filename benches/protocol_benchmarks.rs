use std::collections::HashMap;

use airplay_remote::control::Command;
use airplay_remote::protocol::crypto::Ed25519KeyPair;
use airplay_remote::protocol::http::parse_response;
use airplay_remote::protocol::pairing::PairVerify;
use airplay_remote::protocol::plist::{PlistValue, decode, encode};
use airplay_remote::types::PlaybackStatus;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn playback_info() -> PlistValue {
    let mut dict = HashMap::new();
    dict.insert("duration".to_string(), PlistValue::Real(5400.5));
    dict.insert("position".to_string(), PlistValue::Real(1234.25));
    dict.insert("rate".to_string(), PlistValue::Real(1.0));
    dict.insert("readyToPlay".to_string(), PlistValue::Boolean(true));
    dict.insert(
        "loadedTimeRanges".to_string(),
        PlistValue::Array(vec![PlistValue::Integer(0), PlistValue::Integer(600)]),
    );
    PlistValue::Dictionary(dict)
}

fn plist_benchmark(c: &mut Criterion) {
    let value = playback_info();
    let encoded = encode(&value).unwrap();

    c.bench_function("plist_decode_playback_info", |b| {
        b.iter(|| decode(black_box(&encoded)).unwrap())
    });

    c.bench_function("plist_encode_playback_info", |b| {
        b.iter(|| encode(black_box(&value)).unwrap())
    });

    c.bench_function("playback_status_from_info", |b| {
        b.iter(|| PlaybackStatus::from_playback_info(black_box(&value)))
    });
}

fn http_benchmark(c: &mut Criterion) {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/x-apple-binary-plist\r\nContent-Length: 4\r\nServer: AirTunes/220.68\r\n\r\nbody";

    c.bench_function("http_parse_response", |b| {
        b.iter(|| parse_response(black_box(raw)))
    });

    let play = Command::Play {
        url: "http://media.local/movies/feature.mp4".to_string(),
    };
    c.bench_function("http_encode_play", |b| {
        b.iter(|| black_box(&play).request().unwrap().encode())
    });
}

fn pair_verify_benchmark(c: &mut Criterion) {
    let identity = Ed25519KeyPair::generate();

    c.bench_function("pair_verify_start", |b| {
        b.iter(|| {
            let mut verify = PairVerify::new(black_box(&identity));
            verify.start().unwrap()
        })
    });
}

criterion_group!(
    benches,
    plist_benchmark,
    http_benchmark,
    pair_verify_benchmark
);
criterion_main!(benches);
