//! Benchmarks for hpke-chat operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hpke_chat::{setup_opener, setup_sealer, KeyPair};
use rand::rngs::OsRng;

fn bench_kem_operations(c: &mut Criterion) {
    c.bench_function("p384_keypair", |b| {
        b.iter(|| KeyPair::generate(black_box(&mut OsRng)))
    });

    let receiver = KeyPair::generate(&mut OsRng);
    c.bench_function("hpke_setup_sender", |b| {
        b.iter(|| setup_sealer(black_box(receiver.public_key()), b"", &mut OsRng).unwrap())
    });

    let (enc, _) = setup_sealer(receiver.public_key(), b"", &mut OsRng).unwrap();
    c.bench_function("hpke_setup_receiver", |b| {
        b.iter(|| setup_opener(receiver.private_key(), black_box(&enc), b"").unwrap())
    });
}

fn bench_aead_operations(c: &mut Criterion) {
    let receiver = KeyPair::generate(&mut OsRng);
    let (_, mut sealer) = setup_sealer(receiver.public_key(), b"", &mut OsRng).unwrap();
    let pt = vec![0u8; 1024];

    c.bench_function("seal_1k", |b| {
        b.iter(|| sealer.seal(black_box(&pt), b"").unwrap())
    });

    // Each open consumes one sequence number, so pair a fresh context per ciphertext
    c.bench_function("open_1k", |b| {
        b.iter_batched(
            || {
                let (enc, mut sealer) =
                    setup_sealer(receiver.public_key(), b"", &mut OsRng).unwrap();
                let ct = sealer.seal(&pt, b"").unwrap();
                let opener = setup_opener(receiver.private_key(), &enc, b"").unwrap();
                (opener, ct)
            },
            |(mut opener, ct)| opener.open(black_box(&ct), b"").unwrap(),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_kem_operations, bench_aead_operations);
criterion_main!(benches);
