//! Commitment hashing and reveal verification benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::distributions::Alphanumeric;
use rand::Rng;

use commit_reveal::voting::verify_reveal;
use commit_reveal::{compute_commitment, BallotConfig, CommitRevealBallot, ParticipantId};

fn random_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn bench_compute_commitment(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_commitment");
    for len in [8usize, 64, 1024] {
        let secret = random_secret(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &secret, |b, secret| {
            b.iter(|| compute_commitment(black_box(true), black_box(secret)))
        });
    }
    group.finish();
}

fn bench_verify_reveal(c: &mut Criterion) {
    let secret = random_secret(32);
    let digest = compute_commitment(false, &secret);

    c.bench_function("verify_reveal", |b| {
        b.iter(|| verify_reveal(black_box(&digest), black_box(false), black_box(&secret)))
    });
}

fn bench_commit_and_reveal(c: &mut Criterion) {
    c.bench_function("commit_reveal_1000_voters", |b| {
        let votes: Vec<(ParticipantId, bool, String)> = (0..1000u32)
            .map(|i| {
                let mut id = [0u8; 20];
                id[..4].copy_from_slice(&i.to_be_bytes());
                (ParticipantId::new(id), i % 3 == 0, random_secret(16))
            })
            .collect();

        b.iter(|| {
            let ballot = CommitRevealBallot::initialize(BallotConfig::default(), 0);
            for (id, choice, secret) in &votes {
                let _ = ballot.submit_commitment(*id, compute_commitment(*choice, secret), 0);
            }
            for (id, choice, secret) in &votes {
                let _ = ballot.reveal(*id, *choice, secret, 130);
            }
            black_box(ballot.get_tally())
        })
    });
}

criterion_group!(benches, bench_compute_commitment, bench_verify_reveal, bench_commit_and_reveal);
criterion_main!(benches);
