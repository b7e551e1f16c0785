//! # Fault-Proof Benchmarks
//!
//! | Component | Operation | Why it matters |
//! |-----------|-----------|----------------|
//! | Trie | root of N entries | proposer and challenger compute one per batch |
//! | Trie | prove + verify | state provider proofs |
//! | VM | encode + state hash | every bisection query hashes a state |
//! | VM | single step | replayed by the step verifier |
//! | VM | run to step N | each query re-executes from step 0 |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fp_01_trie::{verify_proof, Trie};
use fp_02_preimage_oracle::{LocalContext, PreimageStore};
use fp_03_mips_vm::program::sum_to;
use fp_03_mips_vm::{verify_step, LocalExecutor, VmState};
use rand::Rng;
use shared_types::keccak256;

// ============================================================================
// Trie
// ============================================================================

fn random_entries(count: usize) -> Vec<([u8; 32], Vec<u8>)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let key = keccak256(&(i as u64).to_be_bytes());
            let value: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
            (key, value)
        })
        .collect()
}

fn bench_trie_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("fp-01-trie");
    group.measurement_time(Duration::from_secs(10));

    for size in [100usize, 1_000, 10_000] {
        let entries = random_entries(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("build_and_root", size), &entries, |b, entries| {
            b.iter(|| {
                let mut trie = Trie::new();
                for (key, value) in entries {
                    trie.insert(key, value.clone());
                }
                black_box(trie.root())
            })
        });
    }

    let entries = random_entries(1_000);
    let mut trie = Trie::new();
    for (key, value) in &entries {
        trie.insert(key, value.clone());
    }
    let root = trie.root();
    group.bench_function("prove_and_verify_1000", |b| {
        let mut i = 0;
        b.iter(|| {
            let (key, _) = &entries[i % entries.len()];
            i += 1;
            let proof = trie.prove(key).unwrap();
            black_box(verify_proof(&root, &proof))
        })
    });

    group.finish();
}

// ============================================================================
// VM
// ============================================================================

fn bench_state_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("fp-03-state");
    let mut state = VmState {
        pc: 0x1000,
        next_pc: 0x1004,
        step: 123_456,
        ..VmState::default()
    };
    for (i, reg) in state.registers.iter_mut().enumerate() {
        *reg = ((i as u64) << 40) | 0xdead;
    }

    group.bench_function("encode", |b| b.iter(|| black_box(state.encode())));
    group.bench_function("state_hash", |b| b.iter(|| black_box(state.state_hash())));
    group.bench_function("decode", |b| {
        let encoded = state.encode();
        b.iter(|| black_box(VmState::decode(&encoded).unwrap()))
    });
    group.finish();
}

fn bench_vm_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("fp-03-mips-vm");
    let executor = LocalExecutor::from_program(&sum_to(2_000), Arc::new(PreimageStore::new())).unwrap();

    let proof = executor.generate_proof(100).unwrap();
    let local_inputs = LocalContext::new();
    group.bench_function("verify_single_step", |b| {
        b.iter(|| {
            black_box(verify_step(&proof.state_data, &proof.proof_data, &local_inputs).unwrap())
        })
    });

    for steps in [256u64, 1_024, 4_096] {
        group.throughput(Throughput::Elements(steps));
        group.bench_with_input(BenchmarkId::new("run_to_step", steps), &steps, |b, &steps| {
            b.iter(|| black_box(executor.state_hash_at(steps).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_trie_root, bench_state_hash, bench_vm_execution);
criterion_main!(benches);
