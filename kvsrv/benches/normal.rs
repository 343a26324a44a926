use criterion::{criterion_group, criterion_main, Criterion};

use tokio::{runtime::Builder, time::Instant};

use kvsrv::{tests::kv_server, KvStore};

fn bench_append(c: &mut Criterion) {
    let _ = env_logger::try_init();
    const NCLIENTS: usize = 10;
    const NQUERIES: usize = 1000;

    c.bench_function(
        &format!("{} append op from {} clients", NQUERIES, NCLIENTS),
        |b| {
            b.iter_custom(|iters| {
                let rt = Builder::new_multi_thread()
                    .worker_threads(4)
                    .enable_all()
                    .build()
                    .unwrap();

                rt.block_on(async {
                    let (clerk, _, _, _) = kv_server(KvStore::new());
                    let start = Instant::now();

                    for _ in 0..iters {
                        let mut appenders = Vec::new();
                        for i in 0..NCLIENTS {
                            let clerk = clerk.clone();
                            appenders.push(tokio::spawn(async move {
                                let key = format!("key-{}", i);
                                for _ in 0..NQUERIES / NCLIENTS {
                                    clerk.append(&key, "x").await.unwrap();
                                }
                            }));
                        }
                        for a in appenders {
                            a.await.expect("appenders should not panic");
                        }
                    }

                    start.elapsed()
                })
            });
        },
    );
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_append,
);
criterion_main!(benches);
